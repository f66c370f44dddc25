use crate::coordinator::CoordinatorEvent;
use crate::lookup::LookupResult;
use crate::query::Query;

/// What the content area shows. Exactly one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Message { text: String, is_error: bool },
    Loading,
    Result { query: Query, payload: LookupResult },
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::Message {
            text: String::new(),
            is_error: false,
        }
    }
}

/// Projects coordinator events onto the current [`ViewState`].
#[derive(Debug, Default)]
pub struct ViewStateDriver {
    current: ViewState,
}

impl ViewStateDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &ViewState {
        &self.current
    }

    pub fn apply(&mut self, event: &CoordinatorEvent) -> &ViewState {
        self.current = match event {
            CoordinatorEvent::Loading { .. } => ViewState::Loading,
            CoordinatorEvent::Succeeded { query, result } => ViewState::Result {
                query: query.clone(),
                payload: result.clone(),
            },
            CoordinatorEvent::Failed { message, .. } => ViewState::Message {
                text: message.clone(),
                is_error: true,
            },
        };
        &self.current
    }

    pub fn apply_all(&mut self, events: impl IntoIterator<Item = CoordinatorEvent>) -> &ViewState {
        for event in events {
            self.apply(&event);
        }
        &self.current
    }
}
