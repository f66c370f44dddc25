mod backend;
mod cache;
mod config;
mod coordinator;
mod history;
mod lookup;
mod query;
mod render;
mod store;
mod view_state;

use iced::{
    alignment, clipboard,
    event::{self, Event as IcedEvent},
    keyboard::{self, Key},
    time,
    widget::{
        button, column, container, pick_list, row, scrollable, text, text_input, text_input::Id,
        tooltip,
    },
    window::{self, Level},
    Element, Length, Padding, Size, Subscription, Task, Theme,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::backend::{Backend, LookupClient};
use crate::cache::ResultCache;
use crate::coordinator::{Completion, Fetch, QueryCoordinator};
use crate::history::HistoryChange;
use crate::query::Query;
use crate::render::EntryRenderer;
use crate::store::HistoryStore;
use crate::view_state::{ViewState, ViewStateDriver};

const LOADING_FRAMES: [&str; 10] = [
    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
];

fn init_tracing() {
    let default_directive = if std::env::var("LOOKUPBAR_DEBUG").is_ok() {
        "lookup_bar=debug"
    } else {
        "lookup_bar=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> iced::Result {
    init_tracing();

    let config = config::Config::load();
    let window_settings = window::Settings {
        size: Size::new(config.window.width as f32, config.window.height as f32),
        min_size: Some(Size::new(
            config.window.min_width as f32,
            config.window.min_height as f32,
        )),
        position: window::Position::Centered,
        ..Default::default()
    };

    iced::application("Translation", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window_settings)
        .run_with(move || App::new(config))
}

/// One row of the history list.
#[derive(Debug, Clone, PartialEq)]
struct HistoryItem {
    query: Query,
    label: String,
    tooltip: String,
}

impl fmt::Display for HistoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(String),
    Submit,
    HistoryPicked(HistoryItem),
    Completed(Completion),
    PanelShown,
    PanelHidden,
    WindowFocused,
    Tick,
    CopyOutput,
    Exit,
}

struct App {
    input_text: String,
    coordinator: QueryCoordinator,
    view_state: ViewStateDriver,
    cache: ResultCache,
    renderer: EntryRenderer,
    store: Option<HistoryStore>,
    max_history: usize,
    history_items: Vec<HistoryItem>,
    loading_frame: usize,
    input_id: Id,
    /// Set until the window is first shown and again while it is minimized.
    hidden: bool,
}

/// Maps window events onto panel lifecycle messages. Plain focus changes
/// (alt-tab, clicking back in) are not a re-show.
fn window_message(event: window::Event) -> Option<Message> {
    match event {
        window::Event::Opened { .. } => Some(Message::PanelShown),
        window::Event::Resized(size) if size.width == 0.0 || size.height == 0.0 => {
            Some(Message::PanelHidden)
        }
        window::Event::Focused => Some(Message::WindowFocused),
        _ => None,
    }
}

impl App {
    fn new(config: config::Config) -> (Self, Task<Message>) {
        let cache = ResultCache::new(config.cache.capacity);

        let client = match LookupClient::with_config(&config.backend, cache.clone()) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Could not create lookup client: {:#}", e);
                std::process::exit(1);
            }
        };

        let max_history = config.history.max_entries;
        let store = match HistoryStore::open_default() {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!("History will not be persisted: {:#}", e);
                None
            }
        };
        let initial = match &store {
            Some(store) => store.load(max_history).unwrap_or_else(|e| {
                tracing::warn!("Could not load history: {:#}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        tracing::info!("Loaded {} history entries", initial.len());

        let app = App::from_parts(Arc::new(client), cache, store, initial, &config);

        let focus_task = text_input::focus(app.input_id.clone());
        let window_task = window::get_latest()
            .and_then(|id| window::change_level(id, Level::AlwaysOnTop));

        (app, Task::batch([focus_task, window_task]))
    }

    fn from_parts(
        backend: Arc<dyn Backend>,
        cache: ResultCache,
        store: Option<HistoryStore>,
        initial: Vec<Query>,
        config: &config::Config,
    ) -> Self {
        let max_history = config.history.max_entries;
        let mut coordinator = QueryCoordinator::new(backend, initial);
        coordinator.limit_history(max_history);
        coordinator.drain_history_changes();

        let mut app = App {
            input_text: String::new(),
            coordinator,
            view_state: ViewStateDriver::new(),
            cache,
            renderer: EntryRenderer::new(config.history.preview_width),
            store,
            max_history,
            history_items: Vec::new(),
            loading_frame: 0,
            input_id: Id::unique(),
            hidden: true,
        };
        app.refresh_history_items();
        app
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputChanged(value) => {
                self.input_text = value;
                Task::none()
            }
            Message::Submit => {
                let fetch = self.coordinator.submit(&self.input_text);
                self.sync(fetch)
            }
            Message::HistoryPicked(item) => {
                self.input_text = item.query.to_string();
                self.coordinator.select_history(item.query);
                self.sync(None)
            }
            Message::Completed(completion) => {
                self.coordinator.complete(completion);
                self.sync(None)
            }
            Message::PanelShown | Message::WindowFocused if self.hidden => self.show_panel(),
            Message::PanelShown | Message::WindowFocused => Task::none(),
            Message::PanelHidden => {
                self.hidden = true;
                Task::none()
            }
            Message::Tick => {
                if matches!(self.view_state.current(), ViewState::Loading) {
                    self.loading_frame = (self.loading_frame + 1) % LOADING_FRAMES.len();
                }
                Task::none()
            }
            Message::CopyOutput => match self.view_state.current() {
                ViewState::Result { payload, .. } => {
                    clipboard::write(payload.to_display_text())
                }
                _ => Task::none(),
            },
            Message::Exit => iced::exit(),
        }
    }

    /// Re-shows the most recent query. A lookup already in flight is left alone.
    fn show_panel(&mut self) -> Task<Message> {
        self.hidden = false;
        if self.coordinator.pending().is_some() {
            return Task::none();
        }

        if let Some(top) = self.coordinator.history().get(0) {
            self.input_text = top.to_string();
        }
        let fetch = self.coordinator.panel_shown();
        self.sync(fetch)
    }

    /// Routes history notifications to their consumers, applies queued
    /// coordinator events to the view and turns every issued lookup into a task.
    fn sync(&mut self, fetch: Option<Fetch>) -> Task<Message> {
        let mut fetches: Vec<Fetch> = fetch.into_iter().collect();

        self.coordinator.limit_history(self.max_history);

        let mut reordered = false;
        for change in self.coordinator.drain_history_changes() {
            match &change {
                HistoryChange::Reordered => reordered = true,
                HistoryChange::SelectionChanged { selected: Some(query), .. } => {
                    self.input_text = query.to_string();
                }
                HistoryChange::SelectionChanged { selected: None, .. } => {}
            }
            fetches.extend(self.coordinator.on_history_change(&change));
        }

        if reordered {
            self.persist_history();
        }

        let events = self.coordinator.drain_events();
        if !events.is_empty() {
            self.loading_frame = 0;
            self.view_state.apply_all(events);
        }
        self.refresh_history_items();

        Task::batch(
            fetches
                .into_iter()
                .map(|fetch| Task::perform(fetch, Message::Completed)),
        )
    }

    fn persist_history(&self) {
        if let Some(store) = &self.store {
            let entries = self.coordinator.history().entries();
            if let Err(e) = store.replace_all(entries, self.max_history) {
                tracing::warn!("Could not save history: {:#}", e);
            }
        }
    }

    fn refresh_history_items(&mut self) {
        self.history_items = self
            .coordinator
            .history()
            .entries()
            .iter()
            .map(|query| {
                let cached = self.cache.get(query);
                let rendered = self.renderer.render(query, cached.as_ref());
                HistoryItem {
                    query: query.clone(),
                    label: rendered.label,
                    tooltip: rendered.tooltip,
                }
            })
            .collect();
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if matches!(self.view_state.current(), ViewState::Loading) {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| match event {
            IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) => Some(Message::Exit),
            IcedEvent::Window(window_event) => window_message(window_event),
            _ => None,
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<Message> {
        let input = text_input("Word or phrase...", &self.input_text)
            .on_input(Message::InputChanged)
            .on_submit(Message::Submit)
            .padding(10)
            .size(16)
            .id(self.input_id.clone());

        let query_button = button(text("Query").size(14))
            .on_press(Message::Submit)
            .padding(10);

        let selected = self
            .coordinator
            .history()
            .selected()
            .and_then(|query| self.history_items.iter().find(|item| &item.query == query));

        let picker = pick_list(self.history_items.as_slice(), selected, Message::HistoryPicked)
            .placeholder(if self.coordinator.history().is_empty() {
                "No history yet"
            } else {
                "History"
            })
            .width(Length::Fill);

        let history: Element<Message> = match selected {
            Some(item) => tooltip(
                picker,
                text(item.tooltip.as_str()).size(13),
                tooltip::Position::Bottom,
            )
            .style(container::rounded_box)
            .into(),
            None => picker.into(),
        };

        let output: Element<Message> = match self.view_state.current() {
            ViewState::Message { text: message, is_error } => {
                let label = if *is_error {
                    text(message.as_str()).size(15).style(text::danger)
                } else {
                    text(message.as_str()).size(15)
                };
                container(label)
                    .width(Length::Fill)
                    .height(Length::Fill)
                    .align_x(alignment::Horizontal::Center)
                    .align_y(alignment::Vertical::Center)
                    .into()
            }
            ViewState::Loading => container(
                column![
                    text(LOADING_FRAMES[self.loading_frame % LOADING_FRAMES.len()]).size(32),
                    text(match self.coordinator.pending() {
                        Some(query) => format!("Querying \"{}\"...", query),
                        None => "Querying...".to_string(),
                    })
                    .size(15)
                ]
                .spacing(10)
                .align_x(alignment::Horizontal::Center),
            )
            .width(Length::Fill)
            .height(Length::Fill)
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .into(),
            ViewState::Result { payload, .. } => scrollable(
                container(text(payload.to_display_text()).size(15))
                    .padding(15)
                    .width(Length::Fill),
            )
            .height(Length::Fill)
            .into(),
        };

        let mut content_column = column![
            row![input, query_button].spacing(6),
            history,
            output
        ]
        .spacing(10)
        .padding(10);

        if matches!(self.view_state.current(), ViewState::Result { .. }) {
            let copy_button = container(
                button(text("[Copy]").size(14))
                    .on_press(Message::CopyOutput)
                    .padding(10),
            )
            .width(Length::Fill)
            .align_x(alignment::Horizontal::Right)
            .padding(Padding::from([10, 10]));

            content_column = content_column.push(copy_button);
        }

        container(content_column)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}
