//! Decides when a lookup is issued and tracks its outcome.
//!
//! The coordinator never runs futures itself. Issuing a lookup hands back a
//! [`Fetch`] for the caller's executor; whatever it resolves to is fed back
//! through [`QueryCoordinator::complete`] on the same thread that owns the
//! coordinator. Completions for anything but the pending query are dropped,
//! so the view always follows the most recent submission.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::backend::{Backend, BackendError};
use crate::history::{HistoryChange, HistoryModel};
use crate::lookup::LookupResult;
use crate::query::Query;

/// Outcome of one backend call, tagged with the query it was issued for.
#[derive(Debug, Clone)]
pub struct Completion {
    pub query: Query,
    pub outcome: Result<LookupResult, BackendError>,
}

pub type Fetch = Pin<Box<dyn Future<Output = Completion> + Send>>;

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    Loading { query: Query },
    Succeeded { query: Query, result: LookupResult },
    Failed { query: Query, message: String },
}

pub struct QueryCoordinator {
    backend: Arc<dyn Backend>,
    history: HistoryModel,
    last_successful: Option<Query>,
    pending: Option<Query>,
    events: Vec<CoordinatorEvent>,
}

impl QueryCoordinator {
    pub fn new(backend: Arc<dyn Backend>, initial_history: Vec<Query>) -> Self {
        QueryCoordinator {
            backend,
            history: HistoryModel::new(initial_history),
            last_successful: None,
            pending: None,
            events: Vec::new(),
        }
    }

    pub fn history(&self) -> &HistoryModel {
        &self.history
    }

    #[cfg(test)]
    pub fn last_successful(&self) -> Option<&Query> {
        self.last_successful.as_ref()
    }

    pub fn pending(&self) -> Option<&Query> {
        self.pending.as_ref()
    }

    /// Issues a lookup for `raw` unless it is blank or is the query whose
    /// result is currently shown.
    pub fn submit(&mut self, raw: &str) -> Option<Fetch> {
        let query = Query::parse(raw)?;
        if self.last_successful.as_ref() == Some(&query) {
            tracing::debug!("{:?} is already displayed, not re-issuing", query.as_str());
            return None;
        }

        if let Some(previous) = self.pending.replace(query.clone()) {
            tracing::debug!("{:?} supersedes pending {:?}", query.as_str(), previous.as_str());
        }
        self.events.push(CoordinatorEvent::Loading { query: query.clone() });

        tracing::debug!("Issuing lookup for {:?}", query.as_str());
        let request = self.backend.fetch(query.clone());
        Some(
            request
                .map(move |outcome| Completion { query, outcome })
                .boxed(),
        )
    }

    pub fn complete(&mut self, completion: Completion) {
        match completion.outcome {
            Ok(result) => self.on_backend_success(completion.query, result),
            Err(error) => self.on_backend_failure(completion.query, error.to_string()),
        }
    }

    pub fn on_backend_success(&mut self, query: Query, result: LookupResult) {
        if !self.is_pending(&query) {
            tracing::debug!("Discarding stale result for {:?}", query.as_str());
            return;
        }

        self.pending = None;
        self.last_successful = Some(query.clone());
        self.history.record_success(query.clone());
        self.events.push(CoordinatorEvent::Succeeded { query, result });
    }

    pub fn on_backend_failure(&mut self, query: Query, message: String) {
        if !self.is_pending(&query) {
            tracing::debug!("Discarding stale failure for {:?}", query.as_str());
            return;
        }

        tracing::warn!("Lookup for {:?} failed: {}", query.as_str(), message);
        self.pending = None;
        self.last_successful = None;
        self.events.push(CoordinatorEvent::Failed { query, message });
    }

    /// Same rules as [`submit`](Self::submit); re-selecting the displayed
    /// entry does nothing.
    pub fn reissue_from_history(&mut self, index: usize) -> Option<Fetch> {
        let query = self.history.get(index)?.as_str().to_string();
        self.submit(&query)
    }

    /// Re-shows the most recent query when the panel becomes visible again.
    pub fn refresh_top(&mut self) -> Option<Fetch> {
        self.reissue_from_history(0)
    }

    pub fn panel_shown(&mut self) -> Option<Fetch> {
        self.refresh_top()
    }

    pub fn select_history(&mut self, query: Query) {
        self.history.select_without_fetch(query);
    }

    /// Selection listener for the history list widget. Only an explicit,
    /// unsuppressed pick of a listed entry re-issues it.
    pub fn on_history_change(&mut self, change: &HistoryChange) -> Option<Fetch> {
        match change {
            HistoryChange::SelectionChanged {
                selected: Some(query),
                suppressed: false,
            } => {
                let index = self.history.position(query)?;
                self.reissue_from_history(index)
            }
            _ => None,
        }
    }

    /// Trims the history to `max` entries.
    pub fn limit_history(&mut self, max: usize) {
        self.history.truncate(max);
    }

    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn drain_history_changes(&mut self) -> Vec<HistoryChange> {
        self.history.drain_changes()
    }

    fn is_pending(&self, query: &Query) -> bool {
        self.pending.as_ref() == Some(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FetchFuture;
    use std::sync::Mutex;

    /// Records every call and answers from a fixed script.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Query>>,
        failures: Mutex<Vec<(String, BackendError)>>,
    }

    impl RecordingBackend {
        fn failing_with(query: &str, error: BackendError) -> Self {
            let backend = RecordingBackend::default();
            backend
                .failures
                .lock()
                .unwrap()
                .push((query.to_string(), error));
            backend
        }

        fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|q| q.as_str().to_string())
                .collect()
        }
    }

    impl Backend for RecordingBackend {
        fn fetch(&self, query: Query) -> FetchFuture {
            self.calls.lock().unwrap().push(query.clone());
            let failure = self
                .failures
                .lock()
                .unwrap()
                .iter()
                .find(|(q, _)| q == query.as_str())
                .map(|(_, e)| e.clone());
            let outcome = match failure {
                Some(error) => Err(error),
                None => Ok(result_for(query.as_str())),
            };
            Box::pin(async move { outcome })
        }
    }

    fn result_for(word: &str) -> LookupResult {
        LookupResult {
            query: word.to_string(),
            translation: vec![format!("{}!", word)],
            ..Default::default()
        }
    }

    fn q(s: &str) -> Query {
        Query::parse(s).unwrap()
    }

    fn setup(history: &[&str]) -> (Arc<RecordingBackend>, QueryCoordinator) {
        setup_with(RecordingBackend::default(), history)
    }

    fn setup_with(
        backend: RecordingBackend,
        history: &[&str],
    ) -> (Arc<RecordingBackend>, QueryCoordinator) {
        let backend = Arc::new(backend);
        let coordinator = QueryCoordinator::new(
            backend.clone(),
            history.iter().map(|s| q(s)).collect(),
        );
        (backend, coordinator)
    }

    fn resolve(fetch: Fetch) -> Completion {
        fetch.now_or_never().expect("mock backend resolves immediately")
    }

    fn history_words(coordinator: &QueryCoordinator) -> Vec<&str> {
        coordinator.history().entries().iter().map(Query::as_str).collect()
    }

    #[test]
    fn test_successful_lookup_scenario() {
        let (backend, mut coordinator) = setup(&[]);

        let fetch = coordinator.submit("hello").expect("lookup issued");
        assert_eq!(
            coordinator.drain_events(),
            vec![CoordinatorEvent::Loading { query: q("hello") }]
        );
        assert_eq!(coordinator.pending(), Some(&q("hello")));

        coordinator.complete(resolve(fetch));

        assert_eq!(
            coordinator.drain_events(),
            vec![CoordinatorEvent::Succeeded {
                query: q("hello"),
                result: result_for("hello"),
            }]
        );
        assert_eq!(history_words(&coordinator), ["hello"]);
        assert_eq!(coordinator.last_successful(), Some(&q("hello")));
        assert!(coordinator.pending().is_none());
        assert_eq!(backend.calls(), ["hello"]);
    }

    #[test]
    fn test_resubmitting_displayed_query_is_noop() {
        let (backend, mut coordinator) = setup(&[]);
        let fetch = coordinator.submit("hello").unwrap();
        coordinator.complete(resolve(fetch));
        coordinator.drain_events();
        coordinator.drain_history_changes();

        assert!(coordinator.submit("hello").is_none());
        assert!(coordinator.submit("  hello  ").is_none());
        assert!(coordinator.drain_events().is_empty());
        assert!(coordinator.drain_history_changes().is_empty());
        assert_eq!(backend.calls(), ["hello"]);
    }

    #[test]
    fn test_blank_submission_is_noop() {
        let (backend, mut coordinator) = setup(&["a"]);
        assert!(coordinator.submit("").is_none());
        assert!(coordinator.submit("   ").is_none());
        assert!(coordinator.drain_events().is_empty());
        assert!(coordinator.drain_history_changes().is_empty());
        assert!(coordinator.pending().is_none());
        assert!(backend.calls().is_empty());
        assert_eq!(history_words(&coordinator), ["a"]);
    }

    #[test]
    fn test_stale_success_is_discarded() {
        let (_backend, mut coordinator) = setup(&[]);
        let first = coordinator.submit("q1").unwrap();
        let second = coordinator.submit("q2").unwrap();
        coordinator.drain_events();

        coordinator.complete(resolve(first));

        assert!(coordinator.drain_events().is_empty());
        assert_eq!(coordinator.pending(), Some(&q("q2")));
        assert!(coordinator.last_successful().is_none());
        assert!(coordinator.history().is_empty());

        coordinator.complete(resolve(second));
        assert_eq!(
            coordinator.drain_events(),
            vec![CoordinatorEvent::Succeeded {
                query: q("q2"),
                result: result_for("q2"),
            }]
        );
        assert_eq!(history_words(&coordinator), ["q2"]);
    }

    #[test]
    fn test_stale_failure_is_discarded() {
        let (_backend, mut coordinator) = setup(&[]);
        let _first = coordinator.submit("q1").unwrap();
        let _second = coordinator.submit("q2").unwrap();
        coordinator.drain_events();

        coordinator.on_backend_failure(q("q1"), "timeout".to_string());
        assert!(coordinator.drain_events().is_empty());
        assert_eq!(coordinator.pending(), Some(&q("q2")));
    }

    #[test]
    fn test_completion_without_pending_is_discarded() {
        let (_backend, mut coordinator) = setup(&[]);
        coordinator.on_backend_success(q("ghost"), result_for("ghost"));
        assert!(coordinator.drain_events().is_empty());
        assert!(coordinator.history().is_empty());
    }

    #[test]
    fn test_failure_resets_dedup() {
        let error = BackendError::Network("network error".to_string());
        let (backend, mut coordinator) =
            setup_with(RecordingBackend::failing_with("foo", error.clone()), &[]);

        let fetch = coordinator.submit("foo").unwrap();
        coordinator.drain_events();
        coordinator.complete(resolve(fetch));

        assert_eq!(
            coordinator.drain_events(),
            vec![CoordinatorEvent::Failed {
                query: q("foo"),
                message: error.to_string(),
            }]
        );
        assert!(coordinator.last_successful().is_none());
        assert!(coordinator.history().is_empty());

        assert!(coordinator.submit("foo").is_some());
        assert_eq!(backend.calls(), ["foo", "foo"]);
    }

    #[test]
    fn test_failure_after_success_clears_last_successful() {
        let (backend, mut coordinator) = setup(&[]);
        let fetch = coordinator.submit("hello").unwrap();
        coordinator.complete(resolve(fetch));

        let _world = coordinator.submit("world").unwrap();
        coordinator.on_backend_failure(q("world"), "network error".to_string());
        assert!(coordinator.last_successful().is_none());

        // previously displayed query is no longer deduplicated
        assert!(coordinator.submit("hello").is_some());
        assert_eq!(backend.calls(), ["hello", "world", "hello"]);
    }

    #[test]
    fn test_reissue_from_history() {
        let (backend, mut coordinator) = setup(&["alpha", "beta"]);
        assert!(coordinator.reissue_from_history(1).is_some());
        assert!(coordinator.reissue_from_history(7).is_none());
        assert_eq!(backend.calls(), ["beta"]);
    }

    #[test]
    fn test_reissue_of_displayed_entry_is_noop() {
        let (backend, mut coordinator) = setup(&["alpha", "beta"]);
        let fetch = coordinator.reissue_from_history(1).unwrap();
        coordinator.complete(resolve(fetch));
        assert_eq!(history_words(&coordinator), ["beta", "alpha"]);

        assert!(coordinator.reissue_from_history(0).is_none());
        assert_eq!(backend.calls(), ["beta"]);
    }

    #[test]
    fn test_refresh_top() {
        let (backend, mut coordinator) = setup(&[]);
        assert!(coordinator.refresh_top().is_none());

        let fetch = coordinator.submit("hello").unwrap();
        coordinator.complete(resolve(fetch));
        assert!(coordinator.panel_shown().is_none());
        assert_eq!(backend.calls(), ["hello"]);

        let (backend, mut coordinator) = setup(&["persisted"]);
        assert!(coordinator.panel_shown().is_some());
        assert_eq!(backend.calls(), ["persisted"]);
    }

    #[test]
    fn test_success_notifications_do_not_loop_back() {
        let (backend, mut coordinator) = setup(&["old"]);
        let fetch = coordinator.submit("new").unwrap();
        coordinator.complete(resolve(fetch));

        let changes = coordinator.drain_history_changes();
        assert_eq!(changes[0], HistoryChange::Reordered);
        for change in &changes {
            assert!(coordinator.on_history_change(change).is_none());
        }
        assert_eq!(backend.calls(), ["new"]);
    }

    #[test]
    fn test_selection_alone_never_fetches() {
        let (backend, mut coordinator) = setup(&["alpha", "beta"]);
        coordinator.select_history(q("beta"));
        assert_eq!(coordinator.history().selected(), Some(&q("beta")));
        assert!(backend.calls().is_empty());
        assert!(coordinator.drain_events().is_empty());
    }

    #[test]
    fn test_user_selection_listener_reissues() {
        let (backend, mut coordinator) = setup(&["alpha", "beta"]);
        coordinator.select_history(q("beta"));

        let fetches: Vec<Fetch> = coordinator
            .drain_history_changes()
            .iter()
            .filter_map(|change| coordinator.on_history_change(change))
            .collect();

        assert_eq!(fetches.len(), 1);
        assert_eq!(backend.calls(), ["beta"]);
    }

    #[test]
    fn test_limit_history() {
        let (_backend, mut coordinator) = setup(&["a", "b", "c"]);
        coordinator.limit_history(2);
        assert_eq!(history_words(&coordinator), ["a", "b"]);
        assert_eq!(coordinator.drain_history_changes(), vec![HistoryChange::Reordered]);
    }
}
