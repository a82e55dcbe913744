use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted, LocalBoxFuture};
use futures::FutureExt;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::api::error::FetchError;

/// Abort handle handed to one fetch invocation.
///
/// Cancelling drops the in-flight future at its next suspension point; the
/// fetcher can also poll [`CancellationToken::check`] between steps.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    handle: AbortHandle,
}

impl CancellationToken {
    fn new_pair() -> (Self, AbortRegistration) {
        let (handle, registration) = AbortHandle::new_pair();
        (Self { handle }, registration)
    }

    /// A token that is never cancelled by a controller
    pub fn detached() -> Self {
        Self::new_pair().0
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }

    /// `Err(FetchError::Cancelled)` once cancelled, for use with `?`
    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Fetch lifecycle as seen by consumers
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// When false no fetch is issued
    pub enabled: bool,
    /// Keep the last successful data visible while a new fetch runs
    pub preserve_previous_data: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            preserve_previous_data: false,
        }
    }
}

/// Future that performs one fetch and commits its outcome. The caller spawns
/// it on the local executor.
pub type FetchTask = LocalBoxFuture<'static, ()>;

type BoxFetcher<P, T> = Rc<dyn Fn(P, CancellationToken) -> LocalBoxFuture<'static, Result<T, FetchError>>>;
type Listener<T> = Rc<dyn Fn(&FetchState<T>)>;

struct Inner<P, T> {
    state: FetchState<T>,
    options: LoadOptions,
    params: Option<P>,
    params_key: Option<Value>,
    generation: u64,
    in_flight: Option<CancellationToken>,
    mounted: bool,
    listeners: Vec<Listener<T>>,
}

/// Owns the fetch lifecycle of one consumer.
///
/// Only the most recently issued fetch may commit state. Earlier fetches are
/// aborted when a new one starts, and anything that still settles late is
/// discarded by generation.
pub struct AsyncDataController<P, T> {
    fetcher: BoxFetcher<P, T>,
    inner: Rc<RefCell<Inner<P, T>>>,
}

impl<P, T> Clone for AsyncDataController<P, T> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Rc::clone(&self.fetcher),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P, T> AsyncDataController<P, T>
where
    P: Serialize + Clone + 'static,
    T: Clone + 'static,
{
    pub fn new<F, Fut>(fetcher: F, options: LoadOptions) -> Self
    where
        F: Fn(P, CancellationToken) -> Fut + 'static,
        Fut: Future<Output = Result<T, FetchError>> + 'static,
    {
        Self {
            fetcher: Rc::new(move |params, token| fetcher(params, token).boxed_local()),
            inner: Rc::new(RefCell::new(Inner {
                state: FetchState::default(),
                options,
                params: None,
                params_key: None,
                generation: 0,
                in_flight: None,
                mounted: true,
                listeners: Vec::new(),
            })),
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FetchState<T> {
        self.inner.borrow().state.clone()
    }

    pub fn options(&self) -> LoadOptions {
        self.inner.borrow().options
    }

    /// Replaces the options; takes effect on the next `load`/`reload`
    pub fn set_options(&self, options: LoadOptions) {
        self.inner.borrow_mut().options = options;
    }

    /// Registers a callback invoked after every state change
    pub fn subscribe(&self, listener: impl Fn(&FetchState<T>) + 'static) {
        self.inner.borrow_mut().listeners.push(Rc::new(listener));
    }

    /// Records `params` and starts a fetch when they differ (by serialized
    /// value) from the previous ones.
    pub fn load(&self, params: P) -> Option<FetchTask> {
        let key = serde_json::to_value(&params).ok();
        {
            let mut inner = self.inner.borrow_mut();
            if key.is_some() && inner.params_key == key && inner.params.is_some() {
                return None;
            }
            inner.params = Some(params);
            inner.params_key = key;
        }
        self.start()
    }

    /// Re-issues the fetch for the current params. The only recovery path
    /// after an error.
    pub fn reload(&self) -> Option<FetchTask> {
        self.start()
    }

    /// Stops all further state writes and aborts the in-flight fetch
    pub fn unmount(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.mounted = false;
        if let Some(token) = inner.in_flight.take() {
            token.cancel();
        }
        inner.listeners.clear();
    }

    fn start(&self) -> Option<FetchTask> {
        let (params, token, registration, generation) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.mounted || !inner.options.enabled {
                return None;
            }
            let params = inner.params.clone()?;

            if let Some(previous) = inner.in_flight.take() {
                previous.cancel();
            }
            inner.generation += 1;
            let (token, registration) = CancellationToken::new_pair();
            inner.in_flight = Some(token.clone());
            inner.state.loading = true;
            if !inner.options.preserve_previous_data {
                inner.state.data = None;
            }
            (params, token, registration, inner.generation)
        };
        debug!("Starting fetch generation {}", generation);
        notify(&self.inner);

        let fetch = (self.fetcher)(params, token);
        let inner = Rc::clone(&self.inner);
        Some(
            async move {
                let outcome = Abortable::new(fetch, registration).await;
                settle(&inner, generation, outcome);
            }
            .boxed_local(),
        )
    }
}

fn settle<P, T: Clone>(
    inner: &Rc<RefCell<Inner<P, T>>>,
    generation: u64,
    outcome: Result<Result<T, FetchError>, Aborted>,
) {
    {
        let mut guard = inner.borrow_mut();
        if !guard.mounted {
            debug!("Fetch generation {} settled after unmount", generation);
            return;
        }
        if guard.generation != generation {
            debug!("Discarding superseded fetch generation {}", generation);
            return;
        }
        match outcome {
            // data and error stay as they were
            Err(Aborted) | Ok(Err(FetchError::Cancelled)) => {
                debug!("Fetch generation {} cancelled", generation);
            }
            Ok(Ok(data)) => {
                guard.state.data = Some(data);
                guard.state.error = None;
            }
            Ok(Err(error)) => {
                warn!("Fetch generation {} failed: {}", generation, error);
                guard.state.error = Some(error);
            }
        }
        guard.state.loading = false;
        guard.in_flight = None;
    }
    notify(inner);
}

fn notify<P, T: Clone>(inner: &Rc<RefCell<Inner<P, T>>>) {
    let (state, listeners) = {
        let guard = inner.borrow();
        (guard.state.clone(), guard.listeners.clone())
    };
    for listener in listeners {
        listener(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::collections::HashMap;

    type Reply = Result<String, FetchError>;

    /// Fetcher whose responses are released by the test, one sender per page
    struct Harness {
        pool: LocalPool,
        senders: Rc<RefCell<HashMap<u32, oneshot::Sender<Reply>>>>,
        seen_tokens: Rc<RefCell<Vec<CancellationToken>>>,
        calls: Rc<Cell<usize>>,
        controller: AsyncDataController<u32, String>,
    }

    impl Harness {
        fn new(options: LoadOptions) -> Self {
            let senders: Rc<RefCell<HashMap<u32, oneshot::Sender<Reply>>>> = Rc::default();
            let seen_tokens: Rc<RefCell<Vec<CancellationToken>>> = Rc::default();
            let calls = Rc::new(Cell::new(0));

            let controller = {
                let senders = Rc::clone(&senders);
                let seen_tokens = Rc::clone(&seen_tokens);
                let calls = Rc::clone(&calls);
                AsyncDataController::new(
                    move |page: u32, token: CancellationToken| {
                        let (tx, rx) = oneshot::channel();
                        senders.borrow_mut().insert(page, tx);
                        seen_tokens.borrow_mut().push(token);
                        calls.set(calls.get() + 1);
                        async move { rx.await.unwrap_or(Err(FetchError::Network("dropped".into()))) }
                    },
                    options,
                )
            };

            Self {
                pool: LocalPool::new(),
                senders,
                seen_tokens,
                calls,
                controller,
            }
        }

        fn spawn(&mut self, task: Option<FetchTask>) {
            let task = task.expect("a fetch should have been issued");
            self.pool.spawner().spawn_local(task).unwrap();
            self.pool.run_until_stalled();
        }

        fn reply(&mut self, page: u32, reply: Reply) {
            if let Some(tx) = self.senders.borrow_mut().remove(&page) {
                let _ = tx.send(reply);
            }
            self.pool.run_until_stalled();
        }
    }

    #[test]
    fn test_success_commits_data() {
        let mut h = Harness::new(LoadOptions::default());
        let task = h.controller.load(1);
        h.spawn(task);
        assert!(h.controller.state().loading);

        h.reply(1, Ok("page-1".into()));

        let state = h.controller.state();
        assert_eq!(state.data.as_deref(), Some("page-1"));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_superseded_fetch_never_commits() {
        let mut h = Harness::new(LoadOptions::default());
        let first = h.controller.load(1);
        h.spawn(first);
        let second = h.controller.load(2);
        h.spawn(second);

        assert!(h.seen_tokens.borrow()[0].is_cancelled());
        assert!(!h.seen_tokens.borrow()[1].is_cancelled());

        h.reply(2, Ok("page-2".into()));
        h.reply(1, Ok("page-1".into()));

        assert_eq!(h.controller.state().data.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_older_fetch_resolving_first_is_discarded() {
        let mut h = Harness::new(LoadOptions::default());
        let first = h.controller.load(1);
        h.spawn(first);
        let second = h.controller.load(2);
        h.spawn(second);

        h.reply(1, Ok("page-1".into()));
        let state = h.controller.state();
        assert_eq!(state.data, None);
        assert!(state.loading);

        h.reply(2, Ok("page-2".into()));
        assert_eq!(h.controller.state().data.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_preserve_previous_data_while_loading() {
        let mut h = Harness::new(LoadOptions {
            enabled: true,
            preserve_previous_data: true,
        });
        let task = h.controller.load(1);
        h.spawn(task);
        h.reply(1, Ok("page-1".into()));

        let task = h.controller.load(2);
        h.spawn(task);
        let state = h.controller.state();
        assert!(state.loading);
        assert_eq!(state.data.as_deref(), Some("page-1"));
    }

    #[test]
    fn test_clear_data_when_not_preserving() {
        let mut h = Harness::new(LoadOptions::default());
        let task = h.controller.load(1);
        h.spawn(task);
        h.reply(1, Ok("page-1".into()));

        let task = h.controller.load(2);
        h.spawn(task);
        assert_eq!(h.controller.state().data, None);
    }

    #[test]
    fn test_error_keeps_previous_data_and_reload_recovers() {
        let mut h = Harness::new(LoadOptions {
            enabled: true,
            preserve_previous_data: true,
        });
        let task = h.controller.load(1);
        h.spawn(task);
        h.reply(1, Ok("page-1".into()));

        let task = h.controller.reload();
        h.spawn(task);
        h.reply(1, Err(FetchError::Network("offline".into())));

        let state = h.controller.state();
        assert_eq!(state.data.as_deref(), Some("page-1"));
        assert_eq!(state.error, Some(FetchError::Network("offline".into())));
        assert!(!state.loading);

        let task = h.controller.reload();
        h.spawn(task);
        h.reply(1, Ok("page-1b".into()));

        let state = h.controller.state();
        assert_eq!(state.data.as_deref(), Some("page-1b"));
        assert!(state.error.is_none());
        assert_eq!(h.calls.get(), 3);
    }

    #[test]
    fn test_unchanged_params_do_not_refetch() {
        let mut h = Harness::new(LoadOptions::default());
        let task = h.controller.load(7);
        h.spawn(task);
        assert!(h.controller.load(7).is_none());
        assert_eq!(h.calls.get(), 1);
    }

    #[test]
    fn test_disabled_issues_nothing() {
        let h = Harness::new(LoadOptions {
            enabled: false,
            preserve_previous_data: false,
        });
        assert!(h.controller.load(1).is_none());
        assert!(!h.controller.state().loading);
        assert_eq!(h.calls.get(), 0);
    }

    #[test]
    fn test_fetcher_reported_cancellation_is_invisible() {
        let mut h = Harness::new(LoadOptions::default());
        let task = h.controller.load(1);
        h.spawn(task);
        h.reply(1, Err(FetchError::Cancelled));

        let state = h.controller.state();
        assert!(state.error.is_none());
        assert!(state.data.is_none());
        assert!(!state.loading);
    }

    #[test]
    fn test_cancellation_after_success_keeps_data_and_clears_loading() {
        let mut h = Harness::new(LoadOptions {
            enabled: true,
            preserve_previous_data: true,
        });
        let task = h.controller.load(1);
        h.spawn(task);
        h.reply(1, Ok("page-1".into()));

        let task = h.controller.reload();
        h.spawn(task);
        assert!(h.controller.state().loading);
        h.reply(1, Err(FetchError::Cancelled));

        let state = h.controller.state();
        assert_eq!(state.data.as_deref(), Some("page-1"));
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[test]
    fn test_unmount_stops_writes() {
        let mut h = Harness::new(LoadOptions::default());
        let task = h.controller.load(1);
        h.spawn(task);
        h.controller.unmount();
        assert!(h.seen_tokens.borrow()[0].is_cancelled());

        h.reply(1, Ok("late".into()));
        let state = h.controller.state();
        assert_eq!(state.data, None);
        assert!(h.controller.reload().is_none());
    }

    #[test]
    fn test_listeners_see_each_transition() {
        let mut h = Harness::new(LoadOptions::default());
        let seen: Rc<RefCell<Vec<(bool, Option<String>)>>> = Rc::default();
        {
            let seen = Rc::clone(&seen);
            h.controller
                .subscribe(move |state| seen.borrow_mut().push((state.loading, state.data.clone())));
        }
        let task = h.controller.load(1);
        h.spawn(task);
        h.reply(1, Ok("page-1".into()));

        assert_eq!(
            *seen.borrow(),
            vec![(true, None), (false, Some("page-1".to_string()))]
        );
    }

    #[test]
    fn test_token_check() {
        let token = CancellationToken::detached();
        assert!(token.check().is_ok());
        token.cancel();
        assert_eq!(token.check(), Err(FetchError::Cancelled));
    }
}
