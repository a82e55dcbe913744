use std::future::Future;

use serde::Serialize;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::api::{AsyncDataController, CancellationToken, FetchError, FetchState, LoadOptions};

/// State of a [`use_async_data`] consumer plus its retry trigger
#[derive(Clone, PartialEq)]
pub struct AsyncDataHandle<T> {
    pub state: FetchState<T>,
    /// Re-issues the fetch for the current params
    pub reload: Callback<()>,
}

/// Runs `fetcher` whenever `params` change and re-renders on every state
/// change. The in-flight fetch is aborted when the component unmounts.
#[hook]
pub fn use_async_data<P, T, F, Fut>(fetcher: F, params: P, options: LoadOptions) -> AsyncDataHandle<T>
where
    P: Serialize + Clone + PartialEq + 'static,
    T: Clone + 'static,
    F: Fn(P, CancellationToken) -> Fut + 'static,
    Fut: Future<Output = Result<T, FetchError>> + 'static,
{
    let state = use_state(FetchState::<T>::default);

    let controller = {
        let state = state.clone();
        use_memo((), move |_| {
            let controller = AsyncDataController::new(fetcher, options);
            controller.subscribe(move |next| state.set(next.clone()));
            controller
        })
    };

    {
        let controller = controller.clone();
        use_effect_with((params, options), move |(params, options)| {
            let options_changed = controller.options() != *options;
            controller.set_options(*options);
            let task = match controller.load(params.clone()) {
                Some(task) => Some(task),
                None if options_changed => controller.reload(),
                None => None,
            };
            if let Some(task) = task {
                spawn_local(task);
            }
            || ()
        });
    }

    {
        let controller = controller.clone();
        use_effect_with((), move |_| move || controller.unmount());
    }

    let reload = {
        let controller = controller.clone();
        Callback::from(move |_| {
            if let Some(task) = controller.reload() {
                spawn_local(task);
            }
        })
    };

    AsyncDataHandle {
        state: (*state).clone(),
        reload,
    }
}
