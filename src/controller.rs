//! List presentation state: the items on screen and the current selection.
//!
//! The controller owns the displayed list for one view. A refresh replaces
//! the list wholesale and drops the selection; a scroll-triggered page is
//! appended through the service's after hook. Every batch of incoming items
//! goes through [`ListHooks::filter_incoming`] first, which views can use
//! to drop or rewrite listings before they are shown.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::error::Result;
use crate::paging::PagedFilters;
use crate::service::ListingsService;

/// Extension points for a list view.
pub trait ListHooks<T>: Send + Sync {
    /// Inspect items arriving from the server before they join the list.
    fn filter_incoming(&self, items: Vec<T>) -> Vec<T> {
        items
    }
}

/// Hooks that accept every incoming item unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl<T> ListHooks<T> for PassThrough {}

struct ListState<T> {
    list_data: Vec<T>,
    selected_index: Option<usize>,
    refreshing: bool,
    appending: bool,
    /// Identifies the newest refresh; older refresh results are dropped
    refresh_seq: u64,
    last_error: Option<String>,
}

impl<T> ListState<T> {
    fn merge(&mut self, items: Vec<T>, is_refresh: bool) {
        if is_refresh {
            self.list_data = items;
            self.selected_index = None;
        } else {
            self.list_data.extend(items);
        }
    }
}

/// Displayed listings for one view.
///
/// Cloning yields another handle to the same list.
pub struct ListController<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    service: ListingsService<F, T>,
    route: String,
    state: Arc<Mutex<ListState<T>>>,
    hooks: Arc<dyn ListHooks<T>>,
}

impl<F, T> Clone for ListController<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            route: self.route.clone(),
            state: Arc::clone(&self.state),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<F, T> ListController<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(service: ListingsService<F, T>, route: impl Into<String>) -> Self {
        Self::with_hooks(service, route, Arc::new(PassThrough))
    }

    /// Create a controller and attach it to the service's get-more hooks.
    pub fn with_hooks(
        service: ListingsService<F, T>,
        route: impl Into<String>,
        hooks: Arc<dyn ListHooks<T>>,
    ) -> Self {
        let state = Arc::new(Mutex::new(ListState {
            list_data: Vec::new(),
            selected_index: None,
            refreshing: false,
            appending: false,
            refresh_seq: 0,
            last_error: None,
        }));

        service.on_before_get_more({
            let state = Arc::clone(&state);
            move || state.lock().appending = true
        });
        service.on_after_get_more({
            let state = Arc::clone(&state);
            let hooks = Arc::clone(&hooks);
            move |items: &[T]| {
                let incoming = hooks.filter_incoming(items.to_vec());
                let mut state = state.lock();
                state.merge(incoming, false);
                state.appending = false;
            }
        });
        service.on_get_more_failed({
            let state = Arc::clone(&state);
            move |e| {
                let mut state = state.lock();
                state.appending = false;
                state.last_error = Some(e.to_string());
            }
        });

        Self {
            service,
            route: route.into(),
            state,
            hooks,
        }
    }

    /// Replace the list with the first page for `filters`.
    ///
    /// The request is issued before this returns. If another refresh starts
    /// before this one completes, this one's results are discarded.
    pub fn refresh_list(&self, filters: PagedFilters<F>) -> BoxFuture<'static, Result<usize>> {
        let seq = {
            let mut state = self.state.lock();
            state.refresh_seq += 1;
            state.refreshing = true;
            state.refresh_seq
        };

        let fetch = self.service.get_listings(filters, &self.route, false);
        let controller = self.clone();
        async move {
            let result = fetch.await;

            if controller.state.lock().refresh_seq != seq {
                tracing::debug!("dropping results of a superseded refresh");
                return result.map(|_| 0);
            }

            match result {
                Ok(items) => {
                    let count = controller.update_list_data(items, true);
                    let mut state = controller.state.lock();
                    state.refreshing = false;
                    state.last_error = None;
                    Ok(count)
                }
                Err(e) => {
                    let mut state = controller.state.lock();
                    state.refreshing = false;
                    state.last_error = Some(e.to_string());
                    Err(e)
                }
            }
        }
        .boxed()
    }

    /// Merge a batch of items into the list.
    ///
    /// A refresh replaces the list and clears the selection; otherwise the
    /// items are appended in order. Returns how many items were kept by
    /// [`ListHooks::filter_incoming`].
    pub fn update_list_data(&self, items: Vec<T>, is_refresh: bool) -> usize {
        let incoming = self.hooks.filter_incoming(items);
        let count = incoming.len();
        self.state.lock().merge(incoming, is_refresh);
        count
    }

    /// Copy of the displayed items.
    pub fn get_list_data(&self) -> Vec<T> {
        self.state.lock().list_data.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().list_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select the item at `index`, returning it if the index is in range.
    pub fn select_listing(&self, index: usize) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.list_data.get(index).cloned()?;
        state.selected_index = Some(index);
        Some(item)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.state.lock().selected_index
    }

    pub fn get_selected_listing(&self) -> Option<T> {
        let state = self.state.lock();
        state
            .selected_index
            .and_then(|index| state.list_data.get(index).cloned())
    }

    /// Remove the selected item from the list and clear the selection.
    pub fn remove_selected_listing(&self) -> Option<T> {
        let mut state = self.state.lock();
        let index = state.selected_index.take()?;
        if index < state.list_data.len() {
            Some(state.list_data.remove(index))
        } else {
            None
        }
    }

    pub fn clear_selection(&self) {
        self.state.lock().selected_index = None;
    }

    /// Show or hide the refresh indicator.
    pub fn set_refreshing(&self, refreshing: bool) {
        self.state.lock().refreshing = refreshing;
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// True while a scroll-triggered page is loading.
    pub fn is_appending(&self) -> bool {
        self.state.lock().appending
    }

    /// Message of the most recent failed refresh or append.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Filters of the most recent request, for views opened from this list.
    pub fn previous_filters(&self) -> Option<PagedFilters<F>> {
        self.service.get_previous_filters()
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn service(&self) -> &ListingsService<F, T> {
        &self.service
    }
}
