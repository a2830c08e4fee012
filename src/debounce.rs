//! Debounced refresh on filter changes.
//!
//! Filter edits arrive as a stream of [`PagedFilters`] values. The first
//! value refreshes the list straight away; after that, a value only takes
//! effect once the stream has been quiet for the debounce interval, and
//! only the last value of a burst is applied. A value whose criteria match
//! the last applied filters is dropped. The loading indicator goes up as
//! soon as any value arrives and comes down again if that value is dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::ListController;
use crate::paging::PagedFilters;

/// Quiet period before a filter change refreshes the list.
pub const DEFAULT_REFRESH_DEBOUNCE_MS: u64 = 1500;

/// Background task turning filter changes into list refreshes.
///
/// Dropping the handle stops the task.
pub struct DebouncedRefresher {
    task: JoinHandle<()>,
}

impl DebouncedRefresher {
    /// Spawn a task refreshing `controller` from the filter values on `filters`.
    ///
    /// The task ends when every sender has been dropped.
    pub fn spawn<F, T>(
        controller: ListController<F, T>,
        filters: mpsc::UnboundedReceiver<PagedFilters<F>>,
        debounce: Duration,
    ) -> Self
    where
        F: Clone + PartialEq + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        let task = tokio::spawn(run_refresh_loop(controller, filters, debounce));
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task. A refresh already issued still completes.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for DebouncedRefresher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_refresh_loop<F, T>(
    controller: ListController<F, T>,
    mut filters: mpsc::UnboundedReceiver<PagedFilters<F>>,
    debounce: Duration,
) where
    F: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    let mut applied: Option<PagedFilters<F>> = None;
    let mut first = true;

    while let Some(mut latest) = filters.recv().await {
        controller.set_refreshing(true);

        if !first {
            // Keep the last value of the burst
            loop {
                match tokio::time::timeout(debounce, filters.recv()).await {
                    Ok(Some(next)) => latest = next,
                    Ok(None) | Err(_) => break,
                }
            }
        }
        first = false;

        if applied
            .as_ref()
            .is_some_and(|previous| previous.same_criteria(&latest))
        {
            tracing::debug!("filters unchanged, skipping refresh");
            controller.set_refreshing(false);
            continue;
        }

        tracing::debug!(route = controller.route(), "refreshing listings for new filters");
        let refresh = controller.refresh_list(latest.clone());
        applied = Some(latest);

        tokio::spawn(async move {
            if let Err(e) = refresh.await {
                tracing::warn!("listings refresh failed: {e}");
            }
        });
    }
}
