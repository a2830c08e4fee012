//! Listings retrieval service.
//!
//! Sits between a list view and its [`ListingsBuffer`]. A refresh clears the
//! buffer and starts paging from zero; a "get more" replays the filters and
//! route of the most recent request to pull the next page. The service keeps
//! a latch that is set the moment a request is accepted and cleared only
//! when results arrive, so scroll events cannot stack up duplicate fetches.
//! A request that returns nothing leaves the latch set, which is how the
//! service remembers that the server is out of listings.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};

use crate::buffer::{BufferSettings, BufferSnapshot, ListingsBuffer};
use crate::config::Config;
use crate::error::{ListingsError, Result};
use crate::paging::{DEFAULT_RETRIEVAL_AMOUNT, PagedFilters};
use crate::remote::ListingsTransport;

type BeforeHook = Box<dyn Fn() + Send + Sync>;
type AfterHook<T> = Box<dyn Fn(&[T]) + Send + Sync>;
type FailedHook = Box<dyn Fn(&ListingsError) + Send + Sync>;

struct Hooks<T> {
    before: Vec<BeforeHook>,
    after: Vec<AfterHook<T>>,
    failed: Vec<FailedHook>,
}

struct ServiceState<F> {
    /// Set while a request is outstanding or once the server is exhausted
    no_more_listings: bool,
    /// Route and filters of the most recent accepted request
    previous: Option<(String, PagedFilters<F>)>,
    /// Bumped on every refresh so late "get more" results can be ignored
    epoch: u64,
}

struct ServiceInner<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    buffer: ListingsBuffer<F, T>,
    retrieval_amount: usize,
    state: Mutex<ServiceState<F>>,
    hooks: RwLock<Hooks<T>>,
}

/// Paged listings retrieval for one list view.
///
/// Cloning yields another handle to the same service.
pub struct ListingsService<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    inner: Arc<ServiceInner<F, T>>,
}

impl<F, T> Clone for ListingsService<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F, T> ListingsService<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(
        transport: Arc<dyn ListingsTransport<F, T>>,
        settings: BufferSettings,
        retrieval_amount: usize,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                buffer: ListingsBuffer::new(transport, settings),
                retrieval_amount,
                state: Mutex::new(ServiceState {
                    no_more_listings: false,
                    previous: None,
                    epoch: 0,
                }),
                hooks: RwLock::new(Hooks {
                    before: Vec::new(),
                    after: Vec::new(),
                    failed: Vec::new(),
                }),
            }),
        }
    }

    /// Create a service with the buffer and page size from configuration.
    pub fn from_config(transport: Arc<dyn ListingsTransport<F, T>>, config: &Config) -> Self {
        Self::new(
            transport,
            config.buffer_settings(),
            config.listings.retrieval_amount,
        )
    }

    /// Create a service with default buffer settings.
    pub fn with_defaults(transport: Arc<dyn ListingsTransport<F, T>>) -> Self {
        Self::new(
            transport,
            BufferSettings::default(),
            DEFAULT_RETRIEVAL_AMOUNT,
        )
    }

    /// Fetch a page of listings.
    ///
    /// With `get_more == false` this is a refresh: the buffer is cleared and
    /// paging restarts at offset zero. With `get_more == true` the next page
    /// for the current filters is returned; when nothing more can be
    /// retrieved (a request is outstanding, the server is exhausted, or there
    /// has been no request yet) the returned future resolves to an empty list
    /// without touching the network.
    ///
    /// The latch and the recorded filters are updated before this returns,
    /// not when the future is first polled.
    pub fn get_listings(
        &self,
        filters: PagedFilters<F>,
        route: &str,
        get_more: bool,
    ) -> BoxFuture<'static, Result<Vec<T>>> {
        let epoch = {
            let mut state = self.inner.state.lock();
            if get_more && (state.no_more_listings || state.previous.is_none()) {
                tracing::debug!(route, "no more listings to retrieve");
                return futures::future::ready(Ok(Vec::new())).boxed();
            }

            state.no_more_listings = true;
            state.previous = Some((route.to_string(), filters.clone()));
            if !get_more {
                state.epoch += 1;
            }
            state.epoch
        };

        if !get_more {
            self.inner.buffer.clear();
        }

        self.dispatch(epoch, route.to_string(), filters)
    }

    /// Start a scroll-triggered "get more" for the previous filters.
    ///
    /// Runs the before hooks synchronously, then returns a future that
    /// fetches the next page and hands the result to the after hooks (or the
    /// failed hooks). Returns `None` when no more listings can be retrieved.
    pub fn begin_get_more(&self) -> Option<BoxFuture<'static, ()>> {
        let (epoch, route, filters) = {
            let mut state = self.inner.state.lock();
            if state.no_more_listings {
                return None;
            }
            let (route, filters) = state.previous.clone()?;
            state.no_more_listings = true;
            (state.epoch, route, filters)
        };

        for hook in &self.inner.hooks.read().before {
            hook();
        }

        let fetch = self.dispatch(epoch, route, filters);
        let inner = Arc::clone(&self.inner);
        Some(
            async move {
                match fetch.await {
                    Ok(items) => {
                        for hook in &inner.hooks.read().after {
                            hook(&items);
                        }
                    }
                    Err(e) => {
                        for hook in &inner.hooks.read().failed {
                            hook(&e);
                        }
                    }
                }
            }
            .boxed(),
        )
    }

    fn dispatch(
        &self,
        epoch: u64,
        route: String,
        filters: PagedFilters<F>,
    ) -> BoxFuture<'static, Result<Vec<T>>> {
        let inner = Arc::clone(&self.inner);
        async move {
            if inner.state.lock().epoch != epoch {
                tracing::debug!(route = route.as_str(), "request superseded by a refresh");
                return Ok(Vec::new());
            }

            let result = inner
                .buffer
                .get_listings(inner.retrieval_amount, &route, &filters, true)
                .await;

            if let Ok(items) = &result {
                let mut state = inner.state.lock();
                if state.epoch == epoch {
                    state.no_more_listings = items.is_empty();
                } else {
                    tracing::debug!(route = route.as_str(), "ignoring listings from before the last refresh");
                }
            }
            result
        }
        .boxed()
    }

    /// Register a callback run just before a scroll-triggered fetch starts.
    pub fn on_before_get_more(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.inner.hooks.write().before.push(Box::new(hook));
    }

    /// Register a callback receiving the items of a scroll-triggered fetch.
    pub fn on_after_get_more(&self, hook: impl Fn(&[T]) + Send + Sync + 'static) {
        self.inner.hooks.write().after.push(Box::new(hook));
    }

    /// Register a callback receiving the error of a failed scroll-triggered fetch.
    pub fn on_get_more_failed(&self, hook: impl Fn(&ListingsError) + Send + Sync + 'static) {
        self.inner.hooks.write().failed.push(Box::new(hook));
    }

    /// True when a "get more" would be accepted right now.
    pub fn can_get_more(&self) -> bool {
        let state = self.inner.state.lock();
        !state.no_more_listings && state.previous.is_some()
    }

    /// True once some request has been made, so "get more" has filters to replay.
    pub fn has_previous(&self) -> bool {
        self.inner.state.lock().previous.is_some()
    }

    /// Filters used by the most recent request.
    pub fn get_previous_filters(&self) -> Option<PagedFilters<F>> {
        self.inner
            .state
            .lock()
            .previous
            .as_ref()
            .map(|(_, filters)| filters.clone())
    }

    /// Route used by the most recent request.
    pub fn previous_route(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .previous
            .as_ref()
            .map(|(route, _)| route.clone())
    }

    pub fn retrieval_amount(&self) -> usize {
        self.inner.retrieval_amount
    }

    pub fn buffer_snapshot(&self) -> BufferSnapshot {
        self.inner.buffer.snapshot()
    }
}
