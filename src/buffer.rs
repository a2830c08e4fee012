//! Read-ahead buffer for paged listings.
//!
//! The buffer fetches more listings than a consumer asks for and keeps the
//! surplus, so the next "load more" can usually be answered without waiting
//! on the network. It tracks:
//!
//! - the buffered items, in server order
//! - `start_offset`: the server offset of the first buffered item
//! - `end_of_listings`: the server returned fewer items than requested
//! - at most one in-flight fetch, shared by every consumer waiting on it
//!
//! Fetches run as spawned tokio tasks. A consumer waiting for data awaits a
//! [`Shared`] handle to the task, so concurrent consumers never issue
//! duplicate requests. Clearing the buffer bumps a generation counter and
//! aborts the task; a response tagged with an older generation is dropped
//! on arrival.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::error::{ListingsError, Result};
use crate::paging::PagedFilters;
use crate::remote::ListingsTransport;
use crate::response::ListResponse;

/// Items kept prefetched beyond what consumers have taken.
pub const DEFAULT_BUFFER_CAPACITY: usize = 5;

/// Tunables for a [`ListingsBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSettings {
    /// Number of items the buffer tries to keep on hand
    pub capacity: usize,
    /// Abandon a fetch that takes longer than this
    pub fetch_timeout: Option<Duration>,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUFFER_CAPACITY,
            fetch_timeout: None,
        }
    }
}

/// Point-in-time view of the buffer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub buffered: usize,
    pub start_offset: usize,
    pub end_of_listings: bool,
    pub fetch_in_flight: bool,
}

/// Number of items a fetch delivered, or the error every waiter shares.
type FetchOutcome = std::result::Result<usize, Arc<ListingsError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct InFlight {
    fetch: SharedFetch,
    abort: AbortHandle,
}

struct BufferState<T> {
    items: VecDeque<T>,
    start_offset: usize,
    end_of_listings: bool,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl<T> BufferState<T> {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            start_offset: 0,
            end_of_listings: false,
            generation: 0,
            in_flight: None,
        }
    }

    fn take_front(&mut self, amount: usize) -> Vec<T> {
        let taken = amount.min(self.items.len());
        self.start_offset += taken;
        self.items.drain(..taken).collect()
    }
}

struct BufferShared<F, T>
where
    F: Send + Sync + 'static,
    T: Send + 'static,
{
    transport: Arc<dyn ListingsTransport<F, T>>,
    settings: BufferSettings,
    state: Mutex<BufferState<T>>,
}

/// Client-side read-ahead cache of listings for one list view.
pub struct ListingsBuffer<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    shared: Arc<BufferShared<F, T>>,
}

impl<F, T> ListingsBuffer<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new(transport: Arc<dyn ListingsTransport<F, T>>, settings: BufferSettings) -> Self {
        Self {
            shared: Arc::new(BufferShared {
                transport,
                settings,
                state: Mutex::new(BufferState::new()),
            }),
        }
    }

    pub fn settings(&self) -> BufferSettings {
        self.shared.settings
    }

    /// Take up to `retrieval_amount` listings from the front of the buffer.
    ///
    /// When enough items are buffered (or `return_available_immediately` is
    /// set and anything is buffered) the call returns without touching the
    /// network and kicks off a background refill if the buffer dropped below
    /// capacity. Otherwise it waits on a fetch sized to cover the request
    /// plus a full buffer, joining one already in flight if there is one.
    ///
    /// Returns an empty list once the server has run out of listings, or if
    /// the buffer was cleared while this call was waiting.
    pub async fn get_listings(
        &self,
        retrieval_amount: usize,
        route: &str,
        filters: &PagedFilters<F>,
        return_available_immediately: bool,
    ) -> Result<Vec<T>> {
        if retrieval_amount == 0 {
            return Err(ListingsError::InvalidFilters(
                "retrievalAmount must be greater than 0".to_string(),
            ));
        }

        let generation = self.shared.state.lock().generation;

        loop {
            let fetch = {
                let mut state = self.shared.state.lock();
                if state.generation != generation {
                    tracing::debug!(route, "buffer cleared while waiting, returning no listings");
                    return Ok(Vec::new());
                }

                let available = state.items.len();
                if available >= retrieval_amount
                    || (available > 0 && (return_available_immediately || state.end_of_listings))
                {
                    let taken = state.take_front(retrieval_amount);
                    BufferShared::refill_if_needed(&self.shared, &mut state, route, filters);
                    return Ok(taken);
                }

                if state.end_of_listings {
                    return Ok(Vec::new());
                }

                if state.in_flight.is_none() {
                    let size = retrieval_amount + self.shared.settings.capacity - available;
                    BufferShared::start_fetch(&self.shared, &mut state, size, route, filters);
                }
                match state.in_flight.as_ref() {
                    Some(in_flight) => in_flight.fetch.clone(),
                    None => {
                        return Err(ListingsError::TaskFailed(
                            "listings fetch was not started".to_string(),
                        ));
                    }
                }
            };

            fetch.await.map_err(ListingsError::Fetch)?;
        }
    }

    /// Drop every buffered item and reset paging to the start.
    ///
    /// An in-flight fetch is aborted; if its response still arrives it is
    /// discarded rather than applied to the cleared buffer.
    pub fn clear(&self) {
        let in_flight = {
            let mut state = self.shared.state.lock();
            state.items.clear();
            state.start_offset = 0;
            state.end_of_listings = false;
            state.generation += 1;
            state.in_flight.take()
        };

        if let Some(in_flight) = in_flight {
            tracing::debug!("aborting in-flight listings fetch");
            in_flight.abort.abort();
        }
    }

    /// True once the server returned fewer items than requested.
    pub fn is_end_of_listings(&self) -> bool {
        self.shared.state.lock().end_of_listings
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        let state = self.shared.state.lock();
        BufferSnapshot {
            buffered: state.items.len(),
            start_offset: state.start_offset,
            end_of_listings: state.end_of_listings,
            fetch_in_flight: state.in_flight.is_some(),
        }
    }
}

impl<F, T> Drop for ListingsBuffer<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<F, T> BufferShared<F, T>
where
    F: Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    fn refill_if_needed(
        shared: &Arc<Self>,
        state: &mut BufferState<T>,
        route: &str,
        filters: &PagedFilters<F>,
    ) {
        let capacity = shared.settings.capacity;
        if state.items.len() < capacity && !state.end_of_listings && state.in_flight.is_none() {
            let size = capacity - state.items.len();
            Self::start_fetch(shared, state, size, route, filters);
        }
    }

    /// Spawn a fetch for `size` items following the last buffered one and
    /// record it as the in-flight fetch.
    ///
    /// Must be called with the state lock held and no fetch in flight.
    fn start_fetch(
        shared: &Arc<Self>,
        state: &mut BufferState<T>,
        size: usize,
        route: &str,
        filters: &PagedFilters<F>,
    ) {
        let offset = state.start_offset + state.items.len();
        let request = filters.clone().with_page(offset, size);
        let generation = state.generation;

        tracing::debug!(route, offset, amount = size, "fetching listings");

        let handle = tokio::spawn(Self::run_fetch(
            Arc::clone(shared),
            generation,
            route.to_string(),
            request,
        ));
        let abort = handle.abort_handle();

        let fetch = async move {
            match handle.await {
                Ok(outcome) => outcome,
                // Aborted by clear(); waiters notice the generation change.
                Err(e) if e.is_cancelled() => Ok(0),
                Err(e) => Err(Arc::new(ListingsError::TaskFailed(e.to_string()))),
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(InFlight { fetch, abort });
    }

    fn run_fetch(
        shared: Arc<Self>,
        generation: u64,
        route: String,
        request: PagedFilters<F>,
    ) -> BoxFuture<'static, FetchOutcome> {
        async move {
            let mut guard = InFlightGuard {
                shared: Arc::clone(&shared),
                generation,
                armed: true,
            };
            let requested = request.retrieval_amount;

            let call = shared.transport.post_listings(&route, &request);
            let response = match shared.settings.fetch_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(response) => response,
                    Err(_) => Err(ListingsError::Timeout(limit)),
                },
                None => call.await,
            };
            let result = response.and_then(ListResponse::into_payload);

            let mut state = shared.state.lock();
            guard.armed = false;

            if state.generation != generation {
                tracing::debug!(route = route.as_str(), "discarding listings response for a cleared buffer");
                return Ok(0);
            }
            state.in_flight = None;

            match result {
                Ok(items) => {
                    let received = items.len();
                    state.end_of_listings = received < requested;
                    state.items.extend(items);

                    tracing::debug!(
                        route = route.as_str(),
                        received,
                        requested,
                        buffered = state.items.len(),
                        end_of_listings = state.end_of_listings,
                        "listings fetch complete"
                    );

                    Self::refill_if_needed(&shared, &mut state, &route, &request);
                    Ok(received)
                }
                Err(e) => {
                    tracing::warn!(route = route.as_str(), "listings fetch failed: {e}");
                    Err(Arc::new(e))
                }
            }
        }
        .boxed()
    }
}

/// Clears the in-flight marker if a fetch task unwinds before it finishes.
struct InFlightGuard<F, T>
where
    F: Send + Sync + 'static,
    T: Send + 'static,
{
    shared: Arc<BufferShared<F, T>>,
    generation: u64,
    armed: bool,
}

impl<F, T> Drop for InFlightGuard<F, T>
where
    F: Send + Sync + 'static,
    T: Send + 'static,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.shared.state.lock();
        if state.generation == self.generation {
            state.in_flight = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{MockServer, RecordedRequest};

    const ROUTE: &str = "/foodListings/getFoodListings";

    fn filters() -> PagedFilters<()> {
        PagedFilters::new(())
    }

    fn buffer(server: &Arc<MockServer<u32>>, settings: BufferSettings) -> ListingsBuffer<(), u32> {
        ListingsBuffer::new(server.clone(), settings)
    }

    async fn settle(buffer: &ListingsBuffer<(), u32>) {
        for _ in 0..100 {
            if !buffer.snapshot().fetch_in_flight {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("buffer never settled: {:?}", buffer.snapshot());
    }

    fn request(offset: usize, amount: usize) -> RecordedRequest {
        RecordedRequest {
            route: ROUTE.to_string(),
            offset,
            amount,
        }
    }

    #[tokio::test]
    async fn test_prefetch_walkthrough() {
        let server = MockServer::new((0..13).collect());
        let buffer = buffer(&server, BufferSettings::default());

        let first = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert_eq!(first, vec![0, 1, 2, 3, 4]);
        assert_eq!(server.requests(), vec![request(0, 10)]);
        assert_eq!(
            buffer.snapshot(),
            BufferSnapshot {
                buffered: 5,
                start_offset: 5,
                end_of_listings: false,
                fetch_in_flight: false,
            }
        );

        let second = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert_eq!(second, vec![5, 6, 7, 8, 9]);
        settle(&buffer).await;
        assert_eq!(server.requests(), vec![request(0, 10), request(10, 5)]);
        assert_eq!(
            buffer.snapshot(),
            BufferSnapshot {
                buffered: 3,
                start_offset: 10,
                end_of_listings: true,
                fetch_in_flight: false,
            }
        );

        let third = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert_eq!(third, vec![10, 11, 12]);
        assert_eq!(buffer.snapshot().start_offset, 13);

        let fourth = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert!(fourth.is_empty());
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn test_end_of_data_stops_fetching() {
        let server = MockServer::new((0..2).collect());
        let buffer = buffer(&server, BufferSettings::default());

        let items = buffer.get_listings(5, ROUTE, &filters(), false).await.unwrap();
        assert_eq!(items, vec![0, 1]);
        assert!(buffer.is_end_of_listings());

        for _ in 0..3 {
            assert!(
                buffer
                    .get_listings(5, ROUTE, &filters(), false)
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_server_resolves_empty() {
        let server = MockServer::new(Vec::new());
        let buffer = buffer(&server, BufferSettings::default());

        let items = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert!(items.is_empty());
        assert!(buffer.is_end_of_listings());
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn test_start_offset_tracks_consumed_items() {
        let server = MockServer::new((0..20).collect());
        let buffer = buffer(&server, BufferSettings::default());

        let mut consumed = 0;
        let mut last_offset = 0;
        loop {
            let items = buffer.get_listings(3, ROUTE, &filters(), false).await.unwrap();
            if items.is_empty() {
                break;
            }
            assert_eq!(items[0] as usize, consumed, "items arrive in server order");
            consumed += items.len();

            let offset = buffer.snapshot().start_offset;
            assert!(offset >= last_offset);
            assert_eq!(offset, consumed);
            last_offset = offset;
        }
        assert_eq!(consumed, 20);
    }

    #[tokio::test]
    async fn test_concurrent_consumers_share_one_fetch() {
        let server = MockServer::gated((0..30).collect());
        let buffer = Arc::new(buffer(&server, BufferSettings::default()));

        let a = tokio::spawn({
            let buffer = Arc::clone(&buffer);
            async move { buffer.get_listings(5, ROUTE, &filters(), false).await }
        });
        let b = tokio::spawn({
            let buffer = Arc::clone(&buffer);
            async move { buffer.get_listings(5, ROUTE, &filters(), false).await }
        });

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(server.requests(), vec![request(0, 10)]);

        server.release(1);
        let mut all = a.await.unwrap().unwrap();
        all.extend(b.await.unwrap().unwrap());
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_background_refill_is_joined_by_next_consumer() {
        let server = MockServer::gated((0..30).collect());
        let buffer = Arc::new(buffer(&server, BufferSettings::default()));

        server.release(1);
        let first = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert_eq!(first, vec![0, 1, 2, 3, 4]);

        // served from the buffer; leaves a refill running in the background
        let second = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert_eq!(second, vec![5, 6, 7, 8, 9]);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(buffer.snapshot().fetch_in_flight);
        assert_eq!(server.requests(), vec![request(0, 10), request(10, 5)]);

        let third = tokio::spawn({
            let buffer = Arc::clone(&buffer);
            async move { buffer.get_listings(5, ROUTE, &filters(), true).await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(server.request_count(), 2);

        server.release(1);
        assert_eq!(third.await.unwrap().unwrap(), vec![10, 11, 12, 13, 14]);
    }

    #[tokio::test]
    async fn test_clear_discards_stale_response() {
        let server = MockServer::gated((0..30).collect());
        let buffer = Arc::new(buffer(&server, BufferSettings::default()));

        let waiter = tokio::spawn({
            let buffer = Arc::clone(&buffer);
            async move { buffer.get_listings(5, ROUTE, &filters(), true).await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(buffer.snapshot().fetch_in_flight);

        buffer.clear();
        server.release(1);

        assert!(waiter.await.unwrap().unwrap().is_empty());
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            buffer.snapshot(),
            BufferSnapshot {
                buffered: 0,
                start_offset: 0,
                end_of_listings: false,
                fetch_in_flight: false,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_clears_in_flight_marker() {
        let server = MockServer::new((0..10).collect());
        let buffer = buffer(&server, BufferSettings::default());

        server.fail_next("database unavailable");
        let err = buffer
            .get_listings(5, ROUTE, &filters(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ListingsError::Fetch(_)));
        assert!(err.to_string().contains("database unavailable"));
        assert!(!buffer.snapshot().fetch_in_flight);

        let items = buffer.get_listings(5, ROUTE, &filters(), true).await.unwrap();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_rejected_response_surfaces_auth_flags() {
        let server = MockServer::new((0..10).collect());
        let buffer = buffer(&server, BufferSettings::default());

        server.script(Ok(ListResponse::failed("Please confirm signup").with_signup_confirm_required()));
        let err = buffer
            .get_listings(5, ROUTE, &filters(), true)
            .await
            .unwrap_err();
        assert!(err.requires_auth());
        assert_eq!(buffer.snapshot().buffered, 0);
        assert!(!buffer.is_end_of_listings());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let server = MockServer::gated((0..10).collect());
        let buffer = buffer(
            &server,
            BufferSettings {
                capacity: 5,
                fetch_timeout: Some(Duration::from_millis(50)),
            },
        );

        let err = buffer
            .get_listings(5, ROUTE, &filters(), true)
            .await
            .unwrap_err();
        match err {
            ListingsError::Fetch(inner) => {
                assert!(matches!(*inner, ListingsError::Timeout(_)));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(!buffer.snapshot().fetch_in_flight);
    }

    #[tokio::test]
    async fn test_rejects_zero_amount() {
        let server = MockServer::new((0..10).collect());
        let buffer = buffer(&server, BufferSettings::default());
        assert!(buffer.get_listings(0, ROUTE, &filters(), true).await.is_err());
        assert_eq!(server.request_count(), 0);
    }
}
