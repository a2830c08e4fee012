//! Scripted in-memory listings server for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::{ListingsError, Result};
use crate::paging::PagedFilters;
use crate::response::ListResponse;

use super::ListingsTransport;

/// One request seen by the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub route: String,
    pub offset: usize,
    pub amount: usize,
}

/// Serves slices of a fixed item list, honouring offset and amount.
///
/// When created with [`MockServer::gated`], every request parks until a
/// permit is released with [`MockServer::release`].
pub struct MockServer<T> {
    items: Mutex<Vec<T>>,
    requests: Mutex<Vec<RecordedRequest>>,
    scripted: Mutex<VecDeque<Result<ListResponse<T>>>>,
    gate: Option<Arc<Semaphore>>,
}

impl<T: Clone> MockServer<T> {
    pub fn new(items: Vec<T>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
            requests: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            gate: None,
        })
    }

    pub fn gated(items: Vec<T>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
            requests: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            gate: Some(Arc::new(Semaphore::new(0))),
        })
    }

    /// Let `n` parked requests complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Answer the next request with `reply` instead of a slice.
    pub fn script(&self, reply: Result<ListResponse<T>>) {
        self.scripted.lock().push_back(reply);
    }

    /// Answer the next request with a 500.
    pub fn fail_next(&self, message: &str) {
        self.script(Err(ListingsError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl<F, T> ListingsTransport<F, T> for MockServer<T>
where
    F: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    async fn post_listings(
        &self,
        route: &str,
        filters: &PagedFilters<F>,
    ) -> Result<ListResponse<T>> {
        self.requests.lock().push(RecordedRequest {
            route: route.to_string(),
            offset: filters.retrieval_offset,
            amount: filters.retrieval_amount,
        });

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| ListingsError::TaskFailed(e.to_string()))?;
            permit.forget();
        }

        if let Some(reply) = self.scripted.lock().pop_front() {
            return reply;
        }

        let items = self.items.lock();
        let start = filters.retrieval_offset.min(items.len());
        let end = (start + filters.retrieval_amount).min(items.len());
        Ok(ListResponse::ok(items[start..end].to_vec()))
    }
}
