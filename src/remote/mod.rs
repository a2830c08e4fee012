//! Network boundary for the listings pipeline.
//!
//! The buffer only ever talks to the server through [`ListingsTransport`]:
//! one POST to a caller-supplied route carrying the paged filters, answered
//! with a [`ListResponse`]. [`HttpTransport`] is the reqwest-backed
//! implementation used in production.

pub mod http;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::error::Result;
use crate::paging::PagedFilters;
use crate::response::ListResponse;

pub use http::HttpTransport;

/// Something that can answer a paged listings request.
#[async_trait]
pub trait ListingsTransport<F, T>: Send + Sync
where
    F: Send + Sync + 'static,
    T: Send + 'static,
{
    /// POST `{ filters }` to `route` and return the decoded response.
    ///
    /// The server returns at most `filters.retrieval_amount` items starting
    /// at `filters.retrieval_offset`, in its own order.
    async fn post_listings(&self, route: &str, filters: &PagedFilters<F>)
    -> Result<ListResponse<T>>;
}
