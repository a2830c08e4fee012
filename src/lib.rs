//! Incremental listings retrieval for the foodshare client.
//!
//! A list view asks a [`ListingsService`] for pages of listings. The service
//! draws from a prefetching [`ListingsBuffer`], which talks to the server
//! through a [`ListingsTransport`]. Scrolling near the bottom of the view
//! triggers the next page via a [`ScrollScheduler`], and the displayed list
//! lives in a [`ListController`]. Filter edits can be fed to a
//! [`DebouncedRefresher`] so that only settled changes refresh the list.

pub mod buffer;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod listing;
pub mod paging;
pub mod remote;
pub mod response;
pub mod scroll;
pub mod service;

pub use buffer::{BufferSettings, BufferSnapshot, ListingsBuffer};
pub use config::Config;
pub use controller::{ListController, ListHooks, PassThrough};
pub use debounce::DebouncedRefresher;
pub use error::{ListingsError, Result};
pub use listing::{FoodListing, FoodListingFilters, FoodListingQuery, FoodType};
pub use paging::PagedFilters;
pub use remote::{HttpTransport, ListingsTransport};
pub use response::{ListRequest, ListResponse};
pub use scroll::{ScrollMetrics, ScrollScheduler, ScrollSubscription};
pub use service::ListingsService;
