//! Paging contract shared with the listings server.
//!
//! Every listings request carries caller-defined filter criteria plus two
//! paging fields owned by the buffer: `retrievalOffset` (index of the first
//! item to fetch) and `retrievalAmount` (maximum number of items to fetch).
//! On the wire both paging fields sit next to the criteria in one flat
//! JSON object.

use serde::{Deserialize, Serialize};

use crate::error::{ListingsError, Result};

/// Default number of listings requested per page.
pub const DEFAULT_RETRIEVAL_AMOUNT: usize = 5;

fn default_retrieval_amount() -> usize {
    DEFAULT_RETRIEVAL_AMOUNT
}

/// Filter criteria plus the paging cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedFilters<F> {
    /// Index of the first item to fetch
    #[serde(default)]
    pub retrieval_offset: usize,
    /// Maximum number of items to fetch
    #[serde(default = "default_retrieval_amount")]
    pub retrieval_amount: usize,
    /// Caller-defined filter criteria
    #[serde(flatten)]
    pub criteria: F,
}

impl<F> PagedFilters<F> {
    /// Wrap criteria with the paging cursor at the start of the list.
    pub fn new(criteria: F) -> Self {
        Self {
            retrieval_offset: 0,
            retrieval_amount: DEFAULT_RETRIEVAL_AMOUNT,
            criteria,
        }
    }

    /// Set the paging cursor.
    pub fn with_page(mut self, retrieval_offset: usize, retrieval_amount: usize) -> Self {
        self.retrieval_offset = retrieval_offset;
        self.retrieval_amount = retrieval_amount;
        self
    }

    /// Reject a zero-sized page.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval_amount == 0 {
            return Err(ListingsError::InvalidFilters(
                "retrievalAmount must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl<F: PartialEq> PagedFilters<F> {
    /// Compare filter criteria, ignoring the paging fields.
    ///
    /// This is the equality used to decide whether a filter change should
    /// trigger a refresh.
    pub fn same_criteria(&self, other: &Self) -> bool {
        self.criteria == other.criteria
    }
}

impl<F: Default> Default for PagedFilters<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}
