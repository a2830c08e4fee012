//! Request and response bodies for the listings endpoint.

use serde::{Deserialize, Serialize};

use crate::error::{ListingsError, Result};
use crate::paging::PagedFilters;

/// POST body sent to a listings route.
#[derive(Debug, Clone, Serialize)]
pub struct ListRequest<'a, F> {
    pub filters: &'a PagedFilters<F>,
}

/// Response returned by a listings route.
///
/// An empty `list_data` means the server has nothing more for the current
/// filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub list_data: Vec<T>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub login_required: bool,
    #[serde(default)]
    pub signup_confirm_required: bool,
}

impl<T> ListResponse<T> {
    /// Build a successful response around `list_data`.
    pub fn ok(list_data: Vec<T>) -> Self {
        Self {
            list_data,
            success: true,
            message: String::new(),
            login_required: false,
            signup_confirm_required: false,
        }
    }

    /// Build a failed response carrying the server's message and auth flags.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            list_data: Vec::new(),
            success: false,
            message: message.into(),
            login_required: false,
            signup_confirm_required: false,
        }
    }

    pub fn with_login_required(mut self) -> Self {
        self.login_required = true;
        self
    }

    pub fn with_signup_confirm_required(mut self) -> Self {
        self.signup_confirm_required = true;
        self
    }

    /// Extract the payload, turning an unsuccessful response into
    /// [`ListingsError::Rejected`] with the auth flags intact.
    pub fn into_payload(self) -> Result<Vec<T>> {
        if self.success {
            return Ok(self.list_data);
        }

        Err(ListingsError::Rejected {
            message: if self.message.is_empty() {
                "no message from server".to_string()
            } else {
                self.message
            },
            login_required: self.login_required,
            signup_confirm_required: self.signup_confirm_required,
        })
    }
}
