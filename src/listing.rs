use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ListingsError;
use crate::paging::PagedFilters;

/// Route serving donated food listings.
pub const FOOD_LISTINGS_ROUTE: &str = "/foodListings/getFoodListings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FoodType {
    Produce,
    Bakery,
    Dairy,
    Meat,
    Prepared,
    Canned,
    #[default]
    Other,
}

impl fmt::Display for FoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoodType::Produce => write!(f, "produce"),
            FoodType::Bakery => write!(f, "bakery"),
            FoodType::Dairy => write!(f, "dairy"),
            FoodType::Meat => write!(f, "meat"),
            FoodType::Prepared => write!(f, "prepared"),
            FoodType::Canned => write!(f, "canned"),
            FoodType::Other => write!(f, "other"),
        }
    }
}

impl FromStr for FoodType {
    type Err = ListingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "produce" => Ok(FoodType::Produce),
            "bakery" => Ok(FoodType::Bakery),
            "dairy" => Ok(FoodType::Dairy),
            "meat" => Ok(FoodType::Meat),
            "prepared" => Ok(FoodType::Prepared),
            "canned" => Ok(FoodType::Canned),
            "other" => Ok(FoodType::Other),
            _ => Err(ListingsError::InvalidFilters(format!(
                "invalid food type: {s}"
            ))),
        }
    }
}

pub const VALID_FOOD_TYPES: &[&str] = &[
    "produce", "bakery", "dairy", "meat", "prepared", "canned", "other",
];

/// One donated food item offered by a donor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodListing {
    pub id: u64,
    pub food_title: String,
    #[serde(default)]
    pub food_type: FoodType,
    #[serde(default)]
    pub perishable: bool,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_label: String,
    /// Expiry date as sent by the server
    #[serde(default)]
    pub expire_date: String,
    #[serde(default)]
    pub donor_name: String,
    /// Distance from the receiver in miles, when the server computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Criteria for the food listings route.
///
/// Unset fields are left off the wire so the server applies its defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodListingFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub food_types: Vec<FoodType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perishable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    /// Only listings expiring within this many days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_days_to_expire: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
}

pub type FoodListingQuery = PagedFilters<FoodListingFilters>;
