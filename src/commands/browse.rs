use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::print_json;
use crate::cli::OutputOptions;
use crate::config::Config;
use crate::controller::ListController;
use crate::error::{ListingsError, Result};
use crate::listing::{FoodListing, FoodListingFilters};
use crate::paging::PagedFilters;
use crate::remote::HttpTransport;
use crate::service::ListingsService;

/// A row in the listings table
#[derive(Tabled)]
struct ListingRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Type")]
    food_type: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Donor")]
    donor: String,
    #[tabled(rename = "Distance")]
    distance: String,
}

impl From<&FoodListing> for ListingRow {
    fn from(listing: &FoodListing) -> Self {
        let food_type = if listing.perishable {
            format!("{} (perishable)", listing.food_type)
        } else {
            listing.food_type.to_string()
        };

        ListingRow {
            id: listing.id,
            title: listing.food_title.clone(),
            food_type,
            quantity: format!("{} {}", listing.quantity, listing.unit_label)
                .trim()
                .to_string(),
            expires: listing.expire_date.clone(),
            donor: listing.donor_name.clone(),
            distance: listing
                .distance
                .map(|d| format!("{d:.1} mi"))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn parse_filters(raw: Option<&str>) -> Result<FoodListingFilters> {
    match raw {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| ListingsError::InvalidFilters(format!("could not parse '{raw}': {e}"))),
        None => Ok(FoodListingFilters::default()),
    }
}

fn print_page(number: usize, listings: &[FoodListing]) {
    println!("{}", format!("Page {number}").cyan().bold());
    if listings.is_empty() {
        println!("{}", "No listings.".dimmed());
        return;
    }

    let rows: Vec<ListingRow> = listings.iter().map(ListingRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}\n");
}

/// Load the first page of listings, then up to `pages` more
pub async fn cmd_browse(
    route: &str,
    filters: Option<&str>,
    pages: usize,
    output: OutputOptions,
) -> Result<()> {
    let config = Config::load()?;
    let criteria = parse_filters(filters)?;
    let query = PagedFilters::new(criteria).with_page(0, config.listings.retrieval_amount);
    query.validate()?;

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let service: ListingsService<FoodListingFilters, FoodListing> =
        ListingsService::from_config(transport, &config);
    let controller = ListController::new(service.clone(), route);

    let mut page_sizes = Vec::new();
    let first = match controller.refresh_list(query.clone()).await {
        Ok(count) => count,
        Err(e) => {
            if e.requires_auth() {
                eprintln!("{}", "The server requires you to log in first.".yellow());
            }
            return Err(e);
        }
    };
    page_sizes.push(first);
    if !output.json {
        print_page(1, &controller.get_list_data());
    }

    for number in 2..=pages + 1 {
        let items = service.get_listings(query.clone(), route, true).await?;
        if items.is_empty() {
            break;
        }

        let before = controller.len();
        let kept = controller.update_list_data(items, false);
        page_sizes.push(kept);
        if !output.json {
            print_page(number, &controller.get_list_data()[before..]);
        }
    }

    let listings = controller.get_list_data();
    let end_of_listings = !service.can_get_more() && service.buffer_snapshot().end_of_listings;

    if output.json {
        print_json(&json!({
            "route": route,
            "pages": page_sizes,
            "end_of_listings": end_of_listings,
            "listings": listings,
        }))?;
    } else {
        let mut summary = format!("{} listing(s) in {} page(s)", listings.len(), page_sizes.len());
        if end_of_listings {
            summary.push_str(", no more listings on the server");
        }
        println!("{}", summary.dimmed());
    }

    Ok(())
}
