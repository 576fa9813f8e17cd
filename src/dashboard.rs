//! Owner dashboard: owned items with their active rental requests.
//!
//! DESIGN
//! ======
//! `group_active_requests` is the whole join. It is pure so the projection
//! can be tested without a transport. `load_rental_dashboard` only sequences
//! the two fetches around it: items first, bookings only when there is at
//! least one item to attach them to.

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::api::types::{Booking, BookingStatus, Item, ItemId};
use crate::api::{bookings, items};
use crate::error::ApiError;
use crate::session::SessionManager;

pub const BOOKINGS_UNAVAILABLE: &str = "Rental requests could not be loaded.";

/// Map every owned item to its active bookings, in input order.
///
/// The result has exactly one key per distinct item id. Bookings for items
/// not in `items` are ignored.
#[must_use]
pub fn group_active_requests(items: &[Item], bookings: &[Booking]) -> BTreeMap<ItemId, Vec<Booking>> {
    let mut grouped: BTreeMap<ItemId, Vec<Booking>> = items.iter().map(|item| (item.id, Vec::new())).collect();
    for booking in bookings.iter().filter(|b| b.status.is_active()) {
        if let Some(requests) = grouped.get_mut(&booking.item.id()) {
            requests.push(booking.clone());
        }
    }
    grouped
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RentalDashboard {
    pub items: Vec<Item>,
    pub requests: BTreeMap<ItemId, Vec<Booking>>,
    /// Set when bookings failed to load; every item then shows no requests.
    pub warning: Option<String>,
}

impl RentalDashboard {
    #[must_use]
    pub fn requests_for(&self, item_id: ItemId) -> &[Booking] {
        self.requests.get(&item_id).map_or(&[], Vec::as_slice)
    }

    /// Drop an item locally, e.g. after the server confirmed its deletion.
    pub fn remove_item(&mut self, item_id: ItemId) {
        self.items.retain(|item| item.id != item_id);
        self.requests.remove(&item_id);
    }

    /// Delete the item on the server, then drop it from the view.
    ///
    /// # Errors
    ///
    /// Propagates the delete failure; the dashboard is left unchanged.
    pub async fn delete_item(&mut self, session: &SessionManager, item_id: ItemId) -> Result<(), ApiError> {
        items::delete_item(session, item_id).await?;
        self.remove_item(item_id);
        Ok(())
    }
}

/// Fetch owned items, then bookings, and group them.
///
/// # Errors
///
/// Returns the item-fetch error. A bookings failure is not an error: the
/// result carries empty request lists and a `warning`.
pub async fn load_rental_dashboard(session: &SessionManager) -> Result<RentalDashboard, ApiError> {
    let items = items::my_items(session).await?;
    if items.is_empty() {
        debug!("no owned items; skipping bookings fetch");
        return Ok(RentalDashboard::default());
    }

    match bookings::list_bookings(session).await {
        Ok(all) => {
            let requests = group_active_requests(&items, &all);
            Ok(RentalDashboard { items, requests, warning: None })
        }
        Err(e) => {
            warn!(error = %e, "bookings fetch failed; showing items without requests");
            let requests = group_active_requests(&items, &[]);
            Ok(RentalDashboard { items, requests, warning: Some(BOOKINGS_UNAVAILABLE.to_owned()) })
        }
    }
}

/// Per-status tallies for the order-management tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub accepted: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[must_use]
pub fn status_counts(bookings: &[Booking]) -> StatusCounts {
    let mut counts = StatusCounts { all: bookings.len(), ..StatusCounts::default() };
    for booking in bookings {
        match booking.status {
            BookingStatus::Pending => counts.pending += 1,
            BookingStatus::AcceptedByOwner => counts.accepted += 1,
            BookingStatus::Confirmed => counts.confirmed += 1,
            BookingStatus::Completed => counts.completed += 1,
            BookingStatus::Cancelled => counts.cancelled += 1,
            BookingStatus::Other => {}
        }
    }
    counts
}
