//! Bookings: listing, creation, and the owner/renter lifecycle actions.
//!
//! LIFECYCLE
//! =========
//! ```text
//!   pending ──owner_accept──▶ accepted_by_owner ──renter_confirm──▶ confirmed
//!      │                                                              │
//!      └──cancel──▶ cancelled                    return / complete ───┴──▶ completed
//! ```
//! Transitions are enforced server-side; the client only validates inputs
//! the server would otherwise reject with a 400.

#[cfg(test)]
#[path = "bookings_test.rs"]
mod tests;

use serde_json::{Value, json};
use tracing::info;

use super::types::{Booking, BookingDraft, BookingId, ItemId};
use crate::error::ApiError;
use crate::net::ApiRequest;
use crate::session::SessionManager;

const BOOKINGS_PATH: &str = "/api/bookings/";
const RETURN_NOTE: &str = "Item returned";

fn booking_path(id: BookingId) -> String {
    format!("{BOOKINGS_PATH}{id}/")
}

/// A lifecycle action posted to `/api/bookings/{id}/{action}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingAction {
    OwnerAccept { note: String },
    RenterConfirm,
    Cancel { note: String },
    Return { note: Option<String> },
    Complete,
    Extend { days: u32 },
    AssignLogistics { provider: String, details: String },
}

impl BookingAction {
    #[must_use]
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::OwnerAccept { .. } => "owner_accept",
            Self::RenterConfirm => "renter_confirm",
            Self::Cancel { .. } => "cancel",
            Self::Return { .. } => "return",
            Self::Complete => "complete",
            Self::Extend { .. } => "extend",
            Self::AssignLogistics { .. } => "assign_logistics",
        }
    }

    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::OwnerAccept { note } => json!({ "owner_note": note }),
            Self::Cancel { note } => json!({ "note": note }),
            Self::Return { note } => json!({ "note": note.as_deref().unwrap_or(RETURN_NOTE) }),
            Self::Extend { days } => json!({ "days": days }),
            Self::AssignLogistics { provider, details } => json!({ "provider": provider, "details": details }),
            Self::RenterConfirm | Self::Complete => json!({}),
        }
    }

    /// Reject inputs the server cannot accept before any request is made.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a zero-day extension or a blank
    /// logistics provider.
    pub fn validate(&self) -> Result<(), ApiError> {
        let message = match self {
            Self::Extend { days: 0 } => "days: Please enter valid number of days",
            Self::AssignLogistics { provider, .. } if provider.trim().is_empty() => {
                "provider: Please enter provider name"
            }
            _ => return Ok(()),
        };
        Err(ApiError::Validation { messages: vec![message.to_owned()] })
    }
}

/// Every booking visible to the caller, as renter or owner.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn list_bookings(session: &SessionManager) -> Result<Vec<Booking>, ApiError> {
    session.send_json(ApiRequest::get(BOOKINGS_PATH)).await
}

/// Bookings for a single item. The server filter is advisory, so the result
/// is filtered again by item reference.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn bookings_for_item(session: &SessionManager, item_id: ItemId) -> Result<Vec<Booking>, ApiError> {
    let bookings: Vec<Booking> =
        session.send_json(ApiRequest::get(BOOKINGS_PATH).query("item", item_id.to_string())).await?;
    Ok(bookings.into_iter().filter(|b| b.item.id() == item_id).collect())
}

/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown or invisible booking.
pub async fn get_booking(session: &SessionManager, id: BookingId) -> Result<Booking, ApiError> {
    session.send_json(ApiRequest::get(booking_path(id))).await
}

/// Request a rental. The booking starts out `pending`.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for overlapping or out-of-range dates.
pub async fn create_booking(session: &SessionManager, draft: &BookingDraft) -> Result<Booking, ApiError> {
    let booking: Booking = session.send_json(ApiRequest::post(BOOKINGS_PATH).json(draft)?).await?;
    info!(item_id = draft.item_id, booking_id = booking.id, "booking requested");
    Ok(booking)
}

/// Post a lifecycle action and return the updated booking.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] without contacting the server when
/// [`BookingAction::validate`] fails; otherwise the server's classification.
pub async fn apply_action(session: &SessionManager, id: BookingId, action: &BookingAction) -> Result<Booking, ApiError> {
    action.validate()?;
    let path = format!("{}{}/", booking_path(id), action.path_segment());
    let booking: Booking = session.send_json(ApiRequest::post(path).with_body(action.body())).await?;
    info!(booking_id = id, action = action.path_segment(), status = ?booking.status, "booking updated");
    Ok(booking)
}
