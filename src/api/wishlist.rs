//! Favorites (wishlist) entries with embedded items.

#[cfg(test)]
#[path = "wishlist_test.rs"]
mod tests;

use serde_json::json;

use super::types::{ItemId, WishlistEntry};
use crate::error::ApiError;
use crate::net::ApiRequest;
use crate::session::SessionManager;

const WISHLIST_PATH: &str = "/api/wishlists/";

/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn list_wishlist(session: &SessionManager) -> Result<Vec<WishlistEntry>, ApiError> {
    session.send_json(ApiRequest::get(WISHLIST_PATH)).await
}

/// # Errors
///
/// Returns [`ApiError::Validation`] if the item is already a favorite.
pub async fn add_to_wishlist(session: &SessionManager, item_id: ItemId) -> Result<WishlistEntry, ApiError> {
    session.send_json(ApiRequest::post(WISHLIST_PATH).with_body(json!({ "item_id": item_id }))).await
}

/// Remove an entry by its wishlist id (not the item id).
///
/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown entry.
pub async fn remove_from_wishlist(session: &SessionManager, entry_id: i64) -> Result<(), ApiError> {
    session.send_unit(ApiRequest::delete(format!("{WISHLIST_PATH}{entry_id}/"))).await
}
