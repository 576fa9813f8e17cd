//! Item catalogue: listing, detail, owner CRUD, and categories.

#[cfg(test)]
#[path = "items_test.rs"]
mod tests;

use tracing::info;

use super::types::{Category, Item, ItemDraft, ItemId, ItemQuery};
use crate::error::ApiError;
use crate::net::ApiRequest;
use crate::session::SessionManager;

const ITEMS_PATH: &str = "/api/items/";
const MY_ITEMS_PATH: &str = "/api/my-items/";
const CATEGORIES_PATH: &str = "/api/categories/";

fn item_path(id: ItemId) -> String {
    format!("{ITEMS_PATH}{id}/")
}

/// Browse the catalogue. Empty filter fields are not sent.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn list_items(session: &SessionManager, query: &ItemQuery) -> Result<Vec<Item>, ApiError> {
    let mut request = ApiRequest::get(ITEMS_PATH);
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        request = request.query("search", search.trim());
    }
    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        request = request.query("category", category);
    }
    session.send_json(request).await
}

/// # Errors
///
/// Returns [`ApiError::NotFound`] for an unknown id.
pub async fn get_item(session: &SessionManager, id: ItemId) -> Result<Item, ApiError> {
    session.send_json(ApiRequest::get(item_path(id))).await
}

/// List the items owned by the signed-in user.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn my_items(session: &SessionManager) -> Result<Vec<Item>, ApiError> {
    session.send_json(ApiRequest::get(MY_ITEMS_PATH)).await
}

/// # Errors
///
/// Returns [`ApiError::Validation`] with per-field messages on rejected input.
pub async fn create_item(session: &SessionManager, draft: &ItemDraft) -> Result<Item, ApiError> {
    let item: Item = session.send_json(ApiRequest::post(ITEMS_PATH).json(draft)?).await?;
    info!(item_id = item.id, "item created");
    Ok(item)
}

/// Replace an item's editable fields.
///
/// # Errors
///
/// Returns [`ApiError::Forbidden`] when the caller does not own the item.
pub async fn update_item(session: &SessionManager, id: ItemId, draft: &ItemDraft) -> Result<Item, ApiError> {
    session.send_json(ApiRequest::put(item_path(id)).json(draft)?).await
}

/// # Errors
///
/// Returns [`ApiError::Forbidden`] or [`ApiError::NotFound`] from the server.
pub async fn delete_item(session: &SessionManager, id: ItemId) -> Result<(), ApiError> {
    session.send_unit(ApiRequest::delete(item_path(id))).await?;
    info!(item_id = id, "item deleted");
    Ok(())
}

/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn categories(session: &SessionManager) -> Result<Vec<Category>, ApiError> {
    session.send_json(ApiRequest::get(CATEGORIES_PATH)).await
}
