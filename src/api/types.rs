//! Rentify wire DTOs.
//!
//! DESIGN
//! ======
//! Shapes follow the REST serializers. Money fields arrive as decimal
//! strings from some endpoints and numbers from others, so they go through
//! `deserialize_decimal`. Enumerations keep an `Other` variant so a new
//! server-side status never breaks listing.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type ItemId = i64;
pub type BookingId = i64;

// =============================================================================
// AUTH
// =============================================================================

/// `POST /auth/login/` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id_string")]
    pub user_id: Option<String>,
}

/// `POST /auth/refresh/` success body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub user_name: String,
    pub password: String,
}

/// Generic `{message}` / `{detail}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default, alias = "detail")]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatus {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub total_ratings: u32,
    #[serde(default)]
    pub date_joined: Option<String>,
}

/// Partial profile edit; unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

// =============================================================================
// ITEMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Rented,
    Maintenance,
    Unavailable,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Category as either a bare primary key or an embedded object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(i64),
    Embedded(Category),
}

impl CategoryRef {
    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Id(id) => *id,
            Self::Embedded(category) => category.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemImage {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub price_per_day: Option<f64>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub availability_status: Option<Availability>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub deposit_required: Option<f64>,
    #[serde(default)]
    pub minimum_rental_days: Option<u32>,
    #[serde(default)]
    pub maximum_rental_days: Option<u32>,
    #[serde(default)]
    pub images: Vec<ItemImage>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

impl Item {
    /// Primary image, falling back to the first one.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
            .and_then(|img| img.image_url.as_deref())
    }
}

/// Body for item create/update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub category: i64,
    pub price_per_day: String,
    pub condition: Option<Condition>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_rental_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_rental_days: Option<u32>,
}

/// Listing filters for `GET /api/items/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

// =============================================================================
// BOOKINGS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    AcceptedByOwner,
    Confirmed,
    Cancelled,
    Completed,
    #[serde(other)]
    Other,
}

impl BookingStatus {
    /// Cancelled and completed bookings are closed; everything else is an
    /// active request.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// A booking's item as either a bare id or an embedded object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemRef {
    Id(ItemId),
    Embedded(Box<Item>),
}

impl ItemRef {
    #[must_use]
    pub fn id(&self) -> ItemId {
        match self {
            Self::Id(id) => *id,
            Self::Embedded(item) => item.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default)]
    pub id: Option<BookingId>,
    pub item: ItemRef,
    pub status: BookingStatus,
    #[serde(default)]
    pub renter: Option<Value>,
    #[serde(default)]
    pub owner: Option<Value>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub renter_note: Option<String>,
    #[serde(default)]
    pub owner_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub item_id: ItemId,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
    #[serde(default)]
    pub renter_note: String,
    #[serde(default)]
    pub third_party_required: bool,
}

// =============================================================================
// WISHLIST
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: i64,
    pub item: ItemRef,
}

// =============================================================================
// REVIEWS
// =============================================================================

/// What a review is about. Serialized as the `review_type` wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    Item,
    Owner,
    Renter,
}

impl ReviewKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Owner => "owner",
            Self::Renter => "renter",
        }
    }

    /// Collection endpoint. Listings filter it with `?<kind>=<subject id>`.
    #[must_use]
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::Item => "/api/reviews/items/",
            Self::Owner => "/api/reviews/owners/",
            Self::Renter => "/api/reviews/renters/",
        }
    }

    /// Per-aspect ratings submitted alongside `overall_rating`.
    #[must_use]
    pub fn sub_rating_fields(self) -> &'static [&'static str] {
        match self {
            Self::Item => &["condition_rating", "accuracy_rating", "value_rating"],
            Self::Owner => &["communication_rating", "responsiveness_rating", "friendliness_rating"],
            Self::Renter => {
                &["item_care_rating", "communication_rating", "return_condition_rating", "punctuality_rating"]
            }
        }
    }

    #[must_use]
    pub fn recommend_field(self) -> &'static str {
        match self {
            Self::Item => "would_recommend",
            Self::Owner => "would_rent_again",
            Self::Renter => "would_rent_to_again",
        }
    }
}

impl std::fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: i64,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub rating: Option<f64>,
}

/// One review as listed or as echoed back after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    #[serde(default)]
    pub reviewer: Option<Reviewer>,
    pub overall_rating: u8,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub helpful_count: u32,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `201` body of the review create endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewCreated {
    #[serde(default)]
    pub message: Option<String>,
    pub review: Review,
}

/// A completed rental the caller has not fully reviewed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReview {
    pub booking_id: BookingId,
    pub item_id: ItemId,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_image: Option<String>,
    pub owner_id: i64,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub needs_item_review: bool,
    #[serde(default)]
    pub needs_owner_review: bool,
}

/// Flattened review row from `my-reviews/`. Item rows carry `item_*`,
/// owner and renter rows carry `target_*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub id: i64,
    pub rating: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<String>,
    pub review_type: ReviewKind,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub target_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyReviews {
    #[serde(default)]
    pub received: Vec<ReviewSummary>,
    #[serde(default)]
    pub given: Vec<ReviewSummary>,
}

/// Result of flipping the caller's helpful vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpfulVote {
    #[serde(default)]
    pub message: Option<String>,
    pub is_helpful: bool,
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            number.as_f64().map(Some).ok_or_else(|| D::Error::custom("expected finite decimal"))
        }
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid decimal '{text}'"))),
        Some(_) => Err(D::Error::custom("expected decimal string or number")),
    }
}

fn deserialize_opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(_) => Err(D::Error::custom("expected string or integer id")),
    }
}
