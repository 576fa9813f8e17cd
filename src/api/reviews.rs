//! Reviews left after a completed rental: the renter reviews the item and
//! its owner, the owner reviews the renter.

#[cfg(test)]
#[path = "reviews_test.rs"]
mod tests;

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use tracing::info;

use super::types::{BookingId, HelpfulVote, MyReviews, PendingReview, Review, ReviewCreated, ReviewKind};
use crate::error::ApiError;
use crate::net::ApiRequest;
use crate::session::SessionManager;

const PENDING_PATH: &str = "/api/reviews/pending/";
const MY_REVIEWS_PATH: &str = "/api/reviews/my-reviews/";
const HELPFUL_PATH: &str = "/api/reviews/helpful/";

/// How a renter left the item; only sent with renter reviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnReport {
    pub returned_clean: bool,
    pub returned_on_time: bool,
    pub any_damage: bool,
    pub damage_description: String,
}

impl Default for ReturnReport {
    fn default() -> Self {
        Self { returned_clean: true, returned_on_time: true, any_damage: false, damage_description: String::new() }
    }
}

/// A review about to be submitted for one booking.
///
/// Aspect ratings missing from `sub_ratings` take the overall rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub kind: ReviewKind,
    pub booking: BookingId,
    /// Item id for item reviews, user id for owner and renter reviews.
    pub subject: i64,
    pub overall_rating: u8,
    pub sub_ratings: BTreeMap<String, u8>,
    pub title: String,
    pub comment: String,
    /// Item reviews only.
    pub pros: String,
    /// Item reviews only.
    pub cons: String,
    pub recommend: bool,
    pub return_report: ReturnReport,
}

impl ReviewDraft {
    #[must_use]
    pub fn new(kind: ReviewKind, booking: BookingId, subject: i64, overall_rating: u8) -> Self {
        Self {
            kind,
            booking,
            subject,
            overall_rating,
            sub_ratings: BTreeMap::new(),
            title: String::new(),
            comment: String::new(),
            pros: String::new(),
            cons: String::new(),
            recommend: true,
            return_report: ReturnReport::default(),
        }
    }

    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert(self.kind.as_str().to_owned(), json!(self.subject));
        body.insert("booking".to_owned(), json!(self.booking));
        body.insert("overall_rating".to_owned(), json!(self.overall_rating));
        for field in self.kind.sub_rating_fields() {
            let rating = self.sub_ratings.get(*field).copied().unwrap_or(self.overall_rating);
            body.insert((*field).to_owned(), json!(rating));
        }
        body.insert("title".to_owned(), json!(self.title));
        body.insert("comment".to_owned(), json!(self.comment));
        match self.kind {
            ReviewKind::Item => {
                body.insert("pros".to_owned(), json!(self.pros));
                body.insert("cons".to_owned(), json!(self.cons));
            }
            ReviewKind::Renter => {
                let report = &self.return_report;
                body.insert("returned_clean".to_owned(), json!(report.returned_clean));
                body.insert("returned_on_time".to_owned(), json!(report.returned_on_time));
                body.insert("any_damage".to_owned(), json!(report.any_damage));
                body.insert("damage_description".to_owned(), json!(report.damage_description));
            }
            ReviewKind::Owner => {}
        }
        body.insert(self.kind.recommend_field().to_owned(), json!(self.recommend));
        Value::Object(body)
    }

    /// Ratings run from 1 to 5 and aspect names must belong to the kind.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] listing every bad field.
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut messages = Vec::new();
        if !(1..=5).contains(&self.overall_rating) {
            messages.push(format!("overall_rating: Please provide an overall rating for the {}", self.kind));
        }
        for (field, rating) in &self.sub_ratings {
            if !self.kind.sub_rating_fields().contains(&field.as_str()) {
                messages.push(format!("{field}: not rated on {} reviews", self.kind));
            } else if !(1..=5).contains(rating) {
                messages.push(format!("{field}: Ratings run from 1 to 5"));
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation { messages })
        }
    }
}

/// Completed rentals still missing an item or owner review.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn pending_reviews(session: &SessionManager) -> Result<Vec<PendingReview>, ApiError> {
    session.send_json(ApiRequest::get(PENDING_PATH)).await
}

/// Submit a review and return it as stored.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] without contacting the server when
/// [`ReviewDraft::validate`] fails, and for server-side rejections such as a
/// duplicate review for the booking.
pub async fn create_review(session: &SessionManager, draft: &ReviewDraft) -> Result<Review, ApiError> {
    draft.validate()?;
    let created: ReviewCreated =
        session.send_json(ApiRequest::post(draft.kind.collection_path()).with_body(draft.body())).await?;
    info!(kind = %draft.kind, booking_id = draft.booking, review_id = created.review.id, "review submitted");
    Ok(created.review)
}

/// Reviews about one item, owner, or renter.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn list_reviews(session: &SessionManager, kind: ReviewKind, subject: i64) -> Result<Vec<Review>, ApiError> {
    session.send_json(ApiRequest::get(kind.collection_path()).query(kind.as_str(), subject.to_string())).await
}

/// Reviews the caller wrote and reviews about the caller or their items.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn my_reviews(session: &SessionManager) -> Result<MyReviews, ApiError> {
    session.send_json(ApiRequest::get(MY_REVIEWS_PATH)).await
}

/// Flip the caller's helpful vote on a review.
///
/// # Errors
///
/// Propagates transport, session, and status errors.
pub async fn toggle_helpful(
    session: &SessionManager,
    kind: ReviewKind,
    review_id: i64,
) -> Result<HelpfulVote, ApiError> {
    let body = json!({ "review_type": kind, "review_id": review_id });
    session.send_json(ApiRequest::post(HELPFUL_PATH).with_body(body)).await
}
