use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::api::types::BookingStatus;
use crate::net::mock::{MockTransport, ok, status};
use crate::session::store::{CredentialStore, MemoryStore};

fn authed(responses: Vec<Result<crate::net::ApiResponse, ApiError>>) -> (Arc<MockTransport>, SessionManager) {
    let transport = Arc::new(MockTransport::scripted(responses));
    let store = Arc::new(MemoryStore::new());
    store.set_many(&[("token", "A1"), ("refresh", "R1")]).unwrap();
    (transport.clone(), SessionManager::new(transport, store))
}

// =============================================================
// Action encoding
// =============================================================

#[test]
fn action_segments_and_bodies() {
    let accept = BookingAction::OwnerAccept { note: "see you".into() };
    assert_eq!(accept.path_segment(), "owner_accept");
    assert_eq!(accept.body(), json!({ "owner_note": "see you" }));

    assert_eq!(BookingAction::Cancel { note: "changed plans".into() }.body(), json!({ "note": "changed plans" }));
    assert_eq!(BookingAction::Return { note: None }.body(), json!({ "note": "Item returned" }));
    assert_eq!(BookingAction::Extend { days: 3 }.body(), json!({ "days": 3 }));
    assert_eq!(BookingAction::RenterConfirm.body(), json!({}));
    assert_eq!(BookingAction::Complete.path_segment(), "complete");
    assert_eq!(
        BookingAction::AssignLogistics { provider: "Pathao".into(), details: "pickup 9am".into() }.body(),
        json!({ "provider": "Pathao", "details": "pickup 9am" })
    );
}

#[test]
fn validation_rejects_bad_inputs() {
    assert!(matches!(BookingAction::Extend { days: 0 }.validate(), Err(ApiError::Validation { .. })));
    assert!(BookingAction::Extend { days: 1 }.validate().is_ok());
    let blank = BookingAction::AssignLogistics { provider: "  ".into(), details: String::new() };
    assert!(matches!(blank.validate(), Err(ApiError::Validation { .. })));
}

// =============================================================
// Requests
// =============================================================

#[tokio::test]
async fn apply_action_posts_to_action_path() {
    let (transport, session) = authed(vec![ok(json!({ "id": 3, "item": 1, "status": "accepted_by_owner" }))]);

    let booking = apply_action(&session, 3, &BookingAction::OwnerAccept { note: "ok".into() }).await.unwrap();
    assert_eq!(booking.status, BookingStatus::AcceptedByOwner);

    let sent = transport.requests();
    assert_eq!(sent[0].path, "/api/bookings/3/owner_accept/");
    assert_eq!(sent[0].body, Some(json!({ "owner_note": "ok" })));
    assert_eq!(sent[0].bearer.as_deref(), Some("A1"));
}

#[tokio::test]
async fn invalid_action_never_reaches_server() {
    let (transport, session) = authed(vec![]);
    let err = apply_action(&session, 3, &BookingAction::Extend { days: 0 }).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn illegal_transition_surfaces_server_detail() {
    let (_, session) = authed(vec![status(400, json!({ "detail": "Only pending bookings can be accepted." }))]);
    match apply_action(&session, 3, &BookingAction::OwnerAccept { note: String::new() }).await.unwrap_err() {
        ApiError::Validation { messages } => assert_eq!(messages, vec!["Only pending bookings can be accepted."]),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_booking_posts_draft() {
    let (transport, session) = authed(vec![ok(json!({ "id": 9, "item": 1, "status": "pending" }))]);
    let draft = BookingDraft {
        item_id: 1,
        start_date: "2025-01-10".into(),
        end_date: "2025-01-12".into(),
        renter_note: String::new(),
        third_party_required: false,
    };

    let booking = create_booking(&session, &draft).await.unwrap();
    assert_eq!(booking.id, Some(9));
    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body["item_id"], 1);
    assert_eq!(body["start_date"], "2025-01-10");
}

#[tokio::test]
async fn bookings_for_item_filters_client_side() {
    let (transport, session) = authed(vec![ok(json!([
        { "id": 1, "item": 7, "status": "pending" },
        { "id": 2, "item": { "id": 8, "title": "Tent" }, "status": "pending" },
        { "id": 3, "item": { "id": 7, "title": "Drill" }, "status": "confirmed" },
    ]))]);

    let bookings = bookings_for_item(&session, 7).await.unwrap();
    let ids: Vec<_> = bookings.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![Some(1), Some(3)]);
    assert_eq!(transport.requests()[0].query, vec![("item".to_owned(), "7".to_owned())]);
}

#[tokio::test]
async fn get_and_list_bookings() {
    let (transport, session) = authed(vec![
        ok(json!([{ "id": 1, "item": 7, "status": "completed" }])),
        ok(json!({ "id": 1, "item": 7, "status": "completed", "total_price": "30.00" })),
    ]);

    assert_eq!(list_bookings(&session).await.unwrap().len(), 1);
    let booking = get_booking(&session, 1).await.unwrap();
    assert_eq!(booking.total_price, Some(30.0));
    assert_eq!(transport.requests()[1].path, "/api/bookings/1/");
}
