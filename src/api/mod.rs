//! Endpoint bindings for the Rentify REST API.
//!
//! Every function takes the `SessionManager` by reference and returns typed
//! results. Public endpoints (login, registration, verification, password
//! reset) are marked `public()` so a 401 from them is surfaced as-is.

pub mod auth;
pub mod bookings;
pub mod items;
pub mod reviews;
pub mod types;
pub mod wishlist;
