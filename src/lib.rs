//! Core of an item sharing service. Users register and list items, other
//! users request time-bounded bookings of them, and owners approve or
//! reject those requests. Records are persisted in sled as CBOR; the
//! services on top enforce the lifecycle, visibility and paging rules.

pub mod booking;
pub mod error;
pub mod item;
pub mod request;
pub mod service;
pub mod store;
pub mod time;
pub mod user;
