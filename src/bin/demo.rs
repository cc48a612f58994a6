//! End-to-end walkthrough of the booking lifecycle against a throwaway
//! sled database. Set `BOOKING_DATA_DIR` to pick the database location.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use item_booking::booking::NewBooking;
use item_booking::item::{ItemService, NewItem};
use item_booking::request::RequestService;
use item_booking::service::BookingService;
use item_booking::store::Store;
use item_booking::time::TimeStamp;
use item_booking::user::UserService;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let data_dir =
        std::env::var("BOOKING_DATA_DIR").unwrap_or_else(|_| "./booking-data".to_string());
    let db = Arc::new(sled::open(&data_dir)?);
    let store = Store::open(db)?;
    store.clear()?;

    let users = UserService::new(store.clone());
    let items = ItemService::new(store.clone());
    let requests = RequestService::new(store.clone());
    let bookings = BookingService::new(store);

    let anna = users.create("Anna".to_string(), "anna@example.com".to_string())?;
    let boris = users.create("Boris".to_string(), "boris@example.com".to_string())?;
    info!("registered {} (user {}) and {} (user {})", anna.name, anna.id, boris.name, boris.id);

    let wish = requests.create(boris.id, "Need a drill for a weekend project".to_string())?;
    info!("{} posted request {}: {}", boris.name, wish.id, wish.description);

    let drill = items.create(
        NewItem {
            name: "Cordless drill".to_string(),
            description: "18V with two batteries".to_string(),
            available: true,
            request_id: Some(wish.id),
        },
        anna.id,
    )?;
    info!("{} answered with item {} ({})", anna.name, drill.id, drill.name);

    let now = TimeStamp::new();
    let booking = bookings.create(
        NewBooking {
            item_id: drill.id,
            start: now.offset_hours(20),
            end: now.offset_hours(44),
        },
        boris.id,
    )?;
    info!(
        "{} requested booking {} for item {} ({:?})",
        boris.name, booking.id, booking.item_id, booking.status
    );

    let decided = bookings.decide(booking.id, anna.id, true)?;
    info!("owner approved, booking {} is now {:?}", decided.id, decided.status);

    if let Err(err) = bookings.decide(booking.id, anna.id, false) {
        info!("changing the decision is refused: {err}");
    }

    let upcoming = bookings.for_booker(boris.id, "FUTURE", 0, 10)?;
    info!("{} has {} upcoming booking(s)", boris.name, upcoming.len());

    let undecided = bookings.for_owner(anna.id, "WAITING", 0, 10)?;
    info!("{} has {} booking(s) left to decide", anna.name, undecided.len());

    let found = items.search("drill", 0, 10)?;
    info!("searching for \"drill\" finds {} item(s)", found.len());

    Ok(())
}
