//! Booking records and the two booking vocabularies: the persisted
//! [`Status`] lifecycle and the query-side [`State`] filter.

use chrono::Utc;

use crate::item::ItemId;
use crate::time::TimeStamp;
use crate::user::UserId;

pub type BookingId = u64;

/// One reservation of an item for a time interval, requested by a booker and
/// decided by the item's owner.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Booking {
    #[n(0)]
    pub id: BookingId,
    #[n(1)]
    pub start: TimeStamp<Utc>,
    #[n(2)]
    pub end: TimeStamp<Utc>,
    #[n(3)]
    pub item_id: ItemId,
    #[n(4)]
    pub booker_id: UserId,
    #[n(5)]
    pub status: Status,
}

/// Input for a booking request; id and status are assigned on creation.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub item_id: ItemId,
    pub start: TimeStamp<Utc>,
    pub end: TimeStamp<Utc>,
}

/// Short projection of a booking, embedded in item views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRef {
    pub id: BookingId,
    pub booker_id: UserId,
    pub start: TimeStamp<Utc>,
    pub end: TimeStamp<Utc>,
}

impl From<&Booking> for BookingRef {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            booker_id: booking.booker_id,
            start: booking.start.clone(),
            end: booking.end.clone(),
        }
    }
}

/// Persisted lifecycle value. Every booking is created `Waiting` and is
/// decided at most once; `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Status {
    #[n(0)]
    Waiting,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

/// Query-side filter over bookings, combining status with the clock at
/// listing time. Never persisted; it only selects which store query runs.
/// Not the same vocabulary as [`Status`]: the names overlap, the meanings
/// do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
    Unknown,
}

impl State {
    /// Case-sensitive parse of the raw filter string. Anything unrecognized
    /// maps to `Unknown`; the listing dispatch rejects that, echoing the raw
    /// input back to the caller.
    pub fn parse(raw: &str) -> State {
        match raw {
            "ALL" => State::All,
            "CURRENT" => State::Current,
            "PAST" => State::Past,
            "FUTURE" => State::Future,
            "WAITING" => State::Waiting,
            "REJECTED" => State::Rejected,
            _ => State::Unknown,
        }
    }
}
