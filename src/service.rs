//! Service layer for the booking lifecycle: creation, the owner's
//! approve/reject decision, visibility-checked retrieval, and the
//! state-filtered listings for bookers and owners.

use tracing::warn;

use crate::booking::{Booking, BookingId, NewBooking, State, Status};
use crate::error::{Error, Result};
use crate::item::{Item, ItemId};
use crate::store::{PageRequest, Store};
use crate::time::TimeStamp;
use crate::user::UserId;

/// Which side of a booking a listing is for.
enum Role {
    Booker,
    Owner,
}

pub struct BookingService {
    store: Store,
}

impl BookingService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Request a booking of an item. The booking is persisted as `Waiting`
    /// and stays that way until the item's owner decides it.
    pub fn create(&self, input: NewBooking, booker_id: UserId) -> Result<Booking> {
        if input.start >= input.end {
            warn!(
                "rejected booking of item {}: end not after start",
                input.item_id
            );
            return Err(Error::EndNotAfterStart);
        }
        self.require_user(booker_id)?;
        let item = self.require_item(input.item_id)?;
        if booker_id == item.owner_id {
            warn!("user {booker_id} tried to book own item {}", item.id);
            return Err(Error::OwnItemBooking);
        }
        if !item.available {
            warn!("item {} is not open for booking", item.id);
            return Err(Error::ItemUnavailable(item.id));
        }

        let booking = Booking {
            id: self.store.next_id()?,
            start: input.start,
            end: input.end,
            item_id: item.id,
            booker_id,
            status: Status::Waiting,
        };
        self.store.save_booking(&booking)?;
        Ok(booking)
    }

    /// Approve or reject a waiting booking. Only the item's owner may
    /// decide, and only once: the write is conditional on the record still
    /// being the one read, so racing decisions cannot both win.
    pub fn decide(
        &self,
        booking_id: BookingId,
        acting_user_id: UserId,
        approve: bool,
    ) -> Result<Booking> {
        self.require_user(acting_user_id)?;
        let booking = self.require_booking(booking_id)?;
        let item = self.require_item(booking.item_id)?;

        if acting_user_id != item.owner_id {
            warn!(
                "user {acting_user_id} may not decide booking {booking_id} on item {}",
                item.id
            );
            return Err(Error::DecideNotByOwner);
        }
        if booking.status != Status::Waiting {
            warn!("booking {booking_id} is already decided");
            return Err(Error::AlreadyDecided);
        }

        let mut decided = booking.clone();
        decided.status = if approve {
            Status::Approved
        } else {
            Status::Rejected
        };
        if !self.store.compare_and_save_booking(&booking, &decided)? {
            warn!("booking {booking_id} was decided concurrently");
            return Err(Error::AlreadyDecided);
        }
        Ok(decided)
    }

    /// Fetch one booking. Visible only to its booker and the item's owner;
    /// anyone else gets the same answer as for a booking that does not
    /// exist.
    pub fn by_id(&self, booking_id: BookingId, requester_id: UserId) -> Result<Booking> {
        self.require_user(requester_id)?;
        let booking = self.require_booking(booking_id)?;
        let item = self.require_item(booking.item_id)?;

        if requester_id == booking.booker_id || requester_id == item.owner_id {
            Ok(booking)
        } else {
            warn!("user {requester_id} may not view booking {booking_id}");
            Err(Error::BookingNotFound)
        }
    }

    /// Bookings made by the user, filtered by `state`, newest start first.
    pub fn for_booker(
        &self,
        user_id: UserId,
        state: &str,
        from: i64,
        size: i64,
    ) -> Result<Vec<Booking>> {
        self.listing(Role::Booker, user_id, state, from, size)
    }

    /// Bookings of the items the user owns, filtered by `state`, newest
    /// start first.
    pub fn for_owner(
        &self,
        user_id: UserId,
        state: &str,
        from: i64,
        size: i64,
    ) -> Result<Vec<Booking>> {
        self.listing(Role::Owner, user_id, state, from, size)
    }

    fn listing(
        &self,
        role: Role,
        user_id: UserId,
        state: &str,
        from: i64,
        size: i64,
    ) -> Result<Vec<Booking>> {
        let page = PageRequest::new(from, size)?;
        self.require_user(user_id)?;

        // One clock snapshot serves every comparison in this call.
        let now = TimeStamp::new();
        let store = &self.store;
        match (State::parse(state), role) {
            (State::All, Role::Booker) => store.bookings_by_booker(user_id, page),
            (State::All, Role::Owner) => store.bookings_by_owner(user_id, page),
            (State::Current, Role::Booker) => store.bookings_by_booker_current(user_id, now, page),
            (State::Current, Role::Owner) => store.bookings_by_owner_current(user_id, now, page),
            (State::Past, Role::Booker) => store.bookings_by_booker_past(user_id, now, page),
            (State::Past, Role::Owner) => store.bookings_by_owner_past(user_id, now, page),
            (State::Future, Role::Booker) => store.bookings_by_booker_future(user_id, now, page),
            (State::Future, Role::Owner) => store.bookings_by_owner_future(user_id, now, page),
            (State::Waiting, Role::Booker) => {
                store.bookings_by_booker_status(user_id, Status::Waiting, page)
            }
            (State::Waiting, Role::Owner) => {
                store.bookings_by_owner_status(user_id, Status::Waiting, page)
            }
            (State::Rejected, Role::Booker) => {
                store.bookings_by_booker_status(user_id, Status::Rejected, page)
            }
            (State::Rejected, Role::Owner) => {
                store.bookings_by_owner_status(user_id, Status::Rejected, page)
            }
            (State::Unknown, _) => {
                warn!("Unknown state: {state}");
                Err(Error::UnknownState(state.to_string()))
            }
        }
    }

    fn require_user(&self, id: UserId) -> Result<()> {
        match self.store.user_by_id(id)? {
            Some(_) => Ok(()),
            None => Err(Error::UserNotFound),
        }
    }

    fn require_item(&self, id: ItemId) -> Result<Item> {
        self.store.item_by_id(id)?.ok_or(Error::ItemNotFound)
    }

    fn require_booking(&self, id: BookingId) -> Result<Booking> {
        self.store.booking_by_id(id)?.ok_or(Error::BookingNotFound)
    }
}
