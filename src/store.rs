//! Sled-backed persistence: one tree per record type on a shared database,
//! big-endian ids as keys, CBOR-encoded records as values.
//!
//! The store only knows how to save, fetch and filter records. All domain
//! rules (who may see what, which transitions are legal) live in the
//! services on top of it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::booking::{Booking, BookingId, Status};
use crate::error::{Error, Result};
use crate::item::{Comment, Item, ItemId};
use crate::request::{ItemRequest, RequestId};
use crate::time::TimeStamp;
use crate::user::{User, UserId};

/// Validated page coordinates for the paged queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    /// Checks `from >= 0` and `size > 0`, then translates the offset hint
    /// into a page number as `from / size` (truncating). A `from` inside the
    /// first page therefore still lands on page zero: `from = 5, size = 10`
    /// returns records 0..10, not 5..15.
    pub fn new(from: i64, size: i64) -> Result<Self> {
        if from < 0 || size <= 0 {
            warn!("rejected paging parameters from={from} size={size}");
            return Err(Error::InvalidPage);
        }
        let page = if from > 0 { from / size } else { 0 };
        Ok(Self {
            page: page as usize,
            size: size as usize,
        })
    }
}

/// Newest-start-first ordering plus paging, shared by every booking listing.
pub fn order_and_page(mut bookings: Vec<Booking>, page: PageRequest) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.start.cmp(&a.start));
    page_slice(bookings, page)
}

fn page_slice<T>(records: Vec<T>, page: PageRequest) -> Vec<T> {
    records
        .into_iter()
        .skip(page.page.saturating_mul(page.size))
        .take(page.size)
        .collect()
}

fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>> {
    Ok(minicbor::to_vec(value)?)
}

fn decode<T: for<'b> minicbor::Decode<'b, ()>>(bytes: &[u8]) -> Result<T> {
    Ok(minicbor::decode(bytes)?)
}

fn put<T: minicbor::Encode<()>>(tree: &sled::Tree, id: u64, value: &T) -> Result<()> {
    tree.insert(id.to_be_bytes(), encode(value)?)?;
    Ok(())
}

fn get<T: for<'b> minicbor::Decode<'b, ()>>(tree: &sled::Tree, id: u64) -> Result<Option<T>> {
    match tree.get(id.to_be_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn scan_filter<T, F>(tree: &sled::Tree, mut keep: F) -> Result<Vec<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
    F: FnMut(&T) -> bool,
{
    let mut records = Vec::new();
    for entry in tree.iter() {
        let (_, value) = entry?;
        let record: T = decode(&value)?;
        if keep(&record) {
            records.push(record);
        }
    }
    Ok(records)
}

#[derive(Clone)]
pub struct Store {
    db: Arc<sled::Db>,
    users: sled::Tree,
    items: sled::Tree,
    bookings: sled::Tree,
    comments: sled::Tree,
    requests: sled::Tree,
}

impl Store {
    pub fn open(db: Arc<sled::Db>) -> Result<Self> {
        Ok(Self {
            users: db.open_tree("users")?,
            items: db.open_tree("items")?,
            bookings: db.open_tree("bookings")?,
            comments: db.open_tree("comments")?,
            requests: db.open_tree("requests")?,
            db,
        })
    }

    /// Next id from the database-wide sequence. One sequence spans every
    /// record type, so ids are unique across the store but not dense within
    /// a single tree.
    pub fn next_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    /// Empties every tree. Meant for throwaway databases like the demo's.
    pub fn clear(&self) -> Result<()> {
        self.users.clear()?;
        self.items.clear()?;
        self.bookings.clear()?;
        self.comments.clear()?;
        self.requests.clear()?;
        Ok(())
    }

    // --- users ---

    pub fn save_user(&self, user: &User) -> Result<()> {
        put(&self.users, user.id, user)
    }

    pub fn user_by_id(&self, id: UserId) -> Result<Option<User>> {
        get(&self.users, id)
    }

    pub fn all_users(&self) -> Result<Vec<User>> {
        scan_filter(&self.users, |_: &User| true)
    }

    pub fn users_by_email(&self, email: &str) -> Result<Vec<User>> {
        scan_filter(&self.users, |user: &User| user.email == email)
    }

    pub fn delete_user(&self, id: UserId) -> Result<()> {
        self.users.remove(id.to_be_bytes())?;
        Ok(())
    }

    // --- items ---

    pub fn save_item(&self, item: &Item) -> Result<()> {
        put(&self.items, item.id, item)
    }

    pub fn item_by_id(&self, id: ItemId) -> Result<Option<Item>> {
        get(&self.items, id)
    }

    /// The owner's items in ascending id order, paged.
    pub fn items_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Vec<Item>> {
        let items = scan_filter(&self.items, |item: &Item| item.owner_id == owner)?;
        Ok(page_slice(items, page))
    }

    /// Available items whose name or description contains `needle`
    /// (which the caller has already lowercased), ascending id order.
    pub fn search_items(&self, needle: &str, page: PageRequest) -> Result<Vec<Item>> {
        let items = scan_filter(&self.items, |item: &Item| {
            item.available
                && (item.name.to_lowercase().contains(needle)
                    || item.description.to_lowercase().contains(needle))
        })?;
        Ok(page_slice(items, page))
    }

    pub fn items_by_request(&self, request: RequestId) -> Result<Vec<Item>> {
        scan_filter(&self.items, |item: &Item| item.request_id == Some(request))
    }

    pub fn delete_items_by_owner(&self, owner: UserId) -> Result<()> {
        for item in scan_filter(&self.items, |item: &Item| item.owner_id == owner)? {
            self.items.remove(item.id.to_be_bytes())?;
        }
        Ok(())
    }

    // --- bookings ---

    pub fn save_booking(&self, booking: &Booking) -> Result<()> {
        put(&self.bookings, booking.id, booking)
    }

    pub fn booking_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        get(&self.bookings, id)
    }

    /// Conditional save: writes `after` only if the stored record still
    /// equals `before`. Returns false when a concurrent writer got there
    /// first.
    pub fn compare_and_save_booking(&self, before: &Booking, after: &Booking) -> Result<bool> {
        let swap = self.bookings.compare_and_swap(
            before.id.to_be_bytes(),
            Some(encode(before)?),
            Some(encode(after)?),
        )?;
        Ok(swap.is_ok())
    }

    pub fn bookings_by_booker(&self, booker: UserId, page: PageRequest) -> Result<Vec<Booking>> {
        self.bookings_matching(page, |b| b.booker_id == booker)
    }

    /// Bookings by the booker that are running at `now`, both bounds strict.
    pub fn bookings_by_booker_current(
        &self,
        booker: UserId,
        now: TimeStamp<Utc>,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        self.bookings_matching(page, |b| {
            b.booker_id == booker && b.start < now && b.end > now
        })
    }

    pub fn bookings_by_booker_past(
        &self,
        booker: UserId,
        now: TimeStamp<Utc>,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        self.bookings_matching(page, |b| b.booker_id == booker && b.end < now)
    }

    pub fn bookings_by_booker_future(
        &self,
        booker: UserId,
        now: TimeStamp<Utc>,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        self.bookings_matching(page, |b| b.booker_id == booker && b.start > now)
    }

    pub fn bookings_by_booker_status(
        &self,
        booker: UserId,
        status: Status,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        self.bookings_matching(page, |b| b.booker_id == booker && b.status == status)
    }

    pub fn bookings_by_owner(&self, owner: UserId, page: PageRequest) -> Result<Vec<Booking>> {
        let owned = self.owned_items(owner)?;
        self.bookings_matching(page, |b| owned.contains(&b.item_id))
    }

    pub fn bookings_by_owner_current(
        &self,
        owner: UserId,
        now: TimeStamp<Utc>,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        let owned = self.owned_items(owner)?;
        self.bookings_matching(page, |b| {
            owned.contains(&b.item_id) && b.start < now && b.end > now
        })
    }

    pub fn bookings_by_owner_past(
        &self,
        owner: UserId,
        now: TimeStamp<Utc>,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        let owned = self.owned_items(owner)?;
        self.bookings_matching(page, |b| owned.contains(&b.item_id) && b.end < now)
    }

    pub fn bookings_by_owner_future(
        &self,
        owner: UserId,
        now: TimeStamp<Utc>,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        let owned = self.owned_items(owner)?;
        self.bookings_matching(page, |b| owned.contains(&b.item_id) && b.start > now)
    }

    pub fn bookings_by_owner_status(
        &self,
        owner: UserId,
        status: Status,
        page: PageRequest,
    ) -> Result<Vec<Booking>> {
        let owned = self.owned_items(owner)?;
        self.bookings_matching(page, |b| owned.contains(&b.item_id) && b.status == status)
    }

    /// The latest approved booking of the item that has already started.
    pub fn last_booking_for_item(
        &self,
        item: ItemId,
        now: TimeStamp<Utc>,
    ) -> Result<Option<Booking>> {
        let mut matches = scan_filter(&self.bookings, |b: &Booking| {
            b.item_id == item && b.status == Status::Approved && b.start < now
        })?;
        matches.sort_by(|a, b| b.start.cmp(&a.start));
        Ok(matches.into_iter().next())
    }

    /// The earliest approved booking of the item that is still ahead.
    pub fn next_booking_for_item(
        &self,
        item: ItemId,
        now: TimeStamp<Utc>,
    ) -> Result<Option<Booking>> {
        let mut matches = scan_filter(&self.bookings, |b: &Booking| {
            b.item_id == item && b.status == Status::Approved && b.start > now
        })?;
        matches.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(matches.into_iter().next())
    }

    /// Some approved booking of the item by the booker that already ended,
    /// if any. The comment guard only cares whether one exists.
    pub fn finished_booking(
        &self,
        item: ItemId,
        booker: UserId,
        now: TimeStamp<Utc>,
    ) -> Result<Option<Booking>> {
        Ok(scan_filter(&self.bookings, |b: &Booking| {
            b.item_id == item
                && b.booker_id == booker
                && b.status == Status::Approved
                && b.end < now
        })?
        .into_iter()
        .next())
    }

    fn bookings_matching<F>(&self, page: PageRequest, keep: F) -> Result<Vec<Booking>>
    where
        F: FnMut(&Booking) -> bool,
    {
        let matches = scan_filter(&self.bookings, keep)?;
        Ok(order_and_page(matches, page))
    }

    fn owned_items(&self, owner: UserId) -> Result<HashSet<ItemId>> {
        Ok(scan_filter(&self.items, |item: &Item| item.owner_id == owner)?
            .into_iter()
            .map(|item| item.id)
            .collect())
    }

    // --- comments ---

    pub fn save_comment(&self, comment: &Comment) -> Result<()> {
        put(&self.comments, comment.id, comment)
    }

    /// Comments on the item, oldest first.
    pub fn comments_for_item(&self, item: ItemId) -> Result<Vec<Comment>> {
        let mut comments = scan_filter(&self.comments, |c: &Comment| c.item_id == item)?;
        comments.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(comments)
    }

    // --- requests ---

    pub fn save_request(&self, request: &ItemRequest) -> Result<()> {
        put(&self.requests, request.id, request)
    }

    pub fn request_by_id(&self, id: RequestId) -> Result<Option<ItemRequest>> {
        get(&self.requests, id)
    }

    /// The user's own requests, newest first.
    pub fn requests_by_requester(&self, requester: UserId) -> Result<Vec<ItemRequest>> {
        let mut requests =
            scan_filter(&self.requests, |r: &ItemRequest| r.requester_id == requester)?;
        requests.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(requests)
    }

    /// Requests posted by anyone but `user`, newest first, paged.
    pub fn requests_by_others(&self, user: UserId, page: PageRequest) -> Result<Vec<ItemRequest>> {
        let mut requests =
            scan_filter(&self.requests, |r: &ItemRequest| r.requester_id != user)?;
        requests.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(page_slice(requests, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(id: u64, start_hour: u32) -> Booking {
        let start = TimeStamp::new_with(2024, 6, 1, start_hour, 0, 0);
        Booking {
            id,
            start: start.clone(),
            end: start.offset_hours(1),
            item_id: 100,
            booker_id: 200,
            status: Status::Waiting,
        }
    }

    #[test]
    fn page_request_translates_offsets_to_pages() -> Result<()> {
        assert_eq!(PageRequest::new(0, 4)?, PageRequest { page: 0, size: 4 });
        assert_eq!(PageRequest::new(5, 10)?, PageRequest { page: 0, size: 10 });
        assert_eq!(PageRequest::new(20, 10)?, PageRequest { page: 2, size: 10 });
        assert_eq!(PageRequest::new(21, 3)?, PageRequest { page: 7, size: 3 });
        Ok(())
    }

    #[test]
    fn page_request_rejects_bad_parameters() {
        assert!(matches!(PageRequest::new(-1, 10), Err(Error::InvalidPage)));
        assert!(matches!(PageRequest::new(0, 0), Err(Error::InvalidPage)));
        assert!(matches!(PageRequest::new(0, -5), Err(Error::InvalidPage)));
    }

    #[test]
    fn order_and_page_sorts_newest_start_first() -> Result<()> {
        let shuffled = vec![booking(1, 9), booking(2, 17), booking(3, 13)];
        let ordered = order_and_page(shuffled, PageRequest::new(0, 10)?);
        let ids: Vec<u64> = ordered.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        Ok(())
    }

    #[test]
    fn order_and_page_cuts_the_requested_page() -> Result<()> {
        let bookings: Vec<Booking> = (0..7).map(|i| booking(i, 8 + i as u32)).collect();
        let second_page = order_and_page(bookings.clone(), PageRequest::new(3, 3)?);
        let ids: Vec<u64> = second_page.iter().map(|b| b.id).collect();
        // Descending by start, so the second page holds the middle ids.
        assert_eq!(ids, vec![3, 2, 1]);

        let beyond = order_and_page(bookings, PageRequest::new(21, 3)?);
        assert!(beyond.is_empty());
        Ok(())
    }
}
