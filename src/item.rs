//! Items offered for sharing, the comments left on them, and the catalog
//! service that manages both.
//!
//! Item views are audience sensitive. The owner sees the item decorated
//! with its surrounding approved bookings, anyone else sees the bare item
//! and its comments.

use chrono::Utc;
use tracing::warn;

use crate::booking::BookingRef;
use crate::error::{Error, Result};
use crate::request::RequestId;
use crate::store::{PageRequest, Store};
use crate::time::TimeStamp;
use crate::user::UserId;

pub type ItemId = u64;
pub type CommentId = u64;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Item {
    #[n(0)]
    pub id: ItemId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub description: String,
    /// Whether the owner currently accepts bookings for it.
    #[n(3)]
    pub available: bool,
    #[n(4)]
    pub owner_id: UserId,
    /// Set when the item was listed in answer to an item request.
    #[n(5)]
    pub request_id: Option<RequestId>,
}

/// Fields callers supply when listing an item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub request_id: Option<RequestId>,
}

/// Partial edit of an item. Absent fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Comment {
    #[n(0)]
    pub id: CommentId,
    #[n(1)]
    pub text: String,
    #[n(2)]
    pub item_id: ItemId,
    #[n(3)]
    pub author_id: UserId,
    #[n(4)]
    pub created: TimeStamp<Utc>,
}

/// An item as shown to a viewer. The booking fields are populated only
/// when the viewer owns the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub item: Item,
    pub last_booking: Option<BookingRef>,
    pub next_booking: Option<BookingRef>,
    pub comments: Vec<Comment>,
}

pub struct ItemService {
    store: Store,
}

impl ItemService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create(&self, input: NewItem, owner_id: UserId) -> Result<Item> {
        self.require_user(owner_id)?;

        let item = Item {
            id: self.store.next_id()?,
            name: input.name,
            description: input.description,
            available: input.available,
            owner_id,
            request_id: input.request_id,
        };
        self.store.save_item(&item)?;
        Ok(item)
    }

    /// Applies a patch to an item. Only the owner may edit.
    pub fn update(
        &self,
        item_id: ItemId,
        patch: ItemPatch,
        acting_user_id: UserId,
    ) -> Result<Item> {
        let mut item = self.require_item(item_id)?;
        if item.owner_id != acting_user_id {
            warn!("user {acting_user_id} may not edit item {item_id}");
            return Err(Error::EditNotByOwner);
        }

        if let Some(name) = patch.name {
            item.name = name;
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(available) = patch.available {
            item.available = available;
        }

        self.store.save_item(&item)?;
        Ok(item)
    }

    /// One item with its comments. The owner additionally sees the latest
    /// started and the next upcoming approved booking.
    pub fn by_id(&self, item_id: ItemId, viewer_id: UserId) -> Result<ItemView> {
        let item = self.require_item(item_id)?;
        if viewer_id == item.owner_id {
            self.owner_view(item, TimeStamp::new())
        } else {
            let comments = self.store.comments_for_item(item_id)?;
            Ok(ItemView {
                item,
                last_booking: None,
                next_booking: None,
                comments,
            })
        }
    }

    /// The owner's items in listing order, each decorated as in [`Self::by_id`].
    pub fn by_owner(&self, owner_id: UserId, from: i64, size: i64) -> Result<Vec<ItemView>> {
        let page = PageRequest::new(from, size)?;
        let now = TimeStamp::new();
        self.store
            .items_by_owner(owner_id, page)?
            .into_iter()
            .map(|item| self.owner_view(item, now.clone()))
            .collect()
    }

    /// Case-insensitive substring search over names and descriptions.
    /// Matches available items only; blank text matches nothing.
    pub fn search(&self, text: &str, from: i64, size: i64) -> Result<Vec<Item>> {
        let page = PageRequest::new(from, size)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.store.search_items(&text.to_lowercase(), page)
    }

    /// Leaves a comment on an item. Only users who actually rented it may
    /// comment: there must be an approved booking of this item by this
    /// author that has already ended.
    pub fn add_comment(&self, item_id: ItemId, author_id: UserId, text: String) -> Result<Comment> {
        self.require_user(author_id)?;
        self.require_item(item_id)?;

        let now = TimeStamp::new();
        if self
            .store
            .finished_booking(item_id, author_id, now.clone())?
            .is_none()
        {
            warn!("user {author_id} has no finished booking of item {item_id}, comment refused");
            return Err(Error::CommentWithoutBooking(item_id));
        }

        let comment = Comment {
            id: self.store.next_id()?,
            text,
            item_id,
            author_id,
            created: now,
        };
        self.store.save_comment(&comment)?;
        Ok(comment)
    }

    fn owner_view(&self, item: Item, now: TimeStamp<Utc>) -> Result<ItemView> {
        let last = self.store.last_booking_for_item(item.id, now.clone())?;
        let next = self.store.next_booking_for_item(item.id, now)?;
        let comments = self.store.comments_for_item(item.id)?;
        Ok(ItemView {
            last_booking: last.as_ref().map(BookingRef::from),
            next_booking: next.as_ref().map(BookingRef::from),
            item,
            comments,
        })
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
}
