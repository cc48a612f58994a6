//! Item requests: a user describes something they would like to rent, and
//! other users may answer by listing a matching item.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::store::{PageRequest, Store};
use crate::time::TimeStamp;
use crate::user::UserId;

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ItemRequest {
    #[n(0)]
    pub id: RequestId,
    #[n(1)]
    pub description: String,
    #[n(2)]
    pub requester_id: UserId,
    #[n(3)]
    pub created: TimeStamp<Utc>,
}

/// A request together with the items listed in answer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestView {
    pub request: ItemRequest,
    pub items: Vec<Item>,
}

pub struct RequestService {
    store: Store,
}

impl RequestService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create(&self, requester_id: UserId, description: String) -> Result<ItemRequest> {
        self.require_user(requester_id)?;

        let request = ItemRequest {
            id: self.store.next_id()?,
            description,
            requester_id,
            created: TimeStamp::new(),
        };
        self.store.save_request(&request)?;
        Ok(request)
    }

    /// The user's own requests, newest first, with their answers.
    pub fn own(&self, requester_id: UserId) -> Result<Vec<RequestView>> {
        self.require_user(requester_id)?;
        self.store
            .requests_by_requester(requester_id)?
            .into_iter()
            .map(|request| self.decorate(request))
            .collect()
    }

    /// Requests posted by everyone else, newest first, paged. Used to
    /// browse for something to offer.
    pub fn from_others(&self, user_id: UserId, from: i64, size: i64) -> Result<Vec<RequestView>> {
        let page = PageRequest::new(from, size)?;
        self.require_user(user_id)?;
        self.store
            .requests_by_others(user_id, page)?
            .into_iter()
            .map(|request| self.decorate(request))
            .collect()
    }

    /// One request with its answers, visible to any registered user.
    pub fn by_id(&self, request_id: RequestId, user_id: UserId) -> Result<RequestView> {
        self.require_user(user_id)?;
        let request = self
            .store
            .request_by_id(request_id)?
            .ok_or(Error::RequestNotFound)?;
        self.decorate(request)
    }

    fn decorate(&self, request: ItemRequest) -> Result<RequestView> {
        let items = self.store.items_by_request(request.id)?;
        Ok(RequestView { request, items })
    }

    fn require_user(&self, id: UserId) -> Result<()> {
        match self.store.user_by_id(id)? {
            Some(_) => Ok(()),
            None => Err(Error::UserNotFound),
        }
    }
}
