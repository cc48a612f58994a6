//! User accounts and the account service.

use tracing::warn;

use crate::error::{Error, Result};
use crate::store::Store;

pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct User {
    #[n(0)]
    pub id: UserId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub email: String,
}

pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Registers an account. Emails are unique across live users.
    pub fn create(&self, name: String, email: String) -> Result<User> {
        self.ensure_email_free(&email, None)?;

        let user = User {
            id: self.store.next_id()?,
            name,
            email,
        };
        self.store.save_user(&user)?;
        Ok(user)
    }

    /// Partial update: absent fields keep their stored values. A changed
    /// email is re-checked for uniqueness against everyone but this user.
    pub fn update(&self, id: UserId, name: Option<String>, email: Option<String>) -> Result<User> {
        let mut user = self.require(id)?;

        if let Some(email) = email {
            self.ensure_email_free(&email, Some(id))?;
            user.email = email;
        }
        if let Some(name) = name {
            user.name = name;
        }

        self.store.save_user(&user)?;
        Ok(user)
    }

    pub fn by_id(&self, id: UserId) -> Result<User> {
        self.require(id)
    }

    pub fn all(&self) -> Result<Vec<User>> {
        self.store.all_users()
    }

    /// Removes the account and every item it owns. Bookings and comments
    /// stay behind as historical records.
    pub fn delete(&self, id: UserId) -> Result<()> {
        self.store.delete_user(id)?;
        self.store.delete_items_by_owner(id)
    }

    fn require(&self, id: UserId) -> Result<User> {
        self.store.user_by_id(id)?.ok_or(Error::UserNotFound)
    }

    fn ensure_email_free(&self, email: &str, current: Option<UserId>) -> Result<()> {
        let taken = self
            .store
            .users_by_email(email)?
            .into_iter()
            .any(|user| current != Some(user.id));

        if taken {
            warn!("email {email} is already registered");
            return Err(Error::EmailTaken(email.to_string()));
        }
        Ok(())
    }
}
