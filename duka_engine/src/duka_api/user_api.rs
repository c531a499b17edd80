use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewUser, Role, User},
    traits::{ShopError, UserManagement},
};

/// Access to the local mirror of user accounts.
pub struct UserApi<B> {
    db: B,
}

impl<B> Debug for UserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi")
    }
}

impl<B> UserApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn user(&self, id: i64) -> Result<User, ShopError> {
        self.db.fetch_user(id).await?.ok_or(ShopError::UserNotFound(id))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<User>, ShopError> {
        self.db.fetch_user_by_username(username).await
    }

    pub async fn register(&self, user: NewUser) -> Result<User, ShopError> {
        if user.username.trim().is_empty() {
            return Err(ShopError::ValidationError("Username cannot be empty".into()));
        }
        self.db.insert_user(user).await
    }

    /// Removes a user from the mirror. Only admins may do this, and not to themselves.
    pub async fn remove(&self, id: i64, acting_user: &User) -> Result<(), ShopError> {
        if acting_user.role != Role::Admin {
            return Err(ShopError::PermissionDenied("Only admins can remove users".into()));
        }
        if acting_user.id == id {
            return Err(ShopError::ValidationError("You cannot remove yourself".into()));
        }
        if !self.db.delete_user(id).await? {
            return Err(ShopError::UserNotFound(id));
        }
        info!("🔄️👤️ User #{id} removed by {}", acting_user.username);
        Ok(())
    }
}
