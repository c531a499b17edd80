use crate::{
    db_types::{NewUser, User},
    traits::ShopError,
};

/// Users are owned by the external identity system. The engine keeps a mirror of the fields it needs for ownership
/// and permission checks.
#[allow(async_fn_in_trait)]
pub trait UserManagement: Clone {
    async fn insert_user(&self, user: NewUser) -> Result<User, ShopError>;

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, ShopError>;

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, ShopError>;

    /// Removes the user along with their orders and payments. Audit entries that refer to the user survive with the
    /// user reference cleared. Returns `false` if the user did not exist.
    async fn delete_user(&self, id: i64) -> Result<bool, ShopError>;
}
