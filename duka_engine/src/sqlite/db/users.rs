use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    traits::ShopError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, ShopError> {
    let result = sqlx::query_as("INSERT INTO users (username, email, role) VALUES ($1, $2, $3) RETURNING *")
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role)
        .fetch_one(conn)
        .await;
    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(ShopError::ValidationError(format!("Username {} is already taken", user.username)))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_user_by_username(username: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE username = $1").bind(username).fetch_optional(conn).await
}

pub async fn delete_user(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
