use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewProduct, NewVariant, Product, ProductVariant};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    sqlx::query_as("INSERT INTO products (name, description, category) VALUES ($1, $2, $3) RETURNING *")
        .bind(product.name)
        .bind(product.description)
        .bind(product.category)
        .fetch_one(conn)
        .await
}

pub async fn insert_variant(variant: NewVariant, conn: &mut SqliteConnection) -> Result<ProductVariant, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO product_variants (product_id, size, price, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(variant.product_id)
    .bind(variant.size)
    .bind(variant.price)
    .bind(variant.stock)
    .fetch_one(conn)
    .await
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products ORDER BY id").fetch_all(conn).await
}

pub async fn fetch_variant(id: i64, conn: &mut SqliteConnection) -> Result<Option<ProductVariant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM product_variants WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_variants_for_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductVariant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM product_variants WHERE product_id = $1 ORDER BY id")
        .bind(product_id)
        .fetch_all(conn)
        .await
}

/// Adds `amount` units to the variant's stock. Returns `false` if the variant does not exist.
pub async fn add_stock(variant_id: i64, amount: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE product_variants SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(amount)
    .bind(variant_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Compare-and-decrement. Removes `quantity` units only if at least that many are in stock, so the counter can never
/// go negative. Returns `false` (and changes nothing) otherwise.
pub async fn deduct_stock(variant_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE product_variants
            SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock >= $1
        "#,
    )
    .bind(quantity)
    .bind(variant_id)
    .execute(conn)
    .await?;
    let deducted = result.rows_affected() > 0;
    trace!("🗃️ Deduct {quantity} from variant #{variant_id}: {deducted}");
    Ok(deducted)
}
