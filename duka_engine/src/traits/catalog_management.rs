use crate::{
    db_types::{NewProduct, NewVariant, Product, ProductVariant, User},
    events::StockRestockedEvent,
    traits::ShopError,
};

#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, ShopError>;

    /// Adds a variant to an existing product. Fails with `ProductNotFound` if the product does not exist and with
    /// `ValidationError` for a negative price or stock level.
    async fn insert_variant(&self, variant: NewVariant) -> Result<ProductVariant, ShopError>;

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, ShopError>;

    async fn fetch_products(&self) -> Result<Vec<Product>, ShopError>;

    async fn fetch_variant(&self, id: i64) -> Result<Option<ProductVariant>, ShopError>;

    async fn fetch_variants_for_product(&self, product_id: i64) -> Result<Vec<ProductVariant>, ShopError>;

    /// Atomically adds `amount` units to the variant's stock and records a `product_restock` audit entry.
    async fn restock_variant(
        &self,
        variant_id: i64,
        amount: i64,
        acting_user: &User,
    ) -> Result<StockRestockedEvent, ShopError>;
}
