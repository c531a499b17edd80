use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewProduct, NewVariant, Product, ProductVariant, User},
    events::EventProducers,
    order_flow_api::require_elevated,
    traits::{CatalogManagement, ShopError},
};

/// A product together with all of its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListing {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

pub struct CatalogApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn products(&self) -> Result<Vec<ProductListing>, ShopError> {
        let products = self.db.fetch_products().await?;
        let mut result = Vec::with_capacity(products.len());
        for product in products {
            let variants = self.db.fetch_variants_for_product(product.id).await?;
            result.push(ProductListing { product, variants });
        }
        Ok(result)
    }

    pub async fn product(&self, product_id: i64) -> Result<ProductListing, ShopError> {
        let product = self.db.fetch_product(product_id).await?.ok_or(ShopError::ProductNotFound(product_id))?;
        let variants = self.db.fetch_variants_for_product(product_id).await?;
        Ok(ProductListing { product, variants })
    }

    pub async fn create_product(&self, product: NewProduct, acting_user: &User) -> Result<Product, ShopError> {
        require_elevated(acting_user, "manage the catalog")?;
        self.db.insert_product(product).await
    }

    pub async fn add_variant(&self, variant: NewVariant, acting_user: &User) -> Result<ProductVariant, ShopError> {
        require_elevated(acting_user, "manage the catalog")?;
        self.db.insert_variant(variant).await
    }

    /// Adds stock to one of the product's variants. This is the only way stock ever goes up.
    pub async fn restock(
        &self,
        product_id: i64,
        variant_id: i64,
        amount: i64,
        acting_user: &User,
    ) -> Result<ProductVariant, ShopError> {
        require_elevated(acting_user, "restock products")?;
        match self.db.fetch_variant(variant_id).await? {
            Some(v) if v.product_id == product_id => {},
            _ => return Err(ShopError::VariantNotFound(variant_id)),
        }
        let event = self.db.restock_variant(variant_id, amount, acting_user).await?;
        debug!("🔄️📦️ Variant #{variant_id} restocked by {}. Notifying hooks.", acting_user.username);
        self.producers.publish_stock_restocked(&event).await;
        Ok(event.variant)
    }
}
