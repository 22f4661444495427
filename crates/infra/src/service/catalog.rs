use chrono::Utc;
use tracing::instrument;

use stockwise_core::ProductId;
use stockwise_products::{CatalogKey, NewProduct, Product};

use crate::store::InventoryStore;

use super::ServiceError;

/// Raw product registration input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateProduct {
    pub product_type: String,
    pub brand: String,
    pub category: String,
    pub name: String,
    pub sku: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: InventoryStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(brand = %input.brand, name = %input.name), err)]
    pub async fn create(&self, input: CreateProduct) -> Result<Product, ServiceError> {
        let key = CatalogKey::new(&input.product_type, &input.brand, &input.category, &input.name)?;
        let product = NewProduct::new(key, input.sku.as_deref()).into_product(Utc::now());
        let product = self.store.insert_product(product).await?;
        tracing::info!(product_id = %product.id, "product registered");
        Ok(product)
    }

    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {id}")))
    }

    pub async fn list(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list_products().await?)
    }
}
