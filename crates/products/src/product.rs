use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, Entity, ProductId};

/// The tuple a bulk-upload row is matched on: `(type, brand, category, name)`.
///
/// Fields are stored trimmed of surrounding whitespace. Comparison is exact and
/// case-sensitive: `"LENE"` and `"Lene"` are different brands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    pub product_type: String,
    pub brand: String,
    pub category: String,
    pub name: String,
}

impl CatalogKey {
    /// Build a key from raw input, trimming each field.
    ///
    /// Every field is required; an empty field (after trimming) is a validation error.
    pub fn new(
        product_type: &str,
        brand: &str,
        category: &str,
        name: &str,
    ) -> DomainResult<Self> {
        Ok(Self {
            product_type: required("type", product_type)?,
            brand: required("brand", brand)?,
            category: required("category", category)?,
            name: required("name", name)?,
        })
    }

    /// Whether this key identifies `product`.
    pub fn matches(&self, product: &Product) -> bool {
        self.product_type == product.product_type.trim()
            && self.brand == product.brand.trim()
            && self.category == product.category.trim()
            && self.name == product.name.trim()
    }
}

impl core::fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.product_type, self.brand, self.category, self.name
        )
    }
}

fn required(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_type: String,
    pub brand: String,
    pub category: String,
    pub name: String,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn catalog_key(&self) -> CatalogKey {
        CatalogKey {
            product_type: self.product_type.trim().to_string(),
            brand: self.brand.trim().to_string(),
            category: self.category.trim().to_string(),
            name: self.name.trim().to_string(),
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for registering a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub key: CatalogKey,
    pub sku: Option<String>,
}

impl NewProduct {
    pub fn new(key: CatalogKey, sku: Option<&str>) -> Self {
        let sku = sku
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { key, sku }
    }

    /// Materialize the product with a fresh id.
    pub fn into_product(self, created_at: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::new(),
            product_type: self.key.product_type,
            brand: self.key.brand,
            category: self.key.category,
            name: self.key.name,
            sku: self.sku,
            created_at,
        }
    }
}
