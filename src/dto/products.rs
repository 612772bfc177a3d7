use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::catalog::{BulkPack, ProductType},
    models::Product,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub category: String,
    pub product_type: ProductType,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub bulk_packs: Vec<BulkPack>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub product_type: Option<ProductType>,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    pub bulk_packs: Option<Vec<BulkPack>>,
}

/// Catalog card: the product plus its "starting from" price.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: Product,
    #[schema(value_type = String)]
    pub starting_price: Decimal,
}

impl From<Product> for ProductCard {
    fn from(product: Product) -> Self {
        let starting_price = product.starting_price();
        Self {
            product,
            starting_price,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductCard>)]
    pub items: Vec<ProductCard>,
}
