use std::{collections::HashSet, fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::Product;

/// Separates the product id from the pack size in a cart line key.
pub const PACK_KEY_SEPARATOR: char = ':';

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("price must not be negative")]
    NegativePrice,

    #[error("bulk pack size must not be empty")]
    EmptyPackSize,

    #[error("bulk pack {0} is listed twice")]
    DuplicatePack(String),

    #[error("product {product_id} has no {size} pack")]
    UnknownPack { product_id: String, size: String },

    #[error("product {0} is out of stock")]
    OutOfStock(String),

    #[error("unknown product type {0}")]
    UnknownProductType(String),

    #[error("product id must be a lowercase slug")]
    InvalidSlug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Dark,
    Milk,
    White,
    Vegan,
    SugarFree,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Dark => "dark",
            ProductType::Milk => "milk",
            ProductType::White => "white",
            ProductType::Vegan => "vegan",
            ProductType::SugarFree => "sugar_free",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(ProductType::Dark),
            "milk" => Ok(ProductType::Milk),
            "white" => Ok(ProductType::White),
            "vegan" => Ok(ProductType::Vegan),
            // older rows were written with a hyphen
            "sugar_free" | "sugar-free" => Ok(ProductType::SugarFree),
            other => Err(CatalogError::UnknownProductType(other.to_string())),
        }
    }
}

/// A larger pack of the same product sold at its own price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BulkPack {
    /// Display label such as `"6 pack"`; also the pack discriminator in line keys.
    pub size: String,
    #[schema(value_type = String, example = "1499")]
    pub price: Decimal,
}

/// Builds the key that identifies a cart line: the product id, suffixed with
/// the pack size when a bulk pack was chosen.
pub fn line_key(product_id: &str, pack_size: Option<&str>) -> String {
    match pack_size {
        Some(size) => format!("{product_id}{PACK_KEY_SEPARATOR}{size}"),
        None => product_id.to_string(),
    }
}

/// Product ids are human-assigned slugs (`mango-milk`).
pub fn validate_slug(id: &str) -> Result<(), CatalogError> {
    let valid = !id.is_empty()
        && !id.starts_with('-')
        && !id.ends_with('-')
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidSlug)
    }
}

pub fn validate_pricing(price: Decimal, packs: &[BulkPack]) -> Result<(), CatalogError> {
    if price < Decimal::ZERO {
        return Err(CatalogError::NegativePrice);
    }

    let mut seen = HashSet::new();
    for pack in packs {
        let size = pack.size.trim();
        if size.is_empty() {
            return Err(CatalogError::EmptyPackSize);
        }
        if pack.price < Decimal::ZERO {
            return Err(CatalogError::NegativePrice);
        }
        if !seen.insert(size.to_lowercase()) {
            return Err(CatalogError::DuplicatePack(size.to_string()));
        }
    }
    Ok(())
}

/// The unit price, display name and key a cart line gets when this product
/// is added at the given pack size.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub line_key: String,
    pub name: String,
    pub unit_price: Decimal,
    pub pack_size: Option<String>,
}

impl Product {
    /// "Starting from" price shown on cards: the first bulk pack when packs
    /// exist, the base price otherwise.
    pub fn starting_price(&self) -> Decimal {
        self.bulk_packs
            .first()
            .map(|pack| pack.price)
            .unwrap_or(self.price)
    }

    pub fn find_pack(&self, size: &str) -> Option<&BulkPack> {
        let size = size.trim();
        self.bulk_packs
            .iter()
            .find(|pack| pack.size.eq_ignore_ascii_case(size))
    }

    /// Resolves what a cart line for this product (optionally at a pack size)
    /// should snapshot.
    pub fn snapshot(&self, pack_size: Option<&str>) -> Result<PriceSnapshot, CatalogError> {
        if !self.in_stock {
            return Err(CatalogError::OutOfStock(self.id.clone()));
        }

        match pack_size.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(PriceSnapshot {
                line_key: line_key(&self.id, None),
                name: self.name.clone(),
                unit_price: self.price,
                pack_size: None,
            }),
            Some(size) => {
                let pack = self.find_pack(size).ok_or_else(|| CatalogError::UnknownPack {
                    product_id: self.id.clone(),
                    size: size.to_string(),
                })?;
                Ok(PriceSnapshot {
                    line_key: line_key(&self.id, Some(&pack.size)),
                    name: format!("{} ({})", self.name, pack.size),
                    unit_price: pack.price,
                    pack_size: Some(pack.size.clone()),
                })
            }
        }
    }
}
