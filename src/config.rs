use std::{env, str::FromStr};

use anyhow::Context;
use rust_decimal::Decimal;

use crate::domain::{checkout::CheckoutRules, pricing::ShippingPolicy};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub store: StoreSettings,
}

/// Storefront rules that vary per deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub shipping: ShippingPolicy,
    pub allowed_cities: Vec<String>,
    /// Business WhatsApp number orders are handed off to, digits only.
    pub whatsapp_number: String,
    pub delivery_lead_days: i64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            shipping: ShippingPolicy::default(),
            allowed_cities: vec!["Hyderabad".to_string(), "Secunderabad".to_string()],
            whatsapp_number: "919876543210".to_string(),
            delivery_lead_days: 3,
        }
    }
}

impl StoreSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let flat_fee = parse_env::<Decimal>("SHIPPING_FEE")?.unwrap_or(defaults.shipping.flat_fee);
        let free_threshold = parse_env::<Decimal>("FREE_SHIPPING_THRESHOLD")?
            .unwrap_or(defaults.shipping.free_threshold);

        let allowed_cities = match env::var("ALLOWED_CITIES") {
            Ok(raw) => {
                let cities: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                anyhow::ensure!(!cities.is_empty(), "ALLOWED_CITIES must name at least one city");
                cities
            }
            Err(_) => defaults.allowed_cities,
        };

        let whatsapp_number = env::var("WHATSAPP_NUMBER").unwrap_or(defaults.whatsapp_number);
        let delivery_lead_days =
            parse_env::<i64>("DELIVERY_LEAD_DAYS")?.unwrap_or(defaults.delivery_lead_days);

        Ok(Self {
            shipping: ShippingPolicy {
                flat_fee,
                free_threshold,
            },
            allowed_cities,
            whatsapp_number,
            delivery_lead_days,
        })
    }

    pub fn checkout_rules(&self) -> CheckoutRules {
        CheckoutRules {
            shipping: self.shipping,
            allowed_cities: self.allowed_cities.clone(),
        }
    }
}

fn parse_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            store: StoreSettings::from_env()?,
        })
    }
}
