use chrono::Duration;
use rust_decimal::Decimal;
use sqlx::types::Json;
use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::catalog::{BulkPack, ProductType},
    middleware::auth::ADMIN_ROLE,
    services::auth_service::{grant_role, issue_token},
};
use uuid::Uuid;

// Fixed ids so repeated seeding hands out the same dev identities.
const STAFF_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001);
const SHOPPER_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0002);

struct SeedProduct {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price: i64,
    category: &'static str,
    product_type: ProductType,
    packs: &'static [(&'static str, i64)],
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        id: "mango-milk",
        name: "Mango Milk",
        description: "Alphonso mango folded into creamy milk chocolate",
        price: 549,
        category: "bars",
        product_type: ProductType::Milk,
        packs: &[("3 pack", 1499), ("6 pack", 2899)],
    },
    SeedProduct {
        id: "classic-dark-70",
        name: "Classic Dark 70%",
        description: "Single-origin cocoa, lightly roasted",
        price: 449,
        category: "bars",
        product_type: ProductType::Dark,
        packs: &[("3 pack", 1249)],
    },
    SeedProduct {
        id: "rose-pistachio-white",
        name: "Rose Pistachio White",
        description: "White chocolate with rose petals and pistachio",
        price: 599,
        category: "bars",
        product_type: ProductType::White,
        packs: &[],
    },
    SeedProduct {
        id: "oat-milk-hazelnut",
        name: "Oat Milk Hazelnut",
        description: "Dairy-free bar with roasted hazelnuts",
        price: 649,
        category: "bars",
        product_type: ProductType::Vegan,
        packs: &[],
    },
    SeedProduct {
        id: "truffle-box-12",
        name: "Sugar-Free Truffle Box (12)",
        description: "Assorted handmade truffles sweetened with stevia",
        price: 1199,
        category: "gifting",
        product_type: ProductType::SugarFree,
        packs: &[],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    seed_products(&pool).await?;
    grant_role(&pool, STAFF_ID, ADMIN_ROLE).await?;
    println!("Granted {ADMIN_ROLE} to {STAFF_ID}");

    let ttl = Duration::days(30);
    let staff_token = issue_token(&config.jwt_secret, STAFF_ID, Some("staff@example.com"), ttl)?;
    let shopper_token =
        issue_token(&config.jwt_secret, SHOPPER_ID, Some("shopper@example.com"), ttl)?;

    println!("Seed completed.");
    println!("Staff token:   {staff_token}");
    println!("Shopper token: {shopper_token}");
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for product in PRODUCTS {
        let packs: Vec<BulkPack> = product
            .packs
            .iter()
            .map(|(size, price)| BulkPack {
                size: (*size).to_string(),
                price: Decimal::from(*price),
            })
            .collect();

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, product_type, bulk_packs)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(product.id)
        .bind(product.name)
        .bind(product.description)
        .bind(Decimal::from(product.price))
        .bind(product.category)
        .bind(product.product_type.as_str())
        .bind(Json(packs))
        .execute(pool)
        .await?;
    }

    println!("Seeded {} products", PRODUCTS.len());
    Ok(())
}
