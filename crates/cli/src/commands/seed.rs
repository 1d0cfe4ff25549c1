//! Seed the database with sample catalog data.
//!
//! Intended for local development; every insert is idempotent on slug so
//! the command can be re-run safely.

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

struct SeedCategory {
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
}

struct SeedProduct {
    slug: &'static str,
    name: &'static str,
    description: &'static str,
    price: Decimal,
    stock: i32,
    category: &'static str,
    featured: bool,
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory {
        slug: "candles",
        name: "Candles",
        description: "Hand-poured ritual and ambience candles",
        icon: "flame",
    },
    SeedCategory {
        slug: "crystals",
        name: "Crystals",
        description: "Tumbled stones, points, and clusters",
        icon: "gem",
    },
    SeedCategory {
        slug: "tarot",
        name: "Tarot & Oracle",
        description: "Decks, spreads, and reading accessories",
        icon: "cards",
    },
    SeedCategory {
        slug: "apparel",
        name: "Apparel",
        description: "Printed shirts, hoodies, and totes",
        icon: "shirt",
    },
];

fn sample_products() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            slug: "hearth-beeswax-pillar",
            name: "Hearth Beeswax Pillar",
            description: "Slow-burning beeswax pillar with a honeyed glow.",
            price: Decimal::new(2400, 2),
            stock: 40,
            category: "candles",
            featured: true,
        },
        SeedProduct {
            slug: "rose-quartz-point",
            name: "Rose Quartz Point",
            description: "Polished rose quartz point, roughly three inches.",
            price: Decimal::new(1850, 2),
            stock: 25,
            category: "crystals",
            featured: false,
        },
        SeedProduct {
            slug: "ember-tarot-deck",
            name: "Ember Tarot Deck",
            description: "78-card deck with gilt edges and a linen box.",
            price: Decimal::new(4200, 2),
            stock: 15,
            category: "tarot",
            featured: true,
        },
        SeedProduct {
            slug: "beginner-reading-cloth",
            name: "Beginner Reading Cloth",
            description: "Printed altar cloth with a three-card spread guide.",
            price: Decimal::new(1600, 2),
            stock: 30,
            category: "tarot",
            featured: false,
        },
    ]
}

/// Seed sample categories and products.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let mut inserted = 0_u32;
    for category in CATEGORIES {
        inserted += insert_category(&pool, category).await?;
    }
    info!("Seeded {inserted} categories");

    let mut inserted = 0_u32;
    for product in sample_products() {
        inserted += insert_product(&pool, &product).await?;
    }
    info!("Seeded {inserted} products");

    Ok(())
}

async fn insert_category(pool: &PgPool, category: &SeedCategory) -> Result<u32, sqlx::Error> {
    let result = sqlx::query(
        r"
        INSERT INTO categories (slug, name, description, icon)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (slug) DO NOTHING
        ",
    )
    .bind(category.slug)
    .bind(category.name)
    .bind(category.description)
    .bind(category.icon)
    .execute(pool)
    .await?;

    Ok(u32::try_from(result.rows_affected()).unwrap_or(0))
}

async fn insert_product(pool: &PgPool, product: &SeedProduct) -> Result<u32, sqlx::Error> {
    let result = sqlx::query(
        r"
        INSERT INTO products
            (name, slug, description, price, stock_quantity, category_id,
             is_featured, variants, metadata)
        VALUES
            ($1, $2, $3, $4, $5,
             (SELECT id FROM categories WHERE slug = $6),
             $7, $8, $9)
        ON CONFLICT (slug) DO NOTHING
        ",
    )
    .bind(product.name)
    .bind(product.slug)
    .bind(product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.category)
    .bind(product.featured)
    .bind(json!([]))
    .bind(json!({}))
    .execute(pool)
    .await?;

    Ok(u32::try_from(result.rows_affected()).unwrap_or(0))
}
