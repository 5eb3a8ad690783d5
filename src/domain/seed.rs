//! Sample users and products for a fresh development database.

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use crate::domain::{
    catalog::{ProductInput, create_product},
    user::{Role, hash_password, insert_user},
};

struct SampleProduct {
    name: &'static str,
    slug: &'static str,
    category: &'static str,
    brand: &'static str,
    price_cents: i64,
    stock: i32,
    is_featured: bool,
}

const SAMPLE_PRODUCTS: [SampleProduct; 6] = [
    SampleProduct {
        name: "Polo Sporting Stretch Shirt",
        slug: "polo-sporting-stretch-shirt",
        category: "Men's Dress Shirts",
        brand: "Polo",
        price_cents: 5999,
        stock: 5,
        is_featured: true,
    },
    SampleProduct {
        name: "Brooks Brothers Long Sleeved Shirt",
        slug: "brooks-brothers-long-sleeved-shirt",
        category: "Men's Dress Shirts",
        brand: "Brooks Brothers",
        price_cents: 8599,
        stock: 10,
        is_featured: true,
    },
    SampleProduct {
        name: "Tommy Hilfiger Classic Fit Dress Shirt",
        slug: "tommy-hilfiger-classic-fit-dress-shirt",
        category: "Men's Dress Shirts",
        brand: "Tommy Hilfiger",
        price_cents: 9999,
        stock: 0,
        is_featured: false,
    },
    SampleProduct {
        name: "Calvin Klein Slim Fit Stretch Shirt",
        slug: "calvin-klein-slim-fit-stretch-shirt",
        category: "Men's Dress Shirts",
        brand: "Calvin Klein",
        price_cents: 3999,
        stock: 10,
        is_featured: false,
    },
    SampleProduct {
        name: "Polo Ralph Lauren Oxford Shirt",
        slug: "polo-ralph-lauren-oxford-shirt",
        category: "Men's Dress Shirts",
        brand: "Polo",
        price_cents: 7999,
        stock: 8,
        is_featured: false,
    },
    SampleProduct {
        name: "Polo Classic Pink Hoodie",
        slug: "polo-classic-pink-hoodie",
        category: "Men's Sweatshirts",
        brand: "Polo",
        price_cents: 9999,
        stock: 12,
        is_featured: false,
    },
];

/// Does nothing once any user exists.
pub async fn seed_sample_data(pool: &PgPool) -> Result<(), anyhow::Error> {
    let users: i64 = sqlx::query_scalar("SELECT count(*) FROM users")
        .fetch_one(pool)
        .await
        .context("Problem counting users.")?;
    if users > 0 {
        info!("Database already has users, skipping sample data");
        return Ok(());
    }

    let password_hash = hash_password("123456")?;
    insert_user(pool, "Admin", "admin@example.com", &password_hash, Role::Admin).await?;
    insert_user(pool, "Jane", "user@example.com", &password_hash, Role::User).await?;

    for (index, sample) in SAMPLE_PRODUCTS.iter().enumerate() {
        let number = index + 1;
        create_product(
            pool,
            ProductInput {
                name: sample.name.to_owned(),
                slug: sample.slug.to_owned(),
                category: sample.category.to_owned(),
                brand: sample.brand.to_owned(),
                description: format!("{} by {}", sample.name, sample.brand),
                stock: sample.stock,
                images: vec![
                    format!("/images/sample-products/p{number}-1.jpg"),
                    format!("/images/sample-products/p{number}-2.jpg"),
                ],
                is_featured: sample.is_featured,
                banner: sample
                    .is_featured
                    .then(|| format!("banner-{number}.jpg")),
                price: Decimal::new(sample.price_cents, 2),
            },
        )
        .await?;
    }

    info!(
        "Seeded 2 users and {} products",
        SAMPLE_PRODUCTS.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::featured_products;

    #[sqlx::test]
    async fn seeding_twice_inserts_once(pool: PgPool) {
        seed_sample_data(&pool).await.expect("Seeding should succeed.");
        seed_sample_data(&pool).await.expect("Seeding again should succeed.");

        let products: i64 = sqlx::query_scalar("SELECT count(*) FROM products")
            .fetch_one(&pool)
            .await
            .expect("Query should succeed.");
        assert_eq!(products, SAMPLE_PRODUCTS.len() as i64);

        let featured = featured_products(&pool).await.expect("Query should succeed.");
        assert_eq!(featured.len(), 2);
    }
}
