use fake::{Dummy, Fake, Faker, faker::lorem::en::Words, rand::seq::IteratorRandom};
use rust_decimal::Decimal;

use crate::domain::{
    ProductId,
    catalog::{Product, ProductInput},
};

/// Prices between 0.10 and 99.99.
pub struct Price;

impl Dummy<Price> for Decimal {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_config: &Price, rng: &mut R) -> Self {
        let value = (10..10_000).choose(rng).unwrap_or(1_999);
        Decimal::new(value, 2)
    }
}

/// A product with a unique slug, a price from [`Price`] and the given stock.
pub struct InStock(pub i32);

impl Dummy<InStock> for ProductInput {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(config: &InStock, rng: &mut R) -> Self {
        let words: Vec<String> = Words(2..4).fake_with_rng(rng);
        let name = words.join(" ");
        let slug = format!("{}-{}", name.replace(' ', "-"), ProductId::new());
        ProductInput {
            name: format!("{name} product"),
            slug,
            category: "Men's Dress Shirts".to_owned(),
            brand: "Polo".to_owned(),
            description: Words(5..10).fake_with_rng::<Vec<String>, R>(rng).join(" "),
            stock: config.0,
            images: vec!["/images/sample-products/p1-1.jpg".to_owned()],
            is_featured: false,
            banner: None,
            price: Price.fake_with_rng(rng),
        }
    }
}

impl Dummy<Faker> for Product {
    fn dummy_with_rng<R: fake::Rng + ?Sized>(_config: &Faker, rng: &mut R) -> Self {
        let input: ProductInput = InStock((0..20).fake_with_rng(rng)).fake_with_rng(rng);
        Product::from_input(ProductId::new(), input)
    }
}
