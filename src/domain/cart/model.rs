//! The cart and its line items.
//!
//! Mutations happen on the in-memory [`Cart`] and always reprice it, so the four money fields
//! written back to the `carts` table are never stale.

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{PgConnection, types::Json};

use crate::{
    domain::{
        CartId, ProductId, SessionCartId, UserId,
        catalog::Product,
        pricing::{PricedLine, Prices},
    },
    infra::CartContext,
};

use super::CartError;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub quantity: u32,
    pub price: Decimal,
    pub image: String,
}

impl PricedLine for CartItem {
    fn unit_price(&self) -> Decimal {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOwner {
    User(UserId),
    Session(SessionCartId),
}

impl CartOwner {
    /// A signed-in user owns the cart; otherwise the anonymous session does.
    pub fn from_context(context: &CartContext) -> Result<Self, CartError> {
        match (context.user_id(), context.session_cart_id) {
            (Some(user_id), _) => Ok(CartOwner::User(user_id)),
            (None, Some(session_cart_id)) => Ok(CartOwner::Session(session_cart_id)),
            (None, None) => Err(CartError::NoCartSession),
        }
    }

    /// The `(session_cart_id, user_id)` column pair; exactly one is set.
    fn columns(self) -> (Option<SessionCartId>, Option<UserId>) {
        match self {
            CartOwner::User(user_id) => (None, Some(user_id)),
            CartOwner::Session(session_cart_id) => (Some(session_cart_id), None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    Added,
    Increased,
    Decreased,
    Removed,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub cart_id: CartId,
    #[serde(skip)]
    pub owner: CartOwner,
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub prices: Prices,
}

impl Cart {
    pub fn new(owner: CartOwner) -> Self {
        Cart {
            cart_id: CartId::new(),
            owner,
            items: Vec::new(),
            prices: Prices::zero(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Adds one unit of the product, checking the stock for the resulting quantity.
    pub fn add_item(&mut self, product: &Product) -> Result<LineChange, CartError> {
        let stock = i64::from(product.stock);
        let change = match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.product_id)
        {
            Some(existing) => {
                if stock < i64::from(existing.quantity) + 1 {
                    return Err(CartError::InsufficientStock);
                }
                existing.quantity += 1;
                LineChange::Increased
            }
            None => {
                if stock < 1 {
                    return Err(CartError::InsufficientStock);
                }
                self.items.push(CartItem {
                    product_id: product.product_id,
                    name: product.name.clone(),
                    slug: product.slug.clone(),
                    quantity: 1,
                    price: product.price,
                    image: product.thumbnail().to_owned(),
                });
                LineChange::Added
            }
        };
        self.reprice();
        Ok(change)
    }

    /// Removes one unit; the line disappears when its quantity reaches zero.
    pub fn remove_item(&mut self, product_id: ProductId) -> Result<LineChange, CartError> {
        let position = self
            .items
            .iter()
            .position(|item| item.product_id == product_id)
            .ok_or(CartError::ItemNotFound)?;

        let change = if self.items[position].quantity <= 1 {
            self.items.remove(position);
            LineChange::Removed
        } else {
            self.items[position].quantity -= 1;
            LineChange::Decreased
        };
        self.reprice();
        Ok(change)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.reprice();
    }

    fn reprice(&mut self) {
        self.items.retain(|item| item.quantity > 0);
        self.prices = Prices::for_lines(&self.items);
    }
}

//-------------------------- SQL -------------------------------

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    cart_id: CartId,
    session_cart_id: Option<SessionCartId>,
    user_id: Option<UserId>,
    items: Json<Vec<CartItem>>,
    items_price: Decimal,
    shipping_price: Decimal,
    tax_price: Decimal,
    total_price: Decimal,
}

impl TryFrom<CartRow> for Cart {
    type Error = anyhow::Error;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let owner = match (row.user_id, row.session_cart_id) {
            (Some(user_id), _) => CartOwner::User(user_id),
            (None, Some(session_cart_id)) => CartOwner::Session(session_cart_id),
            (None, None) => anyhow::bail!("Cart {} has no owner.", row.cart_id),
        };
        Ok(Cart {
            cart_id: row.cart_id,
            owner,
            items: row.items.0,
            prices: Prices {
                items_price: row.items_price,
                shipping_price: row.shipping_price,
                tax_price: row.tax_price,
                total_price: row.total_price,
            },
        })
    }
}

const CART_COLUMNS: &str = "cart_id, session_cart_id, user_id, items, items_price, \
     shipping_price, tax_price, total_price";

/// Loads the owner's cart. With `lock` the row stays locked until the transaction ends.
pub async fn load_cart(
    conn: &mut PgConnection,
    owner: CartOwner,
    lock: bool,
) -> Result<Option<Cart>, anyhow::Error> {
    let suffix = if lock { " FOR UPDATE" } else { "" };
    let query = match owner {
        CartOwner::User(user_id) => sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1{suffix}"
        ))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await,
        CartOwner::Session(session_cart_id) => sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE session_cart_id = $1{suffix}"
        ))
        .bind(session_cart_id)
        .fetch_optional(&mut *conn)
        .await,
    };
    query
        .with_context(|| format!("Problem loading cart for {owner:?}."))?
        .map(Cart::try_from)
        .transpose()
}

/// Loads and locks the owner's cart, creating an empty one if there is none yet. Concurrent
/// first calls for the same owner wait on the owner's unique key instead of racing.
pub async fn open_cart(conn: &mut PgConnection, owner: CartOwner) -> Result<Cart, anyhow::Error> {
    let (session_cart_id, user_id) = owner.columns();
    sqlx::query(
        "INSERT INTO carts (cart_id, session_cart_id, user_id) VALUES ($1, $2, $3)
         ON CONFLICT DO NOTHING",
    )
    .bind(CartId::new())
    .bind(session_cart_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Problem opening cart for {owner:?}."))?;

    load_cart(conn, owner, true)
        .await?
        .with_context(|| format!("Cart for {owner:?} is missing after being opened."))
}

/// Inserts or overwrites the cart with its current items and prices.
pub async fn save_cart(conn: &mut PgConnection, cart: &Cart) -> Result<(), anyhow::Error> {
    let (session_cart_id, user_id) = cart.owner.columns();
    sqlx::query(
        "INSERT INTO carts
            (cart_id, session_cart_id, user_id, items, items_price, shipping_price, tax_price,
             total_price)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (cart_id) DO UPDATE SET
            items = EXCLUDED.items,
            items_price = EXCLUDED.items_price,
            shipping_price = EXCLUDED.shipping_price,
            tax_price = EXCLUDED.tax_price,
            total_price = EXCLUDED.total_price,
            updated_at = now()",
    )
    .bind(cart.cart_id)
    .bind(session_cart_id)
    .bind(user_id)
    .bind(Json(&cart.items))
    .bind(cart.prices.items_price)
    .bind(cart.prices.shipping_price)
    .bind(cart.prices.tax_price)
    .bind(cart.prices.total_price)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Problem saving cart {}.", cart.cart_id))?;
    Ok(())
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use fake::{Fake, Faker};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::infra::SessionUser;

    fn product(price: Decimal, stock: i32) -> Product {
        Product {
            price,
            stock,
            ..Faker.fake()
        }
    }

    fn session_cart() -> Cart {
        Cart::new(CartOwner::Session(SessionCartId::new()))
    }

    #[test]
    fn adding_the_same_product_twice_increments_the_line() {
        let shirt = product(dec!(30.00), 5);
        let mut cart = session_cart();

        assert_eq!(cart.add_item(&shirt), Ok(LineChange::Added));
        assert_eq!(cart.add_item(&shirt), Ok(LineChange::Increased));

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.prices.items_price, dec!(60.00));
    }

    #[test]
    fn adding_beyond_the_stock_is_rejected() {
        let scarf = product(dec!(12.00), 1);
        let mut cart = session_cart();
        cart.add_item(&scarf).expect("First unit is in stock.");

        assert_eq!(cart.add_item(&scarf), Err(CartError::InsufficientStock));
        assert_eq!(cart.items[0].quantity, 1);
    }

    #[test]
    fn out_of_stock_products_cannot_be_added() {
        let mut cart = session_cart();
        assert_eq!(
            cart.add_item(&product(dec!(5.00), 0)),
            Err(CartError::InsufficientStock)
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn removing_the_last_unit_deletes_the_line() {
        let shirt = product(dec!(30.00), 5);
        let mut cart = session_cart();
        cart.add_item(&shirt).expect("Shirt is in stock.");
        cart.add_item(&shirt).expect("Shirt is in stock.");

        assert_eq!(cart.remove_item(shirt.product_id), Ok(LineChange::Decreased));
        assert_eq!(cart.remove_item(shirt.product_id), Ok(LineChange::Removed));
        assert!(cart.is_empty());
        assert_eq!(cart.prices, Prices::zero());
    }

    #[test]
    fn removing_an_absent_product_fails() {
        let mut cart = session_cart();
        assert_eq!(
            cart.remove_item(ProductId::new()),
            Err(CartError::ItemNotFound)
        );
    }

    #[test]
    fn cart_prices_follow_the_items() {
        let mut cart = session_cart();
        let shirt = product(dec!(30.00), 5);
        let hat = product(dec!(25.00), 5);
        cart.add_item(&shirt).expect("Shirt is in stock.");
        cart.add_item(&shirt).expect("Shirt is in stock.");
        cart.add_item(&hat).expect("Hat is in stock.");

        assert_eq!(
            cart.prices,
            Prices {
                items_price: dec!(85.00),
                shipping_price: dec!(10.00),
                tax_price: dec!(12.75),
                total_price: dec!(107.75),
            }
        );

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.prices, Prices::zero());
    }

    #[test]
    fn signed_in_users_own_their_cart() {
        let user_id = UserId::new();
        let context = CartContext {
            session_cart_id: Some(SessionCartId::new()),
            user: Some(SessionUser {
                user_id,
                role: crate::domain::user::Role::User,
            }),
        };
        assert_eq!(CartOwner::from_context(&context), Ok(CartOwner::User(user_id)));
        assert_eq!(
            CartOwner::from_context(&CartContext::default()),
            Err(CartError::NoCartSession)
        );
    }
}
