//! Cart pricing.
//!
//! The four money fields of a cart are a pure function of its line items. They are
//! recomputed on every mutation and copied onto an order when it is placed.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::helpers::money::round2;

pub const FREE_SHIPPING_THRESHOLD: Decimal = dec!(100.00);
pub const FLAT_SHIPPING_PRICE: Decimal = dec!(10.00);
pub const TAX_RATE: Decimal = dec!(0.15);

/// Anything that contributes `unit_price × quantity` to a cart total.
pub trait PricedLine {
    fn unit_price(&self) -> Decimal;
    fn quantity(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prices {
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
}

impl Default for Prices {
    fn default() -> Self {
        Self::zero()
    }
}

impl Prices {
    /// All four fields at `0.00`, the prices of an emptied cart.
    pub fn zero() -> Self {
        let zero = round2(Decimal::ZERO);
        Self {
            items_price: zero,
            shipping_price: zero,
            tax_price: zero,
            total_price: zero,
        }
    }

    /// An empty cart is free of shipping as well, so clearing a cart and pricing an
    /// empty item list agree.
    pub fn for_lines<L: PricedLine>(lines: &[L]) -> Self {
        if lines.iter().all(|line| line.quantity() == 0) {
            return Self::zero();
        }

        let items_price = round2(
            lines
                .iter()
                .map(|line| line.unit_price() * Decimal::from(line.quantity()))
                .sum(),
        );
        let shipping_price = if items_price < FREE_SHIPPING_THRESHOLD {
            FLAT_SHIPPING_PRICE
        } else {
            Decimal::ZERO
        };
        let shipping_price = round2(shipping_price);
        let tax_price = round2(items_price * TAX_RATE);
        let total_price = round2(items_price + shipping_price + tax_price);

        Self {
            items_price,
            shipping_price,
            tax_price,
            total_price,
        }
    }
}

//-------------------------- Tests -------------------------------
