use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds half-up at the cent boundary and always carries two decimal places,
/// so `10` becomes `10.00` and `12.745` becomes `12.75`.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// True when the value is a non-negative amount with at most two decimal places.
pub fn is_currency(value: &Decimal) -> bool {
    !value.is_sign_negative() && value.normalize().scale() <= 2
}
