//! Credit cost of a message.

use rust_decimal::{Decimal, RoundingStrategy};

/// Characters per billing unit.
pub const CHARS_PER_UNIT: u32 = 150;

/// Credits charged per billing unit (0.40).
pub const CREDITS_PER_UNIT: Decimal = Decimal::from_parts(40, 0, 0, false, 2);

/// `round(chars / 150 * 0.40, 2)`, counting Unicode scalar values.
pub fn message_cost(message: &str) -> Decimal {
    let chars = Decimal::from(message.chars().count() as u64);
    (chars * CREDITS_PER_UNIT / Decimal::from(CHARS_PER_UNIT))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
