use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clients::CartLine;

/// Totals over a cart snapshot. Shared by the placement workflow and the
/// read-only totals preview so both report the identical amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub total_quantity: i32,
    pub subtotal: Decimal,
}

impl CartTotals {
    pub const ZERO: CartTotals = CartTotals {
        total_quantity: 0,
        subtotal: Decimal::ZERO,
    };
}

/// Computes subtotal and total quantity with exact decimal accumulation.
/// No floating point is involved at any step, so monetary totals carry no
/// rounding drift. An empty slice yields (0, 0).
pub fn cart_totals(lines: &[CartLine]) -> CartTotals {
    let mut totals = CartTotals::ZERO;
    for line in lines {
        totals.subtotal += line.unit_price * Decimal::from(line.quantity);
        totals.total_quantity += line.quantity;
    }
    totals
}
