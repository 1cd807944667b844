//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

/// Money amount in centavos to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money {
    /// Amount in centavos (e.g. 150000 = ₱1500.00).
    cents: i64,
}

impl Money {
    /// Creates a money amount from centavos.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a money amount from whole pesos.
    pub fn from_pesos(pesos: i64) -> Self {
        Self { cents: pesos * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in centavos.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-peso portion.
    pub fn pesos(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the centavo portion (remainder after whole pesos).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-₱{}.{:02}", self.pesos().abs(), self.cents_part())
        } else {
            write!(f, "₱{}.{:02}", self.pesos(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A line item in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Human-readable product name.
    pub name: String,

    /// Quantity ordered; always positive.
    pub quantity: u32,

    /// Price per unit.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(name: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity × unit price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
