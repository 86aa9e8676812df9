//! Per-order financial record: costs, derived profit, payment status.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flowgic_core::{DomainError, DomainResult};

/// Upper bound accepted for any money or distance input.
pub(crate) fn max_amount() -> Decimal {
    Decimal::from(1_000_000_000_000i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl PaymentStatus {
    pub fn code(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::PartiallyPaid => "Partially paid",
            PaymentStatus::Paid => "Paid",
        }
    }
}

/// Financial record, at most one per order.
///
/// All amounts are non-negative with two decimal places. `profit` is never
/// stored; it is derived from the cost figures on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Financial {
    /// Revenue: what the client pays for the job.
    pub client_cost: Decimal,
    pub fuel_expenses: Decimal,
    pub driver_cost: Decimal,
    pub third_party_cost: Decimal,
    pub payment_status: PaymentStatus,
    pub partial_amount: Option<Decimal>,
}

impl Financial {
    /// A fresh, unpaid record.
    pub fn open(client_cost: Decimal, fuel_expenses: Decimal) -> Self {
        Self {
            client_cost,
            fuel_expenses,
            driver_cost: Decimal::ZERO,
            third_party_cost: Decimal::ZERO,
            payment_status: PaymentStatus::Unpaid,
            partial_amount: None,
        }
    }

    pub fn profit(&self) -> Decimal {
        profit(
            self.client_cost,
            self.fuel_expenses,
            self.driver_cost,
            self.third_party_cost,
        )
    }
}

/// `client_cost − fuel − driver − third_party`. May be negative.
pub fn profit(client_cost: Decimal, fuel: Decimal, driver: Decimal, third_party: Decimal) -> Decimal {
    (client_cost - fuel - driver - third_party).round_dp(2)
}

/// Render a money amount with exactly two decimal places.
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Fuel cost estimate used when a financial record is opened without an
/// explicit fuel figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelPolicy {
    pub consumption_l_per_100km: Decimal,
    pub price_per_liter: Decimal,
}

impl Default for FuelPolicy {
    fn default() -> Self {
        Self {
            consumption_l_per_100km: Decimal::from(30),
            price_per_liter: Decimal::from(82),
        }
    }
}

impl FuelPolicy {
    /// Estimated fuel cost for `distance_km`; zero when the distance is
    /// unknown. Fails rather than overflowing for out-of-range inputs.
    pub fn estimate(&self, distance_km: Option<Decimal>) -> DomainResult<Decimal> {
        let km = match distance_km {
            Some(km) if km > Decimal::ZERO => km,
            _ => return Ok(Decimal::ZERO),
        };

        let out_of_range = || DomainError::validation("Fuel estimate out of range");
        let cost = (km / Decimal::ONE_HUNDRED)
            .checked_mul(self.consumption_l_per_100km)
            .and_then(|litres| litres.checked_mul(self.price_per_liter))
            .ok_or_else(out_of_range)?;

        if cost < Decimal::ZERO || cost > max_amount() {
            return Err(out_of_range());
        }
        Ok(cost.round_dp(2))
    }
}

/// Parse a non-negative money (or distance) field submitted by a client.
pub fn parse_amount(field: &str, raw: &str) -> DomainResult<Decimal> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|_| DomainError::validation(format!("Invalid value for {field}")))?;

    if value < Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} must not be negative")));
    }
    if value > max_amount() {
        return Err(DomainError::validation(format!("Invalid value for {field}")));
    }

    Ok(value.round_dp(2))
}

/// Parse a partial payment amount (strictly positive).
pub fn parse_payment_amount(raw: &str) -> DomainResult<Decimal> {
    let value =
        Decimal::from_str(raw.trim()).map_err(|_| DomainError::validation("Invalid amount"))?;

    if value > max_amount() {
        return Err(DomainError::validation("Invalid amount"));
    }
    if value <= Decimal::ZERO {
        return Err(DomainError::validation("Amount must be positive"));
    }

    Ok(value.round_dp(2))
}

/// What a payment update does to the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PaymentAction {
    MarkedAsPaid,
    PartialPayment { amount: Decimal },
}

impl PaymentAction {
    /// Interpret the payment form: `fully_paid=true` wins over `partial_amount`.
    pub fn from_form(fully_paid: Option<&str>, partial_amount: Option<&str>) -> DomainResult<Self> {
        if fully_paid.map(str::trim) == Some("true") {
            return Ok(PaymentAction::MarkedAsPaid);
        }

        match partial_amount.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Ok(PaymentAction::PartialPayment {
                amount: parse_payment_amount(raw)?,
            }),
            None => Err(DomainError::validation("No payment data provided")),
        }
    }

    /// The record after this action.
    pub fn applied_to(&self, financial: &Financial) -> Financial {
        let mut next = financial.clone();
        match self {
            PaymentAction::MarkedAsPaid => {
                next.payment_status = PaymentStatus::Paid;
            }
            PaymentAction::PartialPayment { amount } => {
                next.payment_status = PaymentStatus::PartiallyPaid;
                next.partial_amount = Some(*amount);
            }
        }
        next
    }
}
