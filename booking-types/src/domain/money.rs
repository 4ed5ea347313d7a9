//! Type-safe monetary value with embedded currency.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// Currencies accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    BDT,
    USD,
    EUR,
    GBP,
    INR,
}

impl Currency {
    /// Returns the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::BDT | Currency::USD | Currency::EUR | Currency::GBP | Currency::INR => 2,
        }
    }

    /// Minor units per major unit (100 for every supported currency).
    pub fn minor_units_per_major(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }

    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::BDT => "৳",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::INR => "₹",
        }
    }

    /// Lowercase ISO code as payment gateways expect it.
    pub fn gateway_code(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BDT" => Ok(Currency::BDT),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "INR" => Ok(Currency::INR),
            _ => Err(DomainError::ValidationError(format!(
                "Unsupported currency: {}",
                s
            ))),
        }
    }
}

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (poisha, cents, etc.)
/// to avoid floating-point precision issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value from minor units.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    /// Converts a major-unit decimal (e.g. `500` or `12.5`) to minor units.
    ///
    /// Sub-minor precision is truncated, not rounded.
    pub fn from_major_truncated(major: Decimal, currency: Currency) -> Result<Self, DomainError> {
        if major.is_sign_negative() && !major.is_zero() {
            return Err(DomainError::NegativeAmount);
        }

        let minor = major
            .checked_mul(Decimal::from(currency.minor_units_per_major()))
            .and_then(|scaled| scaled.trunc().to_i64())
            .ok_or_else(|| DomainError::ValidationError(format!("Amount out of range: {}", major)))?;

        Self::new(minor, currency)
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the amount in major units.
    pub fn major(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.decimal_places())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_major = self.currency.minor_units_per_major();
        let major = self.amount / per_major;
        let minor = (self.amount % per_major).abs();
        write!(f, "{}{}.{:02}", self.currency.symbol(), major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_creation() {
        let money = Money::new(1000, Currency::BDT).unwrap();
        assert_eq!(money.amount(), 1000);
        assert_eq!(money.currency(), Currency::BDT);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(-100, Currency::USD);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_from_major_multiplies_by_hundred() {
        let money = Money::from_major_truncated(dec!(500), Currency::BDT).unwrap();
        assert_eq!(money.amount(), 50000);
    }

    #[test]
    fn test_from_major_truncates_sub_minor_precision() {
        let money = Money::from_major_truncated(dec!(19.999), Currency::USD).unwrap();
        assert_eq!(money.amount(), 1999);

        let money = Money::from_major_truncated(dec!(19.99), Currency::USD).unwrap();
        assert_eq!(money.amount(), 1999);
    }

    #[test]
    fn test_from_major_rejects_negative() {
        let result = Money::from_major_truncated(dec!(-1), Currency::BDT);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_from_major_rejects_overflow() {
        let huge: Decimal = "10000000000000000000000000000".parse().unwrap();
        let result = Money::from_major_truncated(huge, Currency::BDT);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));

        // Fits in a Decimal after scaling but not in i64 minor units.
        let result = Money::from_major_truncated(dec!(100000000000000000), Currency::BDT);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_major_divides_by_hundred() {
        let money = Money::new(50000, Currency::BDT).unwrap();
        assert_eq!(money.major(), dec!(500));
    }

    #[test]
    fn test_currency_parsing_is_case_insensitive() {
        assert_eq!("bdt".parse::<Currency>().unwrap(), Currency::BDT);
        assert_eq!(Currency::BDT.gateway_code(), "bdt");
        assert!("xyz".parse::<Currency>().is_err());
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(1050, Currency::USD).unwrap();
        assert_eq!(format!("{}", money), "$10.50");
    }
}
