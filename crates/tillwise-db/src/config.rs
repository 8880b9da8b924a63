//! # Till Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TILLWISE_*`)
//! 2. Defaults (this file)
//!
//! Configuration is read-only after initialization, so no locking.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tillwise_core::{Money, OrderBuilder, PaymentMethod};
use tracing::warn;

use crate::pool::DbConfig;

/// Till configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TillConfig {
    /// SQLite file backing the local store.
    pub database_path: PathBuf,

    /// Store name printed on bills.
    pub store_name: String,

    /// GST registration number, when the outlet has one.
    pub gstin: Option<String>,

    /// Currency symbol (for display).
    pub currency_symbol: String,

    /// Payment method preselected on a fresh order.
    pub default_payment_method: PaymentMethod,
}

impl Default for TillConfig {
    /// ## Default Values
    /// - Database: `tillwise.db` in the working directory
    /// - Store: "Tillwise Café"
    /// - Currency: ₹
    /// - Payment: CASH
    fn default() -> Self {
        TillConfig {
            database_path: PathBuf::from("tillwise.db"),
            store_name: "Tillwise Café".to_string(),
            gstin: None,
            currency_symbol: "₹".to_string(),
            default_payment_method: PaymentMethod::Cash,
        }
    }
}

impl TillConfig {
    /// Creates a TillConfig from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `TILLWISE_DB_PATH`: SQLite file path
    /// - `TILLWISE_STORE_NAME`: store name
    /// - `TILLWISE_GSTIN`: GST registration number
    /// - `TILLWISE_CURRENCY_SYMBOL`: display symbol
    /// - `TILLWISE_DEFAULT_PAYMENT`: `CASH`, `UPI` or `CARD`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Blank values are ignored. An unknown payment method keeps the default
    /// and logs a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TillConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("TILLWISE_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(store_name) = get("TILLWISE_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(gstin) = get("TILLWISE_GSTIN") {
            config.gstin = Some(gstin.trim().to_ascii_uppercase());
        }

        if let Some(symbol) = get("TILLWISE_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(method) = get("TILLWISE_DEFAULT_PAYMENT") {
            match method.parse::<PaymentMethod>() {
                Ok(method) => config.default_payment_method = method,
                Err(e) => warn!(value = %method, error = %e, "Ignoring TILLWISE_DEFAULT_PAYMENT"),
            }
        }

        config
    }

    /// Pool configuration for the configured database file.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
    }

    /// A fresh order with this till's preselected payment method.
    pub fn new_order(&self) -> OrderBuilder {
        OrderBuilder::with_payment_method(self.default_payment_method)
    }

    /// Top lines of a printed bill: the store name, then the GSTIN when set.
    pub fn receipt_header(&self) -> Vec<String> {
        let mut lines = vec![self.store_name.clone()];
        if let Some(gstin) = &self.gstin {
            lines.push(format!("GSTIN: {gstin}"));
        }
        lines
    }

    /// Formats an amount for display with Indian digit grouping.
    ///
    /// ## Example
    /// ```rust
    /// use tillwise_core::Money;
    /// use tillwise_db::TillConfig;
    ///
    /// let config = TillConfig::default();
    /// assert_eq!(config.format_currency(Money::from_paise(123456)), "₹1,234.56");
    /// assert_eq!(config.format_currency(Money::from_paise(12345678)), "₹1,23,456.78");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let paise = amount.paise().unsigned_abs();
        let rupees = (paise / 100).to_string();
        let frac = paise % 100;

        format!(
            "{}{}{}.{:02}",
            if amount.is_negative() { "-" } else { "" },
            self.currency_symbol,
            group_indian(&rupees),
            frac
        )
    }
}

/// Groups the last three digits, then pairs: `1234567` → `12,34,567`.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = TillConfig::from_lookup(|_| None);
        assert_eq!(config.database_path, PathBuf::from("tillwise.db"));
        assert_eq!(config.currency_symbol, "₹");
        assert_eq!(config.default_payment_method, PaymentMethod::Cash);
        assert!(config.gstin.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = TillConfig::from_lookup(lookup(&[
            ("TILLWISE_DB_PATH", "/var/lib/tillwise/till.db"),
            ("TILLWISE_STORE_NAME", "Chai Point"),
            ("TILLWISE_GSTIN", " 29abcde1234f1z5 "),
            ("TILLWISE_DEFAULT_PAYMENT", "upi"),
        ]));

        assert_eq!(
            config.db_config().database_path,
            PathBuf::from("/var/lib/tillwise/till.db")
        );
        assert_eq!(config.store_name, "Chai Point");
        assert_eq!(config.gstin.as_deref(), Some("29ABCDE1234F1Z5"));
        assert_eq!(config.default_payment_method, PaymentMethod::Upi);
    }

    #[test]
    fn test_bad_payment_method_keeps_default() {
        let config = TillConfig::from_lookup(lookup(&[
            ("TILLWISE_DEFAULT_PAYMENT", "CHEQUE"),
            ("TILLWISE_STORE_NAME", "   "),
        ]));
        assert_eq!(config.default_payment_method, PaymentMethod::Cash);
        assert_eq!(config.store_name, "Tillwise Café");
    }

    #[test]
    fn test_new_order_uses_default_payment() {
        let config = TillConfig::from_lookup(lookup(&[("TILLWISE_DEFAULT_PAYMENT", "CARD")]));

        let mut order = config.new_order();
        assert_eq!(order.payment_method(), PaymentMethod::Card);

        order.set_payment_method(PaymentMethod::Cash);
        order.clear();
        assert_eq!(order.payment_method(), PaymentMethod::Card);
    }

    #[test]
    fn test_receipt_header() {
        let unregistered = TillConfig::default();
        assert_eq!(unregistered.receipt_header(), vec!["Tillwise Café".to_string()]);

        let registered = TillConfig::from_lookup(lookup(&[
            ("TILLWISE_STORE_NAME", "Chai Point"),
            ("TILLWISE_GSTIN", "29abcde1234f1z5"),
        ]));
        assert_eq!(
            registered.receipt_header(),
            vec!["Chai Point".to_string(), "GSTIN: 29ABCDE1234F1Z5".to_string()]
        );
    }

    #[test]
    fn test_format_currency() {
        let config = TillConfig::default();
        assert_eq!(config.format_currency(Money::from_paise(0)), "₹0.00");
        assert_eq!(config.format_currency(Money::from_paise(1)), "₹0.01");
        assert_eq!(config.format_currency(Money::from_paise(99900)), "₹999.00");
        assert_eq!(config.format_currency(Money::from_paise(123456)), "₹1,234.56");
        assert_eq!(config.format_currency(Money::from_paise(-123456)), "-₹1,234.56");
        assert_eq!(
            config.format_currency(Money::from_paise(1234567890)),
            "₹1,23,45,678.90"
        );
    }
}
