use crate::core::money::MINOR_UNIT_SCALE;
use crate::error::{Result, SettlementError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// ISO 4217-style currency code.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::currency::CurrencyCode;
///
/// let usd = CurrencyCode::new("USD");
/// let eur = CurrencyCode::new("EUR");
/// assert_ne!(usd, eur);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Currency metadata.
///
/// `decimal_places` is the display precision. Stored amounts always use
/// [`MINOR_UNIT_SCALE`], so a currency may not declare more places than that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub decimal_places: u32,
    #[serde(default)]
    pub is_base: bool,
}

impl Currency {
    pub fn new(code: impl Into<String>, decimal_places: u32) -> Self {
        Self {
            code: CurrencyCode::new(code),
            decimal_places,
            is_base: false,
        }
    }

    /// Mark this currency as the system base currency.
    pub fn base(mut self) -> Self {
        self.is_base = true;
        self
    }
}

/// The set of currencies known to the engine.
///
/// Exactly one registered currency is the base currency. Currencies are
/// append-only: once registered they are never edited, because monetary data
/// may already reference them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrencyRegistry {
    currencies: BTreeMap<CurrencyCode, Currency>,
}

impl CurrencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list, enforcing uniqueness and a single base.
    pub fn from_currencies(currencies: impl IntoIterator<Item = Currency>) -> Result<Self> {
        let mut registry = Self::new();
        for currency in currencies {
            registry.register(currency)?;
        }
        if registry.base().is_none() {
            return Err(SettlementError::InvalidCurrency {
                reason: "no base currency configured".into(),
            });
        }
        Ok(registry)
    }

    pub fn register(&mut self, currency: Currency) -> Result<()> {
        if self.currencies.contains_key(&currency.code) {
            return Err(SettlementError::InvalidCurrency {
                reason: format!("currency {} is already registered", currency.code),
            });
        }
        if currency.decimal_places > MINOR_UNIT_SCALE {
            return Err(SettlementError::InvalidCurrency {
                reason: format!(
                    "currency {} declares {} decimal places, maximum is {}",
                    currency.code, currency.decimal_places, MINOR_UNIT_SCALE
                ),
            });
        }
        if currency.is_base {
            if let Some(existing) = self.base() {
                return Err(SettlementError::InvalidCurrency {
                    reason: format!(
                        "{} cannot be base currency, {} already is",
                        currency.code, existing.code
                    ),
                });
            }
        }
        self.currencies.insert(currency.code.clone(), currency);
        Ok(())
    }

    pub fn get(&self, code: &CurrencyCode) -> Option<&Currency> {
        self.currencies.get(code)
    }

    /// Look up a currency, failing with `UnknownCurrency`.
    pub fn require(&self, code: &CurrencyCode) -> Result<&Currency> {
        self.get(code)
            .ok_or_else(|| SettlementError::UnknownCurrency { code: code.clone() })
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.currencies.contains_key(code)
    }

    pub fn base(&self) -> Option<&Currency> {
        self.currencies.values().find(|c| c.is_base)
    }

    pub fn codes(&self) -> impl Iterator<Item = &CurrencyCode> {
        self.currencies.keys()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}
