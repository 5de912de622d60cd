use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the counterparty on the other side of a payment.
///
/// Customers and suppliers live in the surrounding CRM; the engine only keeps
/// the opaque identifier so payments can be traced back.
///
/// # Examples
///
/// ```
/// use settlement_engine::core::party::CounterpartyId;
///
/// let customer = CounterpartyId::new("CUST-0042");
/// let supplier = CounterpartyId::new("SUP-0007");
/// assert_ne!(customer, supplier);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterpartyId(String);

impl CounterpartyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CounterpartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CounterpartyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
