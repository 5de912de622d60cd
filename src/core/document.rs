use crate::core::currency::CurrencyCode;
use crate::core::term::CalculationBase;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the business a payable document sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    /// Money owed to us (sales order, customer invoice).
    Receivable,
    /// Money we owe (purchase order, supplier invoice).
    Payable,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Receivable => write!(f, "receivable"),
            DocumentKind::Payable => write!(f, "payable"),
        }
    }
}

/// Tagged reference to an externally owned document.
///
/// The engine never inspects the document itself; the kind only decides
/// whether settled money is reported as received or paid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: String,
}

impl DocumentRef {
    pub fn receivable(id: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Receivable,
            id: id.into(),
        }
    }

    pub fn payable(id: impl Into<String>) -> Self {
        Self {
            kind: DocumentKind::Payable,
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Reference dates a payment-term stage can be anchored on.
///
/// Any of them may still be unknown (e.g. the shipment has no ETD yet), in
/// which case stages anchored on it get no due date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorDates {
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub shipment_etd: Option<NaiveDate>,
    #[serde(default)]
    pub shipment_eta: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
}

impl AnchorDates {
    /// The anchor selected by a calculation base, if known.
    pub fn resolve(&self, base: CalculationBase) -> Option<NaiveDate> {
        match base {
            CalculationBase::OrderDate => self.order_date,
            CalculationBase::IssueDate => self.issue_date,
            CalculationBase::BeforeShipment | CalculationBase::AfterShipment => {
                self.shipment_etd
            }
            CalculationBase::OnArrival => self.shipment_eta,
            CalculationBase::AfterDelivery => self.delivery_date,
        }
    }
}

/// The numeric view of a receivable or payable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayableDocument {
    pub reference: DocumentRef,
    /// Document total in minor units.
    pub total_amount: i64,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub anchors: AnchorDates,
}

impl PayableDocument {
    pub fn new(reference: DocumentRef, total_amount: i64, currency: CurrencyCode) -> Self {
        Self {
            reference,
            total_amount,
            currency,
            anchors: AnchorDates::default(),
        }
    }

    pub fn with_anchors(mut self, anchors: AnchorDates) -> Self {
        self.anchors = anchors;
        self
    }
}
