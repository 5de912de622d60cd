use crate::error::{Result, SettlementError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which anchor date a stage's `days_offset` is counted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationBase {
    OrderDate,
    IssueDate,
    /// Shipment ETD; offsets are usually zero or negative.
    BeforeShipment,
    /// Shipment ETD.
    AfterShipment,
    /// Shipment ETA.
    OnArrival,
    AfterDelivery,
}

impl fmt::Display for CalculationBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalculationBase::OrderDate => "order date",
            CalculationBase::IssueDate => "issue date",
            CalculationBase::BeforeShipment => "before shipment",
            CalculationBase::AfterShipment => "after shipment",
            CalculationBase::OnArrival => "on arrival",
            CalculationBase::AfterDelivery => "after delivery",
        };
        f.write_str(s)
    }
}

/// The timing rule of a stage: an anchor plus a signed day offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueCondition {
    pub base: CalculationBase,
    pub days_offset: i32,
}

impl fmt::Display for DueCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.days_offset {
            0 => write!(f, "{}", self.base),
            d if d > 0 => write!(f, "{} +{}d", self.base, d),
            d => write!(f, "{} {}d", self.base, d),
        }
    }
}

/// One stage of a payment term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTermStage {
    #[serde(default)]
    pub label: Option<String>,
    /// Whole percent of the document total, 0..=100.
    pub percentage: u8,
    #[serde(default)]
    pub days_offset: i32,
    pub calculation_base: CalculationBase,
    /// Workflow gate flag, interpreted by collaborators outside the engine.
    #[serde(default)]
    pub is_blocking: bool,
}

impl PaymentTermStage {
    pub fn new(percentage: u8, calculation_base: CalculationBase, days_offset: i32) -> Self {
        Self {
            label: None,
            percentage,
            days_offset,
            calculation_base,
            is_blocking: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn blocking(mut self) -> Self {
        self.is_blocking = true;
        self
    }

    pub fn due_condition(&self) -> DueCondition {
        DueCondition {
            base: self.calculation_base,
            days_offset: self.days_offset,
        }
    }
}

/// A named, ordered list of stages whose percentages sum to 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerm {
    pub name: String,
    stages: Vec<PaymentTermStage>,
}

impl PaymentTerm {
    /// Define a term, rejecting invalid stage sets with `InvalidTerm`.
    pub fn new(name: impl Into<String>, stages: Vec<PaymentTermStage>) -> Result<Self> {
        validate_stages(&stages)?;
        Ok(Self {
            name: name.into(),
            stages,
        })
    }

    pub fn stages(&self) -> &[PaymentTermStage] {
        &self.stages
    }
}

/// Check that a stage set is non-empty, each percentage is at most 100 and
/// the percentages sum to exactly 100.
pub fn validate_stages(stages: &[PaymentTermStage]) -> Result<()> {
    if stages.is_empty() {
        return Err(SettlementError::InvalidTerm {
            reason: "payment term has no stages".into(),
        });
    }
    if let Some(stage) = stages.iter().find(|s| s.percentage > 100) {
        return Err(SettlementError::InvalidTerm {
            reason: format!("stage percentage {} exceeds 100", stage.percentage),
        });
    }
    let sum: u32 = stages.iter().map(|s| u32::from(s.percentage)).sum();
    if sum != 100 {
        return Err(SettlementError::InvalidTerm {
            reason: format!("stage percentages sum to {sum}, expected 100"),
        });
    }
    Ok(())
}
