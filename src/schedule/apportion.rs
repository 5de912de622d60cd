use crate::core::document::PayableDocument;
use crate::core::money::{percent_of, RoundingPolicy};
use crate::core::obligation::Obligation;
use crate::core::term::{validate_stages, PaymentTermStage};
use crate::error::{Result, SettlementError};
use crate::schedule::due_date::resolve_due_date;
use log::debug;

/// Splits a document total into one obligation per payment-term stage.
pub struct Apportioner;

impl Apportioner {
    /// Apportion `document.total_amount` across `stages`.
    ///
    /// # Algorithm
    ///
    /// 1. Validate the stages again (non-empty, sum to 100). Terms are checked
    ///    when defined, but stages may arrive from anywhere.
    /// 2. Every stage but the last gets `round(total * pct / 100)` under
    ///    `rounding`, capped at what is still undistributed.
    /// 3. The last stage gets `total - sum(previous)`, so the amounts always
    ///    sum to the total exactly.
    /// 4. Each due date is the stage's anchor plus its offset, or `None` when
    ///    the anchor is unknown.
    ///
    /// Sort order follows stage order. On tiny totals the cap can leave later
    /// stages at zero, but no stage is ever negative.
    pub fn apportion(
        document: &PayableDocument,
        stages: &[PaymentTermStage],
        rounding: RoundingPolicy,
    ) -> Result<Vec<Obligation>> {
        validate_stages(stages)?;
        let total = document.total_amount;
        if total < 0 {
            return Err(SettlementError::InvalidAmount {
                reason: format!("document total must not be negative, got {total}"),
            });
        }

        let last = stages.len() - 1;
        let mut distributed: i64 = 0;
        let mut obligations = Vec::with_capacity(stages.len());

        for (i, stage) in stages.iter().enumerate() {
            let remaining = total - distributed;
            let amount = if i == last {
                remaining
            } else {
                percent_of(total, stage.percentage, rounding)?.min(remaining)
            };

            let condition = stage.due_condition();
            let label = stage
                .label
                .clone()
                .unwrap_or_else(|| format!("Stage {} ({}%)", i + 1, stage.percentage));

            obligations.push(
                Obligation::new(
                    document.reference.clone(),
                    label,
                    stage.percentage,
                    amount,
                    document.currency.clone(),
                )
                .with_stage(i, condition)
                .with_due_date(resolve_due_date(&document.anchors, condition))
                .with_blocking(stage.is_blocking)
                .with_sort_order(i as u32),
            );
            distributed += amount;
        }

        debug!(
            "apportioned {} {} of {} into {} stages",
            total,
            document.currency,
            document.reference,
            obligations.len()
        );
        Ok(obligations)
    }
}
