use crate::core::document::AnchorDates;
use crate::core::term::DueCondition;
use chrono::{Duration, NaiveDate};

/// Due date for a timing rule: the selected anchor plus the day offset.
///
/// Returns `None` when the anchor is not known yet, or when the offset would
/// leave chrono's supported date range. An obligation without a due date has
/// no deadline and is never overdue.
pub fn resolve_due_date(anchors: &AnchorDates, condition: DueCondition) -> Option<NaiveDate> {
    let anchor = anchors.resolve(condition.base)?;
    anchor.checked_add_signed(Duration::days(i64::from(condition.days_offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::term::CalculationBase;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_offset_after_anchor() {
        let anchors = AnchorDates {
            delivery_date: Some(d(2026, 1, 20)),
            ..Default::default()
        };
        let condition = DueCondition {
            base: CalculationBase::AfterDelivery,
            days_offset: 30,
        };
        assert_eq!(resolve_due_date(&anchors, condition), Some(d(2026, 2, 19)));
    }

    #[test]
    fn test_negative_offset() {
        let anchors = AnchorDates {
            shipment_etd: Some(d(2026, 3, 10)),
            ..Default::default()
        };
        let condition = DueCondition {
            base: CalculationBase::BeforeShipment,
            days_offset: -7,
        };
        assert_eq!(resolve_due_date(&anchors, condition), Some(d(2026, 3, 3)));
    }

    #[test]
    fn test_missing_anchor_gives_no_due_date() {
        let condition = DueCondition {
            base: CalculationBase::OnArrival,
            days_offset: 0,
        };
        assert_eq!(resolve_due_date(&AnchorDates::default(), condition), None);
    }
}
