use std::collections::HashMap;
use std::str::FromStr;

use crate::model::attendance::AttendanceStatus;

/// Per-employee counts over a ledger date range.
///
/// `present_days` counts only on-time Present markings; late arrivals are
/// reported under `late_markings` and do not contribute to payable days.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DayCounts {
    pub present_days: u32,
    pub absent_days: u32,
    pub half_days: u32,
    pub late_markings: u32,
}

impl DayCounts {
    /// Present-day-equivalent count used as the salary proration basis.
    pub fn payable_days(&self) -> f64 {
        self.present_days as f64 + 0.5 * self.half_days as f64
    }
}

/// A fetched ledger row, already scoped to the requested date range.
pub struct LedgerRow {
    pub employee_id: u64,
    pub status: String,
    pub is_late: bool,
}

/// Reduce ledger rows into per-employee counts. Pure: the ledger is sparse
/// and missing days are simply not aggregated — employees without rows get
/// no entry here (callers union with the employee list for zero rows).
pub fn aggregate(rows: &[LedgerRow]) -> HashMap<u64, DayCounts> {
    let mut out: HashMap<u64, DayCounts> = HashMap::new();

    for row in rows {
        let Ok(status) = AttendanceStatus::from_str(&row.status) else {
            continue;
        };

        let counts = out.entry(row.employee_id).or_default();
        match status {
            AttendanceStatus::Present if row.is_late => counts.late_markings += 1,
            AttendanceStatus::Present => counts.present_days += 1,
            AttendanceStatus::Absent => counts.absent_days += 1,
            AttendanceStatus::Halfday => counts.half_days += 1,
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(employee_id: u64, status: &str, is_late: bool) -> LedgerRow {
        LedgerRow {
            employee_id,
            status: status.to_string(),
            is_late,
        }
    }

    #[test]
    fn counts_by_status_and_lateness() {
        let rows = vec![
            row(1, "Present", false),
            row(1, "Present", false),
            row(1, "Present", true),
            row(1, "Absent", false),
            row(1, "Halfday", false),
            row(2, "Present", false),
        ];

        let counts = aggregate(&rows);

        assert_eq!(
            counts[&1],
            DayCounts {
                present_days: 2,
                absent_days: 1,
                half_days: 1,
                late_markings: 1,
            }
        );
        assert_eq!(counts[&2].present_days, 1);
    }

    #[test]
    fn late_present_excluded_from_present_days() {
        let counts = aggregate(&[row(7, "Present", true)]);
        assert_eq!(counts[&7].present_days, 0);
        assert_eq!(counts[&7].late_markings, 1);
        assert_eq!(counts[&7].payable_days(), 0.0);
    }

    #[test]
    fn payable_days_weights_half_days() {
        let counts = aggregate(&[
            row(3, "Present", false),
            row(3, "Halfday", false),
            row(3, "Halfday", false),
        ]);
        assert_eq!(counts[&3].payable_days(), 2.0);
    }

    #[test]
    fn no_rows_means_no_entry_not_an_error() {
        let counts = aggregate(&[]);
        assert!(counts.is_empty());
        assert_eq!(DayCounts::default().payable_days(), 0.0);
    }

    #[test]
    fn pure_and_idempotent_over_same_input() {
        let rows = vec![row(1, "Present", false), row(1, "Absent", false)];
        assert_eq!(aggregate(&rows), aggregate(&rows));
    }
}
