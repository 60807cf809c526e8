use serde::Serialize;
use utoipa::ToSchema;

use super::aggregate::DayCounts;
use crate::model::identity::Identity;

/// Fixed proration base: every month is treated as 30 days.
pub const PRORATION_DAYS: f64 = 30.0;
/// Workday length backing the hourly rate; overtime itself is not computed
/// yet, the rate is carried for the future hourly computation.
pub const WORKDAY_HOURS: f64 = 8.0;

const EPF_RATE: f64 = 0.12;
const ESIC_RATE: f64 = 0.0075;

/// Salary-component configuration read off an identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SalaryProfile {
    pub basic_salary: f64,
    pub special_allowance: f64,
    pub conveyance: f64,
    pub epf: bool,
    pub esic: bool,
    pub paid_leaves: u32,
}

impl From<&Identity> for SalaryProfile {
    fn from(identity: &Identity) -> Self {
        Self {
            basic_salary: identity.basic_salary,
            special_allowance: identity.special_allowance,
            conveyance: identity.conveyance,
            epf: identity.epf,
            esic: identity.esic,
            paid_leaves: identity.paid_leaves,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalaryBreakdown {
    pub payable_days: f64,
    pub remaining_paid_leaves: u32,

    pub prorated_basic: f64,
    pub prorated_special_allowance: f64,
    pub prorated_conveyance: f64,
    pub overtime: f64,

    pub gross_salary: f64,
    pub deductions: f64,
    pub net_salary: f64,
}

/// Round half-up to 2 decimals, the contract for every currency output.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Prorate salary components from payable days and apply statutory
/// deductions. EPF is 12% of prorated basic, ESIC 0.75% of gross, each
/// only when the identity carries the flag.
pub fn compute_salary(profile: &SalaryProfile, counts: &DayCounts) -> SalaryBreakdown {
    let payable_days = counts.payable_days();

    let prorated_basic = profile.basic_salary / PRORATION_DAYS * payable_days;
    let prorated_special_allowance = profile.special_allowance / PRORATION_DAYS * payable_days;
    let prorated_conveyance = profile.conveyance / PRORATION_DAYS * payable_days;

    // Overtime stub: the hourly rate is defined but no hours are tracked.
    let _hourly_rate = profile.basic_salary / PRORATION_DAYS / WORKDAY_HOURS;
    let overtime_pay = 0.0;

    let gross_salary =
        prorated_basic + prorated_special_allowance + prorated_conveyance + overtime_pay;

    let epf_deduction = if profile.epf {
        prorated_basic * EPF_RATE
    } else {
        0.0
    };
    let esic_deduction = if profile.esic {
        gross_salary * ESIC_RATE
    } else {
        0.0
    };
    let deductions = epf_deduction + esic_deduction;

    let net_salary = gross_salary - deductions;

    let leave_days_used = counts.absent_days + counts.half_days;
    let remaining_paid_leaves = profile.paid_leaves.saturating_sub(leave_days_used);

    SalaryBreakdown {
        payable_days,
        remaining_paid_leaves,
        prorated_basic: round2(prorated_basic),
        prorated_special_allowance: round2(prorated_special_allowance),
        prorated_conveyance: round2(prorated_conveyance),
        overtime: round2(overtime_pay),
        gross_salary: round2(gross_salary),
        deductions: round2(deductions),
        net_salary: round2(net_salary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counts(present: u32, half: u32, absent: u32) -> DayCounts {
        DayCounts {
            present_days: present,
            half_days: half,
            absent_days: absent,
            late_markings: 0,
        }
    }

    #[test]
    fn prorates_and_deducts_epf() {
        // 20 present + 2 half = 21 payable days on a 30-day base.
        let profile = SalaryProfile {
            basic_salary: 30000.0,
            special_allowance: 3000.0,
            conveyance: 1000.0,
            epf: true,
            esic: false,
            paid_leaves: 0,
        };

        let breakdown = compute_salary(&profile, &counts(20, 2, 0));

        assert_eq!(breakdown.payable_days, 21.0);
        assert_eq!(breakdown.prorated_basic, 21000.00);
        assert_eq!(breakdown.prorated_special_allowance, 2100.00);
        assert_eq!(breakdown.prorated_conveyance, 700.00);
        assert_eq!(breakdown.gross_salary, 23800.00);
        assert_eq!(breakdown.deductions, 2520.00); // 12% of prorated basic
        assert_eq!(breakdown.net_salary, 21280.00);
        assert_eq!(breakdown.overtime, 0.0);
    }

    #[test]
    fn esic_comes_off_gross() {
        let profile = SalaryProfile {
            basic_salary: 30000.0,
            epf: false,
            esic: true,
            ..Default::default()
        };

        let breakdown = compute_salary(&profile, &counts(30, 0, 0));

        assert_eq!(breakdown.gross_salary, 30000.00);
        assert_eq!(breakdown.deductions, 225.00); // 0.75% of gross
        assert_eq!(breakdown.net_salary, 29775.00);
    }

    #[test]
    fn no_flags_means_no_deductions() {
        let profile = SalaryProfile {
            basic_salary: 15000.0,
            ..Default::default()
        };

        let breakdown = compute_salary(&profile, &counts(15, 0, 0));

        assert_eq!(breakdown.deductions, 0.0);
        assert_eq!(breakdown.net_salary, breakdown.gross_salary);
    }

    #[test]
    fn unset_components_default_to_zero() {
        let breakdown = compute_salary(&SalaryProfile::default(), &counts(20, 0, 0));

        assert_eq!(breakdown.gross_salary, 0.0);
        assert_eq!(breakdown.net_salary, 0.0);
    }

    #[test]
    fn paid_leaves_consumed_by_absences_and_half_days() {
        let profile = SalaryProfile {
            paid_leaves: 4,
            ..Default::default()
        };

        assert_eq!(
            compute_salary(&profile, &counts(10, 1, 2)).remaining_paid_leaves,
            1
        );
        // Never goes negative.
        assert_eq!(
            compute_salary(&profile, &counts(10, 3, 4)).remaining_paid_leaves,
            0
        );
    }

    #[test]
    fn currency_rounds_half_up() {
        let profile = SalaryProfile {
            basic_salary: 10000.0,
            ..Default::default()
        };

        // 10000/30*7 = 2333.333... -> 2333.33
        let breakdown = compute_salary(&profile, &counts(7, 0, 0));
        assert_eq!(breakdown.prorated_basic, 2333.33);

        // 10000/30*5.5 = 1833.3333... and with ESIC: 1833.33.. * 0.0075
        let esic_profile = SalaryProfile {
            basic_salary: 10000.0,
            esic: true,
            ..Default::default()
        };
        let b = compute_salary(&esic_profile, &counts(5, 1, 0));
        assert_eq!(b.payable_days, 5.5);
        assert_eq!(b.gross_salary, 1833.33);
        assert_eq!(b.deductions, 13.75); // 1833.333.. * 0.0075 = 13.7499.. -> 13.75
    }
}
