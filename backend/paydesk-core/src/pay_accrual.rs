// src/pay_accrual.rs
//
// Weekly pay accrual against the monthly attendance threshold.
//
// Cash is paid for every present day. The account part of the daily rate is
// a stipend that covers the first 22 present days of a month, so a day that
// carries the month past 22 present days earns the full rate. A full day that
// starts at exactly 21.5 present days straddles the threshold and is paid half
// at each rate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ExtraWorkDay, PayRate};

/// Present days per month covered by the account stipend.
pub const MIN_DAYS_PRESENT: Decimal = dec!(22);
/// Running day count at which a full day straddles the threshold.
pub const BOUNDARY_DAYS_PRESENT: Decimal = dec!(21.5);

const FULL_DAY: Decimal = dec!(1);
const HALF_DAY: Decimal = dec!(0.5);

// --- Inputs ---

/// One employee's classified attendance for one week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekAttendanceSummary {
    #[serde(default)]
    pub full_days_with_extra_work: Vec<ExtraWorkDay>,
    #[serde(default)]
    pub full_days_without_extra_work: u32,
    #[serde(default)]
    pub half_days: u32,
    #[serde(default)]
    pub days_absent: u32,
    #[serde(default)]
    pub pay_rate: PayRate,
}

// --- Outputs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DayKind {
    FullDayWithExtraWork,
    FullDay,
    HalfDay,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAccrual {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub kind: DayKind,
    pub earned: Decimal,
    pub running_total: Decimal,
    pub running_days_present: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayResult {
    pub total_salary: Decimal,
    /// Running day count after this week.
    pub days_present: Decimal,
    pub daily_breakdown: Vec<DayAccrual>,
}

// --- Accrual ---

#[derive(Debug, Clone, Copy)]
enum WorkDay {
    ExtraWork { date: NaiveDate, hours: Decimal },
    Full,
    Half,
    Absent,
}

impl WorkDay {
    fn weight(&self) -> Decimal {
        match self {
            WorkDay::ExtraWork { .. } | WorkDay::Full => FULL_DAY,
            WorkDay::Half => HALF_DAY,
            WorkDay::Absent => Decimal::ZERO,
        }
    }

    fn kind(&self) -> DayKind {
        match self {
            WorkDay::ExtraWork { .. } => DayKind::FullDayWithExtraWork,
            WorkDay::Full => DayKind::FullDay,
            WorkDay::Half => DayKind::HalfDay,
            WorkDay::Absent => DayKind::Absent,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        match self {
            WorkDay::ExtraWork { date, .. } => Some(*date),
            _ => None,
        }
    }

    /// Pay for the day when neither the boundary nor the threshold applies.
    fn base_pay(&self, rate: &PayRate) -> Decimal {
        match self {
            WorkDay::ExtraWork { hours, .. } if *hours >= FULL_DAY => rate.full_rate(),
            WorkDay::ExtraWork { hours, .. } if *hours > Decimal::ZERO => {
                rate.cash + rate.full_rate() / dec!(2)
            }
            WorkDay::ExtraWork { .. } | WorkDay::Full => rate.cash,
            WorkDay::Half => rate.cash / dec!(2),
            WorkDay::Absent => Decimal::ZERO,
        }
    }
}

/// Fold state threaded through the week's days.
#[derive(Debug, Clone)]
struct Accrual {
    days_present: Decimal,
    total: Decimal,
    boundary_used: bool,
    breakdown: Vec<DayAccrual>,
}

impl Accrual {
    fn starting_at(days_present: Decimal) -> Self {
        Self {
            days_present,
            total: Decimal::ZERO,
            boundary_used: false,
            breakdown: Vec::new(),
        }
    }

    fn record(mut self, rate: &PayRate, day: WorkDay) -> Self {
        let weight = day.weight();
        let earned = if weight.is_zero() {
            Decimal::ZERO
        } else if weight == FULL_DAY
            && !self.boundary_used
            && self.days_present == BOUNDARY_DAYS_PRESENT
        {
            self.boundary_used = true;
            rate.cash * HALF_DAY + rate.full_rate() * HALF_DAY
        } else if self.days_present + weight > MIN_DAYS_PRESENT {
            rate.full_rate()
        } else {
            day.base_pay(rate)
        };

        self.days_present += weight;
        self.total += earned;
        debug!(
            "Accrued {:?} (date: {:?}): earned={}, running_total={}, days_present={}",
            day.kind(),
            day.date(),
            earned,
            self.total,
            self.days_present
        );
        self.breakdown.push(DayAccrual {
            date: day.date(),
            kind: day.kind(),
            earned,
            running_total: self.total,
            running_days_present: self.days_present,
        });
        self
    }

    fn finish(self) -> PayResult {
        PayResult {
            total_salary: self.total,
            days_present: self.days_present,
            daily_breakdown: self.breakdown,
        }
    }
}

fn non_negative(rate: PayRate) -> PayRate {
    PayRate {
        cash: rate.cash.max(Decimal::ZERO),
        account: rate.account.max(Decimal::ZERO),
    }
}

/// Computes the pay earned in one week.
///
/// Days are processed as: full days with extra work (in the given order),
/// full days without extra work, half days, then absent days.
/// `days_present_before` is the month's fractional present-day count from
/// earlier weeks (full day = 1, half day = 0.5).
pub fn calculate_weekly_pay(
    summary: &WeekAttendanceSummary,
    days_present_before: Decimal,
) -> PayResult {
    let rate = non_negative(summary.pay_rate);

    let extra_days = summary
        .full_days_with_extra_work
        .iter()
        .map(|day| WorkDay::ExtraWork {
            date: day.date,
            hours: day.extra_work_hours,
        });
    let full_days = (0..summary.full_days_without_extra_work).map(|_| WorkDay::Full);
    let half_days = (0..summary.half_days).map(|_| WorkDay::Half);
    let absent_days = (0..summary.days_absent).map(|_| WorkDay::Absent);

    extra_days
        .chain(full_days)
        .chain(half_days)
        .chain(absent_days)
        .fold(Accrual::starting_at(days_present_before), |accrual, day| {
            accrual.record(&rate, day)
        })
        .finish()
}

// --- Monthly estimate ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySalary {
    pub total_salary: Decimal,
    pub cash_salary: Decimal,
    pub account_salary: Decimal,
    pub days_present: Decimal,
}

/// Month-level salary: cash for every present day, the account stipend for
/// at least 22 days and for every day beyond.
pub fn monthly_salary(rate: &PayRate, days_present: Decimal) -> MonthlySalary {
    let rate = non_negative(*rate);
    let days_present = days_present.max(Decimal::ZERO);
    let cash_salary = rate.cash * days_present;
    let account_salary = rate.account * days_present.max(MIN_DAYS_PRESENT);
    MonthlySalary {
        total_salary: cash_salary + account_salary,
        cash_salary,
        account_salary,
        days_present,
    }
}
