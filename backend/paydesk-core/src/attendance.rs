// src/attendance.rs
//
// Week-of-month math and attendance classification. Weeks are fixed 7-day
// blocks counted from the 1st of the month: days 1-7 are week 1, 29-31 week 5.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    AttendanceStatus, AttendanceType, DailyAttendance, EmployeeId, ExtraWorkDay, Month, PayRate,
    WeekNum,
};
use crate::pay_accrual::WeekAttendanceSummary;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Week {week} is out of range for {month} (1-{weeks_in_month})")]
    WeekOutOfRange {
        month: Month,
        week: WeekNum,
        weeks_in_month: WeekNum,
    },

    #[error("Present attendance requires attendanceType 'Full Day' or 'Half Day'")]
    MissingAttendanceType,

    #[error("Extra work hours must be 0, 0.5 or 1, got {0}")]
    InvalidExtraWork(Decimal),

    #[error("Extra work is only recorded on full days")]
    ExtraWorkOnPartialDay,
}

// --- Week math ---

pub fn week_of_month(date: NaiveDate) -> WeekNum {
    (date.day() - 1) / 7 + 1
}

pub fn weeks_in_month(month: Month) -> WeekNum {
    month.days_in_month().div_ceil(7)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekRange {
    pub month: Month,
    pub week: WeekNum,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

pub fn week_range(month: Month, week: WeekNum) -> Result<WeekRange, AttendanceError> {
    let weeks = weeks_in_month(month);
    if week == 0 || week > weeks {
        return Err(AttendanceError::WeekOutOfRange {
            month,
            week,
            weeks_in_month: weeks,
        });
    }
    let start = month.first_day() + Days::new(u64::from(7 * (week - 1)));
    let end = (start + Days::new(6)).min(month.last_day());
    Ok(WeekRange {
        month,
        week,
        start,
        end,
    })
}

/// Parses a `YYYY-MM-DD` date. Single-digit months or days are rejected.
pub fn parse_date(text: &str) -> Result<NaiveDate, AttendanceError> {
    if text.len() != 10 {
        return Err(AttendanceError::InvalidDate(text.to_string()));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| AttendanceError::InvalidDate(text.to_string()))
}

// --- Classification ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    FullWithExtraWork(Decimal),
    Full,
    Half,
    Absent,
}

impl DayClass {
    pub fn weight(&self) -> Decimal {
        match self {
            DayClass::FullWithExtraWork(_) | DayClass::Full => Decimal::ONE,
            DayClass::Half => dec!(0.5),
            DayClass::Absent => Decimal::ZERO,
        }
    }
}

pub fn classify(record: &DailyAttendance) -> DayClass {
    match (record.status, record.attendance_type) {
        (AttendanceStatus::Absent, _) | (_, AttendanceType::Absent) => DayClass::Absent,
        (AttendanceStatus::Present, AttendanceType::HalfDay) => DayClass::Half,
        (AttendanceStatus::Present, AttendanceType::FullDay)
            if record.extra_work_hours > Decimal::ZERO =>
        {
            DayClass::FullWithExtraWork(record.extra_work_hours)
        }
        (AttendanceStatus::Present, AttendanceType::FullDay) => DayClass::Full,
    }
}

/// Fractional present-day count: 1 per full day, 0.5 per half day.
pub fn present_days<'a>(records: impl IntoIterator<Item = &'a DailyAttendance>) -> Decimal {
    records
        .into_iter()
        .map(|record| classify(record).weight())
        .sum()
}

/// Body of attendance upserts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceInput {
    pub status: AttendanceStatus,
    #[serde(default)]
    pub attendance_type: Option<AttendanceType>,
    #[serde(default)]
    pub extra_work_hours: Option<Decimal>,
}

impl AttendanceInput {
    pub fn into_record(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> Result<DailyAttendance, AttendanceError> {
        let (attendance_type, extra_work_hours) = match self.status {
            AttendanceStatus::Absent => (AttendanceType::Absent, Decimal::ZERO),
            AttendanceStatus::Present => {
                let attendance_type = match self.attendance_type {
                    Some(t @ (AttendanceType::FullDay | AttendanceType::HalfDay)) => t,
                    _ => return Err(AttendanceError::MissingAttendanceType),
                };
                let hours = self.extra_work_hours.unwrap_or_default();
                if hours != Decimal::ZERO && hours != dec!(0.5) && hours != Decimal::ONE {
                    return Err(AttendanceError::InvalidExtraWork(hours));
                }
                if hours > Decimal::ZERO && attendance_type == AttendanceType::HalfDay {
                    return Err(AttendanceError::ExtraWorkOnPartialDay);
                }
                (attendance_type, hours)
            }
        };
        Ok(DailyAttendance {
            employee_id: employee_id.clone(),
            date,
            month: Month::of(date),
            status: self.status,
            attendance_type,
            extra_work_hours,
        })
    }
}

// --- Summaries ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    pub week: WeekNum,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: u32,
    pub days_present: Decimal,
    pub days_absent: u32,
    pub full_days: u32,
    pub full_days_with_extra_work: Vec<ExtraWorkDay>,
    pub full_days_without_extra_work: u32,
    pub half_days: u32,
}

impl WeekSummary {
    fn empty(range: &WeekRange) -> Self {
        Self {
            week: range.week,
            start_date: range.start,
            end_date: range.end,
            total_days: 0,
            days_present: Decimal::ZERO,
            days_absent: 0,
            full_days: 0,
            full_days_with_extra_work: Vec::new(),
            full_days_without_extra_work: 0,
            half_days: 0,
        }
    }

    pub fn to_pay_input(&self, pay_rate: PayRate) -> WeekAttendanceSummary {
        WeekAttendanceSummary {
            full_days_with_extra_work: self.full_days_with_extra_work.clone(),
            full_days_without_extra_work: self.full_days_without_extra_work,
            half_days: self.half_days,
            days_absent: self.days_absent,
            pay_rate,
        }
    }
}

/// Summarizes the records that fall inside `range`. Extra-work days keep the
/// order of `records`.
pub fn summarize_week<'a>(
    records: impl IntoIterator<Item = &'a DailyAttendance>,
    range: &WeekRange,
) -> WeekSummary {
    records
        .into_iter()
        .filter(|record| range.contains(record.date))
        .fold(WeekSummary::empty(range), |mut summary, record| {
            let class = classify(record);
            summary.total_days += 1;
            summary.days_present += class.weight();
            match class {
                DayClass::FullWithExtraWork(hours) => {
                    summary.full_days += 1;
                    summary.full_days_with_extra_work.push(ExtraWorkDay {
                        date: record.date,
                        extra_work_hours: hours,
                    });
                }
                DayClass::Full => {
                    summary.full_days += 1;
                    summary.full_days_without_extra_work += 1;
                }
                DayClass::Half => summary.half_days += 1,
                DayClass::Absent => summary.days_absent += 1,
            }
            summary
        })
}

/// Present days of the month recorded before the week starts.
pub fn days_present_before<'a>(
    records: impl IntoIterator<Item = &'a DailyAttendance>,
    range: &WeekRange,
) -> Decimal {
    present_days(
        records
            .into_iter()
            .filter(|record| range.month.contains(record.date) && record.date < range.start),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAttendance {
    pub month: Month,
    pub total_days_present: Decimal,
    pub records: Vec<DailyAttendance>,
    pub weeks: Vec<WeekSummary>,
}

/// Per-week breakdown of one employee's month. Weeks without records are
/// left out.
pub fn monthly_attendance(month: Month, mut records: Vec<DailyAttendance>) -> MonthlyAttendance {
    records.retain(|record| month.contains(record.date));
    records.sort_by_key(|record| record.date);

    let weeks = (1..=weeks_in_month(month))
        .filter_map(|week| week_range(month, week).ok())
        .map(|range| summarize_week(&records, &range))
        .filter(|summary| summary.total_days > 0)
        .collect();

    MonthlyAttendance {
        month,
        total_days_present: present_days(&records),
        records,
        weeks,
    }
}
