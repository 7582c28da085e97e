// src/model.rs

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::attendance::AttendanceError;
use crate::error::AppError;

pub type EmployeeId = String;
pub type LoanId = String;
pub type WeekNum = u32; // week of month, 1-5

/// Random 24-character hex identifier.
pub fn new_id() -> String {
    let bytes: [u8; 12] = rand::thread_rng().gen();
    hex::encode(bytes)
}

// --- Month ---

/// A calendar month, written `YYYY-MM` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    first_day: NaiveDate,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|first_day| Self { first_day })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day + Months::new(1) - Days::new(1)
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day && date <= self.last_day()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AttendanceError::InvalidMonth(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Month::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for Month {
    type Error = AttendanceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

// --- Employees ---

/// Split of an employee's daily rate. Missing fields read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PayRate {
    #[serde(default)]
    pub account: Decimal,
    #[serde(default)]
    pub cash: Decimal,
}

impl PayRate {
    pub fn new(cash: Decimal, account: Decimal) -> Self {
        Self { account, cash }
    }

    pub fn full_rate(&self) -> Decimal {
        self.cash + self.account
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    /// Outstanding amount.
    pub amount: Decimal,
    pub date_taken: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub per_day_rate: Decimal,
    pub payment_division: PayRate,
    #[serde(default)]
    pub loans: Vec<Loan>,
}

impl Employee {
    pub fn total_loan_outstanding(&self) -> Decimal {
        self.loans.iter().map(|loan| loan.amount).sum()
    }
}

/// Body of create/update employee requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub name: String,
    pub per_day_rate: Decimal,
    #[serde(default)]
    pub payment_division: PayRate,
}

impl EmployeeInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Employee name is required".to_string()));
        }
        let division = &self.payment_division;
        if division.cash.is_sign_negative() || division.account.is_sign_negative() {
            return Err(AppError::Validation(
                "Account and cash amounts must not be negative".to_string(),
            ));
        }
        if division.full_rate() != self.per_day_rate {
            return Err(AppError::Validation(
                "Account and cash amounts must add up to the perDayRate".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_employee(self) -> Employee {
        Employee {
            id: new_id(),
            name: self.name.trim().to_string(),
            per_day_rate: self.per_day_rate,
            payment_division: self.payment_division,
            loans: Vec::new(),
        }
    }
}

// --- Attendance ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceType {
    #[serde(rename = "Full Day")]
    FullDay,
    #[serde(rename = "Half Day")]
    HalfDay,
    #[default]
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendance {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub month: Month,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub attendance_type: AttendanceType,
    #[serde(default)]
    pub extra_work_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraWorkDay {
    pub date: NaiveDate,
    pub extra_work_hours: Decimal,
}

// --- Weekly pay ledger ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDeduction {
    pub loan_id: LoanId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPay {
    pub id: String,
    pub employee_id: EmployeeId,
    pub month: Month,
    pub week_number: WeekNum,
    pub days_present: Decimal,
    pub days_absent: u32,
    #[serde(default)]
    pub full_days_with_extra_work: Vec<ExtraWorkDay>,
    pub full_days_without_extra_work: u32,
    pub half_days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_amount: Decimal,
    /// Cash part of the daily rate at payment time.
    pub cash: Decimal,
    pub amount_deducted: Decimal,
    pub amount_paid: Decimal,
    #[serde(default)]
    pub loan_deductions: Vec<LoanDeduction>,
    pub paid_at: DateTime<Utc>,
}
