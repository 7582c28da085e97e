// src/payroll.rs
//
// Ties attendance, the accrual calculator and the ledger together.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::attendance::{
    days_present_before, monthly_attendance, present_days, summarize_week, week_range,
    MonthlyAttendance, WeekRange, WeekSummary,
};
use crate::error::AppError;
use crate::model::{
    new_id, DailyAttendance, Employee, EmployeeId, LoanDeduction, Month, WeekNum, WeeklyPay,
};
use crate::pay_accrual::{calculate_weekly_pay, monthly_salary, MonthlySalary, PayResult};
use crate::store::PayrollStore;

// --- Response shapes ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWeek {
    pub employee_id: EmployeeId,
    pub name: String,
    pub summary: WeekSummary,
    pub days_present_before_week: Decimal,
    pub quote: PayResult,
    pub paid: bool,
    pub loan_outstanding: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub month: Month,
    pub week: WeekNum,
    pub week_start_date: chrono::NaiveDate,
    pub week_end_date: chrono::NaiveDate,
    pub employees: Vec<EmployeeWeek>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub loan_deductions: Vec<LoanDeduction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub weekly_pay: WeeklyPay,
    pub breakdown: PayResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeMonthPay {
    pub employee_id: EmployeeId,
    pub month: Month,
    pub weekly_pays: Vec<WeeklyPay>,
    pub total_days_present: Decimal,
    pub total_amount_paid: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidWeekRow {
    pub name: String,
    #[serde(flatten)]
    pub weekly_pay: WeeklyPay,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeMonthSalary {
    pub employee_id: EmployeeId,
    pub name: String,
    pub month: Month,
    #[serde(flatten)]
    pub salary: MonthlySalary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReportRow {
    pub employee_id: EmployeeId,
    pub name: String,
    pub total_days_present: Decimal,
    pub total_days_absent: u32,
    pub total_amount_paid: Decimal,
    pub total_extra_work_days: u32,
    pub total_full_days_without_extra_work: u32,
    pub total_half_days: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub month: Month,
    pub rows: Vec<MonthlyReportRow>,
}

// --- Service ---

#[derive(Clone)]
pub struct PayrollService {
    store: Arc<PayrollStore>,
}

struct WeekQuote {
    summary: WeekSummary,
    days_before: Decimal,
    result: PayResult,
}

fn quote_week(employee: &Employee, records: &[DailyAttendance], range: &WeekRange) -> WeekQuote {
    let summary = summarize_week(records, range);
    let days_before = days_present_before(records, range);
    let result = calculate_weekly_pay(
        &summary.to_pay_input(employee.payment_division),
        days_before,
    );
    WeekQuote {
        summary,
        days_before,
        result,
    }
}

impl PayrollService {
    pub fn new(store: Arc<PayrollStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<PayrollStore> {
        &self.store
    }

    /// Every employee's attendance, quote and paid flag for one week.
    pub fn weekly_report(&self, month: Month, week: WeekNum) -> Result<WeeklyReport, AppError> {
        let range = week_range(month, week)?;
        let employees = self
            .store
            .list_employees()?
            .into_iter()
            .map(|employee| {
                let records = self.store.attendance_for_month(&employee.id, month)?;
                let quote = quote_week(&employee, &records, &range);
                let paid = self.store.is_week_paid(&employee.id, month, week)?;
                Ok(EmployeeWeek {
                    loan_outstanding: employee.total_loan_outstanding(),
                    employee_id: employee.id,
                    name: employee.name,
                    summary: quote.summary,
                    days_present_before_week: quote.days_before,
                    quote: quote.result,
                    paid,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(WeeklyReport {
            month,
            week,
            week_start_date: range.start,
            week_end_date: range.end,
            employees,
        })
    }

    /// Computes and records the week's payment for one employee.
    pub fn process_weekly_payment(
        &self,
        employee_id: &str,
        month: Month,
        week: WeekNum,
        request: PaymentRequest,
    ) -> Result<PaymentOutcome, AppError> {
        let range = week_range(month, week)?;
        let mut breakdown = None;

        let weekly_pay = self
            .store
            .record_weekly_payment(employee_id, month, week, |employee, records| {
                let quote = quote_week(employee, records, &range);
                if quote.summary.total_days == 0 {
                    warn!(
                        "Refusing payment for employee {}: no attendance in week {} of {}",
                        employee_id, week, month
                    );
                    return Err(AppError::Validation(format!(
                        "No attendance recorded for week {} of {}",
                        week, month
                    )));
                }

                let amount_deducted: Decimal =
                    request.loan_deductions.iter().map(|d| d.amount).sum();
                if amount_deducted > quote.result.total_salary {
                    return Err(AppError::Validation(format!(
                        "Loan deductions {} exceed the week's salary {}",
                        amount_deducted, quote.result.total_salary
                    )));
                }

                let pay = WeeklyPay {
                    id: new_id(),
                    employee_id: employee.id.clone(),
                    month,
                    week_number: week,
                    days_present: quote.summary.days_present,
                    days_absent: quote.summary.days_absent,
                    full_days_with_extra_work: quote.summary.full_days_with_extra_work.clone(),
                    full_days_without_extra_work: quote.summary.full_days_without_extra_work,
                    half_days: quote.summary.half_days,
                    start_date: range.start,
                    end_date: range.end,
                    total_amount: quote.result.total_salary,
                    cash: employee.payment_division.cash,
                    amount_deducted,
                    amount_paid: quote.result.total_salary - amount_deducted,
                    loan_deductions: request.loan_deductions.clone(),
                    paid_at: Utc::now(),
                };
                breakdown = Some(quote.result);
                Ok(pay)
            })?;

        let breakdown = breakdown.ok_or_else(|| {
            AppError::Validation("Payment was recorded without a breakdown".to_string())
        })?;
        Ok(PaymentOutcome {
            weekly_pay,
            breakdown,
        })
    }

    /// Quote for one employee and week without touching the ledger.
    pub fn quote(
        &self,
        employee_id: &str,
        month: Month,
        week: WeekNum,
    ) -> Result<EmployeeWeek, AppError> {
        let range = week_range(month, week)?;
        let employee = self.store.get_employee(employee_id)?;
        let records = self.store.attendance_for_month(employee_id, month)?;
        let quote = quote_week(&employee, &records, &range);
        Ok(EmployeeWeek {
            loan_outstanding: employee.total_loan_outstanding(),
            employee_id: employee.id.clone(),
            name: employee.name,
            summary: quote.summary,
            days_present_before_week: quote.days_before,
            quote: quote.result,
            paid: self.store.is_week_paid(employee_id, month, week)?,
        })
    }

    /// Attendance with weekly breakdown. A month without records is not found.
    pub fn monthly_attendance(
        &self,
        employee_id: &str,
        month: Month,
    ) -> Result<MonthlyAttendance, AppError> {
        let records = self.store.attendance_for_month(employee_id, month)?;
        if records.is_empty() {
            return Err(AppError::NotFound(format!(
                "No attendance for employee {} in {}",
                employee_id, month
            )));
        }
        Ok(monthly_attendance(month, records))
    }

    pub fn monthly_salary(
        &self,
        employee_id: &str,
        month: Month,
    ) -> Result<EmployeeMonthSalary, AppError> {
        let employee = self.store.get_employee(employee_id)?;
        let records = self.store.attendance_for_month(employee_id, month)?;
        let salary = monthly_salary(&employee.payment_division, present_days(&records));
        Ok(EmployeeMonthSalary {
            employee_id: employee.id,
            name: employee.name,
            month,
            salary,
        })
    }

    pub fn employee_month_pay(
        &self,
        employee_id: &str,
        month: Month,
    ) -> Result<EmployeeMonthPay, AppError> {
        let weekly_pays = self.store.weekly_pays_for_employee(employee_id, month)?;
        let total_days_present = weekly_pays.iter().map(|pay| pay.days_present).sum();
        let total_amount_paid = weekly_pays.iter().map(|pay| pay.amount_paid).sum();
        Ok(EmployeeMonthPay {
            employee_id: employee_id.to_string(),
            month,
            weekly_pays,
            total_days_present,
            total_amount_paid,
        })
    }

    pub fn week_pay_for_all(
        &self,
        month: Month,
        week: WeekNum,
    ) -> Result<Vec<PaidWeekRow>, AppError> {
        week_range(month, week)?;
        let employees = self.store.list_employees()?;
        let pays = self.store.weekly_pays_for_week(month, week)?;
        Ok(employees
            .into_iter()
            .filter_map(|employee| {
                pays.iter()
                    .find(|pay| pay.employee_id == employee.id)
                    .map(|pay| PaidWeekRow {
                        name: employee.name,
                        weekly_pay: pay.clone(),
                    })
            })
            .collect())
    }

    /// Ledger totals per employee, ordered by name.
    pub fn monthly_report(&self, month: Month) -> Result<MonthlyReport, AppError> {
        let pays = self.store.weekly_pays_for_month(month)?;
        let rows: Vec<MonthlyReportRow> = self
            .store
            .list_employees()?
            .into_iter()
            .map(|employee| {
                let mine: Vec<&WeeklyPay> = pays
                    .iter()
                    .filter(|pay| pay.employee_id == employee.id)
                    .collect();
                MonthlyReportRow {
                    total_days_present: mine.iter().map(|pay| pay.days_present).sum(),
                    total_days_absent: mine.iter().map(|pay| pay.days_absent).sum(),
                    total_amount_paid: mine.iter().map(|pay| pay.amount_paid).sum(),
                    total_extra_work_days: mine
                        .iter()
                        .map(|pay| pay.full_days_with_extra_work.len() as u32)
                        .sum(),
                    total_full_days_without_extra_work: mine
                        .iter()
                        .map(|pay| pay.full_days_without_extra_work)
                        .sum(),
                    total_half_days: mine.iter().map(|pay| pay.half_days).sum(),
                    employee_id: employee.id,
                    name: employee.name,
                }
            })
            .collect();
        info!("Built monthly report for {} ({} employees)", month, rows.len());
        Ok(MonthlyReport { month, rows })
    }
}
