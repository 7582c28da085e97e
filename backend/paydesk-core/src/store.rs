// src/store.rs
//
// In-memory tables behind one mutex, optionally mirrored to a JSON file.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::attendance::week_of_month;
use crate::error::{io_context, AppError};
use crate::model::{
    new_id, DailyAttendance, Employee, EmployeeId, EmployeeInput, Loan, LoanDeduction, Month,
    WeekNum, WeeklyPay,
};

type AttendanceKey = (EmployeeId, NaiveDate);
type LedgerKey = (EmployeeId, Month, WeekNum);

#[derive(Debug, Default, Clone)]
struct StoreData {
    employees: HashMap<EmployeeId, Employee>,
    attendance: BTreeMap<AttendanceKey, DailyAttendance>,
    ledger: BTreeMap<LedgerKey, WeeklyPay>,
}

/// On-disk form of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    employees: Vec<Employee>,
    #[serde(default)]
    attendance: Vec<DailyAttendance>,
    #[serde(default)]
    weekly_pays: Vec<WeeklyPay>,
}

impl From<Snapshot> for StoreData {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            employees: snapshot
                .employees
                .into_iter()
                .map(|employee| (employee.id.clone(), employee))
                .collect(),
            attendance: snapshot
                .attendance
                .into_iter()
                .map(|record| ((record.employee_id.clone(), record.date), record))
                .collect(),
            ledger: snapshot
                .weekly_pays
                .into_iter()
                .map(|pay| ((pay.employee_id.clone(), pay.month, pay.week_number), pay))
                .collect(),
        }
    }
}

impl StoreData {
    fn snapshot(&self) -> Snapshot {
        let mut employees: Vec<Employee> = self.employees.values().cloned().collect();
        employees.sort_by(|a, b| a.id.cmp(&b.id));
        Snapshot {
            employees,
            attendance: self.attendance.values().cloned().collect(),
            weekly_pays: self.ledger.values().cloned().collect(),
        }
    }

    fn employee(&self, employee_id: &str) -> Result<&Employee, AppError> {
        self.employees
            .get(employee_id)
            .ok_or_else(|| employee_not_found(employee_id))
    }

    fn employee_mut(&mut self, employee_id: &str) -> Result<&mut Employee, AppError> {
        self.employees
            .get_mut(employee_id)
            .ok_or_else(|| employee_not_found(employee_id))
    }

    fn month_attendance(&self, employee_id: &str, month: Month) -> Vec<DailyAttendance> {
        let from = (employee_id.to_string(), month.first_day());
        let to = (employee_id.to_string(), month.last_day());
        self.attendance
            .range(from..=to)
            .map(|(_, record)| record.clone())
            .collect()
    }

    fn month_ledger<'a>(
        &'a self,
        employee_id: &str,
        month: Month,
    ) -> impl Iterator<Item = &'a WeeklyPay> + 'a {
        let from = (employee_id.to_string(), month, WeekNum::MIN);
        let to = (employee_id.to_string(), month, WeekNum::MAX);
        self.ledger.range(from..=to).map(|(_, pay)| pay)
    }

    fn ensure_week_unpaid(&self, employee_id: &str, date: NaiveDate) -> Result<(), AppError> {
        let week = week_of_month(date);
        let key = (employee_id.to_string(), Month::of(date), week);
        if self.ledger.contains_key(&key) {
            warn!(
                "Rejected attendance change for employee {} on {}: week {} already paid",
                employee_id, date, week
            );
            return Err(AppError::Conflict(format!(
                "Week {} of {} is already paid; attendance on {} is locked",
                week,
                Month::of(date),
                date
            )));
        }
        Ok(())
    }
}

fn employee_not_found(employee_id: &str) -> AppError {
    AppError::NotFound(format!("Employee {} not found", employee_id))
}

fn weekly_pay_not_found(employee_id: &str, month: Month, week: WeekNum) -> AppError {
    AppError::NotFound(format!(
        "No weekly payment for employee {} in week {} of {}",
        employee_id, week, month
    ))
}

/// Checks every deduction against the loans and applies them all, or none.
fn apply_deductions(
    employee: &mut Employee,
    deductions: &[LoanDeduction],
) -> Result<(), AppError> {
    let mut per_loan: HashMap<&str, Decimal> = HashMap::new();
    for deduction in deductions {
        if deduction.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Loan deduction amounts must be positive".to_string(),
            ));
        }
        *per_loan.entry(deduction.loan_id.as_str()).or_default() += deduction.amount;
    }

    for (loan_id, amount) in &per_loan {
        let loan = employee
            .loans
            .iter()
            .find(|loan| loan.id == *loan_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))?;
        if *amount > loan.amount {
            return Err(AppError::Validation(format!(
                "Deduction {} exceeds the outstanding amount {} of loan {}",
                amount, loan.amount, loan_id
            )));
        }
    }

    for loan in employee.loans.iter_mut() {
        if let Some(amount) = per_loan.get(loan.id.as_str()) {
            loan.amount -= *amount;
        }
    }
    Ok(())
}

pub struct PayrollStore {
    data: Mutex<StoreData>,
    data_file: Option<PathBuf>,
}

impl PayrollStore {
    pub fn in_memory() -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            data_file: None,
        }
    }

    /// Loads the store from `data_file`. A missing file starts an empty store.
    pub fn open(data_file: Option<PathBuf>) -> Result<Self, AppError> {
        let Some(path) = data_file else {
            info!("No data file configured; payroll data is kept in memory only");
            return Ok(Self::in_memory());
        };

        let data = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| io_context(e, format!("Failed to read data file: {:?}", path)))?;
            let snapshot: Snapshot = serde_json::from_str(&json)?;
            info!(
                "Loaded {} employees, {} attendance records and {} weekly payments from {:?}",
                snapshot.employees.len(),
                snapshot.attendance.len(),
                snapshot.weekly_pays.len(),
                path
            );
            StoreData::from(snapshot)
        } else {
            info!("Data file {:?} does not exist yet; starting empty", path);
            StoreData::default()
        };

        Ok(Self {
            data: Mutex::new(data),
            data_file: Some(path),
        })
    }

    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreData>, AppError> {
        self.data
            .lock()
            .map_err(|e| AppError::Lock(format!("Payroll store mutex poisoned: {}", e)))
    }

    fn persist(&self, data: &StoreData) -> Result<(), AppError> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&data.snapshot())?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                io_context(
                    e,
                    format!("Failed to create directory for data file: {:?}", parent),
                )
            })?;
        }
        fs::write(path, json).map_err(|e| {
            error!("Failed to write data file {:?}: {}", path, e);
            io_context(e, format!("Failed to write data file: {:?}", path))
        })?;
        debug!("Persisted payroll snapshot to {:?}", path);
        Ok(())
    }

    /// Runs `apply` on a copy of the tables and swaps the copy in once it is
    /// persisted. On any error the live tables are left as they were.
    fn commit<T, F>(&self, apply: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut StoreData) -> Result<T, AppError>,
    {
        let mut data = self.lock()?;
        let mut staged = data.clone();
        let output = apply(&mut staged)?;
        self.persist(&staged)?;
        *data = staged;
        Ok(output)
    }

    // --- Employees ---

    pub fn insert_employee(&self, employee: Employee) -> Result<Employee, AppError> {
        self.commit(|data| {
            if data.employees.contains_key(&employee.id) {
                return Err(AppError::Conflict(format!(
                    "Employee {} already exists",
                    employee.id
                )));
            }
            data.employees.insert(employee.id.clone(), employee.clone());
            Ok(())
        })?;
        info!("Created employee {} ({})", employee.id, employee.name);
        Ok(employee)
    }

    /// All employees, ordered by name.
    pub fn list_employees(&self) -> Result<Vec<Employee>, AppError> {
        let data = self.lock()?;
        let mut employees: Vec<Employee> = data.employees.values().cloned().collect();
        employees.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(employees)
    }

    pub fn get_employee(&self, employee_id: &str) -> Result<Employee, AppError> {
        let data = self.lock()?;
        data.employee(employee_id).cloned()
    }

    /// Replaces name and rates. Loans are kept.
    pub fn update_employee(
        &self,
        employee_id: &str,
        input: EmployeeInput,
    ) -> Result<Employee, AppError> {
        input.validate()?;
        let updated = self.commit(|data| {
            let employee = data.employee_mut(employee_id)?;
            employee.name = input.name.trim().to_string();
            employee.per_day_rate = input.per_day_rate;
            employee.payment_division = input.payment_division;
            Ok(employee.clone())
        })?;
        info!("Updated employee {}", employee_id);
        Ok(updated)
    }

    /// Removes the employee with their attendance and ledger rows.
    pub fn delete_employee(&self, employee_id: &str) -> Result<Employee, AppError> {
        let employee = self.commit(|data| {
            let employee = data
                .employees
                .remove(employee_id)
                .ok_or_else(|| employee_not_found(employee_id))?;
            data.attendance.retain(|(id, _), _| id != employee_id);
            data.ledger.retain(|(id, _, _), _| id != employee_id);
            Ok(employee)
        })?;
        info!("Deleted employee {} ({})", employee.id, employee.name);
        Ok(employee)
    }

    // --- Loans ---

    pub fn add_loan(
        &self,
        employee_id: &str,
        amount: Decimal,
        date_taken: NaiveDate,
    ) -> Result<Employee, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Loan amount must be positive".to_string(),
            ));
        }
        let loan = Loan {
            id: new_id(),
            amount,
            date_taken,
        };
        let loan_id = loan.id.clone();
        let updated = self.commit(|data| {
            let employee = data.employee_mut(employee_id)?;
            employee.loans.push(loan);
            Ok(employee.clone())
        })?;
        info!(
            "Added loan {} of {} for employee {}",
            loan_id, amount, employee_id
        );
        Ok(updated)
    }

    pub fn deduct_loan(
        &self,
        employee_id: &str,
        loan_id: &str,
        amount: Decimal,
    ) -> Result<Employee, AppError> {
        let deduction = LoanDeduction {
            loan_id: loan_id.to_string(),
            amount,
        };
        let updated = self.commit(|data| {
            let employee = data.employee_mut(employee_id)?;
            apply_deductions(employee, &[deduction])?;
            Ok(employee.clone())
        })?;
        info!(
            "Deducted {} from loan {} of employee {}",
            amount, loan_id, employee_id
        );
        Ok(updated)
    }

    // --- Attendance ---

    /// Inserts or replaces a record. Returns `true` when it was created.
    pub fn upsert_attendance(
        &self,
        record: DailyAttendance,
    ) -> Result<(DailyAttendance, bool), AppError> {
        let mut results = self.upsert_attendance_many(vec![record])?;
        results
            .pop()
            .ok_or_else(|| AppError::Validation("No attendance to record".to_string()))
    }

    /// Applies every record or none of them.
    pub fn upsert_attendance_many(
        &self,
        records: Vec<DailyAttendance>,
    ) -> Result<Vec<(DailyAttendance, bool)>, AppError> {
        let results = self.commit(|data| {
            for record in &records {
                data.employee(&record.employee_id)?;
                data.ensure_week_unpaid(&record.employee_id, record.date)?;
            }

            Ok(records
                .into_iter()
                .map(|record| {
                    let key = (record.employee_id.clone(), record.date);
                    let created = data.attendance.insert(key, record.clone()).is_none();
                    debug!(
                        "{} attendance for employee {} on {}",
                        if created { "Created" } else { "Updated" },
                        record.employee_id,
                        record.date
                    );
                    (record, created)
                })
                .collect::<Vec<_>>())
        })?;
        info!("Recorded {} attendance entries", results.len());
        Ok(results)
    }

    pub fn remove_attendance(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<DailyAttendance, AppError> {
        let removed = self.commit(|data| {
            data.employee(employee_id)?;
            data.ensure_week_unpaid(employee_id, date)?;
            data.attendance
                .remove(&(employee_id.to_string(), date))
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "No attendance for employee {} on {}",
                        employee_id, date
                    ))
                })
        })?;
        info!("Removed attendance for employee {} on {}", employee_id, date);
        Ok(removed)
    }

    /// The employee's records for `month`, ordered by date.
    pub fn attendance_for_month(
        &self,
        employee_id: &str,
        month: Month,
    ) -> Result<Vec<DailyAttendance>, AppError> {
        let data = self.lock()?;
        data.employee(employee_id)?;
        Ok(data.month_attendance(employee_id, month))
    }

    // --- Weekly pay ledger ---

    /// Builds and stores the ledger row for one employee and week.
    ///
    /// `build` sees the employee and their attendance for `month` under the
    /// same lock that checks for an existing payment, applies the loan
    /// deductions and inserts the row. Nothing changes unless the row is
    /// persisted.
    pub fn record_weekly_payment<F>(
        &self,
        employee_id: &str,
        month: Month,
        week: WeekNum,
        build: F,
    ) -> Result<WeeklyPay, AppError>
    where
        F: FnOnce(&Employee, &[DailyAttendance]) -> Result<WeeklyPay, AppError>,
    {
        let pay = self.commit(|data| {
            let key = (employee_id.to_string(), month, week);
            if data.ledger.contains_key(&key) {
                warn!(
                    "Duplicate payment rejected for employee {} in week {} of {}",
                    employee_id, week, month
                );
                return Err(AppError::Conflict(format!(
                    "Week {} of {} is already paid for employee {}",
                    week, month, employee_id
                )));
            }

            let records = data.month_attendance(employee_id, month);
            let pay = build(data.employee(employee_id)?, &records)?;

            let employee = data.employee_mut(employee_id)?;
            apply_deductions(employee, &pay.loan_deductions)?;
            data.ledger.insert(key, pay.clone());
            Ok(pay)
        })?;
        info!(
            "Recorded payment {} for employee {} in week {} of {}: \
             total={}, deducted={}, paid={}",
            pay.id,
            employee_id,
            week,
            month,
            pay.total_amount,
            pay.amount_deducted,
            pay.amount_paid
        );
        Ok(pay)
    }

    pub fn weekly_pay(
        &self,
        employee_id: &str,
        month: Month,
        week: WeekNum,
    ) -> Result<WeeklyPay, AppError> {
        let data = self.lock()?;
        data.ledger
            .get(&(employee_id.to_string(), month, week))
            .cloned()
            .ok_or_else(|| weekly_pay_not_found(employee_id, month, week))
    }

    pub fn is_week_paid(
        &self,
        employee_id: &str,
        month: Month,
        week: WeekNum,
    ) -> Result<bool, AppError> {
        let data = self.lock()?;
        Ok(data
            .ledger
            .contains_key(&(employee_id.to_string(), month, week)))
    }

    pub fn weekly_pays_for_employee(
        &self,
        employee_id: &str,
        month: Month,
    ) -> Result<Vec<WeeklyPay>, AppError> {
        let data = self.lock()?;
        data.employee(employee_id)?;
        Ok(data.month_ledger(employee_id, month).cloned().collect())
    }

    pub fn weekly_pays_for_week(
        &self,
        month: Month,
        week: WeekNum,
    ) -> Result<Vec<WeeklyPay>, AppError> {
        let data = self.lock()?;
        Ok(data
            .ledger
            .values()
            .filter(|pay| pay.month == month && pay.week_number == week)
            .cloned()
            .collect())
    }

    pub fn weekly_pays_for_month(&self, month: Month) -> Result<Vec<WeeklyPay>, AppError> {
        let data = self.lock()?;
        Ok(data
            .ledger
            .values()
            .filter(|pay| pay.month == month)
            .cloned()
            .collect())
    }

    /// Removes a ledger row and gives its loan deductions back.
    pub fn delete_weekly_pay(
        &self,
        employee_id: &str,
        month: Month,
        week: WeekNum,
    ) -> Result<WeeklyPay, AppError> {
        let pay = self.commit(|data| {
            let pay = data
                .ledger
                .remove(&(employee_id.to_string(), month, week))
                .ok_or_else(|| weekly_pay_not_found(employee_id, month, week))?;

            if let Some(employee) = data.employees.get_mut(employee_id) {
                for deduction in &pay.loan_deductions {
                    let loan = employee
                        .loans
                        .iter_mut()
                        .find(|loan| loan.id == deduction.loan_id);
                    match loan {
                        Some(loan) => loan.amount += deduction.amount,
                        None => warn!(
                            "Loan {} no longer exists; {} not restored",
                            deduction.loan_id, deduction.amount
                        ),
                    }
                }
            }
            Ok(pay)
        })?;
        info!(
            "Deleted payment {} for employee {} in week {} of {}",
            pay.id, employee_id, week, month
        );
        Ok(pay)
    }
}
