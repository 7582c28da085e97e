// src/report.rs

use csv::WriterBuilder;
use std::io::Write;

use crate::error::{io_context, AppError};
use crate::payroll::MonthlyReport;

pub const MONTHLY_REPORT_HEADERS: [&str; 8] = [
    "Sr. No.",
    "Employee Name",
    "Days Present",
    "Days Absent",
    "Total Amount Paid",
    "Extra Work Days",
    "Full Days Without Extra Work",
    "Half Days",
];

/// Writes the monthly report as CSV, one row per employee numbered from 1.
pub fn write_monthly_csv<W: Write>(report: &MonthlyReport, writer: W) -> Result<(), AppError> {
    let mut csv = WriterBuilder::new().from_writer(writer);
    csv.write_record(MONTHLY_REPORT_HEADERS)?;
    for (index, row) in report.rows.iter().enumerate() {
        csv.write_record([
            (index + 1).to_string(),
            row.name.clone(),
            row.total_days_present.normalize().to_string(),
            row.total_days_absent.to_string(),
            row.total_amount_paid.normalize().to_string(),
            row.total_extra_work_days.to_string(),
            row.total_full_days_without_extra_work.to_string(),
            row.total_half_days.to_string(),
        ])?;
    }
    csv.flush()
        .map_err(|e| io_context(e, "Failed to flush CSV report"))?;
    Ok(())
}

pub fn monthly_csv_string(report: &MonthlyReport) -> Result<String, AppError> {
    let mut buffer = Vec::new();
    write_monthly_csv(report, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| AppError::Validation(format!("CSV report is not valid UTF-8: {}", e)))
}

/// File name offered to browsers downloading the report.
pub fn monthly_csv_filename(report: &MonthlyReport) -> String {
    format!("monthly-report-{}.csv", report.month)
}
