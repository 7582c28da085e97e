// src/store_tests.rs

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::fs;
    use std::path::PathBuf;

    use crate::error::AppError;
    use crate::model::{
        new_id, AttendanceStatus, AttendanceType, DailyAttendance, Employee, EmployeeInput,
        LoanDeduction, Month, PayRate, WeeklyPay,
    };
    use crate::store::PayrollStore;

    fn data_path(test_name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("paydesk_store_tests")
            .join(format!("{}.json", test_name))
    }

    fn setup(test_name: &str) -> PathBuf {
        teardown(test_name);
        data_path(test_name)
    }

    fn teardown(test_name: &str) {
        let _ = fs::remove_file(data_path(test_name));
    }

    fn d(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    fn month(text: &str) -> Month {
        text.parse().unwrap()
    }

    fn employee(name: &str) -> Employee {
        EmployeeInput {
            name: name.to_string(),
            per_day_rate: dec!(1000),
            payment_division: PayRate::new(dec!(636), dec!(364)),
        }
        .into_employee()
    }

    fn full_day(employee_id: &str, date: &str) -> DailyAttendance {
        let date = d(date);
        DailyAttendance {
            employee_id: employee_id.to_string(),
            date,
            month: Month::of(date),
            status: AttendanceStatus::Present,
            attendance_type: AttendanceType::FullDay,
            extra_work_hours: Decimal::ZERO,
        }
    }

    fn ledger_row(employee: &Employee, week: u32, deductions: Vec<LoanDeduction>) -> WeeklyPay {
        let deducted: Decimal = deductions.iter().map(|d| d.amount).sum();
        WeeklyPay {
            id: new_id(),
            employee_id: employee.id.clone(),
            month: month("2025-01"),
            week_number: week,
            days_present: dec!(1),
            days_absent: 0,
            full_days_with_extra_work: Vec::new(),
            full_days_without_extra_work: 1,
            half_days: 0,
            start_date: d("2025-01-01"),
            end_date: d("2025-01-07"),
            total_amount: dec!(636),
            cash: dec!(636),
            amount_deducted: deducted,
            amount_paid: dec!(636) - deducted,
            loan_deductions: deductions,
            paid_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_reports_created_then_updated() {
        let store = PayrollStore::in_memory();
        let asha = store.insert_employee(employee("Asha")).unwrap();

        let (_, created) = store.upsert_attendance(full_day(&asha.id, "2025-01-02")).unwrap();
        assert!(created);

        let mut half = full_day(&asha.id, "2025-01-02");
        half.attendance_type = AttendanceType::HalfDay;
        let (stored, created) = store.upsert_attendance(half).unwrap();
        assert!(!created);
        assert_eq!(stored.attendance_type, AttendanceType::HalfDay);

        let records = store.attendance_for_month(&asha.id, month("2025-01")).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn attendance_for_unknown_employee_is_not_found() {
        let store = PayrollStore::in_memory();
        let result = store.upsert_attendance(full_day("missing", "2025-01-02"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn duplicate_payment_is_a_conflict() {
        let store = PayrollStore::in_memory();
        let asha = store.insert_employee(employee("Asha")).unwrap();

        store
            .record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
                Ok(ledger_row(e, 1, vec![]))
            })
            .unwrap();
        let second = store.record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
            Ok(ledger_row(e, 1, vec![]))
        });
        assert!(matches!(second, Err(AppError::Conflict(_))));
        assert_eq!(store.weekly_pays_for_month(month("2025-01")).unwrap().len(), 1);
    }

    #[test]
    fn paid_week_locks_its_attendance() {
        let store = PayrollStore::in_memory();
        let asha = store.insert_employee(employee("Asha")).unwrap();
        store.upsert_attendance(full_day(&asha.id, "2025-01-02")).unwrap();
        store
            .record_weekly_payment(&asha.id, month("2025-01"), 1, |e, records| {
                assert_eq!(records.len(), 1);
                Ok(ledger_row(e, 1, vec![]))
            })
            .unwrap();

        assert!(matches!(
            store.upsert_attendance(full_day(&asha.id, "2025-01-03")),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            store.remove_attendance(&asha.id, d("2025-01-02")),
            Err(AppError::Conflict(_))
        ));
        // the next week is still open
        assert!(store.upsert_attendance(full_day(&asha.id, "2025-01-08")).is_ok());
    }

    #[test]
    fn bulk_upsert_is_all_or_nothing() {
        let store = PayrollStore::in_memory();
        let asha = store.insert_employee(employee("Asha")).unwrap();
        let result = store.upsert_attendance_many(vec![
            full_day(&asha.id, "2025-01-02"),
            full_day("missing", "2025-01-02"),
        ]);
        assert!(result.is_err());
        assert!(store
            .attendance_for_month(&asha.id, month("2025-01"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn loan_deductions_are_bounded_and_restored() {
        let store = PayrollStore::in_memory();
        let asha = store.insert_employee(employee("Asha")).unwrap();
        let asha = store.add_loan(&asha.id, dec!(500), d("2024-12-20")).unwrap();
        let loan_id = asha.loans[0].id.clone();

        let too_much = store.record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
            Ok(ledger_row(
                e,
                1,
                vec![LoanDeduction {
                    loan_id: loan_id.clone(),
                    amount: dec!(600),
                }],
            ))
        });
        assert!(matches!(too_much, Err(AppError::Validation(_))));
        assert!(!store.is_week_paid(&asha.id, month("2025-01"), 1).unwrap());

        store
            .record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
                Ok(ledger_row(
                    e,
                    1,
                    vec![LoanDeduction {
                        loan_id: loan_id.clone(),
                        amount: dec!(200),
                    }],
                ))
            })
            .unwrap();
        assert_eq!(store.get_employee(&asha.id).unwrap().loans[0].amount, dec!(300));

        store.delete_weekly_pay(&asha.id, month("2025-01"), 1).unwrap();
        assert_eq!(store.get_employee(&asha.id).unwrap().loans[0].amount, dec!(500));
        assert!(!store.is_week_paid(&asha.id, month("2025-01"), 1).unwrap());
    }

    #[test]
    fn direct_loan_deduction_cannot_exceed_outstanding() {
        let store = PayrollStore::in_memory();
        let asha = store.insert_employee(employee("Asha")).unwrap();
        let asha = store.add_loan(&asha.id, dec!(100), d("2025-01-01")).unwrap();
        let loan_id = asha.loans[0].id.clone();

        assert!(matches!(
            store.deduct_loan(&asha.id, &loan_id, dec!(150)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.deduct_loan(&asha.id, "nope", dec!(10)),
            Err(AppError::NotFound(_))
        ));
        let updated = store.deduct_loan(&asha.id, &loan_id, dec!(100)).unwrap();
        assert_eq!(updated.total_loan_outstanding(), Decimal::ZERO);
        assert!(matches!(
            store.add_loan(&asha.id, dec!(0), d("2025-01-01")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn deleting_employee_cascades() {
        let store = PayrollStore::in_memory();
        let asha = store.insert_employee(employee("Asha")).unwrap();
        store.upsert_attendance(full_day(&asha.id, "2025-01-02")).unwrap();
        store
            .record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
                Ok(ledger_row(e, 1, vec![]))
            })
            .unwrap();

        store.delete_employee(&asha.id).unwrap();
        assert!(matches!(store.get_employee(&asha.id), Err(AppError::NotFound(_))));
        assert!(store.weekly_pays_for_month(month("2025-01")).unwrap().is_empty());
    }

    #[test]
    fn snapshot_survives_reopen() {
        let test_name = "snapshot_survives_reopen";
        let path = setup(test_name);

        let asha_id = {
            let store = PayrollStore::open(Some(path.clone())).unwrap();
            let asha = store.insert_employee(employee("Asha")).unwrap();
            store.add_loan(&asha.id, dec!(250), d("2025-01-01")).unwrap();
            store.upsert_attendance(full_day(&asha.id, "2025-01-02")).unwrap();
            store
                .record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
                    Ok(ledger_row(e, 1, vec![]))
                })
                .unwrap();
            asha.id
        };
        assert!(path.exists());

        let reopened = PayrollStore::open(Some(path.clone())).unwrap();
        let asha = reopened.get_employee(&asha_id).unwrap();
        assert_eq!(asha.total_loan_outstanding(), dec!(250));
        assert_eq!(
            reopened
                .attendance_for_month(&asha_id, month("2025-01"))
                .unwrap()
                .len(),
            1
        );
        assert!(reopened.is_week_paid(&asha_id, month("2025-01"), 1).unwrap());

        teardown(test_name);
    }

    #[test]
    fn failed_write_leaves_store_unchanged() {
        let dir = std::env::temp_dir()
            .join("paydesk_store_tests")
            .join("unwritable");
        let _ = fs::remove_file(&dir);
        let _ = fs::remove_dir_all(&dir);
        let store = PayrollStore::open(Some(dir.join("data.json"))).unwrap();
        let asha = store.insert_employee(employee("Asha")).unwrap();
        let asha = store.add_loan(&asha.id, dec!(500), d("2025-01-01")).unwrap();
        let loan_id = asha.loans[0].id.clone();
        store.upsert_attendance(full_day(&asha.id, "2025-01-02")).unwrap();

        // the data file's parent becomes a regular file
        fs::remove_dir_all(&dir).unwrap();
        fs::write(&dir, "not a directory").unwrap();

        let inserted = store.insert_employee(employee("Ravi"));
        assert!(matches!(inserted, Err(AppError::Io { .. })));
        assert_eq!(store.list_employees().unwrap().len(), 1);

        let deduction = LoanDeduction {
            loan_id: loan_id.clone(),
            amount: dec!(100),
        };
        let paid = store.record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
            Ok(ledger_row(e, 1, vec![deduction.clone()]))
        });
        assert!(matches!(paid, Err(AppError::Io { .. })));
        assert!(!store.is_week_paid(&asha.id, month("2025-01"), 1).unwrap());
        assert_eq!(
            store.get_employee(&asha.id).unwrap().loans[0].amount,
            dec!(500)
        );

        assert!(store.remove_attendance(&asha.id, d("2025-01-02")).is_err());
        assert!(store.delete_employee(&asha.id).is_err());
        assert_eq!(
            store
                .attendance_for_month(&asha.id, month("2025-01"))
                .unwrap()
                .len(),
            1
        );

        // a retry succeeds once the file can be written again
        fs::remove_file(&dir).unwrap();
        store
            .record_weekly_payment(&asha.id, month("2025-01"), 1, |e, _| {
                Ok(ledger_row(e, 1, vec![deduction.clone()]))
            })
            .unwrap();
        assert!(store.is_week_paid(&asha.id, month("2025-01"), 1).unwrap());
        assert_eq!(
            store.get_employee(&asha.id).unwrap().loans[0].amount,
            dec!(400)
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_data_file_starts_empty() {
        let test_name = "missing_data_file_starts_empty";
        let path = setup(test_name);
        let store = PayrollStore::open(Some(path)).unwrap();
        assert!(store.list_employees().unwrap().is_empty());
        teardown(test_name);
    }

    #[test]
    fn employees_are_listed_by_name() {
        let store = PayrollStore::in_memory();
        store.insert_employee(employee("Ravi")).unwrap();
        store.insert_employee(employee("Asha")).unwrap();
        let names: Vec<String> = store
            .list_employees()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Asha", "Ravi"]);
    }
}
