// src/pay_accrual_tests.rs

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::ops::RangeInclusive;

    use crate::model::{ExtraWorkDay, PayRate};
    use crate::pay_accrual::*;

    fn rate() -> PayRate {
        PayRate::new(dec!(636), dec!(364))
    }

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn summary(full: u32, half: u32, absent: u32) -> WeekAttendanceSummary {
        WeekAttendanceSummary {
            full_days_with_extra_work: Vec::new(),
            full_days_without_extra_work: full,
            half_days: half,
            days_absent: absent,
            pay_rate: rate(),
        }
    }

    fn extra(date: &str, hours: Decimal) -> ExtraWorkDay {
        ExtraWorkDay {
            date: d(date),
            extra_work_hours: hours,
        }
    }

    fn earned(result: &PayResult) -> Vec<Decimal> {
        result.daily_breakdown.iter().map(|day| day.earned).collect()
    }

    #[test]
    fn worked_example_crosses_threshold_mid_week() {
        let result = calculate_weekly_pay(&summary(5, 0, 0), dec!(20.5));

        assert_eq!(result.total_salary, dec!(4454));
        assert_eq!(
            earned(&result),
            vec![dec!(636), dec!(818), dec!(1000), dec!(1000), dec!(1000)]
        );
        let progression: Vec<Decimal> = result
            .daily_breakdown
            .iter()
            .map(|day| day.running_days_present)
            .collect();
        assert_eq!(
            progression,
            vec![dec!(21.5), dec!(22.5), dec!(23.5), dec!(24.5), dec!(25.5)]
        );
        assert_eq!(result.days_present, dec!(25.5));
    }

    #[test]
    fn after_threshold_every_present_day_pays_full_rate() {
        for before in [dec!(22), dec!(22.5), dec!(25)] {
            let result = calculate_weekly_pay(&summary(3, 2, 1), before);
            let present: Vec<Decimal> = result
                .daily_breakdown
                .iter()
                .filter(|day| day.kind != DayKind::Absent)
                .map(|day| day.earned)
                .collect();
            assert_eq!(present.len(), 5);
            assert!(
                present.iter().all(|pay| *pay == dec!(1000)),
                "before={before}: {present:?}"
            );
        }
    }

    #[test]
    fn before_threshold_full_days_pay_cash_and_half_days_half_cash() {
        // 15 + 4 + 0.5 * 6 = 22, never beyond the threshold
        let result = calculate_weekly_pay(&summary(4, 6, 0), dec!(15));
        let pays = earned(&result);
        assert_eq!(&pays[..4], &[dec!(636); 4]);
        assert_eq!(&pays[4..], &[dec!(318); 6]);
        assert_eq!(result.total_salary, dec!(4452));
        assert_eq!(result.days_present, dec!(22));
    }

    #[test]
    fn half_day_landing_exactly_on_threshold_pays_half_cash() {
        let result = calculate_weekly_pay(&summary(0, 1, 0), dec!(21.5));
        assert_eq!(result.total_salary, dec!(318));
        assert_eq!(result.days_present, dec!(22));
    }

    #[test]
    fn twenty_second_day_is_cash_and_twenty_third_is_full() {
        let result = calculate_weekly_pay(&summary(2, 0, 0), dec!(21));
        assert_eq!(earned(&result), vec![dec!(636), dec!(1000)]);
    }

    #[test]
    fn extra_work_full_hour_pays_full_rate_before_threshold() {
        let week = WeekAttendanceSummary {
            full_days_with_extra_work: vec![extra("2025-01-06", dec!(1))],
            ..summary(0, 0, 0)
        };
        let result = calculate_weekly_pay(&week, dec!(3));
        assert_eq!(result.total_salary, dec!(1000));
        assert_eq!(result.daily_breakdown[0].date, Some(d("2025-01-06")));
        assert_eq!(result.daily_breakdown[0].kind, DayKind::FullDayWithExtraWork);
    }

    #[test]
    fn extra_work_half_hour_pays_cash_plus_half_rate_before_threshold() {
        let week = WeekAttendanceSummary {
            full_days_with_extra_work: vec![extra("2025-01-06", dec!(0.5))],
            ..summary(0, 0, 0)
        };
        let result = calculate_weekly_pay(&week, dec!(3));
        assert_eq!(result.total_salary, dec!(1136));
    }

    #[test]
    fn extra_work_days_are_processed_first_and_in_order() {
        let week = WeekAttendanceSummary {
            full_days_with_extra_work: vec![
                extra("2025-01-09", dec!(0.5)),
                extra("2025-01-07", dec!(1)),
            ],
            ..summary(1, 1, 0)
        };
        let result = calculate_weekly_pay(&week, Decimal::ZERO);
        let kinds: Vec<DayKind> = result.daily_breakdown.iter().map(|day| day.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DayKind::FullDayWithExtraWork,
                DayKind::FullDayWithExtraWork,
                DayKind::FullDay,
                DayKind::HalfDay
            ]
        );
        assert_eq!(result.daily_breakdown[0].date, Some(d("2025-01-09")));
        assert_eq!(result.daily_breakdown[1].date, Some(d("2025-01-07")));
        assert_eq!(result.daily_breakdown[2].date, None);
        assert_eq!(
            earned(&result),
            vec![dec!(1136), dec!(1000), dec!(636), dec!(318)]
        );
    }

    #[test]
    fn boundary_full_day_is_split_and_advances_a_whole_day() {
        let result = calculate_weekly_pay(&summary(1, 0, 0), dec!(21.5));
        assert_eq!(result.total_salary, dec!(818));
        assert_eq!(result.days_present, dec!(22.5));
    }

    #[test]
    fn boundary_takes_precedence_over_extra_work() {
        let week = WeekAttendanceSummary {
            full_days_with_extra_work: vec![extra("2025-01-20", dec!(0.5))],
            ..summary(0, 0, 0)
        };
        let result = calculate_weekly_pay(&week, dec!(21.5));
        assert_eq!(result.total_salary, dec!(818));
    }

    #[test]
    fn threshold_takes_precedence_over_half_hour_extra_work() {
        let week = WeekAttendanceSummary {
            full_days_with_extra_work: vec![extra("2025-01-27", dec!(0.5))],
            ..summary(0, 0, 0)
        };
        let result = calculate_weekly_pay(&week, dec!(23));
        assert_eq!(result.total_salary, dec!(1000));
    }

    #[test]
    fn boundary_fires_once_per_call() {
        let result = calculate_weekly_pay(&summary(2, 0, 0), dec!(21.5));
        assert_eq!(earned(&result), vec![dec!(818), dec!(1000)]);
    }

    #[test]
    fn absent_days_change_nothing() {
        let without = calculate_weekly_pay(&summary(2, 1, 0), dec!(10));
        let with = calculate_weekly_pay(&summary(2, 1, 4), dec!(10));
        assert_eq!(with.total_salary, without.total_salary);
        assert_eq!(with.days_present, without.days_present);

        let absent: Vec<_> = with
            .daily_breakdown
            .iter()
            .filter(|day| day.kind == DayKind::Absent)
            .collect();
        assert_eq!(absent.len(), 4);
        assert!(absent.iter().all(|day| day.earned.is_zero()));
        assert!(absent
            .iter()
            .all(|day| day.running_days_present == dec!(12.5)));
    }

    #[test]
    fn same_inputs_give_same_salary() {
        let week = WeekAttendanceSummary {
            full_days_with_extra_work: vec![extra("2025-01-20", dec!(1))],
            ..summary(3, 1, 1)
        };
        let first = calculate_weekly_pay(&week, dec!(19.5));
        let second = calculate_weekly_pay(&week, dec!(19.5));
        assert_eq!(first, second);
    }

    #[test]
    fn missing_pay_rate_pays_nothing() {
        let week: WeekAttendanceSummary =
            serde_json::from_str(r#"{"fullDaysWithoutExtraWork": 3, "halfDays": 1}"#).unwrap();
        let result = calculate_weekly_pay(&week, dec!(5));
        assert_eq!(result.total_salary, Decimal::ZERO);
        assert_eq!(result.days_present, dec!(8.5));
    }

    #[test]
    fn empty_week_pays_nothing() {
        let result = calculate_weekly_pay(&summary(0, 0, 0), dec!(21.5));
        assert_eq!(result.total_salary, Decimal::ZERO);
        assert_eq!(result.days_present, dec!(21.5));
        assert!(result.daily_breakdown.is_empty());
    }

    #[test]
    fn monthly_salary_pays_account_for_at_least_22_days() {
        let short = monthly_salary(&rate(), dec!(20));
        assert_eq!(short.cash_salary, dec!(12720));
        assert_eq!(short.account_salary, dec!(8008));
        assert_eq!(short.total_salary, dec!(20728));

        let exact = monthly_salary(&rate(), dec!(22));
        assert_eq!(exact.total_salary, dec!(22000));

        let over = monthly_salary(&rate(), dec!(24.5));
        assert_eq!(over.cash_salary, dec!(15582));
        assert_eq!(over.account_salary, dec!(8918));
        assert_eq!(over.total_salary, dec!(24500));
    }

    // --- Properties over random weeks ---

    /// Days present before the week, in half-day steps.
    fn arb_days_before(halves: RangeInclusive<u32>) -> impl Strategy<Value = Decimal> {
        halves.prop_map(|halves| Decimal::from(halves) / dec!(2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_past_threshold_pays_full_rate(
            before in arb_days_before(44..=80),
            full in 0u32..7,
            half in 0u32..7,
            absent in 0u32..7,
        ) {
            let result = calculate_weekly_pay(&summary(full, half, absent), before);
            for day in &result.daily_breakdown {
                let expected = match day.kind {
                    DayKind::Absent => dec!(0),
                    _ => dec!(1000),
                };
                prop_assert_eq!(day.earned, expected, "before={} day={:?}", before, day);
            }
        }

        #[test]
        fn prop_under_threshold_pays_cash_only(
            before in arb_days_before(0..=44),
            full in 0u32..7,
            half in 0u32..7,
        ) {
            let after = before + Decimal::from(full) + Decimal::from(half) / dec!(2);
            prop_assume!(after <= dec!(22));

            let result = calculate_weekly_pay(&summary(full, half, 0), before);
            for day in &result.daily_breakdown {
                let expected = match day.kind {
                    DayKind::HalfDay => dec!(318),
                    _ => dec!(636),
                };
                prop_assert_eq!(day.earned, expected, "before={} day={:?}", before, day);
            }
        }

        #[test]
        fn prop_totals_match_breakdown(
            before in arb_days_before(0..=60),
            full in 0u32..7,
            half in 0u32..7,
            absent in 0u32..7,
        ) {
            let result = calculate_weekly_pay(&summary(full, half, absent), before);
            let earned_sum: Decimal = result.daily_breakdown.iter().map(|day| day.earned).sum();
            prop_assert_eq!(result.total_salary, earned_sum);
            prop_assert_eq!(
                result.days_present,
                before + Decimal::from(full) + Decimal::from(half) / dec!(2)
            );
            prop_assert_eq!(
                result.daily_breakdown.len(),
                (full + half + absent) as usize
            );
        }
    }
}
