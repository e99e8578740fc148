//! Property-based tests for the tally-core rule engines.
//!
//! These tests verify that:
//! - No rules and no default rate never produce tax
//! - The selected rule is stable when other rules lose priority
//! - A disabled weekday is closed at every minute
//! - The next-open search never goes backwards and lands on an open minute
//! - Settling to cents stays within half a cent

use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_core::hours::{get_next_open_time, is_business_open, BusinessHours, DaySchedule, WeeklySchedule};
use tally_core::tax::{calculate_tax, AppliesTo, TaxCalculationContext, TaxRule, TaxSource};
use tally_core::{Money, TaxRate};

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Strategy for non-negative amounts with up to four decimals.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000).prop_map(|v| Decimal::new(v, 4))
}

/// Strategy for rates between 0 and 30 % with two decimals.
fn arb_rate() -> impl Strategy<Value = TaxRate> {
    (0i64..3_000).prop_map(|v| TaxRate::from_percent(Decimal::new(v, 2)))
}

/// Strategy for a list of catch-all rules with random priorities.
fn arb_rules() -> impl Strategy<Value = Vec<TaxRule>> {
    prop::collection::vec((arb_rate(), -5i32..5), 1..6).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (rate, priority))| TaxRule {
                id: format!("rule-{i}"),
                name: format!("Rule {i}"),
                rate,
                label: format!("Label {i}"),
                applies_to: AppliesTo::All,
                category_ids: Vec::new(),
                product_ids: Vec::new(),
                region: None,
                priority,
                is_active: true,
            })
            .collect()
    })
}

/// Strategy for a local time somewhere in 2025.
fn arb_local_time() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..365, 0i64..1440).prop_map(|(day, minute)| {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(day)
            + Duration::minutes(minute)
    })
}

fn hhmm(hour: u32) -> String {
    format!("{hour:02}:00")
}

fn uniform_week(open: u32, close: u32) -> BusinessHours {
    let day = DaySchedule::open(&hhmm(open), &hhmm(close));
    let schedule = WEEK
        .iter()
        .fold(WeeklySchedule::default(), |s, d| s.with_day(*d, day.clone()));
    BusinessHours {
        schedule,
        ..Default::default()
    }
}

proptest! {
    /// Empty rules and a zero default rate never tax anything.
    #[test]
    fn no_rules_no_default_means_no_tax(subtotal in arb_amount()) {
        let tax = calculate_tax(&TaxCalculationContext::for_subtotal(subtotal), &[], TaxRate::zero());
        prop_assert_eq!(tax.amount, Decimal::ZERO);
        prop_assert_eq!(tax.source, TaxSource::NoTax);
    }

    /// The applied rate is the rate of a priority-maximal rule.
    #[test]
    fn selected_rule_has_top_priority(rules in arb_rules(), subtotal in arb_amount()) {
        let tax = calculate_tax(&TaxCalculationContext::for_subtotal(subtotal), &rules, TaxRate::zero());
        let top = rules.iter().map(|r| r.priority).max().unwrap();

        prop_assert_eq!(tax.applied_rules.len(), 1);
        prop_assert_eq!(tax.applied_rules[0].priority, top);
        prop_assert_eq!(tax.rate, tax.applied_rules[0].rate);
    }

    /// Lowering a rule that was not selected never changes the outcome.
    #[test]
    fn lowering_other_rule_keeps_result(
        rules in arb_rules(),
        subtotal in arb_amount(),
        pick in any::<prop::sample::Index>(),
    ) {
        let context = TaxCalculationContext::for_subtotal(subtotal);
        let before = calculate_tax(&context, &rules, TaxRate::zero());
        let selected = before.applied_rules[0].id.clone();

        let mut lowered = rules.clone();
        let victim = pick.index(lowered.len());
        prop_assume!(lowered[victim].id != selected);
        lowered[victim].priority -= 10;

        let after = calculate_tax(&context, &lowered, TaxRate::zero());
        prop_assert_eq!(after.applied_rules[0].id.clone(), selected);
        prop_assert_eq!(after.amount, before.amount);
    }

    /// A disabled weekday is closed at every minute of the day.
    #[test]
    fn disabled_day_always_closed(at in arb_local_time()) {
        let schedule = WEEK
            .iter()
            .fold(WeeklySchedule::default(), |s, d| s.with_day(*d, DaySchedule::closed()));
        let hours = BusinessHours { schedule, ..Default::default() };

        let status = is_business_open(at, Some(&hours), &[]);
        prop_assert!(!status.is_open);
        prop_assert!(status.reason.unwrap().starts_with("Closed on "));
    }

    /// With the same hours every day, the next opening is an open minute at or after `from`.
    #[test]
    fn next_open_is_open_and_not_earlier(
        at in arb_local_time(),
        open in 0u32..24,
        close in 0u32..25,
    ) {
        let hours = uniform_week(open, close);
        let next = get_next_open_time(at, Some(&hours), &[]).unwrap();

        prop_assert!(next >= at);
        prop_assert!(is_business_open(next, Some(&hours), &[]).is_open);
    }

    /// Settling to cents moves the amount by at most half a cent.
    #[test]
    fn settling_is_within_half_a_cent(amount in arb_amount()) {
        let settled = Money::from_decimal(amount).to_decimal();
        prop_assert!((settled - amount).abs() <= Decimal::new(5, 3));
    }
}
