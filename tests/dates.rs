use chrono::NaiveDate;
use intimation_desk::data::CellValue;
use intimation_desk::dates::{format_canonical, parse_loose_date, text_to_display, to_canonical, to_display};
use proptest::prelude::*;

#[test]
fn display_and_canonical_examples() {
    assert_eq!(to_canonical("25-12-2024").as_deref(), Some("2024-12-25"));
    assert_eq!(text_to_display("2024-12-25"), "25-12-2024");
    assert_eq!(to_display(&CellValue::from("2024-12-25T00:00:00.000Z")), "25-12-2024");
}

#[test]
fn impossible_calendar_dates_are_rejected() {
    assert_eq!(to_canonical("31-02-2024"), None);
    assert_eq!(to_canonical("29-02-2023"), None);
    assert_eq!(to_canonical("29-02-2024").as_deref(), Some("2024-02-29"));
    assert_eq!(to_canonical("00-01-2024"), None);
    assert_eq!(to_canonical("12-13-2024"), None);
}

#[test]
fn unparseable_values_pass_through_display_untouched() {
    assert_eq!(text_to_display("soon"), "soon");
    assert_eq!(text_to_display(""), "");
    assert_eq!(to_display(&CellValue::Null), "");
    assert_eq!(to_display(&CellValue::from(42i64)), "42");
    assert_eq!(to_canonical("soon"), None);
    assert_eq!(to_canonical("   "), None);
}

#[test]
fn loose_input_is_accepted_for_canonical_dates() {
    assert_eq!(to_canonical("2024-12-25").as_deref(), Some("2024-12-25"));
    assert_eq!(to_canonical("Dec 25, 2024").as_deref(), Some("2024-12-25"));
    assert_eq!(
        parse_loose_date("2024-12-25 18:45:00"),
        NaiveDate::from_ymd_opt(2024, 12, 25)
    );
}

proptest! {
    #[test]
    fn display_then_canonical_round_trips(days in 0i64..73_049) {
        let date = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap() + chrono::Duration::days(days);
        let canonical = format_canonical(date);
        let display = text_to_display(&canonical);
        prop_assert_eq!(to_canonical(&display), Some(canonical));
    }
}
