use std::time::Duration;

use proptest::prelude::*;
use vectl_core::parse_duration;

proptest! {
    /// Property: h/m/s groups add up to the same number of seconds
    #[test]
    fn prop_compound_duration_sums(h in 0u64..48, m in 0u64..60, s in 0u64..60) {
        let text = format!("{h}h{m}m{s}s");
        let parsed = parse_duration(&text).unwrap();
        prop_assert_eq!(parsed, Duration::from_secs(h * 3600 + m * 60 + s));
    }

    /// Property: milliseconds round-trip exactly
    #[test]
    fn prop_millis_exact(ms in 0u64..10_000_000) {
        let parsed = parse_duration(&format!("{ms}ms")).unwrap();
        prop_assert_eq!(parsed, Duration::from_millis(ms));
    }

    /// Property: the parser never panics on arbitrary input
    #[test]
    fn prop_never_panics(input in ".{0,16}") {
        let _ = parse_duration(&input);
    }

    /// Property: a number without a unit is rejected unless it is zero
    #[test]
    fn prop_unitless_rejected(n in 1u64..1_000_000) {
        prop_assert!(parse_duration(&n.to_string()).is_err());
    }
}
