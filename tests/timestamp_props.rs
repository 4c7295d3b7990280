// tests/timestamp_props.rs
//
// Randomized checks on timestamp parsing and range validation.
// Seeded so failures reproduce.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use youtube_sauce::timestamp::{self, TimestampError};

const CASES: usize = 2_000;

fn render(rng: &mut StdRng, h: u8, m: u8, s: u8) -> String {
    // randomly pad components and drop leading zero components
    let pad = |rng: &mut StdRng, v: u8| {
        if v < 10 && rng.random_bool(0.5) {
            format!("0{v}")
        } else {
            v.to_string()
        }
    };
    if h > 0 || rng.random_bool(0.2) {
        format!("{}:{}:{}", pad(rng, h), pad(rng, m), pad(rng, s))
    } else if m > 0 || rng.random_bool(0.5) {
        format!("{}:{}", pad(rng, m), pad(rng, s))
    } else {
        pad(rng, s)
    }
}

#[test]
fn canonical_form_reparses_to_same_seconds() {
    let mut rng = StdRng::seed_from_u64(0x5A11CE);
    for _ in 0..CASES {
        let (h, m, s) = (
            rng.random_range(0..=23u8),
            rng.random_range(0..=59u8),
            rng.random_range(0..=59u8),
        );
        let input = render(&mut rng, h, m, s);
        let expected = h as u32 * 3600 + m as u32 * 60 + s as u32;

        let canonical = timestamp::validate(&input)
            .unwrap_or_else(|e| panic!("{input} should validate: {e}"))
            .expect("non-empty input yields a value");
        let reparsed = timestamp::parse(&canonical).expect("canonical re-parses");
        assert_eq!(reparsed.total_seconds(), expected, "{input} -> {canonical}");
        // canonical is a fixed point
        assert_eq!(reparsed.to_string(), canonical);
        assert!(timestamp::matches_loose_pattern(&canonical));
    }
}

#[test]
fn start_after_end_always_fails() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..CASES {
        let a = rng.random_range(0..86_400u32);
        let b = rng.random_range(0..86_400u32);
        if a == b {
            continue;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        let fmt = |t: u32| format!("{}:{:02}:{:02}", t / 3600, (t / 60) % 60, t % 60);

        assert_eq!(
            timestamp::validate_range(Some(&fmt(hi)), Some(&fmt(lo))),
            Err(TimestampError::EndBeforeStart)
        );
        assert!(timestamp::validate_range(Some(&fmt(lo)), Some(&fmt(hi))).is_ok());
    }
}

#[test]
fn out_of_range_components_are_rejected() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let bad = rng.random_range(60..=99u8);
        let input = format!("1:{bad}");
        assert!(matches!(
            timestamp::parse(&input),
            Err(TimestampError::OutOfRange(_))
        ));
        // the server-side shape check does not look at values
        assert!(timestamp::matches_loose_pattern(&input));
    }
    assert!(matches!(
        timestamp::parse("24:00:00"),
        Err(TimestampError::OutOfRange(_))
    ));
}

#[test]
fn documented_examples() {
    assert_eq!(
        timestamp::validate_pair("1:5", "2:00"),
        Ok((Some("1:05".to_string()), Some("2:00".to_string())))
    );
    let err = timestamp::validate_pair("2:00", "1:00").unwrap_err();
    assert_eq!(err.to_string(), "end time must be after start time");

    assert_eq!(timestamp::validate("  "), Ok(None));
    assert_eq!(timestamp::validate("5").unwrap().as_deref(), Some("0:05"));
    assert_eq!(timestamp::validate("00:00:00").unwrap().as_deref(), Some("0:00"));
    assert_eq!(timestamp::validate("01:02:03").unwrap().as_deref(), Some("1:02:03"));
    assert!(matches!(
        timestamp::parse("1:2:3:4"),
        Err(TimestampError::InvalidFormat(_))
    ));
    assert!(matches!(
        timestamp::parse("abc"),
        Err(TimestampError::InvalidFormat(_))
    ));
}
