use deferlog::decimal::{decimal_width, encode_f64, encode_i64, encode_u64};
use deferlog::AppendBuffer;

fn render_u64(v: u64) -> String {
    let mut buf = AppendBuffer::new();
    encode_u64(&mut buf, v);
    String::from_utf8(buf.as_bytes().to_vec()).unwrap()
}

fn render_i64(v: i64) -> String {
    let mut buf = AppendBuffer::new();
    encode_i64(&mut buf, v);
    String::from_utf8(buf.as_bytes().to_vec()).unwrap()
}

fn render_f64(v: f64, precision: usize) -> String {
    let mut buf = AppendBuffer::new();
    encode_f64(&mut buf, v, precision);
    String::from_utf8(buf.as_bytes().to_vec()).unwrap()
}

#[test]
fn test_exact_cases() {
    assert_eq!(render_u64(1024), "1024");
    assert_eq!(render_u64(0), "0");
    assert_eq!(render_i64(-7), "-7");
    assert_eq!(render_i64(0), "0");
    assert_eq!(render_f64(3.14159, 2), "3.14");
}

#[test]
fn test_unsigned_round_trip() {
    let values = [
        0u64,
        1,
        9,
        10,
        42,
        99,
        100,
        999,
        1_000,
        65_535,
        99_999,
        100_000,
        1_000_000_007,
        4_294_967_295,
        4_294_967_296,
        999_999_999_999_999_999,
        u64::MAX - 1,
        u64::MAX,
    ];
    for &v in &values {
        let text = render_u64(v);
        assert_eq!(text.parse::<u64>().unwrap(), v, "round trip failed for {}", v);
        if v != 0 {
            assert!(!text.starts_with('0'), "leading zero in {:?}", text);
        }
    }
}

#[test]
fn test_signed_matches_unsigned_magnitude() {
    let values = [-1i64, -9, -10, -99, -100, -12345, i64::MIN + 1, i64::MIN];
    for &v in &values {
        let text = render_i64(v);
        assert!(text.starts_with('-'), "negative value must lead with '-': {:?}", text);
        assert_eq!(text[1..], render_u64(v.unsigned_abs()));
        assert_eq!(text.parse::<i64>().unwrap(), v);
    }
    assert_eq!(render_i64(i64::MAX), render_u64(i64::MAX as u64));
}

#[test]
fn test_width_classifier_matches_rendered_length() {
    // every power-of-ten boundary on both sides
    let mut boundaries = vec![0u64, 5];
    let mut p = 1u64;
    loop {
        boundaries.push(p);
        boundaries.push(p - 1);
        boundaries.push(p + 1);
        match p.checked_mul(10) {
            Some(next) => p = next,
            None => break,
        }
    }
    boundaries.push(u64::MAX);
    for &v in &boundaries {
        assert_eq!(
            decimal_width(v),
            render_u64(v).len(),
            "classifier disagrees with rendered width for {}",
            v
        );
    }
}

#[test]
fn test_float_precision_zero_has_no_point() {
    assert_eq!(render_f64(3.7, 0), "3");
    assert_eq!(render_f64(0.9, 0), "0");
    assert_eq!(render_f64(-12.5, 0), "-12");
    assert!(!render_f64(1234.5678, 0).contains('.'));
}

#[test]
fn test_float_single_point_and_padding() {
    let text = render_f64(1.05, 2);
    assert_eq!(text, "1.05");
    assert_eq!(text.matches('.').count(), 1);

    // fractional digits are left-zero-padded to the full precision
    assert_eq!(render_f64(2.0, 3), "2.000");
    assert_eq!(render_f64(0.0, 2), "0.00");
    assert_eq!(render_f64(5.0009765625, 1), "5.0");
}

#[test]
fn test_float_truncates_toward_zero() {
    // 0.875 and 0.5 are exact in binary, so the truncation is unambiguous
    assert_eq!(render_f64(1.875, 2), "1.87");
    assert_eq!(render_f64(-1.875, 2), "-1.87");
    assert_eq!(render_f64(2.5, 0), "2");
}

#[test]
fn test_float_round_trip_within_precision() {
    let values = [0.0f64, 0.125, 1.0, 3.14159, 99.999, 1234.5678, 987654.321, -42.75];
    for &v in &values {
        for precision in 1..=6usize {
            let text = render_f64(v, precision);
            let parsed: f64 = text.parse().unwrap();
            let tolerance = 10f64.powi(-(precision as i32));
            assert!(
                (parsed - v).abs() <= tolerance,
                "{} at precision {} rendered {:?}, off by more than {}",
                v,
                precision,
                text,
                tolerance
            );
        }
    }
}

#[test]
fn test_float_large_magnitudes_chunked() {
    // exactly representable values above one 9-digit chunk
    assert_eq!(render_f64(1_000_000_000.0, 0), "1000000000");
    assert_eq!(render_f64(1_234_567_890.0, 0), "1234567890");
    assert_eq!(render_f64(1e18, 0), "1000000000000000000");
    assert_eq!(render_f64(123_456_789_012_345.0, 0), "123456789012345");

    // interior chunks are zero-padded to the full nine digits
    assert_eq!(render_f64(2_000_000_001.0, 0), "2000000001");
}

#[test]
fn test_float_negative_sign_position() {
    let text = render_f64(-3.25, 2);
    assert_eq!(text, "-3.25");
    assert_eq!(&text[..1], "-");
}

#[test]
fn test_float_non_finite() {
    assert_eq!(render_f64(f64::NAN, 3), "NaN");
    assert_eq!(render_f64(f64::INFINITY, 3), "inf");
    assert_eq!(render_f64(f64::NEG_INFINITY, 3), "-inf");
}

#[test]
fn test_fraction_never_overflows_precision_digits() {
    // a fraction within one ulp of 1.0 must not carry into an extra digit
    let nearly_one = 1.0f64 - f64::EPSILON;
    for precision in 1..=9usize {
        let text = render_f64(nearly_one, precision);
        let dot = text.find('.').unwrap();
        assert_eq!(text.len() - dot - 1, precision, "bad width in {:?}", text);
    }
}
