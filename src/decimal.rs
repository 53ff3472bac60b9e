//! Allocation-free base-10 encoders.
//!
//! Integers are rendered two digits per iteration through a single
//! divide/modulo by 100 and a 200-byte digit-pair lookup table, halving the
//! division count of a naive one-digit loop. The exact output width is
//! classified up front so each value costs exactly one
//! [`reserve`](crate::AppendBuffer::reserve)/[`commit`](crate::AppendBuffer::commit)
//! pair with no backtracking.

use std::sync::Once;

use crate::append_buffer::AppendBuffer;

/// Two ASCII characters for every two-digit value 00..=99.
static DIGIT_PAIRS: [u8; 200] = *b"\
0001020304050607080910111213141516171819\
2021222324252627282930313233343536373839\
4041424344454647484950515253545556575859\
6061626364656667686970717273747576777879\
8081828384858687888990919293949596979899";

const CACHE_LINE: usize = 64;

static TOUCH_TABLE: Once = Once::new();

/// Pulls the digit-pair table into cache once per process so the first
/// encoded value does not pay a cold-cache stall. Latency-floor
/// optimization only; correctness does not depend on it.
#[inline]
fn touch_digit_pairs() {
    TOUCH_TABLE.call_once(|| {
        let mut i = 0;
        while i < DIGIT_PAIRS.len() {
            // volatile so the reads are not optimized away
            unsafe { std::ptr::read_volatile(&DIGIT_PAIRS[i]) };
            i += CACHE_LINE;
        }
    });
}

/// Number of decimal digits in `v`, via fixed-threshold branches rather
/// than a logarithm. `decimal_width(0)` is 1.
///
/// Partitioning the low magnitudes first keeps the comparison depth
/// shortest for small values, which dominate real logs.
pub fn decimal_width(v: u64) -> usize {
    if v < 10_000 {
        if v < 100 {
            if v < 10 {
                1
            } else {
                2
            }
        } else if v < 1_000 {
            3
        } else {
            4
        }
    } else if v < 100_000_000 {
        if v < 1_000_000 {
            if v < 100_000 {
                5
            } else {
                6
            }
        } else if v < 10_000_000 {
            7
        } else {
            8
        }
    } else if v < 1_000_000_000_000 {
        if v < 10_000_000_000 {
            if v < 1_000_000_000 {
                9
            } else {
                10
            }
        } else if v < 100_000_000_000 {
            11
        } else {
            12
        }
    } else if v < 10_000_000_000_000_000 {
        if v < 100_000_000_000_000 {
            if v < 10_000_000_000_000 {
                13
            } else {
                14
            }
        } else if v < 1_000_000_000_000_000 {
            15
        } else {
            16
        }
    } else if v < 100_000_000_000_000_000 {
        17
    } else if v < 1_000_000_000_000_000_000 {
        18
    } else if v < 10_000_000_000_000_000_000 {
        19
    } else {
        20
    }
}

/// Writes the digits of `v` ending at `span[pos]` (exclusive), moving
/// backward from the least significant digit. Returns the position of the
/// most significant digit written.
fn write_digits_backward(span: &mut [u8], mut pos: usize, mut v: u64) -> usize {
    while v >= 100 {
        let pair = (v % 100) as usize * 2;
        v /= 100;
        span[pos - 2] = DIGIT_PAIRS[pair];
        span[pos - 1] = DIGIT_PAIRS[pair + 1];
        pos -= 2;
    }
    if v < 10 {
        pos -= 1;
        span[pos] = b'0' + v as u8;
    } else {
        let pair = v as usize * 2;
        pos -= 2;
        span[pos] = DIGIT_PAIRS[pair];
        span[pos + 1] = DIGIT_PAIRS[pair + 1];
    }
    pos
}

/// Encodes an unsigned integer in base 10.
///
/// Zero encodes as exactly `"0"`; no other value carries a leading zero.
pub fn encode_u64(buf: &mut AppendBuffer, v: u64) {
    touch_digit_pairs();
    let width = decimal_width(v);
    let span = buf.reserve(width);
    write_digits_backward(span, width, v);
    buf.commit(width);
}

/// Encodes a signed integer in base 10.
///
/// The width is computed from the absolute value; negative values reserve
/// one extra byte and carry `'-'` in the leading position.
pub fn encode_i64(buf: &mut AppendBuffer, v: i64) {
    touch_digit_pairs();
    let magnitude = v.unsigned_abs();
    if v < 0 {
        let width = decimal_width(magnitude) + 1;
        let span = buf.reserve(width);
        write_digits_backward(span, width, magnitude);
        span[0] = b'-';
        buf.commit(width);
    } else {
        let width = decimal_width(magnitude);
        let span = buf.reserve(width);
        write_digits_backward(span, width, magnitude);
        buf.commit(width);
    }
}

/// One 9-decimal-digit chunk; keeps intermediate integer parts of a double
/// within u64 range.
const CHUNK_FACTOR: f64 = 1_000_000_000.0;

const POW10: [u64; 10] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
];

/// Width of the integer part of a non-negative finite double: nine digits
/// per full chunk plus the classified width of the leading chunk.
fn whole_width(mut value: f64) -> usize {
    let mut width = 0;
    while value >= CHUNK_FACTOR {
        width += 9;
        value /= CHUNK_FACTOR;
    }
    width + decimal_width(value as u64)
}

/// Writes the integer part of `value` ending at `span[pos]` (exclusive),
/// emitting 9-digit chunks from the least significant end. Every chunk
/// except the most significant one is zero-padded to exactly 9 digits.
fn write_whole_backward(span: &mut [u8], mut pos: usize, mut value: f64) {
    while value >= CHUNK_FACTOR {
        let chunk = (value % CHUNK_FACTOR) as u64;
        value /= CHUNK_FACTOR;
        let chunk_start = pos - 9;
        pos = write_digits_backward(span, pos, chunk);
        while pos != chunk_start {
            pos -= 1;
            span[pos] = b'0';
        }
    }
    write_digits_backward(span, pos, value as u64);
}

/// Encodes a floating-point value with a fixed number of fractional digits.
///
/// The fractional part is the scaled remainder **truncated toward zero**
/// (`1.999` at precision 2 encodes as `"1.99"`); this is the single
/// canonical rounding policy of this crate. `precision == 0` omits the
/// decimal point entirely. At most 9 fractional digits are supported.
///
/// Non-finite values encode as `"NaN"`, `"inf"` or `"-inf"`; `-0.0`
/// encodes as zero.
pub fn encode_f64(buf: &mut AppendBuffer, value: f64, precision: usize) {
    debug_assert!(precision <= 9, "fractional precision above 9 digits is unsupported");
    let precision = precision.min(9);

    if value.is_nan() {
        buf.extend(b"NaN");
        return;
    }
    if value.is_infinite() {
        let text: &[u8] = if value < 0.0 { b"-inf" } else { b"inf" };
        buf.extend(text);
        return;
    }

    touch_digit_pairs();

    let negative = value < 0.0;
    let magnitude = if negative { -value } else { value };
    let whole = magnitude.trunc();
    let fraction = magnitude - whole;

    let sign_offset = negative as usize;
    let integer_width = whole_width(whole);
    let fraction_width = if precision > 0 { 1 + precision } else { 0 };
    let width = sign_offset + integer_width + fraction_width;

    let span = buf.reserve(width);
    if precision > 0 {
        // a remainder within one ulp of 1.0 can scale up to 10^precision
        let scaled = ((fraction * POW10[precision] as f64) as u64).min(POW10[precision] - 1);
        let point = sign_offset + integer_width;
        let mut pos = write_digits_backward(span, width, scaled);
        while pos != point + 1 {
            pos -= 1;
            span[pos] = b'0';
        }
        span[point] = b'.';
    }
    write_whole_backward(span, sign_offset + integer_width, whole);
    if negative {
        span[0] = b'-';
    }
    buf.commit(width);
}
