//! PHP compatible functions and types.

use std::borrow::Cow;

pub use datetime::{DateNames, DateTime, DateTimeError};

mod datetime;
mod strtotime;

/// Returns true if the given byte is whitespace according to PHP’s numeric
/// string rules.
fn is_php_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

/// Parses a
/// [PHP numeric string](https://www.php.net/manual/en/language.types.numeric-strings.php),
/// returning `None` if the entire string is not numeric.
///
/// Leading and trailing whitespace is allowed. Hexadecimal, `INF`, and `NAN`
/// are not numeric strings.
pub fn parse_numeric(n: &str) -> Option<f64> {
    let n = n.trim_matches(|c: char| c.is_ascii() && is_php_space(c as u8));
    let b = n.as_bytes();
    let mut i = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let int_digits = b[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    i += int_digits;
    let mut frac_digits = 0;
    if b.get(i) == Some(&b'.') {
        i += 1;
        frac_digits = b[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        i += frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        j += usize::from(matches!(b.get(j), Some(b'+' | b'-')));
        let exp_digits = b[j.min(b.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits == 0 {
            return None;
        }
        i = j + exp_digits;
    }
    if i != b.len() {
        return None;
    }
    // A bare "1." or ".5" is fine for PHP but not for Rust
    let n = n.strip_suffix('.').unwrap_or(n);
    if let Some(rest) = n.strip_prefix('.') {
        format!("0.{rest}").parse().ok()
    } else if let Some(rest) = n.strip_prefix("-.").or_else(|| n.strip_prefix("+.")) {
        let sign = if n.starts_with('-') { "-" } else { "" };
        format!("{sign}0.{rest}").parse().ok()
    } else {
        n.parse().ok()
    }
}

/// Performs a fuzzy comparison of two string values
/// [like PHP](https://www.php.net/manual/en/language.types.numeric-strings.php).
///
/// If both values are numeric strings, they are compared as numbers;
/// otherwise they are compared as strings.
#[allow(clippy::float_cmp)]
pub fn fuzzy_cmp(lhs: &str, rhs: &str) -> bool {
    let lhs = lhs.trim_ascii();
    let rhs = rhs.trim_ascii();
    match (parse_numeric(lhs), parse_numeric(rhs)) {
        (Some(l), Some(r)) => {
            if let (Ok(lhs), Ok(rhs)) = (lhs.parse::<i64>(), rhs.parse::<i64>()) {
                lhs == rhs
            } else {
                l == r
            }
        }
        _ => lhs == rhs,
    }
}

/// Finds and replaces substrings in the input like [`strtr`](https://php.net/strtr).
/// To avoid extra temporary allocation, `replacements` should be ordered from
/// longest to shortest match.
pub fn strtr<'a>(input: &'a str, replacements: &[(&str, &str)]) -> Cow<'a, str> {
    let replacements = if replacements.is_sorted_by(|(a, _), (b, _)| a.len() >= b.len()) {
        Cow::Borrowed(replacements)
    } else {
        let mut replacements = Vec::from(replacements);
        replacements.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        Cow::Owned(replacements)
    };

    let mut out = String::new();
    let mut flushed = 0;
    let mut offset = 0;
    'next: while offset < input.len() {
        let rest = &input[offset..];
        for (find, replace) in replacements.iter() {
            if !find.is_empty() && rest.starts_with(find) {
                out += &input[flushed..offset];
                out += replace;
                offset += find.len();
                flushed = offset;
                continue 'next;
            }
        }
        offset += rest.chars().next().map_or(1, char::len_utf8);
    }

    if flushed == 0 {
        Cow::Borrowed(input)
    } else {
        out += &input[flushed..];
        Cow::Owned(out)
    }
}

/// Casts a float to a string similar to [`strval`](https://www.php.net/strval)
/// with the default `precision` of 14 significant digits.
///
/// Numbers with an exponent below -4 or at or above 14 use scientific
/// notation, and the mantissa always keeps at least one fractional digit
/// (`1.0E+14`).
pub fn strval(n: f64) -> String {
    match n {
        f64::INFINITY => return "INF".into(),
        f64::NEG_INFINITY => return "-INF".into(),
        n if n.is_nan() => return "NAN".into(),
        0.0 => return "0".into(),
        _ => {}
    }

    // Formatting in exponent form first gives the exponent after rounding to
    // 14 significant digits, so 99999999999999.9 becomes 1.0E+14
    let sci = format!("{n:.13e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if !(-4..14).contains(&exp) {
        let mut mantissa = mantissa.trim_end_matches('0').to_string();
        if mantissa.ends_with('.') {
            mantissa.push('0');
        }
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}E{sign}{}", exp.unsigned_abs())
    } else {
        // Clippy: `exp` is in the range -4..14.
        #[allow(clippy::cast_sign_loss)]
        let len = (13 - exp) as usize;
        let mut s = format!("{n:.len$}");
        if s.contains('.') {
            let end = s.trim_end_matches('0').trim_end_matches('.').len();
            s.truncate(end);
        }
        if s == "-0" { "0".into() } else { s }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_cmp() {
        assert!(fuzzy_cmp("0", "0.0"));
        assert!(fuzzy_cmp("  +0 ", " -0. "));
        assert!(fuzzy_cmp("00", "0"));
        assert!(fuzzy_cmp("01", "1"));
        assert!(fuzzy_cmp("+07", "7"));
        assert!(fuzzy_cmp("1", "1.0"));
        assert!(fuzzy_cmp("-1", "-1.0"));
        assert!(fuzzy_cmp("1e2", "100"));
        assert!(fuzzy_cmp("1e+2", "100"));
        assert!(fuzzy_cmp("4611686018427387904.0", "4611686018427387905"));
        assert!(!fuzzy_cmp("4611686018427387904", "4611686018427387905"));
        assert!(!fuzzy_cmp("0", "false"));
        assert!(!fuzzy_cmp("inf", "INF"));
        assert!(!fuzzy_cmp("0", "1"));
        assert!(!fuzzy_cmp("0x1A", "26"));
        assert!(fuzzy_cmp("abc", " abc"));
        assert!(!fuzzy_cmp("abc", "ABC"));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(" 12 "), Some(12.0));
        assert_eq!(parse_numeric("1."), Some(1.0));
        assert_eq!(parse_numeric(".5"), Some(0.5));
        assert_eq!(parse_numeric("-.5"), Some(-0.5));
        assert_eq!(parse_numeric("2.5e3"), Some(2500.0));
        assert_eq!(parse_numeric("."), None);
        assert_eq!(parse_numeric("1e"), None);
        assert_eq!(parse_numeric("nan"), None);
        assert_eq!(parse_numeric("1,200"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn test_strtr() {
        let input = "hello, world!";

        // longest first
        assert_eq!(
            strtr(input, &[("ll", "lol"), ("hello", "goodbye")]),
            Cow::<str>::Owned(String::from("goodbye, world!"))
        );

        // do not match already matched
        assert_eq!(
            strtr(input, &[("hello", "world"), ("world", "universe")]),
            Cow::<str>::Owned(String::from("world, universe!"))
        );

        // return original if no match
        assert_eq!(
            strtr(input, &[("foo", "bar")]),
            Cow::Borrowed("hello, world!")
        );

        assert_eq!(strtr("a−b", &[("−", "-")]), "a-b");
    }

    #[test]
    fn test_strval() {
        assert_eq!(strval(f64::INFINITY), "INF");
        assert_eq!(strval(f64::NEG_INFINITY), "-INF");
        assert_eq!(strval(f64::NAN), "NAN");
        assert_eq!(strval(0.0), "0");
        assert_eq!(strval(0.1 + 0.2), "0.3");
        assert_eq!(strval(0.1 + 0.9), "1");
        assert_eq!(strval(1.0 / 3.0), "0.33333333333333");
        assert_eq!(strval(-2.5), "-2.5");
        assert_eq!(strval(0.0001), "0.0001");
        assert_eq!(strval(0.00001), "1.0E-5");
        assert_eq!(strval(1.123_456_789_012_34), "1.1234567890123");
        assert_eq!(strval(0.123_456_789_012_34), "0.12345678901234");
        assert_eq!(strval(12_345_678_901_234.0), "12345678901234");
        assert_eq!(strval(1e14), "1.0E+14");
        assert_eq!(strval(99_999_999_999_999.9), "1.0E+14");
        assert_eq!(strval(123_456_789_012_340.0), "1.2345678901234E+14");
        assert_eq!(strval(-2.5e20), "-2.5E+20");
    }
}
