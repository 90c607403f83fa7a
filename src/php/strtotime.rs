//! A parser for the subset of PHP `strtotime` date strings that appear in
//! templates.

use time::{Date, Duration, Month, OffsetDateTime, Time, UtcOffset, Weekday};

/// A parser error.
pub type PegError = peg::error::ParseError<peg::str::LineCol>;

/// A parsed date string.
#[derive(Debug, Eq, PartialEq)]
enum Parsed {
    /// The current time.
    Now,
    /// Midnight, offset by a number of days from today.
    Midnight(i64),
    /// Seconds since the Unix epoch.
    Timestamp(i64),
    /// An absolute date, with an optional time and offset.
    Absolute(Date, Option<Time>, Option<UtcOffset>),
}

/// Parses a date string. Dates without an explicit offset are in the offset
/// of `now`.
pub(super) fn parse(text: &str, now: OffsetDateTime) -> Result<OffsetDateTime, super::DateTimeError> {
    Ok(match strtotime::datetime(text)? {
        Parsed::Now => now,
        Parsed::Midnight(days) => now.replace_time(Time::MIDNIGHT) + Duration::days(days),
        Parsed::Timestamp(ts) => OffsetDateTime::from_unix_timestamp(ts)?,
        Parsed::Absolute(date, time, offset) => date
            .with_time(time.unwrap_or(Time::MIDNIGHT))
            .assume_offset(offset.unwrap_or(now.offset())),
    })
}

/// Looks up an English month name or abbreviation.
fn month_from_name(name: &str) -> Option<Month> {
    let name = name.to_ascii_lowercase();
    Some(match name.as_str() {
        "january" | "jan" => Month::January,
        "february" | "feb" => Month::February,
        "march" | "mar" => Month::March,
        "april" | "apr" => Month::April,
        "may" => Month::May,
        "june" | "jun" => Month::June,
        "july" | "jul" => Month::July,
        "august" | "aug" => Month::August,
        "september" | "sep" | "sept" => Month::September,
        "october" | "oct" => Month::October,
        "november" | "nov" => Month::November,
        "december" | "dec" => Month::December,
        _ => return None,
    })
}

/// Looks up an English weekday name or abbreviation.
fn weekday_from_name(name: &str) -> Option<Weekday> {
    let name = name.to_ascii_lowercase();
    Some(match name.as_str() {
        "sunday" | "sun" => Weekday::Sunday,
        "monday" | "mon" => Weekday::Monday,
        "tuesday" | "tue" | "tues" => Weekday::Tuesday,
        "wednesday" | "wed" => Weekday::Wednesday,
        "thursday" | "thu" | "thurs" => Weekday::Thursday,
        "friday" | "fri" => Weekday::Friday,
        "saturday" | "sat" => Weekday::Saturday,
        _ => return None,
    })
}

/// Looks up a relative day keyword.
fn relative_from_name(name: &str) -> Option<Parsed> {
    let name = name.to_ascii_lowercase();
    Some(match name.as_str() {
        "now" => Parsed::Now,
        "today" | "midnight" => Parsed::Midnight(0),
        "tomorrow" => Parsed::Midnight(1),
        "yesterday" => Parsed::Midnight(-1),
        _ => return None,
    })
}

/// Builds an absolute date.
fn absolute(
    year: i32,
    month: Month,
    day: u8,
    time: Option<Time>,
    offset: Option<UtcOffset>,
) -> Result<Parsed, &'static str> {
    Date::from_calendar_date(year, month, day)
        .map(|date| Parsed::Absolute(date, time, offset))
        .or(Err("valid date"))
}

peg::parser! {grammar strtotime() for str {
    rule _ = quiet!{[' '|'\t'|'\u{00a0}']+}
    rule digit() = quiet!{['0'..='9']} / expected!("digit")
    rule alpha() = quiet!{['a'..='z'|'A'..='Z']} / expected!("letter")
    rule word() -> &'input str = $(alpha()+)

    rule n2() -> u8
        = n:$(digit()*<1,2>) {? n.parse().or(Err("number")) }
    rule nlz2() -> u8
        = n:$(digit()*<2>) {? n.parse().or(Err("two digits")) }
    rule year4() -> i32
        = n:$(digit()*<4>) {? n.parse().or(Err("four-digit year")) }
    rule daysuf() = quiet!{"st" / "nd" / "rd" / "th"}

    rule monthtext() -> Month
        = w:word() "."? {? month_from_name(w).ok_or("month name") }
    rule monthnum() -> Month
        = n:nlz2() {? Month::try_from(n).or(Err("month")) }
    rule daytext()
        = w:word() {? weekday_from_name(w).map(|_| ()).ok_or("day name") }

    rule meridian() -> bool
        = _? p:(['a'|'A'] { false } / ['p'|'P'] { true }) "."? ['m'|'M'] "."? { p }
    rule time() -> Time
        = h:n2() ":" m:nlz2() s:(":" s:nlz2() { s })? ("." digit()+)? pm:meridian()?
        {?
            let h = match pm {
                Some(pm) if (1..=12).contains(&h) => Ok(h % 12 + if pm { 12 } else { 0 }),
                Some(_) => Err("12-hour hour"),
                None => Ok(h),
            };
            h.and_then(|h| Time::from_hms(h, m, s.unwrap_or(0)).or(Err("valid time")))
        }
    rule offset() -> UtcOffset
        = _? ("Z" / "UTC" / "GMT") { UtcOffset::UTC }
        / _? sign:$(['+'|'-']) h:nlz2() ":"? m:nlz2()
        {?
            // Clippy: `nlz2` is at most 99.
            #[allow(clippy::cast_possible_wrap)]
            let (h, m) = (h as i8, m as i8);
            let (h, m) = if sign == "-" { (-h, -m) } else { (h, m) };
            UtcOffset::from_hms(h, m, 0).or(Err("valid offset"))
        }

    rule relative() -> Parsed
        = w:word() {? relative_from_name(w).ok_or("relative day") }
    rule timestamp() -> Parsed
        = "@" n:$("-"? digit()+) {? n.parse().map(Parsed::Timestamp).or(Err("timestamp")) }

    // `Sat, 09 Feb 2008 10:55:17 +0000`
    rule rfc2822() -> Parsed
        = (daytext() "," _?)? d:n2() _ m:monthtext() _ y:year4() _ t:time() o:offset()?
        {? absolute(y, m, d, Some(t), o) }

    // `2008-02-09`, `2008-02-09T10:55:17Z`, `2008-02-09 10:55`
    rule iso8601() -> Parsed
        = y:year4() "-" m:monthnum() "-" d:nlz2() t:(("T" / _) t:time() { t })? o:offset()?
        {? absolute(y, m, d, t, o) }

    // `4 March 2007`, `Sunday 4 March 2007 10:00`, `4-Mar-2007`
    rule dmy() -> Parsed
        = (daytext() ","? _)? d:n2() daysuf()? (_ / "-") m:monthtext() (_ / "-") y:year4()
          t:(_ t:time() { t })? o:offset()?
        {? absolute(y, m, d, t, o) }

    // `March 4, 2007`, `March 4 2007 10:00`
    rule mdy() -> Parsed
        = (daytext() ","? _)? m:monthtext() _ d:n2() daysuf()? ","? _ y:year4()
          t:(_ t:time() { t })? o:offset()?
        {? absolute(y, m, d, t, o) }

    pub rule datetime() -> Parsed
        = _? p:(timestamp() / rfc2822() / iso8601() / dmy() / mdy() / relative()) _? { p }
}}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset, time};

    const NOW: OffsetDateTime = datetime!(2024-03-05 14:07:09 UTC);

    #[track_caller]
    fn parse_ok(text: &str) -> OffsetDateTime {
        parse(text, NOW).unwrap_or_else(|err| panic!("'{text}' failed: {err}"))
    }

    #[test]
    fn relative() {
        assert_eq!(parse_ok("now"), NOW);
        assert_eq!(parse_ok("Today"), datetime!(2024-03-05 0:00 UTC));
        assert_eq!(parse_ok("tomorrow"), datetime!(2024-03-06 0:00 UTC));
        assert_eq!(parse_ok("yesterday"), datetime!(2024-03-04 0:00 UTC));
        assert_eq!(parse_ok("@1202554517"), datetime!(2008-02-09 10:55:17 UTC));
    }

    #[test]
    fn rfc2822() {
        assert_eq!(
            parse_ok("Sat, 09 Feb 2008 10:55:17 +0000"),
            datetime!(2008-02-09 10:55:17 UTC)
        );
        assert_eq!(
            parse_ok("09 Feb 2008 10:55:17"),
            datetime!(2008-02-09 10:55:17 UTC)
        );
        assert_eq!(
            parse_ok("9 Feb 2008 10:55 -0130").to_offset(offset!(UTC)),
            datetime!(2008-02-09 12:25 UTC)
        );
    }

    #[test]
    fn iso8601() {
        assert_eq!(parse_ok("2008-02-09").date(), date!(2008-02-09));
        assert_eq!(parse_ok("2008-02-09T10:55:17Z").time(), time!(10:55:17));
        assert_eq!(parse_ok("2008-02-09 10:55").time(), time!(10:55));
        assert_eq!(
            parse_ok("2008-02-09T10:55:17+02:00").offset(),
            offset!(+2)
        );
    }

    #[test]
    fn written_dates() {
        assert_eq!(parse_ok("4 March 2007").date(), date!(2007-03-04));
        assert_eq!(parse_ok("4th March 2007").date(), date!(2007-03-04));
        assert_eq!(parse_ok("4-Mar-2007").date(), date!(2007-03-04));
        assert_eq!(parse_ok("Sunday, 4 March 2007").date(), date!(2007-03-04));
        assert_eq!(parse_ok("March 4, 2007").date(), date!(2007-03-04));
        assert_eq!(parse_ok("Sept 4 2007 3:30 pm").time(), time!(15:30));
        assert_eq!(parse_ok(" 1 Jan. 1999 ").date(), date!(1999-01-01));
    }

    #[test]
    fn invalid() {
        for text in ["", "garbage", "31 February 2007", "2008-13-01", "Feb 2008", "12:00 pmx"] {
            assert!(parse(text, NOW).is_err(), "'{text}' should not parse");
        }
    }
}
