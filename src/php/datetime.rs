//! Date formatting in the style of `Language::sprintfDate`.

use super::strtotime;
use core::fmt::Write as _;
use numerals::roman::Roman;
use time::{Month, OffsetDateTime, Time, UtcOffset, Weekday};

/// Any time error.
#[derive(Debug, thiserror::Error)]
pub enum DateTimeError {
    /// The input could not be parsed as a date.
    #[error("invalid date: {0}")]
    Parse(#[from] strtotime::PegError),
    /// A date component was out of range.
    #[error(transparent)]
    Range(#[from] time::error::ComponentRange),
    /// The year is outside of 0000–9999.
    #[error("year {0} is out of range")]
    YearRange(i32),
    /// An error occurred when trying to write to a string.
    #[error(transparent)]
    Write(#[from] core::fmt::Error),
}

/// Localised month and weekday names.
#[derive(Debug)]
pub struct DateNames {
    /// Month names, January first.
    pub months: [&'static str; 12],
    /// Month names in the genitive case, for `xg`.
    pub months_genitive: [&'static str; 12],
    /// Abbreviated month names.
    pub months_abbr: [&'static str; 12],
    /// Weekday names, Sunday first.
    pub weekdays: [&'static str; 7],
    /// Abbreviated weekday names, Sunday first.
    pub weekdays_abbr: [&'static str; 7],
}

impl DateNames {
    /// English.
    pub const EN: Self = Self {
        months: [
            "January",
            "February",
            "March",
            "April",
            "May",
            "June",
            "July",
            "August",
            "September",
            "October",
            "November",
            "December",
        ],
        months_genitive: [
            "January",
            "February",
            "March",
            "April",
            "May",
            "June",
            "July",
            "August",
            "September",
            "October",
            "November",
            "December",
        ],
        months_abbr: [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ],
        weekdays: [
            "Sunday",
            "Monday",
            "Tuesday",
            "Wednesday",
            "Thursday",
            "Friday",
            "Saturday",
        ],
        weekdays_abbr: ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
    };

    /// German.
    pub const DE: Self = Self {
        months: [
            "Januar",
            "Februar",
            "März",
            "April",
            "Mai",
            "Juni",
            "Juli",
            "August",
            "September",
            "Oktober",
            "November",
            "Dezember",
        ],
        months_genitive: [
            "Januar",
            "Februar",
            "März",
            "April",
            "Mai",
            "Juni",
            "Juli",
            "August",
            "September",
            "Oktober",
            "November",
            "Dezember",
        ],
        months_abbr: [
            "Jan.", "Feb.", "Mär.", "Apr.", "Mai", "Jun.", "Jul.", "Aug.", "Sep.", "Okt.", "Nov.",
            "Dez.",
        ],
        weekdays: [
            "Sonntag",
            "Montag",
            "Dienstag",
            "Mittwoch",
            "Donnerstag",
            "Freitag",
            "Samstag",
        ],
        weekdays_abbr: ["So.", "Mo.", "Di.", "Mi.", "Do.", "Fr.", "Sa."],
    };

    /// Dutch.
    pub const NL: Self = Self {
        months: [
            "januari",
            "februari",
            "maart",
            "april",
            "mei",
            "juni",
            "juli",
            "augustus",
            "september",
            "oktober",
            "november",
            "december",
        ],
        months_genitive: [
            "januari",
            "februari",
            "maart",
            "april",
            "mei",
            "juni",
            "juli",
            "augustus",
            "september",
            "oktober",
            "november",
            "december",
        ],
        months_abbr: [
            "jan", "feb", "mrt", "apr", "mei", "jun", "jul", "aug", "sep", "okt", "nov", "dec",
        ],
        weekdays: [
            "zondag",
            "maandag",
            "dinsdag",
            "woensdag",
            "donderdag",
            "vrijdag",
            "zaterdag",
        ],
        weekdays_abbr: ["zo", "ma", "di", "wo", "do", "vr", "za"],
    };

    /// Returns the names for the given language code, falling back to
    /// English.
    pub fn for_language(code: &str) -> &'static Self {
        match code.split(['-', '_']).next().unwrap_or(code) {
            "de" => &Self::DE,
            "nl" => &Self::NL,
            _ => &Self::EN,
        }
    }

    /// The name of the given month.
    fn month(&self, month: Month) -> &'static str {
        self.months[usize::from(u8::from(month)) - 1]
    }

    /// The genitive name of the given month.
    fn month_genitive(&self, month: Month) -> &'static str {
        self.months_genitive[usize::from(u8::from(month)) - 1]
    }

    /// The abbreviated name of the given month.
    fn month_abbr(&self, month: Month) -> &'static str {
        self.months_abbr[usize::from(u8::from(month)) - 1]
    }

    /// The name of the given weekday.
    fn weekday(&self, weekday: Weekday) -> &'static str {
        self.weekdays[usize::from(weekday.number_days_from_sunday())]
    }

    /// The abbreviated name of the given weekday.
    fn weekday_abbr(&self, weekday: Weekday) -> &'static str {
        self.weekdays_abbr[usize::from(weekday.number_days_from_sunday())]
    }
}

/// A point in time with a fixed UTC offset.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct DateTime {
    /// The time.
    inner: OffsetDateTime,
}

impl DateTime {
    /// Creates a new `DateTime` by parsing `text` relative to `now`. Dates
    /// without an explicit offset are read in the offset of `now`, and the
    /// result is projected into that offset.
    ///
    /// An empty string is `now`, and exactly four digits are `HHMM` of the
    /// current day.
    pub fn parse(text: &str, now: OffsetDateTime) -> Result<Self, DateTimeError> {
        let text = text.trim();
        let inner = if text.is_empty() {
            now
        } else if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
            let hour = text[..2].parse::<u8>().unwrap_or(u8::MAX);
            let minute = text[2..].parse::<u8>().unwrap_or(u8::MAX);
            now.replace_time(Time::from_hms(hour, minute, 0)?)
        } else {
            strtotime::parse(text, now)?.to_offset(now.offset())
        };

        if !(0..=9999).contains(&inner.year()) {
            return Err(DateTimeError::YearRange(inner.year()));
        }

        Ok(Self { inner })
    }

    /// Wraps an existing time.
    pub fn from_offset_date_time(inner: OffsetDateTime) -> Self {
        Self { inner }
    }

    /// Projects this time into a different offset.
    #[must_use]
    pub fn to_offset(self, offset: UtcOffset) -> Self {
        Self {
            inner: self.inner.to_offset(offset),
        }
    }

    /// Formats a time according to the
    /// [MediaWiki extended time format](https://www.mediawiki.org/wiki/Special:MyLanguage/Help:Extension:ParserFunctions#time).
    pub fn format(&self, format: &str, names: &DateNames) -> Result<String, DateTimeError> {
        let mut out = String::new();
        let mut f = format.chars();
        let mut roman = false;
        let mut genitive = false;
        while let Some(c) = f.next() {
            match c {
                'x' => match f.next() {
                    Some('r') => roman = true,
                    Some('g') => genitive = true,
                    Some('x') => out.push('x'),
                    // All numbers are already emitted as ASCII decimals
                    Some('n' | 'N') => {}
                    Some(modifier @ ('i' | 'j' | 'k' | 'm' | 'o' | 't' | 'h' | 'T')) => {
                        log::warn!("#time: ignoring unsupported format modifier 'x{modifier}'");
                    }
                    Some(modifier) => {
                        out.push('x');
                        out.push(modifier);
                    }
                    None => out.push('x'),
                },
                '"' => {
                    // 'Template:Tomorrow' uses this
                    let rest = f.as_str();
                    if let Some(end) = rest.find('"') {
                        out.push_str(&rest[..end]);
                        f = rest[end + 1..].chars();
                    } else {
                        out.push('"');
                    }
                }
                '\\' => out.push(f.next().unwrap_or('\\')),
                c => {
                    let mut piece = String::new();
                    if !self.directive(&mut piece, c, names, genitive)? {
                        piece.push(c);
                    }
                    genitive = false;
                    if core::mem::take(&mut roman) {
                        piece = to_roman(&piece).unwrap_or(piece);
                    }
                    out += &piece;
                }
            }
        }
        Ok(out)
    }

    /// Writes a single format directive. Returns false if `c` is not a
    /// directive.
    fn directive(
        &self,
        out: &mut String,
        c: char,
        names: &DateNames,
        genitive: bool,
    ) -> Result<bool, DateTimeError> {
        let d = &self.inner;
        match c {
            'd' => write!(out, "{:02}", d.day())?,
            'D' => out.push_str(names.weekday_abbr(d.weekday())),
            'j' => write!(out, "{}", d.day())?,
            'l' => out.push_str(names.weekday(d.weekday())),
            'N' => write!(out, "{}", d.weekday().number_from_monday())?,
            'w' => write!(out, "{}", d.weekday().number_days_from_sunday())?,
            'z' => write!(out, "{}", d.ordinal() - 1)?,
            'W' => write!(out, "{:02}", d.iso_week())?,
            'F' if genitive => out.push_str(names.month_genitive(d.month())),
            'F' => out.push_str(names.month(d.month())),
            'm' => write!(out, "{:02}", u8::from(d.month()))?,
            'M' => out.push_str(names.month_abbr(d.month())),
            'n' => write!(out, "{}", u8::from(d.month()))?,
            't' => write!(out, "{}", d.month().length(d.year()))?,
            'L' => write!(out, "{}", u8::from(time::util::is_leap_year(d.year())))?,
            'o' => write!(out, "{}", d.date().to_iso_week_date().0)?,
            'Y' => write!(out, "{:04}", d.year())?,
            'y' => write!(out, "{:02}", d.year().rem_euclid(100))?,
            'a' => out.push_str(if d.hour() < 12 { "am" } else { "pm" }),
            'A' => out.push_str(if d.hour() < 12 { "AM" } else { "PM" }),
            'g' => write!(out, "{}", to_12_hour(d.hour()))?,
            'G' => write!(out, "{}", d.hour())?,
            'h' => write!(out, "{:02}", to_12_hour(d.hour()))?,
            'H' => write!(out, "{:02}", d.hour())?,
            'i' => write!(out, "{:02}", d.minute())?,
            's' => write!(out, "{:02}", d.second())?,
            'U' => write!(out, "{}", d.unix_timestamp())?,
            'Z' => write!(out, "{}", d.offset().whole_seconds())?,
            'O' => write_offset(out, d.offset(), "")?,
            'P' => write_offset(out, d.offset(), ":")?,
            'e' | 'T' if d.offset().is_utc() => out.push_str("UTC"),
            'e' | 'T' => write_offset(out, d.offset(), ":")?,
            'I' => out.push('0'),
            'c' => {
                write!(
                    out,
                    "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                    d.year(),
                    u8::from(d.month()),
                    d.day(),
                    d.hour(),
                    d.minute(),
                    d.second()
                )?;
                write_offset(out, d.offset(), ":")?;
            }
            'r' => {
                let en = &DateNames::EN;
                write!(
                    out,
                    "{}, {:02} {} {:04} {:02}:{:02}:{:02} ",
                    en.weekday_abbr(d.weekday()),
                    d.day(),
                    en.month_abbr(d.month()),
                    d.year(),
                    d.hour(),
                    d.minute(),
                    d.second()
                )?;
                write_offset(out, d.offset(), "")?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl core::ops::Deref for DateTime {
    type Target = OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Converts a 24-hour clock hour to a 12-hour clock hour.
fn to_12_hour(hour: u8) -> u8 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

/// Writes a UTC offset as `+HHMM` or `+HH:MM`.
fn write_offset(out: &mut String, offset: UtcOffset, sep: &str) -> core::fmt::Result {
    let sign = if offset.is_negative() { '-' } else { '+' };
    write!(
        out,
        "{sign}{:02}{sep}{:02}",
        offset.whole_hours().unsigned_abs(),
        offset.minutes_past_hour().unsigned_abs()
    )
}

/// Converts a number from 1 to 10000 into uppercase Roman numerals.
fn to_roman(value: &str) -> Option<String> {
    let n = value.parse::<i16>().ok()?;
    (1..=10000)
        .contains(&n)
        .then(|| format!("{:X}", Roman::from(n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-03-05 14:07:09 UTC);

    #[track_caller]
    fn format(fmt: &str, date: &str) -> String {
        DateTime::parse(date, NOW)
            .and_then(|d| d.format(fmt, &DateNames::EN))
            .unwrap()
    }

    #[test]
    fn directives() {
        let date = "09 Feb 2008 10:55:17";
        assert_eq!(format("Y-m-d", date), "2008-02-09");
        assert_eq!(format("y n j", date), "08 2 9");
        assert_eq!(format("D, l", date), "Sat, Saturday");
        assert_eq!(format("M F", date), "Feb February");
        assert_eq!(format("N w z", date), "6 6 39");
        assert_eq!(format("W", date), "06");
        assert_eq!(format("L t", date), "1 29");
        assert_eq!(format("g h G H i s a A", date), "10 10 10 10 55 17 am AM");
        assert_eq!(format("g a", "2008-02-09 00:30"), "12 am");
        assert_eq!(format("h A", "2008-02-09 15:30"), "03 PM");
        assert_eq!(format("U", date), "1202554517");
        assert_eq!(format("c", date), "2008-02-09T10:55:17+00:00");
        assert_eq!(format("r", date), "Sat, 09 Feb 2008 10:55:17 +0000");
    }

    #[test]
    fn literals() {
        let date = "2008-02-09";
        assert_eq!(format(r#""Year" Y"#, date), "Year 2008");
        assert_eq!(format(r"\Y\\Y", date), "Y\\2008");
        assert_eq!(format("Y!", date), "2008!");
        assert_eq!(format("xx", date), "x");
        assert_eq!(format(r#"Y ""#, date), "2008 \"");
    }

    #[test]
    fn roman_numerals() {
        assert_eq!(format("xrY", "4 March 2007"), "MMVII");
        assert_eq!(format("xrn/Y", "4 March 2007"), "III/2007");
        assert_eq!(format("xrY", "0000-01-01"), "0000");
    }

    #[test]
    fn localised_names() {
        let date = DateTime::parse("2008-03-09", NOW).unwrap();
        assert_eq!(date.format("j F Y, l", &DateNames::DE).unwrap(), "9 März 2008, Sonntag");
        assert_eq!(date.format("j M Y", &DateNames::NL).unwrap(), "9 mrt 2008");
        assert_eq!(date.format("xgF", &DateNames::EN).unwrap(), "March");
        assert!(core::ptr::eq(DateNames::for_language("de-at"), &DateNames::DE));
        assert!(core::ptr::eq(DateNames::for_language("fr"), &DateNames::EN));
    }

    #[test]
    fn short_forms() {
        assert_eq!(format("Y-m-d H:i:s", ""), "2024-03-05 14:07:09");
        assert_eq!(format("G:i", "2008"), "20:08");
        assert_eq!(format("Y-m-d", "2008"), "2024-03-05");
        assert!(DateTime::parse("2599", NOW).is_err());
    }

    #[test]
    fn offsets() {
        let date = DateTime::parse("2008-02-09T10:55:17+02:30", NOW).unwrap();
        assert_eq!(date.format("H:i O", &DateNames::EN).unwrap(), "08:25 +0000");
        let local = date.to_offset(UtcOffset::from_hms(-5, 0, 0).unwrap());
        assert_eq!(local.format("H:i P", &DateNames::EN).unwrap(), "03:25 -05:00");
    }
}
