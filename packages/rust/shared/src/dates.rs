//! Date stagger generator.
//!
//! Each catalog position gets its own publication date, `start + index * interval`.
//! Both textual forms of a date (ISO and display) come from the same
//! [`NaiveDate`], so they cannot drift apart.

use chrono::format::{Fixed, Item, Numeric, Pad, StrftimeItems};
use chrono::{Days, NaiveDate};

use crate::config::DatesConfig;
use crate::error::{PagePatchError, Result};

/// Computes one date per catalog position at a fixed spacing.
#[derive(Debug, Clone)]
pub struct DateStagger {
    start: NaiveDate,
    interval_days: u32,
    display_format: String,
}

/// A date assigned to a catalog position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateAssignment {
    pub index: usize,
    pub date: NaiveDate,
}

/// Both textual representations of one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDate {
    pub date: NaiveDate,
    /// Machine-readable form, e.g. `2026-02-01`.
    pub iso: String,
    /// Human-readable form, e.g. `01/02/2026`.
    pub display: String,
}

impl DateStagger {
    /// Build a stagger, validating the interval and the display format.
    ///
    /// The display format must round-trip: formatting a date and parsing it
    /// back has to give the same date.
    pub fn new(start: NaiveDate, interval_days: u32, display_format: impl Into<String>) -> Result<Self> {
        let display_format = display_format.into();

        if interval_days == 0 {
            return Err(PagePatchError::config(
                "dates.interval_days must be at least 1",
            ));
        }

        display_pattern(&display_format)?;

        let probe = start.format(&display_format).to_string();
        match NaiveDate::parse_from_str(&probe, &display_format) {
            Ok(parsed) if parsed == start => {}
            _ => {
                return Err(PagePatchError::config(format!(
                    "dates.display_format '{display_format}' does not identify a calendar date"
                )));
            }
        }

        Ok(Self {
            start,
            interval_days,
            display_format,
        })
    }

    /// Build a stagger from the `[dates]` config section.
    pub fn from_config(config: &DatesConfig) -> Result<Self> {
        Self::new(config.start, config.interval_days, config.display_format.clone())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    /// Date for catalog position `index`.
    pub fn assign(&self, index: usize) -> Result<DateAssignment> {
        let offset = (index as u64)
            .checked_mul(u64::from(self.interval_days))
            .ok_or_else(|| PagePatchError::validation(format!("date offset overflow at index {index}")))?;

        let date = self
            .start
            .checked_add_days(Days::new(offset))
            .ok_or_else(|| {
                PagePatchError::validation(format!("date out of range at index {index}"))
            })?;

        Ok(DateAssignment { index, date })
    }

    /// Render an assignment in both textual forms.
    pub fn render(&self, assignment: &DateAssignment) -> RenderedDate {
        RenderedDate {
            date: assignment.date,
            iso: assignment.date.format("%Y-%m-%d").to_string(),
            display: assignment.date.format(&self.display_format).to_string(),
        }
    }

    /// Parse a display-form date back into a calendar date.
    pub fn parse_display(&self, display: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(display, &self.display_format).ok()
    }
}

/// Regex source matching any date rendered with `format`.
///
/// Only date fields are accepted: a display date has to be found again on
/// the next run, and time or zone fields cannot be formatted from a date.
pub fn display_pattern(format: &str) -> Result<String> {
    let unsupported = |what: &str| {
        PagePatchError::config(format!(
            "dates.display_format '{format}': {what} cannot appear in a display date"
        ))
    };

    let mut pattern = String::new();
    for item in StrftimeItems::new(format) {
        match item {
            Item::Literal(s) | Item::Space(s) => pattern.push_str(&regex::escape(s)),
            Item::OwnedLiteral(s) | Item::OwnedSpace(s) => pattern.push_str(&regex::escape(&s)),
            Item::Numeric(field, pad) => {
                let field = numeric_pattern(&field, pad)
                    .ok_or_else(|| unsupported("a time or timestamp field"))?;
                pattern.push_str(field);
            }
            Item::Fixed(
                Fixed::ShortMonthName
                | Fixed::LongMonthName
                | Fixed::ShortWeekdayName
                | Fixed::LongWeekdayName,
            ) => pattern.push_str(r"\p{L}+"),
            Item::Fixed(_) => return Err(unsupported("a time or zone field")),
            _ => {
                return Err(PagePatchError::config(format!(
                    "dates.display_format '{format}' is not a valid strftime format"
                )));
            }
        }
    }
    Ok(pattern)
}

fn numeric_pattern(field: &Numeric, pad: Pad) -> Option<&'static str> {
    let pattern = match field {
        Numeric::Year | Numeric::IsoYear => r"\d{4}",
        Numeric::Ordinal => match pad {
            Pad::Zero => r"\d{3}",
            Pad::Space => r" {0,2}\d{1,3}",
            _ => r"\d{1,3}",
        },
        Numeric::YearDiv100
        | Numeric::YearMod100
        | Numeric::IsoYearDiv100
        | Numeric::IsoYearMod100
        | Numeric::Month
        | Numeric::Day
        | Numeric::WeekFromSun
        | Numeric::WeekFromMon
        | Numeric::IsoWeek => match pad {
            Pad::Zero => r"\d{2}",
            Pad::Space => r" ?\d{1,2}",
            _ => r"\d{1,2}",
        },
        Numeric::NumDaysFromSun | Numeric::WeekdayFromMon => r"\d",
        _ => return None,
    };
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stagger() -> DateStagger {
        let start = NaiveDate::from_ymd_opt(2026, 1, 20).expect("valid date");
        DateStagger::new(start, 3, "%d/%m/%Y").expect("valid stagger")
    }

    #[test]
    fn index_four_lands_on_first_of_february() {
        let s = stagger();
        let assignment = s.assign(4).unwrap();
        let rendered = s.render(&assignment);
        assert_eq!(rendered.iso, "2026-02-01");
        assert_eq!(rendered.display, "01/02/2026");
    }

    #[test]
    fn index_zero_is_start_date() {
        let s = stagger();
        assert_eq!(s.assign(0).unwrap().date, s.start());
    }

    #[test]
    fn dates_are_strictly_increasing_with_exact_spacing() {
        let s = stagger();
        for i in 0..20usize {
            for j in (i + 1)..20usize {
                let a = s.assign(i).unwrap().date;
                let b = s.assign(j).unwrap().date;
                assert!(a < b);
                assert_eq!((b - a).num_days(), (j - i) as i64 * 3);
            }
        }
    }

    #[test]
    fn both_renderings_decode_to_the_same_date() {
        let s = stagger();
        for i in 0..15 {
            let rendered = s.render(&s.assign(i).unwrap());
            let from_iso = NaiveDate::parse_from_str(&rendered.iso, "%Y-%m-%d").unwrap();
            let from_display = s.parse_display(&rendered.display).unwrap();
            assert_eq!(from_iso, rendered.date);
            assert_eq!(from_display, rendered.date);
        }
    }

    #[test]
    fn zero_interval_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let err = DateStagger::new(start, 0, "%d/%m/%Y").unwrap_err();
        assert!(err.to_string().contains("interval_days"));
    }

    #[test]
    fn lossy_display_format_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let err = DateStagger::new(start, 3, "%d/%m").unwrap_err();
        assert!(err.to_string().contains("display_format"));

        let err = DateStagger::new(start, 3, "%Q").unwrap_err();
        assert!(err.to_string().contains("display_format"));
    }

    #[test]
    fn time_fields_rejected_in_display_format() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let err = DateStagger::new(start, 3, "%d/%m/%Y %H:%M").unwrap_err();
        assert!(err.to_string().contains("time or timestamp field"));

        let err = DateStagger::new(start, 3, "%d/%m/%Y %Z").unwrap_err();
        assert!(err.to_string().contains("zone field"));
    }

    #[test]
    fn display_pattern_matches_rendered_dates() {
        for format in ["%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d %B %Y", "%d %b %Y", "%A %d %B %Y"] {
            let start = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
            let s = DateStagger::new(start, 3, format).unwrap();
            let re = regex::Regex::new(&format!("^(?:{})$", display_pattern(format).unwrap())).unwrap();
            for i in 0..40 {
                let rendered = s.render(&s.assign(i).unwrap());
                assert!(re.is_match(&rendered.display), "{format}: {}", rendered.display);
            }
        }
    }

    #[test]
    fn display_pattern_escapes_literals() {
        assert_eq!(display_pattern("%d.%m.%Y").unwrap(), r"\d{2}\.\d{2}\.\d{4}");
        assert_eq!(display_pattern("le %d/%m/%Y").unwrap(), r"le \d{2}/\d{2}/\d{4}");
    }
}
