use chrono::{Days, NaiveDate};

use crate::error::ReportError;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliceWidth {
    #[default]
    Day,
    Week,
}

impl SliceWidth {
    fn days(self) -> u64 {
        match self {
            SliceWidth::Day => 1,
            SliceWidth::Week => 7,
        }
    }
}

/// Inclusive calendar range requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One search window. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSlice {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub width: SliceWidth,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|source| {
        ReportError::InvalidDate {
            value: value.to_string(),
            source,
        }
    })
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ReportError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Splits the range into back-to-back windows. The search operators on the
    /// far end are strict, so the last window closes on the day after `end`.
    pub fn slices(&self, width: SliceWidth) -> Vec<DateSlice> {
        let limit = self
            .end
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);
        let mut slices = Vec::new();
        let mut cursor = self.start;

        while cursor <= self.end {
            let next = cursor
                .checked_add_days(Days::new(width.days()))
                .map_or(limit, |date| date.min(limit));
            slices.push(DateSlice {
                start: cursor,
                end: next,
                width,
            });
            if next <= cursor {
                break;
            }
            cursor = next;
        }

        slices
    }
}

impl DateSlice {
    /// Search term for this window, without the `type:ticket` prefix.
    pub fn query(&self) -> String {
        match self.width {
            SliceWidth::Day => format!("solved:{}", self.start),
            SliceWidth::Week => format!("created>={} created<{}", self.start, self.end),
        }
    }
}
