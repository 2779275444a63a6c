use std::fmt;
use std::str::FromStr;

use jiff::civil::Date;
use rust_decimal::Decimal;
use serde::Serialize;

/// Printed when no entry carries the requested code.
pub const NOTHING_FOUND: &str = "nothing found";

/// One day's rates, in the order the provider listed them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RateTable {
    /// Date the provider published the table for; may precede the requested date.
    pub date: Option<Date>,
    pub entries: Vec<RateEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateEntry {
    /// Three-letter currency code, e.g. `USD`.
    pub code: String,
    pub name: String,
    /// Rate exactly as published, which uses `,` as the decimal separator.
    pub value: String,
    /// Number of units `value` is quoted for.
    pub nominal: Option<u32>,
    pub num_code: Option<String>,
}

impl RateEntry {
    /// The published value as a number.
    pub fn rate(&self) -> Option<Decimal> {
        Decimal::from_str(&self.value.trim().replace(',', ".")).ok()
    }

    /// Rate for a single unit of the currency.
    pub fn unit_rate(&self) -> Option<Decimal> {
        let rate = self.rate()?;
        match self.nominal {
            None | Some(1) => Some(rate),
            Some(0) => None,
            Some(n) => rate.checked_div(Decimal::from(n)).map(|r| r.normalize()),
        }
    }
}

impl fmt::Display for RateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.code, self.name, self.value)
    }
}

impl RateTable {
    /// Every entry whose code equals `code` exactly, first to last.
    pub fn lookup<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a RateEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.code == code)
    }

    /// Text report for `code`: one line per match, or [`NOTHING_FOUND`].
    pub fn report(&self, code: &str) -> String {
        let lines: Vec<String> = self.lookup(code).map(ToString::to_string).collect();
        if lines.is_empty() {
            NOTHING_FOUND.to_string()
        } else {
            lines.join("\n")
        }
    }

    /// JSON report for `code`: an array of matches, empty when nothing matches.
    pub fn report_json(&self, code: &str) -> serde_json::Result<String> {
        let quotes: Vec<Quote> = self
            .lookup(code)
            .map(|entry| Quote {
                entry,
                unit_rate: entry.unit_rate(),
                date: self.date,
            })
            .collect();
        serde_json::to_string_pretty(&quotes)
    }
}

#[derive(Serialize)]
struct Quote<'a> {
    #[serde(flatten)]
    entry: &'a RateEntry,
    unit_rate: Option<Decimal>,
    date: Option<Date>,
}
