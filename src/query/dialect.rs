use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// SQL flavour a query is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[strum(serialize = "postgres")]
    Postgres,
    #[strum(serialize = "sqlite")]
    Sqlite,
}

impl Dialect {
    /// Placeholder for the `index`-th bound parameter, counted from 1.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => "?".to_string(),
        }
    }

    pub fn match_operator(self, case_sensitive: bool) -> &'static str {
        match (self, case_sensitive) {
            (Dialect::Postgres, true) => "LIKE",
            (Dialect::Postgres, false) => "ILIKE",
            (Dialect::Sqlite, true) => "GLOB",
            (Dialect::Sqlite, false) => "LIKE",
        }
    }

    /// Trailer appended after the bound pattern, if the operator needs one.
    pub fn match_suffix(self, case_sensitive: bool) -> &'static str {
        match (self, case_sensitive) {
            (Dialect::Sqlite, false) => " ESCAPE '\\'",
            _ => "",
        }
    }

    /// Wraps a literal substring into a pattern for `match_operator`, with
    /// the operator's wildcards escaped so the value only matches itself.
    pub fn contains_pattern(self, value: &str, case_sensitive: bool) -> String {
        if matches!((self, case_sensitive), (Dialect::Sqlite, true)) {
            let mut escaped = String::with_capacity(value.len() + 2);
            escaped.push('*');
            for c in value.chars() {
                match c {
                    '*' | '?' | '[' => {
                        escaped.push('[');
                        escaped.push(c);
                        escaped.push(']');
                    }
                    _ => escaped.push(c),
                }
            }
            escaped.push('*');
            return escaped;
        }

        let mut escaped = String::with_capacity(value.len() + 2);
        escaped.push('%');
        for c in value.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }

    /// First day of the period containing `content.date`. Weeks start on
    /// Monday on both backends.
    pub fn period_expression(self, unit: TimeUnit) -> &'static str {
        match self {
            Dialect::Postgres => match unit {
                TimeUnit::Year => "CAST(date_trunc('year', content.date) AS DATE)",
                TimeUnit::Quarter => "CAST(date_trunc('quarter', content.date) AS DATE)",
                TimeUnit::Month => "CAST(date_trunc('month', content.date) AS DATE)",
                TimeUnit::Week => "CAST(date_trunc('week', content.date) AS DATE)",
                TimeUnit::Day => "CAST(date_trunc('day', content.date) AS DATE)",
            },
            Dialect::Sqlite => match unit {
                TimeUnit::Year => "date(content.date, 'start of year')",
                TimeUnit::Quarter => {
                    "date(content.date, 'start of month', printf('-%d months', (CAST(strftime('%m', content.date) AS INTEGER) - 1) % 3))"
                }
                TimeUnit::Month => "date(content.date, 'start of month')",
                TimeUnit::Week => "date(content.date, 'weekday 0', '-6 days')",
                TimeUnit::Day => "date(content.date)",
            },
        }
    }

    /// Double-quoted identifier with embedded quotes doubled.
    pub fn quote_identifier(self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Truncation units accepted for per-period counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl TimeUnit {
    pub fn parse(unit: &str) -> Result<Self> {
        unit.trim()
            .parse()
            .map_err(|_| Error::UnsupportedAggregationUnit(unit.to_string()))
    }
}
