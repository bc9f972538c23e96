//! Synthetic bookkeeping statements appended to every dry-run transcript

use crate::query::interface::quote_literal;
use serde::Deserialize;

/// Identifier quoting for the bookkeeping statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// MySQL-style backticks
    #[default]
    Backtick,
    /// ANSI double quotes
    Double,
}

impl QuoteStyle {
    fn quote(self, ident: &str) -> String {
        match self {
            QuoteStyle::Backtick => format!("`{}`", ident.replace('`', "``")),
            QuoteStyle::Double => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }
}

impl std::str::FromStr for QuoteStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backtick" => Ok(QuoteStyle::Backtick),
            "double" => Ok(QuoteStyle::Double),
            other => Err(format!("unknown quote style: {}", other)),
        }
    }
}

/// Renders insert/delete records for the tracking table
#[derive(Debug, Clone)]
pub struct TrackingStatements {
    table: String,
    quote: QuoteStyle,
}

impl TrackingStatements {
    pub fn new(table: impl Into<String>, quote: QuoteStyle) -> Self {
        Self {
            table: table.into(),
            quote,
        }
    }

    /// Statement recording a migration as applied
    pub fn insert(&self, name: &str) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.quote.quote(&self.table),
            self.quote.quote("name"),
            quote_literal(name)
        )
    }

    /// Statement removing a migration's record
    pub fn delete(&self, name: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {};",
            self.quote.quote(&self.table),
            self.quote.quote("name"),
            quote_literal(name)
        )
    }
}
