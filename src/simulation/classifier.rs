//! Query classifier
//!
//! Decides which statements a dry run may send to the database. Only
//! metadata reads survive: introspection verbs, and reads of the tracking
//! table the runner needs to work out what is pending.

use crate::query::{strip_leading_comments, Query, QueryBody};
use once_cell::sync::Lazy;
use regex::Regex;

static INTROSPECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(show|describe|desc|explain|pragma)\b").expect("valid introspection regex")
});

/// What the capture layer does with a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    PassThrough,
    Capture,
}

/// Classify SQL text; `tracking_table` must already be lowercased
///
/// Leading comments are skipped before the leading keyword is checked.
pub fn classify(sql: &str, tracking_table: &str) -> Disposition {
    let statement = strip_leading_comments(sql);
    if INTROSPECTION.is_match(statement) {
        return Disposition::PassThrough;
    }

    let lowered = statement.to_lowercase();
    if lowered.starts_with("select") && lowered.contains(tracking_table) {
        return Disposition::PassThrough;
    }

    Disposition::Capture
}

/// Classify a query; bound payloads are never inspected
pub fn classify_query(query: &Query, tracking_table: &str) -> Disposition {
    match &query.body {
        QueryBody::Sql(sql) => classify(sql, tracking_table),
        QueryBody::Bound { .. } => Disposition::PassThrough,
    }
}
