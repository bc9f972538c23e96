//! Transcript formatting for captured statements

use crate::migration::Direction;

const BANNER_WIDTH: usize = 60;
const EMPTY_MARKER: &str = "(no statements generated)";

/// Render one migration's captured statements
pub fn format(name: &str, direction: Direction, statements: &[String]) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    let mut out = format!("{}\nMigration: {} ({})\n{}\n", banner, name, direction, banner);

    if statements.is_empty() {
        out.push_str(&format!("  {}\n", EMPTY_MARKER));
        return out;
    }

    for (i, statement) in statements.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, statement));
    }
    out
}
