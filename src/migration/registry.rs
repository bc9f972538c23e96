//! Migration registry
//!
//! An explicit name -> migration map. Names sort lexicographically, so a
//! timestamp or counter prefix gives the execution order.

use super::Migration;
use crate::error::{config_error, not_found_error, AppResult};
use crate::query::{strip_leading_comments, Query, QueryInterface, TypeRegistry};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const UP_MARKER: &str = "-- migrate:up";
const DOWN_MARKER: &str = "-- migrate:down";

/// Ordered set of migrations
#[derive(Default, Clone)]
pub struct MigrationRegistry {
    migrations: BTreeMap<String, Arc<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration under a unique name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        migration: impl Migration + 'static,
    ) -> AppResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(config_error("Migration name must not be empty"));
        }
        if self.migrations.contains_key(&name) {
            return Err(config_error(format!("Duplicate migration name: {}", name)));
        }
        self.migrations.insert(name, Arc::new(migration));
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(
        mut self,
        name: impl Into<String>,
        migration: impl Migration + 'static,
    ) -> AppResult<Self> {
        self.register(name, migration)?;
        Ok(self)
    }

    /// Load one [`SqlMigration`] per file matching `pattern`
    pub fn from_glob(pattern: &str) -> AppResult<Self> {
        let mut registry = Self::new();
        for entry in glob::glob(pattern)? {
            let path = entry?;
            if !path.is_file() {
                continue;
            }
            let name = migration_name(&path)?;
            let source = std::fs::read_to_string(&path)?;
            debug!("Loaded migration {} from {}", name, path.display());
            registry.register(name, SqlMigration::parse(&source))?;
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> AppResult<Arc<dyn Migration>> {
        self.migrations
            .get(name)
            .cloned()
            .ok_or_else(|| not_found_error(format!("Migration {} is not registered", name)))
    }

    /// Names in execution order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.migrations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

fn migration_name(path: &Path) -> AppResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| config_error(format!("Unusable migration file name: {}", path.display())))
}

/// Migration backed by an SQL file with `-- migrate:up` / `-- migrate:down` sections
///
/// A file without markers is treated as up-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlMigration {
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl SqlMigration {
    pub fn parse(source: &str) -> Self {
        let has_markers = source
            .lines()
            .any(|l| is_marker(l, UP_MARKER) || is_marker(l, DOWN_MARKER));

        let mut up = String::new();
        let mut down = String::new();
        let mut current = if has_markers { None } else { Some(&mut up) };

        for line in source.lines() {
            if is_marker(line, UP_MARKER) {
                current = Some(&mut up);
                continue;
            }
            if is_marker(line, DOWN_MARKER) {
                current = Some(&mut down);
                continue;
            }
            if let Some(section) = current.as_deref_mut() {
                section.push_str(line);
                section.push('\n');
            }
        }

        Self {
            up: split_statements(&up),
            down: split_statements(&down),
        }
    }

    async fn run(statements: &[String], queries: &QueryInterface) -> AppResult<()> {
        for statement in statements {
            queries.execute(Query::raw(statement.clone())).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Migration for SqlMigration {
    async fn up(&self, queries: &QueryInterface, _types: &TypeRegistry) -> AppResult<()> {
        Self::run(&self.up, queries).await
    }

    async fn down(&self, queries: &QueryInterface, _types: &TypeRegistry) -> AppResult<()> {
        Self::run(&self.down, queries).await
    }
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.trim().eq_ignore_ascii_case(marker)
}

/// Split on top-level `;`
///
/// Semicolons inside string literals, quoted identifiers, comments and
/// `$tag$` bodies do not end a statement. Leading comments are dropped and
/// chunks with nothing left are skipped.
fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_past(sql, i + 2, "\n"),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_past(sql, i + 2, "*/"),
            b'$' => i = skip_dollar_quoted(sql, i),
            b';' => {
                push_statement(&mut statements, &sql[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    push_statement(&mut statements, &sql[start..]);

    statements
}

fn push_statement(statements: &mut Vec<String>, chunk: &str) {
    let body = strip_leading_comments(chunk).trim_end();
    if !body.is_empty() {
        statements.push(format!("{};", body));
    }
}

/// Index just past the closing quote; a doubled quote is an escape
fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Index just past the next `terminator` at or after `from`
fn skip_past(sql: &str, from: usize, terminator: &str) -> usize {
    sql[from..]
        .find(terminator)
        .map_or(sql.len(), |pos| from + pos + terminator.len())
}

/// Skip a `$tag$ ... $tag$` body; a `$` that opens no tag (e.g. `$1`) is skipped alone
fn skip_dollar_quoted(sql: &str, open: usize) -> usize {
    let bytes = sql.as_bytes();
    if bytes.get(open + 1).is_some_and(u8::is_ascii_digit) {
        return open + 1;
    }

    let mut close = open + 1;
    while close < bytes.len() && (bytes[close].is_ascii_alphanumeric() || bytes[close] == b'_') {
        close += 1;
    }
    if bytes.get(close) != Some(&b'$') {
        return open + 1;
    }

    let tag = &sql[open..=close];
    skip_past(sql, close + 1, tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CREATE_USERS: &str = "\
-- migrate:up
CREATE TABLE users (id INTEGER PRIMARY KEY);
CREATE INDEX users_id ON users (id);

-- migrate:down
-- drop everything
DROP TABLE users;
";

    #[test]
    fn test_parse_sections() {
        let migration = SqlMigration::parse(CREATE_USERS);

        assert_eq!(
            migration.up,
            vec![
                "CREATE TABLE users (id INTEGER PRIMARY KEY);".to_string(),
                "CREATE INDEX users_id ON users (id);".to_string(),
            ]
        );
        assert_eq!(migration.down, vec!["DROP TABLE users;".to_string()]);
    }

    #[test]
    fn test_semicolons_inside_literals_do_not_split() {
        let migration = SqlMigration::parse(
            "INSERT INTO settings (k, v) VALUES ('sep', 'a;b');\n\
             INSERT INTO settings (k, v) VALUES ('quote', 'it''s; fine');\n\
             ALTER TABLE \"odd;name\" ADD COLUMN bio TEXT; -- trailing; note\n",
        );

        assert_eq!(
            migration.up,
            vec![
                "INSERT INTO settings (k, v) VALUES ('sep', 'a;b');".to_string(),
                "INSERT INTO settings (k, v) VALUES ('quote', 'it''s; fine');".to_string(),
                "ALTER TABLE \"odd;name\" ADD COLUMN bio TEXT;".to_string(),
            ]
        );
    }

    #[test]
    fn test_dollar_quoted_bodies_stay_whole() {
        let function = "CREATE FUNCTION touch_updated_at() RETURNS trigger AS $$ \
                        BEGIN NEW.updated_at := now(); RETURN NEW; END; \
                        $$ LANGUAGE plpgsql;";
        let tagged = "DO $body$ BEGIN PERFORM 1; END $body$;";
        let placeholder = "PREPARE find AS SELECT * FROM users WHERE id = $1;";
        let source = format!("{}\n{}\n{}\n", function, tagged, placeholder);

        let migration = SqlMigration::parse(&source);

        assert_eq!(
            migration.up,
            vec![function.to_string(), tagged.to_string(), placeholder.to_string()]
        );
    }

    #[test]
    fn test_leading_comments_are_dropped() {
        let migration = SqlMigration::parse(
            "-- migrate:up\n-- seed admin\n/* id 1 */\n\
             INSERT INTO users (id) VALUES (1);\n-- done\n",
        );

        assert_eq!(migration.up, vec!["INSERT INTO users (id) VALUES (1);".to_string()]);
        assert_eq!(Query::raw(migration.up[0].clone()).kind, crate::query::QueryKind::Insert);
    }

    #[test]
    fn test_parse_without_markers_is_up_only() {
        let migration = SqlMigration::parse("ALTER TABLE users ADD COLUMN bio TEXT");
        assert_eq!(migration.up, vec!["ALTER TABLE users ADD COLUMN bio TEXT;".to_string()]);
        assert!(migration.down.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = MigrationRegistry::new();
        registry.register("0001-init", SqlMigration::default()).unwrap();

        let result = registry.register("0001-init", SqlMigration::default());
        assert!(result.is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = MigrationRegistry::new()
            .with("0002-b", SqlMigration::default())
            .unwrap()
            .with("0001-a", SqlMigration::default())
            .unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["0001-a", "0002-b"]);
        assert!(registry.get("0003-c").is_err());
    }

    #[test]
    fn test_from_glob_loads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("0002-add-bio.sql"),
            "ALTER TABLE users ADD COLUMN bio TEXT;",
        )
        .unwrap();
        std::fs::write(dir.path().join("0001-create-users.sql"), CREATE_USERS).unwrap();
        std::fs::write(dir.path().join("README.md"), "not a migration").unwrap();

        let pattern = format!("{}/*.sql", dir.path().display());
        let registry = MigrationRegistry::from_glob(&pattern).unwrap();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["0001-create-users", "0002-add-bio"]
        );
    }

    #[test]
    fn test_from_glob_invalid_pattern() {
        assert!(MigrationRegistry::from_glob("migrations/[*.sql").is_err());
    }
}
