//! Column types and definitions
//!
//! `TypeRegistry` is the type catalogue handed to every migration alongside
//! the query interface; it renders abstract types in the target dialect.

use super::interface::Dialect;

/// Abstract column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    BigInt,
    String(u32),
    Text,
    Boolean,
    Float,
    Decimal(u8, u8),
    Date,
    Timestamp,
    Uuid,
    Json,
}

/// Renders [`DataType`]s for a dialect
#[derive(Debug, Clone, Copy)]
pub struct TypeRegistry {
    dialect: Dialect,
}

impl TypeRegistry {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// SQL spelling of a type
    pub fn sql(&self, data_type: DataType) -> String {
        match (self.dialect, data_type) {
            (_, DataType::Integer) => "INTEGER".to_string(),
            (_, DataType::BigInt) => "BIGINT".to_string(),
            (_, DataType::String(len)) => format!("VARCHAR({})", len),
            (_, DataType::Text) => "TEXT".to_string(),
            (Dialect::Postgres, DataType::Boolean) => "BOOLEAN".to_string(),
            (Dialect::MySql, DataType::Boolean) => "TINYINT(1)".to_string(),
            (Dialect::Postgres, DataType::Float) => "DOUBLE PRECISION".to_string(),
            (Dialect::MySql, DataType::Float) => "DOUBLE".to_string(),
            (_, DataType::Decimal(p, s)) => format!("DECIMAL({},{})", p, s),
            (_, DataType::Date) => "DATE".to_string(),
            (Dialect::Postgres, DataType::Timestamp) => "TIMESTAMP WITH TIME ZONE".to_string(),
            (Dialect::MySql, DataType::Timestamp) => "DATETIME".to_string(),
            (Dialect::Postgres, DataType::Uuid) => "UUID".to_string(),
            (Dialect::MySql, DataType::Uuid) => "CHAR(36) BINARY".to_string(),
            (Dialect::Postgres, DataType::Json) => "JSONB".to_string(),
            (Dialect::MySql, DataType::Json) => "JSON".to_string(),
        }
    }

    /// Full column definition, without the trailing comma
    pub fn column_sql(&self, column: &ColumnDef) -> String {
        let type_sql = match (self.dialect, column.auto_increment, column.data_type) {
            (Dialect::Postgres, true, DataType::BigInt) => "BIGSERIAL".to_string(),
            (Dialect::Postgres, true, _) => "SERIAL".to_string(),
            (Dialect::MySql, true, t) => format!("{} AUTO_INCREMENT", self.sql(t)),
            (_, false, t) => self.sql(t),
        };

        let mut def = format!("{} {}", self.dialect.quote(&column.name), type_sql);
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(ref default) = column.default_value {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        if column.unique {
            def.push_str(" UNIQUE");
        }
        if column.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        def
    }
}

/// Column definition used by table-level operations
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
}

impl ColumnDef {
    /// Nullable column with no constraints
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default_value: None,
            primary_key: false,
            unique: false,
            auto_increment: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Raw SQL default expression
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }

    /// Primary keys are implicitly NOT NULL
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_spelling_per_dialect() {
        let pg = TypeRegistry::new(Dialect::Postgres);
        let my = TypeRegistry::new(Dialect::MySql);

        assert_eq!(pg.sql(DataType::String(255)), "VARCHAR(255)");
        assert_eq!(pg.sql(DataType::Json), "JSONB");
        assert_eq!(my.sql(DataType::Json), "JSON");
        assert_eq!(my.sql(DataType::Boolean), "TINYINT(1)");
        assert_eq!(pg.sql(DataType::Decimal(10, 2)), "DECIMAL(10,2)");
    }

    #[test]
    fn test_auto_increment_primary_key() {
        let id = ColumnDef::new("id", DataType::Integer).primary_key().auto_increment();

        assert_eq!(
            TypeRegistry::new(Dialect::Postgres).column_sql(&id),
            "\"id\" SERIAL NOT NULL PRIMARY KEY"
        );
        assert_eq!(
            TypeRegistry::new(Dialect::MySql).column_sql(&id),
            "`id` INTEGER AUTO_INCREMENT NOT NULL PRIMARY KEY"
        );
    }

    #[test]
    fn test_column_with_default_and_unique() {
        let email = ColumnDef::new("email", DataType::String(255))
            .not_null()
            .unique()
            .default_value("''");

        assert_eq!(
            TypeRegistry::new(Dialect::Postgres).column_sql(&email),
            "\"email\" VARCHAR(255) NOT NULL DEFAULT '' UNIQUE"
        );
    }
}
