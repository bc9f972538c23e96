//! SchemaFlow Dry Run
//!
//! Simulates database migrations without mutating the target database.
//! Migrations run against an intercepted execution strategy: metadata reads
//! reach the database, schema-mutating statements are captured and reported
//! per migration in the order they would have run.
//!
//! ```rust,no_run
//! use schemaflow_dryrun::{Database, DryRun, RunOptions};
//!
//! # async fn example(pool: deadpool_postgres::Pool) -> schemaflow_dryrun::AppResult<()> {
//! let dry_run = DryRun::builder()
//!     .database(Database::postgres(pool))
//!     .migrations_path("migrations/*.sql")
//!     .build()?;
//!
//! for result in dry_run.up(RunOptions::new()).await? {
//!     println!("{}", result.rendered_output);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod migration;
pub mod query;
pub mod simulation;

pub use db::Database;
pub use error::{AppError, AppResult};
pub use migration::{Direction, Migration, MigrationRegistry, MigrationStorage};
pub use query::{ColumnDef, DataType, QueryInterface, TypeRegistry};
pub use simulation::{DryRun, DryRunReport, MigrationResult, QuoteStyle, RunOptions};
