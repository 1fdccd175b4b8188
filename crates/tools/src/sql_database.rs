//! SQL database tool over SQLite.
//!
//! One tool input, three commands:
//! - `tables` lists the tables
//! - `schema <table>, ...` shows each table's `CREATE` statement followed by
//!   a few sample rows (all tables when none are named)
//! - anything else runs as a single SQL query and renders the rows
//!
//! The pool is opened on first use, so building the tool never touches the
//! database.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool};
use stepwise_core::error::ToolError;
use stepwise_core::tool::Tool;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const TOOL_NAME: &str = "sql_database";
const SAMPLE_ROWS: usize = 3;

/// Table listing, schema inspection and querying over one SQLite pool.
pub struct SqlDatabase {
    pool: SqlitePool,
}

/// Rows returned by [`SqlDatabase::query`], every cell rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SqlDatabase {
    pub async fn connect(options: SqliteConnectOptions) -> Result<Self, ToolError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| fatal(format!("failed to open database: {e}")))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// User tables, sorted by name.
    pub async fn table_names(&self) -> Result<Vec<String>, ToolError> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(query_error))
            .collect()
    }

    /// `CREATE` statement and sample rows for each of `tables`, or for every
    /// table when `tables` is empty.
    pub async fn table_info(&self, tables: &[String]) -> Result<String, ToolError> {
        let known = self.table_names().await?;
        let tables = if tables.is_empty() { known.as_slice() } else { tables };

        let unknown: Vec<&str> = tables
            .iter()
            .filter(|t| !known.contains(t))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ToolError::InvalidInput(format!(
                "unknown table(s): {}; available: {}",
                unknown.join(", "),
                known.join(", ")
            )));
        }

        let mut sections = Vec::with_capacity(tables.len());
        for table in tables {
            let create: Option<String> =
                sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                    .bind(table.as_str())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(query_error)?;
            let sample = self
                .query(&format!("SELECT * FROM {} LIMIT {SAMPLE_ROWS}", quote_ident(table)))
                .await?;
            sections.push(format!(
                "{}\n\n/*\n{SAMPLE_ROWS} rows from {table} table:\n{}\n*/",
                create.unwrap_or_default(),
                render(&sample, SAMPLE_ROWS)
            ));
        }
        Ok(sections.join("\n\n"))
    }

    pub async fn query(&self, sql: &str) -> Result<QueryResult, ToolError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| cell(row, i)).collect())
            .collect();

        Ok(QueryResult { columns, rows })
    }
}

/// SQLite is dynamically typed; try each storage class in turn.
fn cell(row: &SqliteRow, index: usize) -> String {
    const NULL: &str = "NULL";
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or_else(|| NULL.into(), |v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or_else(|| NULL.into(), |v| v.to_string());
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.unwrap_or_else(|| NULL.into());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.map_or_else(|| NULL.into(), |b| format!("<{} bytes>", b.len()));
    }
    "?".into()
}

fn render(result: &QueryResult, max_rows: usize) -> String {
    if result.rows.is_empty() {
        return "(no rows)".into();
    }

    let mut lines = vec![result.columns.join(" | ")];
    lines.extend(result.rows.iter().take(max_rows).map(|row| row.join(" | ")));
    if result.rows.len() > max_rows {
        lines.push(format!("... ({} more rows)", result.rows.len() - max_rows));
    }
    lines.join("\n")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn fatal(reason: impl Into<String>) -> ToolError {
    ToolError::Fatal {
        tool_name: TOOL_NAME.into(),
        reason: reason.into(),
    }
}

/// A bad query is the agent's to fix; a closed pool is not.
fn query_error(err: sqlx::Error) -> ToolError {
    match err {
        sqlx::Error::PoolClosed => fatal(err.to_string()),
        other => ToolError::ExecutionFailed {
            tool_name: TOOL_NAME.into(),
            reason: other.to_string(),
        },
    }
}

/// `schema`, `schema:` or `schema a, b` → the table list after the command.
fn schema_args(input: &str) -> Option<&str> {
    let head = input.get(..6)?;
    let rest = &input[6..];
    let is_command = head.eq_ignore_ascii_case("schema")
        && (rest.is_empty() || rest.starts_with([' ', '\t', '\n', ':']));
    is_command.then(|| rest.trim_start_matches(':').trim())
}

pub struct SqlDatabaseTool {
    options: Option<SqliteConnectOptions>,
    db: OnceCell<SqlDatabase>,
    max_rows: usize,
}

impl SqlDatabaseTool {
    /// Tool over the SQLite database at `url`, connected on first use.
    pub fn open(url: &str, read_only: bool) -> Result<Self, ToolError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| ToolError::InvalidInput(format!("invalid database URL '{url}': {e}")))?
            .read_only(read_only);
        Ok(Self {
            options: Some(options),
            db: OnceCell::new(),
            max_rows: 20,
        })
    }

    /// Tool over an already open database.
    pub fn new(db: SqlDatabase) -> Self {
        Self {
            options: None,
            db: OnceCell::new_with(Some(db)),
            max_rows: 20,
        }
    }

    pub fn with_max_rows(mut self, n: usize) -> Self {
        self.max_rows = n.max(1);
        self
    }

    async fn database(&self) -> Result<&SqlDatabase, ToolError> {
        self.db
            .get_or_try_init(|| async {
                let options = self
                    .options
                    .clone()
                    .ok_or_else(|| fatal("no database configured"))?;
                info!(database = %options.get_filename().display(), "Opening SQL database");
                SqlDatabase::connect(options).await
            })
            .await
    }
}

#[async_trait]
impl Tool for SqlDatabaseTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Useful for answering questions from a SQL database. Input is one of: 'tables' to list \
         the tables, 'schema <table>, <table>' for table definitions with sample rows, or a \
         single SQLite query. Check the schema before querying; if a query fails, fix it and try again."
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let input = input.trim().trim_matches(|c: char| c == '"' || c == '`').trim();
        if input.is_empty() {
            return Err(ToolError::InvalidInput("expected 'tables', 'schema' or a SQL query".into()));
        }

        let db = self.database().await?;

        if input.eq_ignore_ascii_case("tables") {
            let names = db.table_names().await?;
            return Ok(if names.is_empty() {
                "(no tables)".into()
            } else {
                names.join(", ")
            });
        }

        if let Some(args) = schema_args(input) {
            let tables: Vec<String> = args
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
            return db.table_info(&tables).await;
        }

        debug!(sql = %input, "Running SQL query");
        let result = db.query(input).await?;
        Ok(render(&result, self.max_rows))
    }
}
