//! Database connector used by the agent's tools.
//!
//! One [`SqlDatabase`] wraps exactly one live connection, opened from a
//! connection descriptor. There is no pooling: callers open a fresh handle
//! per question and close it afterwards.

use std::fmt;

use sqlx::any::{install_default_drivers, AnyRow};
use sqlx::{AnyConnection, Column, Connection, Executor, Row};
use tokio::sync::Mutex;

use crate::error::{AgentError, AgentResult};

/// Cell values longer than this are cut before being shown to the model.
pub const MAX_CELL_CHARS: usize = 300;

/// SQL dialect of the connected database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            Dialect::Sqlite | Dialect::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    fn list_tables_sql(&self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
            Dialect::Postgres => {
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' ORDER BY 1"
            }
            Dialect::MySql => {
                "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' ORDER BY 1"
            }
        }
    }

    /// Puts the session into read-only mode.
    fn read_only_sql(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "PRAGMA query_only = ON",
            Dialect::Postgres => "SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY",
            Dialect::MySql => "SET SESSION TRANSACTION READ ONLY",
        }
    }

    /// Returns `(name, type, is_nullable)` rows for one table; `is_nullable`
    /// is `'YES'` or `'NO'`.
    fn columns_sql(&self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "SELECT name, type, CASE WHEN \"notnull\" = 0 THEN 'YES' ELSE 'NO' END \
                 FROM pragma_table_info(?) ORDER BY cid"
            }
            Dialect::Postgres => {
                "SELECT column_name::text, data_type::text, is_nullable::text \
                 FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name::text = $1 \
                 ORDER BY ordinal_position"
            }
            Dialect::MySql => {
                "SELECT CAST(column_name AS CHAR), CAST(column_type AS CHAR), CAST(is_nullable AS CHAR) \
                 FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ? \
                 ORDER BY ordinal_position"
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "SQLite"),
            Dialect::Postgres => write!(f, "PostgreSQL"),
            Dialect::MySql => write!(f, "MySQL"),
        }
    }
}

/// Rewrites a connection descriptor into the form sqlx understands.
///
/// Accepts SQLAlchemy-style descriptors (`sqlite:///relative.db`,
/// `postgresql+psycopg2://…`, `mysql+pymysql://…`) as well as native sqlx
/// URLs. The returned URL keeps any query string.
pub fn normalize_uri(db_uri: &str) -> AgentResult<(Dialect, String)> {
    let db_uri = db_uri.trim();
    let (scheme, rest) = db_uri
        .split_once(':')
        .filter(|(scheme, _)| {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        })
        .ok_or_else(|| AgentError::InvalidUri("missing scheme".to_string()))?;

    // `postgresql+psycopg2` names a Python driver; only the dialect matters.
    let base = scheme
        .split('+')
        .next()
        .unwrap_or(scheme)
        .to_ascii_lowercase();

    match base.as_str() {
        "sqlite" => Ok((Dialect::Sqlite, sqlite_url(rest))),
        "postgres" | "postgresql" => Ok((Dialect::Postgres, network_url("postgres", rest)?)),
        "mysql" | "mariadb" => Ok((Dialect::MySql, network_url("mysql", rest)?)),
        other => Err(AgentError::UnsupportedScheme(other.to_string())),
    }
}

fn network_url(scheme: &str, rest: &str) -> AgentResult<String> {
    if !rest.starts_with("//") || rest.len() == 2 {
        return Err(AgentError::InvalidUri(format!("{} URI has no host", scheme)));
    }
    Ok(format!("{}:{}", scheme, rest))
}

fn sqlite_url(rest: &str) -> String {
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    // `sqlite:///rel.db` is relative and `sqlite:////abs.db` absolute: the
    // empty authority is followed by one separator slash.
    let path = match path.strip_prefix("//") {
        Some(after_authority) => after_authority.strip_prefix('/').unwrap_or(after_authority),
        None => path,
    };

    let mut url = if path.is_empty() || path == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{}", path)
    };
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// A single-connection handle to the target database.
pub struct SqlDatabase {
    dialect: Dialect,
    sample_rows: usize,
    conn: Mutex<AnyConnection>,
}

#[derive(Debug, Clone)]
struct ColumnDef {
    name: String,
    data_type: String,
    nullable: bool,
}

impl SqlDatabase {
    /// Opens a new connection described by `db_uri`.
    ///
    /// The session is switched to read-only before it is handed out, so
    /// writes fail at the database even if they get past the validator.
    ///
    /// `sample_rows` controls how many rows [`SqlDatabase::table_info`]
    /// includes per table.
    pub async fn connect(db_uri: &str, sample_rows: usize) -> AgentResult<Self> {
        let (dialect, url) = normalize_uri(db_uri)?;
        install_default_drivers();

        let mut conn = AnyConnection::connect(&url)
            .await
            .map_err(|e| AgentError::Connection(e.to_string()))?;

        (&mut conn)
            .execute(sqlx::raw_sql(dialect.read_only_sql()))
            .await
            .map_err(|e| AgentError::Connection(format!("failed to make session read-only: {}", e)))?;

        tracing::debug!(dialect = %dialect, "数据库连接已建立");
        Ok(Self {
            dialect,
            sample_rows,
            conn: Mutex::new(conn),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Names of user tables, sorted.
    pub async fn usable_table_names(&self) -> AgentResult<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(self.dialect.list_tables_sql())
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AgentError::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| AgentError::Database(e.to_string()))
            })
            .collect()
    }

    /// Schema text for the given tables: a reconstructed `CREATE TABLE`
    /// statement followed by a few sample rows.
    ///
    /// Fails if any name is not a usable table.
    pub async fn table_info(&self, table_names: &[String]) -> AgentResult<String> {
        let usable = self.usable_table_names().await?;
        let missing: Vec<&str> = table_names
            .iter()
            .filter(|name| !usable.contains(name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(AgentError::Database(format!(
                "table_names {{{}}} not found in database",
                missing.join(", ")
            )));
        }

        let mut sections = Vec::with_capacity(table_names.len());
        for table in table_names {
            let columns = self.columns(table).await?;
            let mut section = create_table_statement(table, &columns);
            if self.sample_rows > 0 {
                section.push_str("\n\n");
                section.push_str(&self.sample_rows_section(table, &columns).await?);
            }
            sections.push(section);
        }
        Ok(sections.join("\n\n"))
    }

    /// Executes `sql` and renders the result as tab-separated text with a
    /// header line. An empty result set renders as an empty string.
    pub async fn run(&self, sql: &str) -> AgentResult<String> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AgentError::Database(e.to_string()))?;
        Ok(render_rows(&rows))
    }

    /// Closes the underlying connection.
    pub async fn close(self) {
        if let Err(e) = self.conn.into_inner().close().await {
            tracing::warn!(error = %e, "关闭数据库连接失败");
        }
    }

    async fn columns(&self, table: &str) -> AgentResult<Vec<ColumnDef>> {
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(self.dialect.columns_sql())
            .bind(table.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AgentError::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get(0)?;
                let data_type: Option<String> = row.try_get(1)?;
                let nullable: String = row.try_get(2)?;
                Ok(ColumnDef {
                    name,
                    data_type: data_type.unwrap_or_default(),
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| AgentError::Database(e.to_string()))
    }

    async fn sample_rows_section(&self, table: &str, columns: &[ColumnDef]) -> AgentResult<String> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {}",
            self.dialect.quote_identifier(table),
            self.sample_rows
        );
        let mut conn = self.conn.lock().await;
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AgentError::Database(e.to_string()))?;

        let mut lines = vec![
            "/*".to_string(),
            format!("{} rows from {} table:", self.sample_rows, table),
            columns
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join("\t"),
        ];
        lines.extend(rows.iter().map(render_row));
        lines.push("*/".to_string());
        Ok(lines.join("\n"))
    }
}

fn create_table_statement(table: &str, columns: &[ColumnDef]) -> String {
    let body = columns
        .iter()
        .map(|c| {
            let mut line = format!("\t{}", c.name);
            if !c.data_type.is_empty() {
                line.push(' ');
                line.push_str(&c.data_type);
            }
            if !c.nullable {
                line.push_str(" NOT NULL");
            }
            line
        })
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE {} (\n{}\n)", table, body)
}

fn render_rows(rows: &[AnyRow]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let header = first
        .columns()
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join("\t");

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    lines.extend(rows.iter().map(render_row));
    lines.join("\n")
}

fn render_row(row: &AnyRow) -> String {
    (0..row.len())
        .map(|idx| render_cell(row, idx))
        .collect::<Vec<_>>()
        .join("\t")
}

/// Renders one cell, trying the value kinds the `Any` driver can carry.
fn render_cell(row: &AnyRow, idx: usize) -> String {
    let text = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        v.map(|v| v.to_string())
    } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        v.map(|v| v.to_string())
    } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        v
    } else if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        v.map(|v| v.to_string())
    } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        v.map(|v| format!("<{} bytes>", v.len()))
    } else {
        Some("<unsupported>".to_string())
    };

    match text {
        Some(text) => truncate(&text.replace(['\t', '\n', '\r'], " ")),
        None => "NULL".to_string(),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_CELL_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SqliteFixture;

    #[test]
    fn test_normalize_sqlalchemy_sqlite_relative() {
        let (dialect, url) = normalize_uri("sqlite:///test.db").unwrap();
        assert_eq!(dialect, Dialect::Sqlite);
        assert_eq!(url, "sqlite:test.db");
    }

    #[test]
    fn test_normalize_sqlalchemy_sqlite_absolute() {
        let (_, url) = normalize_uri("sqlite:////var/data/app.db?mode=ro").unwrap();
        assert_eq!(url, "sqlite:/var/data/app.db?mode=ro");
    }

    #[test]
    fn test_normalize_sqlite_memory_forms() {
        for uri in ["sqlite://", "sqlite:///:memory:", "sqlite::memory:"] {
            let (_, url) = normalize_uri(uri).unwrap();
            assert_eq!(url, "sqlite::memory:", "input {}", uri);
        }
    }

    #[test]
    fn test_normalize_native_sqlx_sqlite() {
        let (_, url) = normalize_uri("sqlite://data.db").unwrap();
        assert_eq!(url, "sqlite:data.db");
    }

    #[test]
    fn test_normalize_postgres_driver_suffix() {
        let (dialect, url) = normalize_uri("postgresql+psycopg2://u:p@db.local:5432/shop").unwrap();
        assert_eq!(dialect, Dialect::Postgres);
        assert_eq!(url, "postgres://u:p@db.local:5432/shop");
    }

    #[test]
    fn test_normalize_mysql_variants() {
        let (dialect, url) = normalize_uri("mysql+pymysql://root@localhost/app").unwrap();
        assert_eq!(dialect, Dialect::MySql);
        assert_eq!(url, "mysql://root@localhost/app");

        let (_, url) = normalize_uri("mariadb://root@localhost/app").unwrap();
        assert_eq!(url, "mysql://root@localhost/app");
    }

    #[test]
    fn test_normalize_rejects_unknown_scheme() {
        let err = normalize_uri("mssql+pyodbc://sa@host/db").unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedScheme(s) if s == "mssql"));
    }

    #[test]
    fn test_normalize_rejects_missing_scheme() {
        assert!(matches!(normalize_uri("just some text"), Err(AgentError::InvalidUri(_))));
        assert!(matches!(normalize_uri("postgres://"), Err(AgentError::InvalidUri(_))));
    }

    #[test]
    fn test_truncate_long_values() {
        let long = "x".repeat(MAX_CELL_CHARS + 10);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), MAX_CELL_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }

    #[tokio::test]
    async fn test_connect_missing_sqlite_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("sqlite:///{}/missing/nope.db", dir.path().display());
        let err = SqlDatabase::connect(&uri, 3).await.err().unwrap();
        assert!(matches!(err, AgentError::Connection(ref msg) if !msg.is_empty()));
    }

    #[tokio::test]
    async fn test_lists_tables() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();
        assert_eq!(db.dialect(), Dialect::Sqlite);
        assert_eq!(db.usable_table_names().await.unwrap(), vec!["orders", "users"]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_table_info_includes_schema_and_samples() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 2).await.unwrap();
        let info = db.table_info(&["users".to_string()]).await.unwrap();

        assert!(info.starts_with("CREATE TABLE users (\n"));
        assert!(info.contains("\tid INTEGER NOT NULL"));
        assert!(info.contains("\temail TEXT\n"));
        assert!(info.contains("2 rows from users table:\nid\tname\temail\n"));
        assert!(info.contains("1\talice\talice@example.com"));
        assert!(info.contains("2\tbob\tNULL"));
        assert!(!info.contains("carol"));
        db.close().await;
    }

    #[tokio::test]
    async fn test_table_info_rejects_unknown_table() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();
        let err = db.table_info(&["accounts".to_string()]).await.unwrap_err();
        assert_eq!(err.to_string(), "table_names {accounts} not found in database");
        db.close().await;
    }

    #[tokio::test]
    async fn test_run_renders_rows() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();

        let out = db.run("SELECT COUNT(*) AS total FROM users").await.unwrap();
        assert_eq!(out, "total\n3");

        let out = db.run("SELECT name FROM users WHERE id > 100").await.unwrap();
        assert_eq!(out, "");

        let err = db.run("SELECT * FROM nowhere").await.unwrap_err();
        assert!(err.to_string().contains("no such table"));
        db.close().await;
    }

    #[tokio::test]
    async fn test_session_is_read_only() {
        let fixture = SqliteFixture::users().await;
        let db = SqlDatabase::connect(&fixture.db_uri(), 3).await.unwrap();

        assert_eq!(db.run("PRAGMA query_only").await.unwrap(), "query_only\n1");

        let err = db
            .run("REPLACE INTO users (id, name) VALUES (4, 'mallory')")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Database(_)));
        assert!(db.run("DELETE FROM users").await.is_err());
        assert_eq!(db.run("SELECT COUNT(*) AS n FROM users").await.unwrap(), "n\n3");
        db.close().await;
    }
}
