// Copyright 2023 Remi Bernotavicius

use crate::Result;
use diesel::connection::SimpleConnection as _;
use diesel::prelude::Connection as _;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Binary, Double, Nullable, Text};
use diesel::sqlite::Sqlite;
use diesel::RunQueryDsl as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;
use std::path::{Path, PathBuf};

pub mod models;
pub mod schema;
mod value;

pub use value::{DynamicRow, Table, Value};

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn establish_connection(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let url = path
        .to_str()
        .ok_or_else(|| format!("database path {path:?} is not valid UTF-8"))?;
    let mut conn = Connection::establish(url)?;
    // Diesel turns enforcement on; references are only declared here.
    conn.batch_execute("PRAGMA foreign_keys = OFF")?;
    Ok(conn)
}

/// Handle to the on-disk database.
///
/// Holds only the path. Every operation opens its own connection and drops it before returning,
/// so nothing is pooled and no transaction spans two calls.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection> {
        establish_connection(&self.path)
    }

    /// Creates the four tables if they don't already exist. Safe to call on every start.
    pub fn init_schema(&self) -> Result<()> {
        let mut conn = self.connect()?;
        let applied = conn.run_pending_migrations(MIGRATIONS)?;
        for version in applied {
            debug!("applied migration {version}");
        }
        Ok(())
    }

    /// Runs a statement that doesn't return rows and returns how many rows it touched.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!("execute: {sql}");
        let mut conn = self.connect()?;
        Ok(bind_params(sql, params).execute(&mut conn)?)
    }

    /// Manual insert of a single provider, receiver, listing or claim.
    pub fn upsert(&self, record: &impl models::Upsert) -> Result<()> {
        let mut conn = self.connect()?;
        record.upsert(&mut conn)?;
        Ok(())
    }

    pub fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Table> {
        debug!("fetch_all: {sql}");
        let mut conn = self.connect()?;
        let rows: Vec<DynamicRow> = bind_params(sql, params).load(&mut conn)?;
        Ok(rows.into_iter().collect())
    }
}

fn bind_params(sql: &str, params: &[Value]) -> BoxedSqlQuery<'static, Sqlite, SqlQuery> {
    params.iter().fold(
        diesel::sql_query(sql).into_boxed::<Sqlite>(),
        |query, param| match param {
            Value::Null => query.bind::<Nullable<Text>, _>(None::<String>),
            Value::Integer(v) => query.bind::<BigInt, _>(*v),
            Value::Real(v) => query.bind::<Double, _>(*v),
            Value::Text(v) => query.bind::<Text, _>(v.clone()),
            Value::Blob(v) => query.bind::<Binary, _>(v.clone()),
        },
    )
}

#[cfg(test)]
pub fn test_database() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("food_donation.db"));
    db.init_schema().unwrap();
    (dir, db)
}

#[test]
fn init_schema_is_idempotent() {
    let (_dir, db) = test_database();
    db.execute(
        "INSERT INTO providers (Provider_ID, Name, City) VALUES (?, ?, ?)",
        &["P1".into(), "Acme".into(), "Springfield".into()],
    )
    .unwrap();

    db.init_schema().unwrap();

    let tables = db
        .fetch_all(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN \
             ('providers', 'receivers', 'food_listings', 'claims') ORDER BY name",
            &[],
        )
        .unwrap();
    assert_eq!(
        tables.column("name"),
        vec![
            &Value::from("claims"),
            &Value::from("food_listings"),
            &Value::from("providers"),
            &Value::from("receivers"),
        ]
    );

    let providers = db.fetch_all("SELECT * FROM providers", &[]).unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers.get(0, "Name"), Some(&Value::from("Acme")));
}

#[test]
fn init_schema_accepts_tables_made_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("food_donation.db"));
    db.execute(
        "CREATE TABLE providers (Provider_ID TEXT PRIMARY KEY, Name TEXT, Type TEXT, \
         Address TEXT, City TEXT, Contact TEXT)",
        &[],
    )
    .unwrap();
    db.execute("INSERT INTO providers (Provider_ID) VALUES ('P9')", &[])
        .unwrap();

    db.init_schema().unwrap();

    let count = db
        .fetch_all("SELECT COUNT(*) AS c FROM providers", &[])
        .unwrap();
    assert_eq!(count.scalar(), Some(&Value::Integer(1)));
}

#[test]
fn fetch_all_binds_every_kind_of_param() {
    let (_dir, db) = test_database();
    let changed = db
        .execute(
            "INSERT INTO food_listings (Food_ID, Food_Name, Quantity, Location) \
             VALUES (?, ?, ?, ?)",
            &["F1".into(), "Rice".into(), 12i64.into(), Value::Null],
        )
        .unwrap();
    assert_eq!(changed, 1);

    let table = db
        .fetch_all(
            "SELECT Food_Name, Quantity, Location, Quantity * ? AS Scaled \
             FROM food_listings WHERE Food_ID = ?",
            &[0.5.into(), "F1".into()],
        )
        .unwrap();
    assert_eq!(
        table.columns,
        vec!["Food_Name", "Quantity", "Location", "Scaled"]
    );
    assert_eq!(
        table.rows,
        vec![vec![
            Value::from("Rice"),
            Value::Integer(12),
            Value::Null,
            Value::Real(6.0),
        ]]
    );
}

#[test]
fn fetch_all_with_no_rows() {
    let (_dir, db) = test_database();
    let table = db.fetch_all("SELECT * FROM claims", &[]).unwrap();
    assert!(table.is_empty());
    assert!(table.columns.is_empty());
}

#[test]
fn storage_errors_propagate() {
    let (_dir, db) = test_database();
    assert!(db.fetch_all("SELECT * FROM no_such_table", &[]).is_err());
    assert!(db.execute("INSERT INTO nowhere VALUES (1)", &[]).is_err());
}

#[test]
fn references_are_not_enforced() {
    let (_dir, db) = test_database();
    let pragma = db.fetch_all("PRAGMA foreign_keys", &[]).unwrap();
    assert_eq!(pragma.scalar(), Some(&Value::Integer(0)));

    let changed = db
        .execute(
            "INSERT INTO claims (Claim_ID, Food_ID, Receiver_ID) VALUES ('C1', 'F404', 'R404')",
            &[],
        )
        .unwrap();
    assert_eq!(changed, 1);
}
