// Copyright 2023 Remi Bernotavicius

use crate::database::models::{Claim, FoodListing, Provider, Receiver, Record, Upsert};
use crate::database::{self, Database};
use derive_more::Display;
use diesel::Connection as _;
use log::info;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use strum::EnumIter;

#[derive(Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq)]
pub enum TableKind {
    #[display("providers")]
    Providers,
    #[display("receivers")]
    Receivers,
    #[display("food_listings")]
    FoodListings,
    #[display("claims")]
    Claims,
}

impl TableKind {
    /// In the order they should be loaded, parents before the rows that refer to them.
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::Providers => "providers_clean.csv",
            Self::Receivers => "receivers_clean.csv",
            Self::FoodListings => "food_listings_clean.csv",
            Self::Claims => "claims_clean.csv",
        }
    }

    pub fn key_column(&self) -> &'static str {
        self.columns()[0]
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {self} WHERE {} = ?", self.key_column())
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Providers => &["Provider_ID", "Name", "Type", "Address", "City", "Contact"],
            Self::Receivers => &["Receiver_ID", "Name", "Type", "City", "Contact"],
            Self::FoodListings => &[
                "Food_ID",
                "Food_Name",
                "Quantity",
                "Expiry_Date",
                "Provider_ID",
                "Provider_Type",
                "Location",
                "Food_Type",
                "Meal_Type",
            ],
            Self::Claims => &["Claim_ID", "Food_ID", "Receiver_ID", "Status", "Timestamp"],
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    Open {
        path: PathBuf,
        source: csv::Error,
    },
    MalformedRow {
        table: TableKind,
        row: usize,
        source: csv::Error,
    },
    Storage(diesel::result::Error),
    Connection(crate::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, source } => write!(f, "couldn't open {path:?}: {source}"),
            Self::MalformedRow { table, row, source } => {
                write!(f, "malformed row {row} for {table}: {source}")
            }
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Connection(e) => write!(f, "couldn't connect to database: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<diesel::result::Error> for LoadError {
    fn from(e: diesel::result::Error) -> Self {
        Self::Storage(e)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Skipped,
    Loaded { rows: usize },
}

/// Upserts every record in one transaction, so a bad row leaves the table as it was.
fn load_records<R: Upsert + DeserializeOwned>(
    conn: &mut database::Connection,
    table: TableKind,
    mut reader: csv::Reader<impl io::Read>,
) -> Result<usize, LoadError> {
    conn.transaction(|conn| {
        let mut rows = 0;
        for (idx, record) in reader.deserialize::<R>().enumerate() {
            let record = record.map_err(|source| LoadError::MalformedRow {
                table,
                row: idx + 1,
                source,
            })?;
            record.upsert(conn)?;
            rows += 1;
        }
        Ok(rows)
    })
}

/// Loads one CSV file into `table`. A missing file isn't an error, it just gets skipped.
///
/// Columns are matched by header name. Declared columns the file doesn't have are stored as
/// NULL, and extra columns are ignored.
pub fn load_if_exists(
    db: &Database,
    table: TableKind,
    path: impl AsRef<Path>,
) -> Result<LoadOutcome, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        info!("{} not found. Skipping seed for {table}.", path.display());
        return Ok(LoadOutcome::Skipped);
    }

    let open_error = |source| LoadError::Open {
        path: path.to_owned(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(open_error)?;
    let headers = reader.headers().map_err(open_error)?;
    for column in table.columns() {
        if !headers.iter().any(|h| h == *column) {
            info!("{} has no {column} column, storing NULL", path.display());
        }
    }
    let mut conn = db.connect().map_err(LoadError::Connection)?;

    let rows = match table {
        TableKind::Providers => load_records::<Provider>(&mut conn, table, reader)?,
        TableKind::Receivers => load_records::<Receiver>(&mut conn, table, reader)?,
        TableKind::FoodListings => load_records::<FoodListing>(&mut conn, table, reader)?,
        TableKind::Claims => load_records::<Claim>(&mut conn, table, reader)?,
    };
    info!("Loaded {rows} rows into {table} from {}", path.display());
    Ok(LoadOutcome::Loaded { rows })
}

/// Reads one row given as values in `table.columns()` order, the same way a line of a seed file
/// would be read. Blank values become NULL.
pub fn parse_row(table: TableKind, values: &[String]) -> Result<Record, LoadError> {
    let headers = csv::StringRecord::from(table.columns().to_vec());
    let mut record = csv::StringRecord::from(values.to_vec());
    record.trim();

    let malformed = |source| LoadError::MalformedRow {
        table,
        row: 1,
        source,
    };
    let headers = Some(&headers);
    Ok(match table {
        TableKind::Providers => Record::Provider(record.deserialize(headers).map_err(malformed)?),
        TableKind::Receivers => Record::Receiver(record.deserialize(headers).map_err(malformed)?),
        TableKind::FoodListings => {
            Record::FoodListing(record.deserialize(headers).map_err(malformed)?)
        }
        TableKind::Claims => Record::Claim(record.deserialize(headers).map_err(malformed)?),
    })
}

/// Where to find the seed file for each table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPaths {
    pub providers: PathBuf,
    pub receivers: PathBuf,
    pub food_listings: PathBuf,
    pub claims: PathBuf,
}

impl SeedPaths {
    /// The usual file names, all in `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            providers: dir.join(TableKind::Providers.default_file_name()),
            receivers: dir.join(TableKind::Receivers.default_file_name()),
            food_listings: dir.join(TableKind::FoodListings.default_file_name()),
            claims: dir.join(TableKind::Claims.default_file_name()),
        }
    }

    pub fn path(&self, table: TableKind) -> &Path {
        match table {
            TableKind::Providers => &self.providers,
            TableKind::Receivers => &self.receivers,
            TableKind::FoodListings => &self.food_listings,
            TableKind::Claims => &self.claims,
        }
    }
}

pub fn load_all(
    db: &Database,
    seeds: &SeedPaths,
) -> Result<Vec<(TableKind, LoadOutcome)>, LoadError> {
    TableKind::iter()
        .map(|table| Ok((table, load_if_exists(db, table, seeds.path(table))?)))
        .collect()
}

#[cfg(test)]
fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[cfg(test)]
fn stored_provider(db: &Database, id: &str) -> Option<Provider> {
    use crate::database::schema::providers::dsl::*;
    use diesel::prelude::OptionalExtension as _;
    use diesel::ExpressionMethods as _;
    use diesel::QueryDsl as _;
    use diesel::RunQueryDsl as _;
    use diesel::SelectableHelper as _;

    providers
        .select(Provider::as_select())
        .filter(provider_id.eq(id))
        .get_result(&mut db.connect().unwrap())
        .optional()
        .unwrap()
}

#[test]
fn missing_file_is_skipped() {
    let (dir, db) = database::test_database();
    let outcome = load_if_exists(&db, TableKind::Providers, dir.path().join("nope.csv")).unwrap();
    assert_eq!(outcome, LoadOutcome::Skipped);
}

#[test]
fn absent_columns_become_null() {
    let (dir, db) = database::test_database();
    let path = write_csv(
        dir.path(),
        "food.csv",
        "Food_ID,Food_Name,Quantity,Unrelated\n\
         F1,Bread,10,x\n\
         F2,Rice,,y\n",
    );
    let outcome = load_if_exists(&db, TableKind::FoodListings, &path).unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { rows: 2 });

    let table = db
        .fetch_all(
            "SELECT Food_ID, Quantity, Location, Meal_Type FROM food_listings ORDER BY Food_ID",
            &[],
        )
        .unwrap();
    assert_eq!(table.get(0, "Quantity"), Some(&database::Value::Integer(10)));
    assert!(table.get(1, "Quantity").unwrap().is_null());
    for row in 0..2 {
        assert!(table.get(row, "Location").unwrap().is_null());
        assert!(table.get(row, "Meal_Type").unwrap().is_null());
    }
}

#[test]
fn reload_replaces_whole_row() {
    let (dir, db) = database::test_database();
    let first = write_csv(
        dir.path(),
        "first.csv",
        "Provider_ID,Name,City\nP1,Acme,Springfield\nP2,Corner Deli,Shelbyville\n",
    );
    let second = write_csv(dir.path(), "second.csv", "Provider_ID,Name\nP1,Acme Foods\n");

    load_if_exists(&db, TableKind::Providers, &first).unwrap();
    load_if_exists(&db, TableKind::Providers, &second).unwrap();

    let p1 = stored_provider(&db, "P1").unwrap();
    assert_eq!(p1.name.as_deref(), Some("Acme Foods"));
    assert_eq!(p1.city, None);

    let p2 = stored_provider(&db, "P2").unwrap();
    assert_eq!(p2.city.as_deref(), Some("Shelbyville"));

    let count = db.fetch_all("SELECT COUNT(*) FROM providers", &[]).unwrap();
    assert_eq!(count.scalar(), Some(&database::Value::Integer(2)));
}

#[test]
fn malformed_row_aborts_the_batch() {
    let (dir, db) = database::test_database();
    let path = write_csv(
        dir.path(),
        "food.csv",
        "Food_ID,Food_Name,Quantity\nF1,Bread,10\nF2,Rice,lots\n",
    );

    let error = load_if_exists(&db, TableKind::FoodListings, &path).unwrap_err();
    assert!(matches!(
        error,
        LoadError::MalformedRow {
            table: TableKind::FoodListings,
            row: 2,
            ..
        }
    ));

    let count = db
        .fetch_all("SELECT COUNT(*) FROM food_listings", &[])
        .unwrap();
    assert_eq!(count.scalar(), Some(&database::Value::Integer(0)));
}

#[test]
fn load_all_uses_configured_paths() {
    let (dir, db) = database::test_database();
    write_csv(
        dir.path(),
        TableKind::Receivers.default_file_name(),
        "Receiver_ID,Name,Type,City,Contact\nR1,Shelter,NGO,Springfield,555-0100\n",
    );
    let claims = write_csv(
        dir.path(),
        "elsewhere.csv",
        "Claim_ID,Food_ID,Receiver_ID,Status,Timestamp\nC1,F1,R1,Pending,2025-03-01 10:00\n",
    );
    let mut seeds = SeedPaths::in_dir(dir.path());
    seeds.claims = claims;

    let outcomes = load_all(&db, &seeds).unwrap();
    assert_eq!(
        outcomes,
        vec![
            (TableKind::Providers, LoadOutcome::Skipped),
            (TableKind::Receivers, LoadOutcome::Loaded { rows: 1 }),
            (TableKind::FoodListings, LoadOutcome::Skipped),
            (TableKind::Claims, LoadOutcome::Loaded { rows: 1 }),
        ]
    );
}

#[test]
fn columns_match_the_schema() {
    let (_dir, db) = database::test_database();
    for table in TableKind::iter() {
        let info = db
            .fetch_all(&format!("SELECT name FROM pragma_table_info('{table}')"), &[])
            .unwrap();
        let names: Vec<_> = info.column("name").into_iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(names, table.columns(), "{table}");
    }
}

#[test]
fn quantities_are_64_bit_and_cells_are_trimmed() {
    let (dir, db) = database::test_database();
    let path = write_csv(
        dir.path(),
        "food.csv",
        "Food_ID,Food_Name,Quantity\n\
         F1,Grain,3000000000\n\
         F2 , Bread , 10 \n",
    );
    let outcome = load_if_exists(&db, TableKind::FoodListings, &path).unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { rows: 2 });

    let table = db
        .fetch_all(
            "SELECT Food_ID, Food_Name, Quantity FROM food_listings ORDER BY Food_ID",
            &[],
        )
        .unwrap();
    assert_eq!(
        table.rows,
        vec![
            vec![
                database::Value::from("F1"),
                database::Value::from("Grain"),
                database::Value::Integer(3_000_000_000),
            ],
            vec![
                database::Value::from("F2"),
                database::Value::from("Bread"),
                database::Value::Integer(10),
            ],
        ]
    );
}

#[test]
fn claims_may_refer_to_rows_that_are_not_loaded() {
    let (dir, db) = database::test_database();
    let path = write_csv(
        dir.path(),
        "claims.csv",
        "Claim_ID,Food_ID,Receiver_ID,Status,Timestamp\n\
         C1,F404,R404,Pending,2025-03-01 10:00\n",
    );
    let outcome = load_if_exists(&db, TableKind::Claims, &path).unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { rows: 1 });

    let table = db
        .fetch_all("SELECT Food_ID, Receiver_ID FROM claims", &[])
        .unwrap();
    assert_eq!(
        table.rows,
        vec![vec![
            database::Value::from("F404"),
            database::Value::from("R404")
        ]]
    );
}

#[test]
fn missing_key_column_stores_null_keys() {
    let (dir, db) = database::test_database();
    let path = write_csv(
        dir.path(),
        "providers.csv",
        "Name,City\nAcme,Springfield\nCorner Deli,Shelbyville\n",
    );
    let outcome = load_if_exists(&db, TableKind::Providers, &path).unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded { rows: 2 });

    let table = db
        .fetch_all(
            "SELECT Name FROM providers WHERE Provider_ID IS NULL ORDER BY Name",
            &[],
        )
        .unwrap();
    assert_eq!(
        table.column("Name"),
        vec![
            &database::Value::from("Acme"),
            &database::Value::from("Corner Deli")
        ]
    );
}

#[test]
fn parse_row_reads_like_a_seed_file() {
    use crate::database::models::{FoodId, ProviderId};

    let values: Vec<String> = ["F7", " Rice ", "12", "", "P1", "", "", "", "Dinner"]
        .into_iter()
        .map(String::from)
        .collect();
    let Record::FoodListing(listing) = parse_row(TableKind::FoodListings, &values).unwrap() else {
        panic!("expected a food listing");
    };
    assert_eq!(listing.food_id, Some(FoodId::new("F7")));
    assert_eq!(listing.food_name.as_deref(), Some("Rice"));
    assert_eq!(listing.quantity, Some(12));
    assert_eq!(listing.expiry_date, None);
    assert_eq!(listing.provider_id, Some(ProviderId::new("P1")));
    assert_eq!(listing.meal_type.as_deref(), Some("Dinner"));

    let mut bad = values.clone();
    bad[2] = "a dozen".into();
    assert!(matches!(
        parse_row(TableKind::FoodListings, &bad),
        Err(LoadError::MalformedRow {
            table: TableKind::FoodListings,
            ..
        })
    ));
}

#[test]
fn parsed_rows_upsert_by_key() {
    let (_dir, db) = database::test_database();
    let row = |name: &str| -> Vec<String> {
        ["P1", name, "", "", "Springfield", ""]
            .into_iter()
            .map(String::from)
            .collect()
    };

    db.upsert(&parse_row(TableKind::Providers, &row("Acme")).unwrap())
        .unwrap();
    db.upsert(&parse_row(TableKind::Providers, &row("Acme Foods")).unwrap())
        .unwrap();

    let p1 = stored_provider(&db, "P1").unwrap();
    assert_eq!(p1.name.as_deref(), Some("Acme Foods"));
    assert_eq!(p1.provider_type, None);
    assert_eq!(p1.city.as_deref(), Some("Springfield"));
}

#[test]
fn delete_by_key() {
    let (dir, db) = database::test_database();
    let path = write_csv(
        dir.path(),
        "receivers.csv",
        "Receiver_ID,Name\nR1,Shelter\nR2,Food Bank\n",
    );
    load_if_exists(&db, TableKind::Receivers, &path).unwrap();

    let table = TableKind::Receivers;
    assert_eq!(
        table.delete_sql(),
        "DELETE FROM receivers WHERE Receiver_ID = ?"
    );
    assert_eq!(db.execute(&table.delete_sql(), &["R1".into()]).unwrap(), 1);
    assert_eq!(db.execute(&table.delete_sql(), &["R1".into()]).unwrap(), 0);

    let left = db.fetch_all("SELECT Receiver_ID FROM receivers", &[]).unwrap();
    assert_eq!(left.column("Receiver_ID"), vec![&database::Value::from("R2")]);
}
