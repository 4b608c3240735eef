// Copyright 2023 Remi Bernotavicius

use derive_more::Display;
use diesel::deserialize::{self, FromSql, QueryableByName};
use diesel::row::{Field as _, NamedRow, Row};
use diesel::sql_types;
use diesel::sqlite::{Sqlite, SqliteType, SqliteValue};

/// A single cell from an arbitrary query, typed by SQLite storage class.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Value {
    #[display("NULL")]
    Null,
    #[display("{_0}")]
    Integer(i64),
    #[display("{_0}")]
    Real(f64),
    #[display("{_0}")]
    Text(String),
    #[display("<{} bytes>", _0.len())]
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen, so this works for `SUM` and `AVG` results alike.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    fn from_sqlite(value: SqliteValue<'_, '_, '_>) -> deserialize::Result<Self> {
        match value.value_type() {
            Some(SqliteType::Long) => {
                <i64 as FromSql<sql_types::BigInt, Sqlite>>::from_sql(value).map(Self::Integer)
            }
            Some(SqliteType::Double) => {
                <f64 as FromSql<sql_types::Double, Sqlite>>::from_sql(value).map(Self::Real)
            }
            Some(SqliteType::Binary) => {
                <Vec<u8> as FromSql<sql_types::Binary, Sqlite>>::from_sql(value).map(Self::Blob)
            }
            Some(_) => <String as FromSql<sql_types::Text, Sqlite>>::from_sql(value).map(Self::Text),
            None => Ok(Self::Null),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One row of a query whose shape is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRow {
    pub fields: Vec<(String, Value)>,
}

impl QueryableByName<Sqlite> for DynamicRow {
    fn build<'a>(row: &impl NamedRow<'a, Sqlite>) -> deserialize::Result<Self> {
        let fields = (0..row.field_count())
            .map(|idx| -> deserialize::Result<(String, Value)> {
                let field = Row::get(row, idx).ok_or("column index out of range")?;
                let name = field.field_name().ok_or("unnamed column")?.to_owned();
                let value = match field.value() {
                    Some(raw) => Value::from_sqlite(raw)?,
                    None => Value::Null,
                };
                Ok((name, value))
            })
            .collect::<deserialize::Result<_>>()?;
        Ok(Self { fields })
    }
}

/// The result of `Database::fetch_all`: column names plus every row.
///
/// Column names come from the rows themselves, so an empty result has no columns.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row)?.get(self.column_index(column)?)
    }

    /// The top-left cell, for single-value queries like `SELECT COUNT(*)`.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first()?.first()
    }

    /// Every value in one column, in row order.
    pub fn column(&self, name: &str) -> Vec<&Value> {
        let Some(idx) = self.column_index(name) else {
            return vec![];
        };
        self.rows.iter().filter_map(|r| r.get(idx)).collect()
    }
}

impl FromIterator<DynamicRow> for Table {
    fn from_iter<I: IntoIterator<Item = DynamicRow>>(iter: I) -> Self {
        let mut table = Table::default();
        for row in iter {
            if table.columns.is_empty() {
                table.columns = row.fields.iter().map(|(name, _)| name.clone()).collect();
            }
            table
                .rows
                .push(row.fields.into_iter().map(|(_, value)| value).collect());
        }
        table
    }
}

#[test]
fn table_lookup() {
    let table: Table = [
        DynamicRow {
            fields: vec![
                ("City".into(), Value::from("Springfield")),
                ("Providers".into(), Value::from(2i64)),
            ],
        },
        DynamicRow {
            fields: vec![
                ("City".into(), Value::from("Shelbyville")),
                ("Providers".into(), Value::from(0i64)),
            ],
        },
    ]
    .into_iter()
    .collect();

    assert_eq!(table.columns, vec!["City", "Providers"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(1, "Providers"), Some(&Value::Integer(0)));
    assert_eq!(table.get(0, "Missing"), None);
    assert_eq!(table.scalar(), Some(&Value::Text("Springfield".into())));
    assert_eq!(
        table.column("City"),
        vec![&Value::from("Springfield"), &Value::from("Shelbyville")]
    );
}

#[test]
fn value_display_and_widening() {
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::from(Some(7i64)).to_string(), "7");
    assert_eq!(Value::from(None::<&str>), Value::Null);
    assert_eq!(Value::Integer(4).as_f64(), Some(4.0));
    assert_eq!(Value::Text("x".into()).as_f64(), None);
}
