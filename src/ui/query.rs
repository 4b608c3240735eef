use crate::database::models::FoodListing;
use crate::database::{Database, Table, Value};
use crate::insights::{self, DashboardTotals, StatusShare};
use crate::Result;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
struct CacheKey {
    sql: String,
    params: String,
}

impl CacheKey {
    fn new(sql: &str, params: &[Value]) -> Self {
        Self {
            sql: sql.into(),
            params: format!("{params:?}"),
        }
    }
}

struct CachedExpiring {
    today: chrono::NaiveDate,
    within_days: u64,
    results: Vec<(chrono::NaiveDate, FoodListing)>,
}

/// Results the UI has already asked for, so redrawing doesn't hit the database every frame.
///
/// Nothing here notices when the data changes underneath; `clear` is the only way to see new
/// rows.
#[derive(Default)]
pub struct QueryCache {
    tables: HashMap<CacheKey, Table>,
    totals: Option<DashboardTotals>,
    status_shares: Option<Vec<StatusShare>>,
    provider_cities: Option<Vec<String>>,
    expiring: Option<CachedExpiring>,
}

impl QueryCache {
    pub fn fetch_all(&mut self, db: &Database, sql: &str, params: &[Value]) -> Result<&Table> {
        match self.tables.entry(CacheKey::new(sql, params)) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => Ok(e.insert(db.fetch_all(sql, params)?)),
        }
    }

    pub fn totals(&mut self, db: &Database) -> Result<DashboardTotals> {
        if let Some(totals) = self.totals {
            return Ok(totals);
        }
        let totals = DashboardTotals::load(db)?;
        self.totals = Some(totals);
        Ok(totals)
    }

    pub fn status_shares(&mut self, db: &Database) -> Result<&[StatusShare]> {
        if self.status_shares.is_none() {
            self.status_shares = Some(StatusShare::load(db)?);
        }
        Ok(self.status_shares.as_deref().unwrap_or_default())
    }

    pub fn provider_cities(&mut self, db: &Database) -> Result<&[String]> {
        if self.provider_cities.is_none() {
            self.provider_cities = Some(insights::distinct_provider_cities(db)?);
        }
        Ok(self.provider_cities.as_deref().unwrap_or_default())
    }

    pub fn expiring_listings(
        &mut self,
        db: &Database,
        today: chrono::NaiveDate,
        within_days: u64,
    ) -> Result<&[(chrono::NaiveDate, FoodListing)]> {
        let fresh = matches!(
            &self.expiring,
            Some(c) if c.today == today && c.within_days == within_days
        );
        if !fresh {
            let results = insights::expiring_listings(db, today, within_days)?;
            self.expiring = Some(CachedExpiring {
                today,
                within_days,
                results,
            });
        }
        Ok(self
            .expiring
            .as_ref()
            .map(|c| c.results.as_slice())
            .unwrap_or_default())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[test]
fn cached_until_cleared() {
    let (_dir, db) = crate::database::test_database();
    let mut cache = QueryCache::default();
    let sql = "SELECT Name FROM providers WHERE City = ?";
    let params = [Value::from("Springfield")];

    assert!(cache.fetch_all(&db, sql, &params).unwrap().is_empty());
    assert_eq!(cache.totals(&db).unwrap().providers, 0);

    db.execute(
        "INSERT INTO providers (Provider_ID, Name, City) VALUES ('P1', 'Acme', 'Springfield')",
        &[],
    )
    .unwrap();

    assert!(cache.fetch_all(&db, sql, &params).unwrap().is_empty());
    assert_eq!(cache.totals(&db).unwrap().providers, 0);
    assert_eq!(
        cache
            .fetch_all(&db, sql, &[Value::from("Elsewhere")])
            .unwrap()
            .len(),
        0
    );

    cache.clear();
    assert_eq!(cache.fetch_all(&db, sql, &params).unwrap().len(), 1);
    assert_eq!(cache.totals(&db).unwrap().providers, 1);
    assert_eq!(
        cache.provider_cities(&db).unwrap().to_vec(),
        vec!["Springfield".to_string()]
    );
}

#[test]
fn failures_are_not_cached() {
    let (_dir, db) = crate::database::test_database();
    let mut cache = QueryCache::default();
    let sql = "SELECT * FROM later";

    assert!(cache.fetch_all(&db, sql, &[]).is_err());
    db.execute("CREATE TABLE later (x INTEGER)", &[]).unwrap();
    assert!(cache.fetch_all(&db, sql, &[]).unwrap().is_empty());
}
