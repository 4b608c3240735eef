// Copyright 2023 Remi Bernotavicius

//! The fixed set of read-only questions the dashboard asks of the data.

use crate::database::models::{Claim, FoodListing};
use crate::database::{self, Database, Table, Value};
use crate::Result;
use derive_more::Display;
use diesel::dsl::count_star;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use strum::EnumIter;

/// How a result is meant to be shown.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Presentation {
    Table,
    /// A single number, the first cell of the first row.
    Metric,
    Bar {
        label: &'static str,
        value: &'static str,
    },
    Pie {
        label: &'static str,
        value: &'static str,
    },
}

#[derive(Debug, Display, EnumIter, Hash, Clone, PartialEq, Eq)]
pub enum Insight {
    #[display("Providers & Receivers per City")]
    CityCounts,
    #[display("Provider Type contributing most food")]
    ProviderTypeContribution,
    #[display("Provider Contact Info by City")]
    ProviderContacts { city: String },
    #[display("Top Receivers by Claims")]
    TopReceivers,
    #[display("Total Food Quantity Available")]
    TotalQuantity,
    #[display("City with Most Food Listings")]
    ListingsByLocation,
    #[display("Most Common Food Types")]
    FoodTypes,
    #[display("Claims per Food Item")]
    ClaimsPerFoodItem,
    #[display("Provider with Most Successful Claims")]
    SuccessfulClaimsByProvider,
    #[display("Claim Status Distribution")]
    ClaimStatusDistribution,
    #[display("Average Quantity Claimed per Receiver")]
    AverageClaimedPerReceiver,
    #[display("Most Claimed Meal Type")]
    MealTypeClaims,
    #[display("Total Quantity Donated per Provider")]
    QuantityPerProvider,
}

impl Insight {
    /// Every insight, with an empty city for the contact lookup.
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::CityCounts => {
                "SELECT City,
                    (SELECT COUNT(*) FROM providers p WHERE p.City = c.City) AS Providers,
                    (SELECT COUNT(*) FROM receivers r WHERE r.City = c.City) AS Receivers
                FROM (SELECT City FROM providers UNION SELECT City FROM receivers) c"
            }
            Self::ProviderTypeContribution => {
                "SELECT Provider_Type, COUNT(*) AS Total_Listings
                FROM food_listings
                GROUP BY Provider_Type
                ORDER BY Total_Listings DESC"
            }
            Self::ProviderContacts { .. } => "SELECT Name, Contact FROM providers WHERE City = ?",
            Self::TopReceivers => {
                "SELECT r.Name, COUNT(c.Claim_ID) AS Total_Claims
                FROM receivers r
                JOIN claims c ON r.Receiver_ID = c.Receiver_ID
                GROUP BY r.Name
                ORDER BY Total_Claims DESC"
            }
            Self::TotalQuantity => "SELECT SUM(Quantity) AS Total_Quantity FROM food_listings",
            Self::ListingsByLocation => {
                "SELECT Location, COUNT(*) AS Listings
                FROM food_listings
                GROUP BY Location
                ORDER BY Listings DESC"
            }
            Self::FoodTypes => {
                "SELECT Food_Type, COUNT(*) AS Count
                FROM food_listings
                GROUP BY Food_Type
                ORDER BY Count DESC"
            }
            Self::ClaimsPerFoodItem => {
                "SELECT f.Food_Name, COUNT(c.Claim_ID) AS Claims
                FROM food_listings f
                LEFT JOIN claims c ON f.Food_ID = c.Food_ID
                GROUP BY f.Food_Name
                ORDER BY Claims DESC"
            }
            Self::SuccessfulClaimsByProvider => {
                "SELECT p.Name, COUNT(c.Claim_ID) AS Successful_Claims
                FROM providers p
                JOIN food_listings f ON p.Provider_ID = f.Provider_ID
                JOIN claims c ON f.Food_ID = c.Food_ID
                WHERE c.Status = 'Completed'
                GROUP BY p.Name
                ORDER BY Successful_Claims DESC"
            }
            Self::ClaimStatusDistribution => {
                "SELECT Status, COUNT(*) AS Count
                FROM claims
                GROUP BY Status"
            }
            Self::AverageClaimedPerReceiver => {
                "SELECT r.Name, AVG(f.Quantity) AS Avg_Claimed
                FROM receivers r
                JOIN claims c ON r.Receiver_ID = c.Receiver_ID
                JOIN food_listings f ON c.Food_ID = f.Food_ID
                GROUP BY r.Name"
            }
            Self::MealTypeClaims => {
                "SELECT f.Meal_Type, COUNT(c.Claim_ID) AS Claims
                FROM food_listings f
                JOIN claims c ON f.Food_ID = c.Food_ID
                GROUP BY f.Meal_Type
                ORDER BY Claims DESC"
            }
            Self::QuantityPerProvider => {
                "SELECT p.Name, SUM(f.Quantity) AS Total_Quantity
                FROM providers p
                JOIN food_listings f ON p.Provider_ID = f.Provider_ID
                GROUP BY p.Name
                ORDER BY Total_Quantity DESC"
            }
        }
    }

    pub fn params(&self) -> Vec<Value> {
        match self {
            Self::ProviderContacts { city } => vec![city.as_str().into()],
            _ => vec![],
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self {
            Self::CityCounts | Self::ProviderContacts { .. } => Presentation::Table,
            Self::TotalQuantity => Presentation::Metric,
            Self::ProviderTypeContribution => Presentation::Bar {
                label: "Provider_Type",
                value: "Total_Listings",
            },
            Self::TopReceivers => Presentation::Bar {
                label: "Name",
                value: "Total_Claims",
            },
            Self::ListingsByLocation => Presentation::Bar {
                label: "Location",
                value: "Listings",
            },
            Self::FoodTypes => Presentation::Bar {
                label: "Food_Type",
                value: "Count",
            },
            Self::ClaimsPerFoodItem => Presentation::Bar {
                label: "Food_Name",
                value: "Claims",
            },
            Self::SuccessfulClaimsByProvider => Presentation::Bar {
                label: "Name",
                value: "Successful_Claims",
            },
            Self::ClaimStatusDistribution => Presentation::Pie {
                label: "Status",
                value: "Count",
            },
            Self::AverageClaimedPerReceiver => Presentation::Bar {
                label: "Name",
                value: "Avg_Claimed",
            },
            Self::MealTypeClaims => Presentation::Bar {
                label: "Meal_Type",
                value: "Claims",
            },
            Self::QuantityPerProvider => Presentation::Bar {
                label: "Name",
                value: "Total_Quantity",
            },
        }
    }

    pub fn fetch(&self, db: &Database) -> Result<Table> {
        db.fetch_all(self.sql(), &self.params())
    }
}

/// Row counts shown on the dashboard.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DashboardTotals {
    pub providers: i64,
    pub receivers: i64,
    pub food_listings: i64,
    pub claims: i64,
    pub completed_claims: i64,
}

impl DashboardTotals {
    pub fn load(db: &Database) -> Result<Self> {
        use database::schema::{claims, food_listings, providers, receivers};

        let mut conn = db.connect()?;
        Ok(Self {
            providers: providers::table.count().get_result(&mut conn)?,
            receivers: receivers::table.count().get_result(&mut conn)?,
            food_listings: food_listings::table.count().get_result(&mut conn)?,
            claims: claims::table.count().get_result(&mut conn)?,
            completed_claims: claims::table
                .filter(claims::status.eq(Claim::STATUS_COMPLETED))
                .count()
                .get_result(&mut conn)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusShare {
    pub status: Option<String>,
    pub count: i64,
    pub percent: f64,
}

impl StatusShare {
    /// Share of claims in each status, largest first. The percentages add up to 100 unless there
    /// are no claims at all, in which case this is empty.
    pub fn load(db: &Database) -> Result<Vec<Self>> {
        use database::schema::claims::dsl::*;

        let mut conn = db.connect()?;
        let counts: Vec<(Option<String>, i64)> = claims
            .group_by(status)
            .select((status, count_star()))
            .load(&mut conn)?;
        Ok(Self::from_counts(counts))
    }

    fn from_counts(counts: Vec<(Option<String>, i64)>) -> Vec<Self> {
        let total: i64 = counts.iter().map(|(_, n)| n).sum();
        let mut shares: Vec<_> = counts
            .into_iter()
            .map(|(status, count)| Self {
                status,
                count,
                percent: count as f64 * 100.0 / total as f64,
            })
            .collect();
        shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
        shares
    }
}

/// Choices for the contact lookup.
pub fn distinct_provider_cities(db: &Database) -> Result<Vec<String>> {
    use database::schema::providers::dsl::*;

    let mut conn = db.connect()?;
    let cities: Vec<Option<String>> = providers
        .select(city)
        .filter(city.is_not_null())
        .distinct()
        .order_by(city.asc())
        .load(&mut conn)?;
    Ok(cities.into_iter().flatten().collect())
}

/// Listings that expire on or before `today + within_days`, soonest first. Already expired ones
/// are included. Listings whose expiry date can't be read are left out.
pub fn expiring_listings(
    db: &Database,
    today: chrono::NaiveDate,
    within_days: u64,
) -> Result<Vec<(chrono::NaiveDate, FoodListing)>> {
    use database::schema::food_listings::dsl::*;

    let cutoff = today
        .checked_add_days(chrono::Days::new(within_days))
        .ok_or("expiry window out of range")?;

    let mut conn = db.connect()?;
    let mut expiring: Vec<_> = food_listings
        .select(FoodListing::as_select())
        .load::<FoodListing>(&mut conn)?
        .into_iter()
        .filter_map(|listing| Some((listing.expiry()?, listing)))
        .filter(|(expiry, _)| *expiry <= cutoff)
        .collect();
    expiring.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(expiring)
}

/// Narrows the food listings down by location, food type and meal type. `None` matches anything.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ListingFilter {
    pub location: Option<String>,
    pub food_type: Option<String>,
    pub meal_type: Option<String>,
}

impl ListingFilter {
    pub fn choices_mut(&mut self) -> [(&'static str, &mut Option<String>); 3] {
        [
            ("Location", &mut self.location),
            ("Food_Type", &mut self.food_type),
            ("Meal_Type", &mut self.meal_type),
        ]
    }

    fn conditions(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("Location", &self.location),
            ("Food_Type", &self.food_type),
            ("Meal_Type", &self.meal_type),
        ]
        .into_iter()
        .filter_map(|(column, value)| Some((column, value.as_deref()?)))
    }

    pub fn sql(&self) -> String {
        let mut sql = String::from("SELECT * FROM food_listings");
        for (i, (column, _)) in self.conditions().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(column);
            sql.push_str(" = ?");
        }
        sql
    }

    pub fn params(&self) -> Vec<Value> {
        self.conditions().map(|(_, value)| value.into()).collect()
    }

    /// The distinct non-null values of one of the filtered columns, in a column of the same name.
    pub fn choices_sql(column: &str) -> String {
        format!(
            "SELECT DISTINCT {column} FROM food_listings \
             WHERE {column} IS NOT NULL ORDER BY {column}"
        )
    }
}

#[cfg(test)]
fn seeded_database() -> (tempfile::TempDir, Database) {
    use crate::database::models::{ClaimId, FoodId, Provider, ProviderId, Receiver, ReceiverId};

    let (dir, db) = database::test_database();

    for (pid, name, kind, city) in [
        ("P1", "Acme", "Restaurant", "Springfield"),
        ("P2", "Corner Deli", "Grocery Store", "Shelbyville"),
    ] {
        db.upsert(&Provider {
            provider_id: Some(ProviderId::new(pid)),
            name: Some(name.into()),
            provider_type: Some(kind.into()),
            address: None,
            city: Some(city.into()),
            contact: Some(format!("{pid}@example.com")),
        })
        .unwrap();
    }

    for (rid, name, city) in [
        ("R1", "Hope Shelter", "Springfield"),
        ("R2", "Food Bank", "Capital City"),
        ("R3", "Idle Pantry", "Springfield"),
    ] {
        db.upsert(&Receiver {
            receiver_id: Some(ReceiverId::new(rid)),
            name: Some(name.into()),
            receiver_type: None,
            city: Some(city.into()),
            contact: None,
        })
        .unwrap();
    }

    for (fid, name, qty, expiry, pid, kind, location, food, meal) in [
        ("F1", "Bread", 10, "2025-03-17", "P1", "Restaurant", "Springfield", "Vegetarian", "Breakfast"),
        ("F2", "Soup", 4, "3/20/2025", "P2", "Grocery Store", "Shelbyville", "Non-Vegetarian", "Dinner"),
        ("F3", "Salad", 6, "2025-04-30", "P1", "Restaurant", "Springfield", "Vegetarian", "Lunch"),
    ] {
        db.upsert(&FoodListing {
            food_id: Some(FoodId::new(fid)),
            food_name: Some(name.into()),
            quantity: Some(qty),
            expiry_date: Some(expiry.into()),
            provider_id: Some(ProviderId::new(pid)),
            provider_type: Some(kind.into()),
            location: Some(location.into()),
            food_type: Some(food.into()),
            meal_type: Some(meal.into()),
        })
        .unwrap();
    }

    for (cid, fid, rid, claim_status) in [
        ("C1", "F1", "R1", "Completed"),
        ("C2", "F2", "R1", "Pending"),
        ("C3", "F1", "R1", "Cancelled"),
        ("C4", "F2", "R2", "Completed"),
    ] {
        db.upsert(&Claim {
            claim_id: Some(ClaimId::new(cid)),
            food_id: Some(FoodId::new(fid)),
            receiver_id: Some(ReceiverId::new(rid)),
            status: Some(claim_status.into()),
            timestamp: None,
        })
        .unwrap();
    }

    (dir, db)
}

#[cfg(test)]
fn as_map(table: &Table, label: &str, value: &str) -> std::collections::HashMap<String, Value> {
    (0..table.len())
        .map(|row| {
            (
                table.get(row, label).unwrap().to_string(),
                table.get(row, value).unwrap().clone(),
            )
        })
        .collect()
}

#[test]
fn every_insight_runs() {
    let (_dir, db) = seeded_database();
    for insight in Insight::iter() {
        let table = insight.fetch(&db).unwrap();
        if let Presentation::Bar { label, value } | Presentation::Pie { label, value } =
            insight.presentation()
        {
            assert!(table.column_index(label).is_some(), "{insight}");
            assert!(table.column_index(value).is_some(), "{insight}");
        }
    }

    let (_dir, empty) = database::test_database();
    for insight in Insight::iter() {
        insight.fetch(&empty).unwrap();
    }
}

#[test]
fn claims_per_food_item_counts_unclaimed_as_zero() {
    use maplit::hashmap;

    let (_dir, db) = seeded_database();
    let table = Insight::ClaimsPerFoodItem.fetch(&db).unwrap();
    assert_eq!(
        as_map(&table, "Food_Name", "Claims"),
        hashmap! {
            "Bread".into() => Value::Integer(2),
            "Soup".into() => Value::Integer(2),
            "Salad".into() => Value::Integer(0),
        }
    );
}

#[test]
fn city_counts_cover_both_tables() {
    use maplit::hashmap;

    let (_dir, db) = seeded_database();
    let table = Insight::CityCounts.fetch(&db).unwrap();
    assert_eq!(
        as_map(&table, "City", "Providers"),
        hashmap! {
            "Springfield".into() => Value::Integer(1),
            "Shelbyville".into() => Value::Integer(1),
            "Capital City".into() => Value::Integer(0),
        }
    );
    assert_eq!(
        as_map(&table, "City", "Receivers"),
        hashmap! {
            "Springfield".into() => Value::Integer(2),
            "Shelbyville".into() => Value::Integer(0),
            "Capital City".into() => Value::Integer(1),
        }
    );
}

#[test]
fn contact_lookup_binds_city() {
    let (_dir, db) = seeded_database();
    let table = Insight::ProviderContacts {
        city: "Shelbyville".into(),
    }
    .fetch(&db)
    .unwrap();
    assert_eq!(
        table.rows,
        vec![vec![
            Value::from("Corner Deli"),
            Value::from("P2@example.com")
        ]]
    );

    let nobody = Insight::ProviderContacts {
        city: "Nowhere".into(),
    }
    .fetch(&db)
    .unwrap();
    assert!(nobody.is_empty());
}

#[test]
fn successful_claims_only_count_completed() {
    use maplit::hashmap;

    let (_dir, db) = seeded_database();
    let table = Insight::SuccessfulClaimsByProvider.fetch(&db).unwrap();
    assert_eq!(
        as_map(&table, "Name", "Successful_Claims"),
        hashmap! {
            "Acme".into() => Value::Integer(1),
            "Corner Deli".into() => Value::Integer(1),
        }
    );
}

#[test]
fn quantities() {
    use maplit::hashmap;

    let (_dir, db) = seeded_database();
    let total = Insight::TotalQuantity.fetch(&db).unwrap();
    assert_eq!(total.scalar(), Some(&Value::Integer(20)));

    let averages = Insight::AverageClaimedPerReceiver.fetch(&db).unwrap();
    assert_eq!(
        as_map(&averages, "Name", "Avg_Claimed"),
        hashmap! {
            "Hope Shelter".into() => Value::Real(8.0),
            "Food Bank".into() => Value::Real(4.0),
        }
    );

    let per_provider = Insight::QuantityPerProvider.fetch(&db).unwrap();
    assert_eq!(per_provider.get(0, "Name"), Some(&Value::from("Acme")));
    assert_eq!(per_provider.get(0, "Total_Quantity"), Some(&Value::Integer(16)));
}

#[test]
fn status_shares_sum_to_one_hundred() {
    let (_dir, db) = seeded_database();
    let shares = StatusShare::load(&db).unwrap();
    assert_eq!(
        shares,
        vec![
            StatusShare {
                status: Some("Completed".into()),
                count: 2,
                percent: 50.0
            },
            StatusShare {
                status: Some("Cancelled".into()),
                count: 1,
                percent: 25.0
            },
            StatusShare {
                status: Some("Pending".into()),
                count: 1,
                percent: 25.0
            },
        ]
    );

    let thirds = StatusShare::from_counts(vec![
        (Some("a".into()), 1),
        (Some("b".into()), 1),
        (None, 1),
    ]);
    let sum: f64 = thirds.iter().map(|s| s.percent).sum();
    assert!((sum - 100.0).abs() < 1e-9);

    let (_dir, empty) = database::test_database();
    assert!(StatusShare::load(&empty).unwrap().is_empty());
}

#[test]
fn dashboard_totals() {
    let (_dir, db) = seeded_database();
    assert_eq!(
        DashboardTotals::load(&db).unwrap(),
        DashboardTotals {
            providers: 2,
            receivers: 3,
            food_listings: 3,
            claims: 4,
            completed_claims: 2,
        }
    );
}

#[test]
fn provider_cities_are_distinct_and_sorted() {
    let (_dir, db) = seeded_database();
    assert_eq!(
        distinct_provider_cities(&db).unwrap(),
        vec!["Shelbyville".to_string(), "Springfield".to_string()]
    );
}

#[test]
fn expiring_soon() {
    let (_dir, db) = seeded_database();
    let today = chrono::NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();

    let ids = |days| -> Vec<String> {
        expiring_listings(&db, today, days)
            .unwrap()
            .into_iter()
            .filter_map(|(_, l)| l.food_id.map(|id| id.to_string()))
            .collect()
    };
    assert_eq!(ids(0), Vec::<String>::new());
    assert_eq!(ids(2), vec!["F1"]);
    assert_eq!(ids(5), vec!["F1", "F2"]);
    assert_eq!(ids(60), vec!["F1", "F2", "F3"]);
}

#[test]
fn listing_counts_are_largest_first() {
    let (_dir, db) = seeded_database();

    let by_type = Insight::ProviderTypeContribution.fetch(&db).unwrap();
    assert_eq!(
        by_type.rows,
        vec![
            vec![Value::from("Restaurant"), Value::Integer(2)],
            vec![Value::from("Grocery Store"), Value::Integer(1)],
        ]
    );

    let by_location = Insight::ListingsByLocation.fetch(&db).unwrap();
    assert_eq!(
        by_location.rows,
        vec![
            vec![Value::from("Springfield"), Value::Integer(2)],
            vec![Value::from("Shelbyville"), Value::Integer(1)],
        ]
    );

    let by_food = Insight::FoodTypes.fetch(&db).unwrap();
    assert_eq!(
        by_food.rows,
        vec![
            vec![Value::from("Vegetarian"), Value::Integer(2)],
            vec![Value::from("Non-Vegetarian"), Value::Integer(1)],
        ]
    );
}

#[test]
fn top_receivers_skip_those_without_claims() {
    let (_dir, db) = seeded_database();
    let table = Insight::TopReceivers.fetch(&db).unwrap();
    assert_eq!(
        table.rows,
        vec![
            vec![Value::from("Hope Shelter"), Value::Integer(3)],
            vec![Value::from("Food Bank"), Value::Integer(1)],
        ]
    );
}

#[test]
fn meal_type_claims_leave_out_unclaimed_listings() {
    use maplit::hashmap;

    let (_dir, db) = seeded_database();
    let table = Insight::MealTypeClaims.fetch(&db).unwrap();
    assert_eq!(
        as_map(&table, "Meal_Type", "Claims"),
        hashmap! {
            "Breakfast".into() => Value::Integer(2),
            "Dinner".into() => Value::Integer(2),
        }
    );
}

#[test]
fn claim_status_distribution_counts_each_status() {
    use maplit::hashmap;

    let (_dir, db) = seeded_database();
    let table = Insight::ClaimStatusDistribution.fetch(&db).unwrap();
    assert_eq!(
        as_map(&table, "Status", "Count"),
        hashmap! {
            "Completed".into() => Value::Integer(2),
            "Pending".into() => Value::Integer(1),
            "Cancelled".into() => Value::Integer(1),
        }
    );
}

#[test]
fn listing_filter_combines_choices() {
    let (_dir, db) = seeded_database();
    let ids = |filter: &ListingFilter| -> Vec<Value> {
        db.fetch_all(&filter.sql(), &filter.params())
            .unwrap()
            .column("Food_ID")
            .into_iter()
            .cloned()
            .collect()
    };

    let mut filter = ListingFilter::default();
    assert_eq!(filter.sql(), "SELECT * FROM food_listings");
    assert_eq!(ids(&filter).len(), 3);

    filter.location = Some("Springfield".into());
    assert_eq!(ids(&filter), vec![Value::from("F1"), Value::from("F3")]);

    filter.meal_type = Some("Lunch".into());
    assert_eq!(
        filter.sql(),
        "SELECT * FROM food_listings WHERE Location = ? AND Meal_Type = ?"
    );
    assert_eq!(ids(&filter), vec![Value::from("F3")]);

    filter.food_type = Some("Non-Vegetarian".into());
    assert!(ids(&filter).is_empty());

    let meals = db
        .fetch_all(&ListingFilter::choices_sql("Meal_Type"), &[])
        .unwrap();
    let meals: Vec<_> = meals
        .column("Meal_Type")
        .into_iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(meals, vec!["Breakfast", "Dinner", "Lunch"]);
}
