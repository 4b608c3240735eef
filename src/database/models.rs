// Copyright 2023 Remi Bernotavicius

use crate::database::{self, schema};
use derive_more::Display;
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::Insertable;
use diesel::result::QueryResult;
use diesel::RunQueryDsl as _;
use diesel_derive_newtype::DieselNewType;
use serde::Deserialize;

/// A row that can be written by primary key. An existing row with the same key is replaced
/// entirely; columns that are `None` end up NULL rather than keeping their old value.
///
/// Keys may be NULL too. SQLite never considers two NULL keys equal, so those rows are always
/// added rather than replaced.
pub trait Upsert {
    fn upsert(&self, conn: &mut database::Connection) -> QueryResult<usize>;
}

macro_rules! impl_upsert {
    ($model:ty, $table:path) => {
        impl Upsert for $model {
            fn upsert(&self, conn: &mut database::Connection) -> QueryResult<usize> {
                diesel::replace_into($table).values(self).execute(conn)
            }
        }
    };
}

impl_upsert!(Provider, schema::providers::table);
impl_upsert!(Receiver, schema::receivers::table);
impl_upsert!(FoodListing, schema::food_listings::table);
impl_upsert!(Claim, schema::claims::table);

/// Any one row, for code that only knows which table it is writing to at runtime.
#[derive(Debug, PartialEq, Clone)]
pub enum Record {
    Provider(Provider),
    Receiver(Receiver),
    FoodListing(FoodListing),
    Claim(Claim),
}

impl Upsert for Record {
    fn upsert(&self, conn: &mut database::Connection) -> QueryResult<usize> {
        match self {
            Self::Provider(r) => r.upsert(conn),
            Self::Receiver(r) => r.upsert(conn),
            Self::FoodListing(r) => r.upsert(conn),
            Self::Claim(r) => r.upsert(conn),
        }
    }
}

#[derive(DieselNewType, Deserialize, Display, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Queryable, Selectable, Insertable, Deserialize, Debug, PartialEq, Clone)]
#[diesel(table_name = crate::database::schema::providers)]
#[diesel(treat_none_as_default_value = false)]
pub struct Provider {
    #[serde(rename = "Provider_ID")]
    pub provider_id: Option<ProviderId>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub provider_type: Option<String>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Contact")]
    pub contact: Option<String>,
}

#[derive(DieselNewType, Deserialize, Display, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct ReceiverId(String);

impl ReceiverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Queryable, Selectable, Insertable, Deserialize, Debug, PartialEq, Clone)]
#[diesel(table_name = crate::database::schema::receivers)]
#[diesel(treat_none_as_default_value = false)]
pub struct Receiver {
    #[serde(rename = "Receiver_ID")]
    pub receiver_id: Option<ReceiverId>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub receiver_type: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Contact")]
    pub contact: Option<String>,
}

#[derive(DieselNewType, Deserialize, Display, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct FoodId(String);

impl FoodId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// A quantity of food offered by a provider. `provider_id` refers to a row in `providers`, though
/// nothing enforces that it exists.
#[derive(Queryable, Selectable, Insertable, Deserialize, Debug, PartialEq, Clone)]
#[diesel(table_name = crate::database::schema::food_listings)]
#[diesel(treat_none_as_default_value = false)]
pub struct FoodListing {
    #[serde(rename = "Food_ID")]
    pub food_id: Option<FoodId>,
    #[serde(rename = "Food_Name")]
    pub food_name: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<i64>,
    #[serde(rename = "Expiry_Date")]
    pub expiry_date: Option<String>,
    #[serde(rename = "Provider_ID")]
    pub provider_id: Option<ProviderId>,
    #[serde(rename = "Provider_Type")]
    pub provider_type: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Food_Type")]
    pub food_type: Option<String>,
    #[serde(rename = "Meal_Type")]
    pub meal_type: Option<String>,
}

impl FoodListing {
    /// Expiry dates show up both as `2025-03-17` and `3/17/2025` depending on who exported the
    /// file.
    pub fn expiry(&self) -> Option<chrono::NaiveDate> {
        let raw = self.expiry_date.as_deref()?.trim();
        ["%Y-%m-%d", "%m/%d/%Y"]
            .into_iter()
            .find_map(|format| chrono::NaiveDate::parse_from_str(raw, format).ok())
    }
}

#[derive(DieselNewType, Deserialize, Display, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct ClaimId(String);

impl ClaimId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Queryable, Selectable, Insertable, Deserialize, Debug, PartialEq, Clone)]
#[diesel(table_name = crate::database::schema::claims)]
#[diesel(treat_none_as_default_value = false)]
pub struct Claim {
    #[serde(rename = "Claim_ID")]
    pub claim_id: Option<ClaimId>,
    #[serde(rename = "Food_ID")]
    pub food_id: Option<FoodId>,
    #[serde(rename = "Receiver_ID")]
    pub receiver_id: Option<ReceiverId>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
}

impl Claim {
    pub const STATUS_COMPLETED: &'static str = "Completed";
}

#[test]
fn expiry_date_formats() {
    use chrono::NaiveDate;

    let mut listing = FoodListing {
        food_id: Some(FoodId::new("F1")),
        food_name: Some("Bread".into()),
        quantity: Some(3),
        expiry_date: Some("2025-03-17".into()),
        provider_id: None,
        provider_type: None,
        location: None,
        food_type: None,
        meal_type: None,
    };
    assert_eq!(listing.expiry(), NaiveDate::from_ymd_opt(2025, 3, 17));

    listing.expiry_date = Some("3/7/2025".into());
    assert_eq!(listing.expiry(), NaiveDate::from_ymd_opt(2025, 3, 7));

    listing.expiry_date = Some("soon".into());
    assert_eq!(listing.expiry(), None);

    listing.expiry_date = None;
    assert_eq!(listing.expiry(), None);
}
