use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{Category, CategoryRecord, Space, SpaceRecord};
use crate::api::Args;
use crate::client::LibCal;
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub lid: u64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct CategoriesEntry {
    lid: u64,
    #[serde(default)]
    categories: Vec<CategoryRecord>,
}

#[derive(Deserialize)]
struct CategoryEntry {
    cid: u64,
    #[serde(default)]
    items: Vec<SpaceRecord>,
}

pub struct Location<'a> {
    libcal: &'a LibCal,
    record: LocationRecord,
}

impl<'a> Location<'a> {
    pub fn new(libcal: &'a LibCal, record: LocationRecord) -> Self {
        Self { libcal, record }
    }

    pub fn id(&self) -> u64 {
        self.record.lid
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &LocationRecord {
        &self.record
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let response = self
            .libcal
            .spaces()
            .call("categories", Args::new().with("ids", vec![self.record.lid]))
            .await?;
        let entries: Vec<CategoriesEntry> = serde_json::from_value(response)?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.lid == self.record.lid)
            .flat_map(|entry| entry.categories)
            .map(Category::new)
            .collect())
    }

    /// Every space of every category in this location, one request per
    /// category.
    pub async fn spaces(&self) -> Result<Vec<Space<'a>>> {
        let mut spaces = vec![];

        for category in self.categories().await? {
            let response = self
                .libcal
                .spaces()
                .call("category", Args::new().with("cid", category.id()))
                .await?;
            let entries: Vec<CategoryEntry> = serde_json::from_value(response)?;

            spaces.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.cid == category.id())
                    .flat_map(|entry| entry.items)
                    .map(|record| {
                        Space::new(self.libcal, record).with_location_name(&self.record.name)
                    }),
            );
        }

        Ok(spaces)
    }
}

impl std::fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.record.name)
    }
}

impl std::fmt::Debug for Location<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Location").field(&self.record).finish()
    }
}

impl PartialEq for Location<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Serialize for Location<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}
