use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub cid: u64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A category of spaces within a location.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Category {
    record: CategoryRecord,
}

impl Category {
    pub fn new(record: CategoryRecord) -> Self {
        Self { record }
    }

    pub fn id(&self) -> u64 {
        self.record.cid
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn record(&self) -> &CategoryRecord {
        &self.record
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.record.name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_round_trip() {
        let raw = json!({"cid": 10, "name": "Study Rooms", "formid": 0, "public": 1});
        let category = Category::new(serde_json::from_value(raw.clone()).unwrap());

        assert_eq!(category.id(), 10);
        assert_eq!(category.to_string(), "Study Rooms");
        assert_eq!(serde_json::to_value(&category).unwrap(), raw);
    }
}
