use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use super::BookingId;
use crate::api::Args;
use crate::client::LibCal;
use crate::datetime::availability::parse_timestamp;
use crate::error::{Error, Result};

const IDENTITY_FIELDS: [&str; 2] = ["bookId", "booking_id"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(rename = "bookId")]
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub book_id: Option<Option<BookingId>>,
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Option<BookingId>>,
    #[serde(rename = "fromDate")]
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub from_date: Option<Option<String>>,
    #[serde(rename = "toDate")]
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub to_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub location_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub item_name: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BookingRecord {
    /// Listings say `bookId`, reservations say `booking_id`.
    pub fn id(&self) -> Option<&BookingId> {
        self.book_id
            .as_ref()
            .and_then(Option::as_ref)
            .or_else(|| self.booking_id.as_ref().and_then(Option::as_ref))
    }
}

/// A text field that is neither missing nor `null`.
fn text(field: &Option<Option<String>>) -> Option<&str> {
    field.as_ref().and_then(|value| value.as_deref())
}

pub struct Booking<'a> {
    libcal: &'a LibCal,
    id: BookingId,
    record: BookingRecord,
    details: OnceCell<BookingRecord>,
}

impl<'a> Booking<'a> {
    pub fn new(libcal: &'a LibCal, record: BookingRecord) -> Result<Self> {
        let id = record
            .id()
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse("booking without an id".to_owned()))?;

        Ok(Self {
            libcal,
            id,
            record,
            details: OnceCell::new(),
        })
    }

    pub fn id(&self) -> &BookingId {
        &self.id
    }

    pub fn record(&self) -> &BookingRecord {
        &self.record
    }

    async fn details(&self) -> Result<&BookingRecord> {
        self.details
            .get_or_try_init(|| async {
                let response = self
                    .libcal
                    .spaces()
                    .call("booking", Args::new().with("book_ids", &self.id))
                    .await?;
                let records: Vec<BookingRecord> = serde_json::from_value(response)?;

                records
                    .into_iter()
                    .find(|record| record.id() == Some(&self.id))
                    .ok_or_else(|| Error::UnexpectedResponse(format!("booking {} not found", self.id)))
            })
            .await
    }

    pub async fn start(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let from = match text(&self.record.from_date) {
            Some(from) => Some(from),
            None => text(&self.details().await?.from_date),
        };
        from.map(parse_timestamp).transpose()
    }

    pub async fn end(&self) -> Result<Option<DateTime<FixedOffset>>> {
        let to = match text(&self.record.to_date) {
            Some(to) => Some(to),
            None => text(&self.details().await?.to_date),
        };
        to.map(parse_timestamp).transpose()
    }

    pub async fn email(&self) -> Result<Option<&str>> {
        match text(&self.record.email) {
            Some(email) => Ok(Some(email)),
            None => Ok(text(&self.details().await?.email)),
        }
    }

    pub async fn location_name(&self) -> Result<Option<&str>> {
        match text(&self.record.location_name) {
            Some(name) => Ok(Some(name)),
            None => Ok(text(&self.details().await?.location_name)),
        }
    }

    pub async fn space_name(&self) -> Result<Option<&str>> {
        match text(&self.record.item_name) {
            Some(name) => Ok(Some(name)),
            None => Ok(text(&self.details().await?.item_name)),
        }
    }

    /// Cancels the booking and folds the service's answer for it into the
    /// record.
    pub async fn cancel(&mut self) -> Result<()> {
        tracing::info!(booking = %self.id, "cancelling booking");

        let response = self
            .libcal
            .spaces()
            .call("cancel", Args::new().with("ids", &self.id))
            .await?;

        let entries = match response {
            Value::Array(entries) => entries,
            other => return Err(Error::UnexpectedResponse(format!("cancel returned {}", other))),
        };

        let Some(Value::Object(entry)) = entries.into_iter().find(|entry| {
            IDENTITY_FIELDS
                .iter()
                .filter_map(|field| entry.get(field))
                .any(|id| serde_json::from_value::<BookingId>(id.clone()).ok().as_ref() == Some(&self.id))
        }) else {
            return Err(Error::UnexpectedResponse(format!("booking {} missing from cancel response", self.id)));
        };

        let Value::Object(mut merged) = serde_json::to_value(&self.record)? else {
            return Err(Error::UnexpectedResponse("booking record is not an object".to_owned()));
        };
        for (key, value) in entry {
            if !IDENTITY_FIELDS.contains(&key.as_str()) {
                merged.insert(key, value);
            }
        }
        self.record = serde_json::from_value(Value::Object(merged))?;

        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        match self.record.extra.get("cancelled") {
            Some(Value::Bool(cancelled)) => *cancelled,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }
}

impl std::fmt::Display for Booking<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(name) = text(&self.record.item_name) {
            write!(f, " {}", name)?;
        }
        if let (Some(from), Some(to)) = (text(&self.record.from_date), text(&self.record.to_date)) {
            write!(f, " from {} to {}", from, to)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Booking<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Booking").field(&self.record).finish()
    }
}

impl PartialEq for Booking<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Serialize for Booking<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}
