use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;

use super::{reservation_window, wrap_bookings, Booking, BookingRecord, Contact, Seat, SeatRecord};
use crate::api::Args;
use crate::client::LibCal;
use crate::datetime::availability::{self, format_date, format_timestamp, parse_slots, to_fixed, Bounds, Slot, SlotRecord};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceRecord {
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub lid: Option<Option<u64>>,
    #[serde(rename = "isBookableAsWhole")]
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub bookable_as_whole: Option<Option<bool>>,
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub availability: Option<Option<Vec<SlotRecord>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpaceRecord {
    pub fn slots(&self) -> Option<&[SlotRecord]> {
        self.availability.as_ref().and_then(|slots| slots.as_deref())
    }

    fn is_complete(&self) -> bool {
        self.lid.flatten().is_some() && self.bookable_as_whole.flatten().is_some() && self.slots().is_some()
    }
}

/// Fetches the full record of one space, with availability for `date`
/// (today when `None`).
pub(crate) async fn fetch_space(libcal: &LibCal, id: u64, date: Option<NaiveDate>) -> Result<SpaceRecord> {
    let mut args = Args::new().with("ids", id);
    if let Some(date) = date {
        args.insert("availability", format_date(&date));
    }
    let response = libcal.spaces().call("item", args).await?;
    let records: Vec<SpaceRecord> = serde_json::from_value(response)?;

    records
        .into_iter()
        .find(|record| record.id == id)
        .ok_or_else(|| Error::UnexpectedResponse(format!("space {} not found", id)))
}

/// A bookable room or area. Slots are half-open: a space is free at the
/// start of a slot but not at its end.
pub struct Space<'a> {
    libcal: &'a LibCal,
    record: SpaceRecord,
    location_name: Option<String>,
    date: Option<NaiveDate>,
    details: OnceCell<SpaceRecord>,
}

impl<'a> Space<'a> {
    pub fn new(libcal: &'a LibCal, record: SpaceRecord) -> Self {
        Self {
            libcal,
            record,
            location_name: None,
            date: None,
            details: OnceCell::new(),
        }
    }

    /// Reads availability, for this space and its seats, on `date` instead
    /// of today.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_location_name(mut self, name: &str) -> Self {
        self.location_name = Some(name.to_owned());
        self
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location_name.as_deref()
    }

    pub fn record(&self) -> &SpaceRecord {
        &self.record
    }

    async fn details(&self) -> Result<&SpaceRecord> {
        if self.record.is_complete() {
            return Ok(&self.record);
        }

        self.details
            .get_or_try_init(|| fetch_space(self.libcal, self.record.id, self.date))
            .await
    }

    pub async fn location_id(&self) -> Result<Option<u64>> {
        match self.record.lid.flatten() {
            Some(lid) => Ok(Some(lid)),
            None => Ok(self.details().await?.lid.flatten()),
        }
    }

    pub async fn is_bookable_as_whole(&self) -> Result<bool> {
        match self.record.bookable_as_whole.flatten() {
            Some(whole) => Ok(whole),
            None => Ok(self.details().await?.bookable_as_whole.flatten().unwrap_or(true)),
        }
    }

    pub async fn availability(&self) -> Result<Vec<Slot>> {
        match self.record.slots() {
            Some(records) => parse_slots(records),
            None => parse_slots(self.details().await?.slots().unwrap_or_default()),
        }
    }

    pub async fn is_available_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Result<bool> {
        let slots = self.availability().await?;
        Ok(availability::is_available(&slots, &to_fixed(at), Bounds::HalfOpen))
    }

    pub async fn is_available_now(&self) -> Result<bool> {
        self.is_available_at(&availability::now()).await
    }

    /// Reserves from `start` (default now) to `end` (default the end of the
    /// starting slot), both snapped outward to slot boundaries.
    pub async fn reserve(
        &self,
        contact: &Contact,
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Result<Booking<'a>> {
        let slots = self.availability().await?;
        let (from, to) = reservation_window(&self.record.name, &slots, start, end, Bounds::HalfOpen, false)?;

        tracing::info!(space = self.record.id, %from, %to, "reserving space");

        let args = contact.reserve_args(&from).with(
            "bookings",
            json!([{"id": self.record.id, "to": format_timestamp(&to)}]),
        );
        let response = self.libcal.spaces().call("reserve", args).await?;
        let record: BookingRecord = serde_json::from_value(response)?;

        Booking::new(self.libcal, record)
    }

    /// Individually bookable seats; empty for spaces only booked as a whole.
    pub async fn seats(&self) -> Result<Vec<Seat<'a>>> {
        if self.is_bookable_as_whole().await? {
            return Ok(vec![]);
        }

        let location_id = self
            .location_id()
            .await?
            .ok_or_else(|| Error::UnexpectedResponse(format!("space {} has no location", self.record.id)))?;

        let mut args = Args::new()
            .with("location_id", location_id)
            .with("spaceId", self.record.id);
        if let Some(date) = &self.date {
            args.insert("availability", format_date(date));
        }
        let response = self.libcal.spaces().call("seats", args).await?;
        let records: Vec<SeatRecord> = serde_json::from_value(response)?;

        Ok(records
            .into_iter()
            .map(|mut record| {
                if record.space_id.flatten().is_none() {
                    record.space_id = Some(Some(self.record.id));
                }

                let mut seat = Seat::new(self.libcal, record).with_space_name(&self.record.name);
                if let Some(date) = self.date {
                    seat = seat.with_date(date);
                }
                match &self.location_name {
                    Some(name) => seat.with_location_name(name),
                    None => seat,
                }
            })
            .collect())
    }

    pub async fn bookings(&self) -> Result<Vec<Booking<'a>>> {
        let response = self
            .libcal
            .spaces()
            .call("bookings", Args::new().with("eid", self.record.id))
            .await?;

        wrap_bookings(self.libcal, response)
    }
}

impl std::fmt::Display for Space<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location_name {
            Some(location) => write!(f, "{} ({})", self.record.name, location),
            None => write!(f, "{}", self.record.name),
        }
    }
}

impl std::fmt::Debug for Space<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Space").field(&self.record).finish()
    }
}

impl PartialEq for Space<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Serialize for Space<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}
