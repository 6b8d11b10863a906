use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;

use super::{reservation_window, wrap_bookings, Booking, BookingRecord, Contact};
use crate::api::Args;
use crate::client::LibCal;
use crate::datetime::availability::{self, format_date, format_timestamp, parse_slots, to_fixed, Bounds, Slot, SlotRecord};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "spaceId")]
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub space_id: Option<Option<u64>>,
    #[serde(default, deserialize_with = "super::nullable", skip_serializing_if = "Option::is_none")]
    pub availability: Option<Option<Vec<SlotRecord>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SeatRecord {
    pub fn slots(&self) -> Option<&[SlotRecord]> {
        self.availability.as_ref().and_then(|slots| slots.as_deref())
    }
}

pub(crate) async fn fetch_seat(libcal: &LibCal, id: u64, date: Option<NaiveDate>) -> Result<SeatRecord> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let response = libcal
        .spaces()
        .call(
            "seat",
            Args::new().with("seat_id", id).with("availability", format_date(&date)),
        )
        .await?;

    // One seat comes back bare or as a single-element list.
    let records: Vec<SeatRecord> = match response {
        Value::Array(_) => serde_json::from_value(response)?,
        other => vec![serde_json::from_value(other)?],
    };

    records
        .into_iter()
        .find(|record| record.id == id)
        .ok_or_else(|| Error::UnexpectedResponse(format!("seat {} not found", id)))
}

/// One seat inside a space. Seat slots are closed: the end of a slot still
/// counts as available.
pub struct Seat<'a> {
    libcal: &'a LibCal,
    record: SeatRecord,
    space_name: Option<String>,
    location_name: Option<String>,
    date: Option<NaiveDate>,
    details: OnceCell<SeatRecord>,
}

impl<'a> Seat<'a> {
    pub fn new(libcal: &'a LibCal, record: SeatRecord) -> Self {
        Self {
            libcal,
            record,
            space_name: None,
            location_name: None,
            date: None,
            details: OnceCell::new(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_space_name(mut self, name: &str) -> Self {
        self.space_name = Some(name.to_owned());
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

    pub fn space_id(&self) -> Option<u64> {
        self.record.space_id.flatten()
    }

    pub fn space_name(&self) -> Option<&str> {
        self.space_name.as_deref()
    }

    pub fn location_name(&self) -> Option<&str> {
        self.location_name.as_deref()
    }

    pub fn record(&self) -> &SeatRecord {
        &self.record
    }

    pub async fn availability(&self) -> Result<Vec<Slot>> {
        if let Some(records) = self.record.slots() {
            return parse_slots(records);
        }

        let details = self
            .details
            .get_or_try_init(|| fetch_seat(self.libcal, self.record.id, self.date))
            .await?;
        parse_slots(details.slots().unwrap_or_default())
    }

    pub async fn is_available_at<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Result<bool> {
        let slots = self.availability().await?;
        Ok(availability::is_available(&slots, &to_fixed(at), Bounds::Closed))
    }

    pub async fn is_available_now(&self) -> Result<bool> {
        self.is_available_at(&availability::now()).await
    }

    /// Like [`Space::reserve`](super::Space::reserve), but the end of the
    /// window must be available as well.
    pub async fn reserve(
        &self,
        contact: &Contact,
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Result<Booking<'a>> {
        let space_id = self
            .record
            .space_id
            .flatten()
            .ok_or_else(|| Error::UnexpectedResponse(format!("seat {} has no space", self.record.id)))?;

        let slots = self.availability().await?;
        let (from, to) = reservation_window(&self.record.name, &slots, start, end, Bounds::Closed, true)?;

        tracing::info!(seat = self.record.id, space = space_id, %from, %to, "reserving seat");

        let args = contact.reserve_args(&from).with(
            "bookings",
            json!([{"id": space_id, "seat_id": self.record.id, "to": format_timestamp(&to)}]),
        );
        let response = self.libcal.spaces().call("reserve", args).await?;
        let record: BookingRecord = serde_json::from_value(response)?;

        Booking::new(self.libcal, record)
    }

    pub async fn bookings(&self) -> Result<Vec<Booking<'a>>> {
        let response = self
            .libcal
            .spaces()
            .call("bookings", Args::new().with("seat_id", self.record.id))
            .await?;

        wrap_bookings(self.libcal, response)
    }
}

impl std::fmt::Display for Seat<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.record.name)?;
        if let Some(space) = &self.space_name {
            write!(f, " in {}", space)?;
        }
        if let Some(location) = &self.location_name {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Seat<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Seat").field(&self.record).finish()
    }
}

impl PartialEq for Seat<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Serialize for Seat<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::datetime::availability::parse_timestamp;
    use crate::testing::{client, FakeTransport};

    fn seat_value() -> Value {
        json!({
            "id": 1000,
            "name": "Seat A",
            "spaceId": 100,
            "availability": [
                {"from": "2024-01-01T10:00:00+00:00", "to": "2024-01-01T12:00:00+00:00"},
                {"from": "2024-01-01T12:00:00+00:00", "to": "2024-01-01T14:00:00+00:00"},
            ],
        })
    }

    #[tokio::test]
    async fn test_closed_availability() {
        let fake = FakeTransport::with_token();
        let libcal = client(&fake);
        let seat = Seat::new(
            &libcal,
            serde_json::from_value(json!({
                "id": 1000,
                "name": "Seat A",
                "availability": [{"from": "2024-01-01T10:00:00+00:00", "to": "2024-01-01T12:00:00+00:00"}],
            }))
            .unwrap(),
        );

        let boundary = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 1).unwrap();

        assert!(seat.is_available_at(&boundary).await.unwrap());
        assert!(!seat.is_available_at(&after).await.unwrap());
    }

    #[tokio::test]
    async fn test_reserve_payload_names_space_and_seat() {
        let fake = FakeTransport::with_token();
        fake.respond("POST", "/1.1/space/reserve", 200, json!({"booking_id": "cs_seat"}));
        let libcal = client(&fake);
        let seat = Seat::new(&libcal, serde_json::from_value(seat_value()).unwrap());

        let contact = Contact::new("Ada", "Lovelace", "ada@example.edu");
        let start = parse_timestamp("2024-01-01T10:30:00+00:00").unwrap();
        let end = parse_timestamp("2024-01-01T12:30:00+00:00").unwrap();
        seat.reserve(&contact, Some(start), Some(end)).await.unwrap();

        let request = fake.last_request("/1.1/space/reserve").unwrap();
        assert_eq!(request.json()["start"], json!("2024-01-01T10:00:00+00:00"));
        assert_eq!(
            request.json()["bookings"],
            json!([{"id": 100, "seat_id": 1000, "to": "2024-01-01T14:00:00+00:00"}])
        );
    }

    #[tokio::test]
    async fn test_reserve_rejects_unavailable_end() {
        let fake = FakeTransport::with_token();
        let libcal = client(&fake);
        let seat = Seat::new(&libcal, serde_json::from_value(seat_value()).unwrap());

        let contact = Contact::new("Ada", "Lovelace", "ada@example.edu");
        let start = parse_timestamp("2024-01-01T10:30:00+00:00").unwrap();
        let end = parse_timestamp("2024-01-01T16:00:00+00:00").unwrap();

        match seat.reserve(&contact, Some(start), Some(end)).await {
            Err(Error::Unavailable { at, .. }) => assert_eq!(at, "2024-01-01T16:00:00+00:00"),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_seat_by_id_fetches_availability() {
        let fake = FakeTransport::with_token();
        fake.respond("GET", "/api/1.1/space/seat/1000", 200, seat_value());
        let libcal = client(&fake);

        let seat = libcal.seat(1000).await.unwrap();

        assert_eq!(seat.space_id(), Some(100));
        assert_eq!(seat.availability().await.unwrap().len(), 2);

        let request = fake.last_request("/api/1.1/space/seat/1000").unwrap();
        assert!(request.query("availability").is_some());
        assert_eq!(fake.count("/api/1.1/space/seat/1000"), 1);
    }

    #[tokio::test]
    async fn test_bookings_by_seat() {
        let fake = FakeTransport::with_token();
        fake.respond("GET", "/1.1/space/items/bookings", 200, json!([{"bookId": "cs_1"}]));
        let libcal = client(&fake);
        let seat = Seat::new(&libcal, serde_json::from_value(seat_value()).unwrap());

        assert_eq!(seat.bookings().await.unwrap().len(), 1);

        let request = fake.last_request("/1.1/space/items/bookings").unwrap();
        assert_eq!(request.query("seat_id").as_deref(), Some("1000"));
        assert!(request.query("eid").is_none());
    }

    #[test]
    fn test_round_trip() {
        let raw = seat_value();
        let parsed: SeatRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(parsed).unwrap(), raw);

        let nulls = json!({"id": 1000, "name": "Seat A", "spaceId": null, "availability": null, "status": "open"});
        let parsed: SeatRecord = serde_json::from_value(nulls.clone()).unwrap();
        assert_eq!(parsed.space_id, Some(None));
        assert_eq!(serde_json::to_value(parsed).unwrap(), nulls);
    }
}
