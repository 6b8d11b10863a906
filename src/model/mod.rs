pub mod booking;
pub mod category;
pub mod location;
pub mod seat;
pub mod space;

pub use booking::{Booking, BookingRecord};
pub use category::{Category, CategoryRecord};
pub use location::{Location, LocationRecord};
pub use seat::{Seat, SeatRecord};
pub use space::{Space, SpaceRecord};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::api::Args;
use crate::datetime::availability::{self, format_timestamp, is_available, snap_window, Bounds, Slot};
use crate::error::{Error, Result};

/// Bookings are numbered on some endpoints and `cs_`-prefixed strings on
/// others. `42` and `"42"` are the same booking.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingId {
    Number(u64),
    Text(String),
}

impl PartialEq for BookingId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BookingId::Number(a), BookingId::Number(b)) => a == b,
            (a, b) => a.to_string() == b.to_string(),
        }
    }
}

impl Eq for BookingId {}

impl std::hash::Hash for BookingId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingId::Number(id) => write!(f, "{}", id),
            BookingId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<u64> for BookingId {
    fn from(id: u64) -> Self {
        BookingId::Number(id)
    }
}

impl From<&str> for BookingId {
    fn from(id: &str) -> Self {
        match id.parse() {
            Ok(number) => BookingId::Number(number),
            Err(_) => BookingId::Text(id.to_owned()),
        }
    }
}

impl From<String> for BookingId {
    fn from(id: String) -> Self {
        BookingId::from(id.as_str())
    }
}

impl From<&BookingId> for Value {
    fn from(id: &BookingId) -> Self {
        match id {
            BookingId::Number(id) => Value::from(*id),
            BookingId::Text(id) => Value::from(id.as_str()),
        }
    }
}

/// Tells an absent field (`None`) from an explicit `null` (`Some(None)`), so
/// a record serializes back exactly as it was received.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Who a reservation is made for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Contact {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: email.to_owned(),
        }
    }

    fn reserve_args(&self, start: &DateTime<FixedOffset>) -> Args {
        Args::new()
            .with("start", format_timestamp(start))
            .with("fname", self.first_name.as_str())
            .with("lname", self.last_name.as_str())
            .with("email", self.email.as_str())
    }
}

/// Checks the start and snaps the requested window to slot boundaries.
/// With `check_end` the resulting end must be available too.
fn reservation_window(
    resource: &str,
    slots: &[Slot],
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
    bounds: Bounds,
    check_end: bool,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start = start.unwrap_or_else(availability::now);

    let unavailable = |at: &DateTime<FixedOffset>| Error::Unavailable {
        resource: resource.to_owned(),
        at: format_timestamp(at),
    };

    if !is_available(slots, &start, bounds) {
        return Err(unavailable(&start));
    }

    let (from, to) = snap_window(slots, &start, end.as_ref(), bounds).ok_or_else(|| unavailable(&start))?;

    if check_end && !is_available(slots, &to, bounds) {
        return Err(unavailable(&to));
    }

    Ok((from, to))
}

fn wrap_bookings<'a>(libcal: &'a crate::LibCal, response: Value) -> Result<Vec<Booking<'a>>> {
    let records: Vec<BookingRecord> = serde_json::from_value(response)?;
    records
        .into_iter()
        .map(|record| Booking::new(libcal, record))
        .collect()
}
