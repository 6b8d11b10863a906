use chrono::{prelude::*, Duration};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::fmt::Write as _;

use crate::error::{Error, Result};

/// A `{"from": ..., "to": ...}` pair exactly as the service sends it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
}

/// Which slot endpoints count as available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bounds {
    /// `[from, to)`, used for spaces.
    HalfOpen,
    /// `[from, to]`, used for seats.
    Closed,
}

impl Bounds {
    pub fn contains(self, slot: &Slot, at: &DateTime<FixedOffset>) -> bool {
        match self {
            Bounds::HalfOpen => slot.from <= *at && *at < slot.to,
            Bounds::Closed => slot.from <= *at && *at <= slot.to,
        }
    }
}

impl Slot {
    pub fn parse(record: &SlotRecord) -> Result<Slot> {
        Ok(Slot {
            from: parse_timestamp(&record.from)?,
            to: parse_timestamp(&record.to)?,
        })
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }
}

/// `10:00 AM to 11:30 AM (1h30m)`. The day is left to the caller, which
/// groups slots under one heading per day.
impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.from.format("%I:%M %p"), self.to.format("%I:%M %p"))?;

        let minutes = self.duration().num_minutes();
        match (minutes / 60, minutes % 60) {
            (0, 0) => Ok(()),
            (0, m) => write!(f, " ({}m)", m),
            (h, 0) => write!(f, " ({}h)", h),
            (h, m) => write!(f, " ({}h{}m)", h, m),
        }
    }
}

/// `YYYY-MM-DD`, the form `availability` and `date` parameters take.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|source| Error::Timestamp {
        value: value.to_owned(),
        source,
    })
}

pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn parse_slots(records: &[SlotRecord]) -> Result<Vec<Slot>> {
    records.iter().map(Slot::parse).collect()
}

/// Any timezone-aware instant, as a fixed offset.
pub fn to_fixed<Tz: TimeZone>(at: &DateTime<Tz>) -> DateTime<FixedOffset> {
    at.with_timezone(&at.offset().fix())
}

pub fn now() -> DateTime<FixedOffset> {
    DateTime::<FixedOffset>::from(Local::now())
}

pub fn is_available(slots: &[Slot], at: &DateTime<FixedOffset>, bounds: Bounds) -> bool {
    slots.iter().any(|slot| bounds.contains(slot, at))
}

/// The slot a reservation starting at `at` falls in. A slot starting at
/// `at` wins over one ending there.
pub fn enclosing_start<'s>(
    slots: &'s [Slot],
    at: &DateTime<FixedOffset>,
    bounds: Bounds,
) -> Option<&'s Slot> {
    slots
        .iter()
        .find(|slot| Bounds::HalfOpen.contains(slot, at))
        .or_else(|| slots.iter().find(|slot| bounds.contains(slot, at)))
}

/// The slot a reservation ending at `at` falls in: `from < at <= to`.
pub fn enclosing_end<'s>(slots: &'s [Slot], at: &DateTime<FixedOffset>) -> Option<&'s Slot> {
    slots.iter().find(|slot| slot.from < *at && *at <= slot.to)
}

/// Snaps a requested window outward to slot boundaries. The start must lie
/// in a slot; an end outside every slot is kept as requested.
pub fn snap_window(
    slots: &[Slot],
    start: &DateTime<FixedOffset>,
    end: Option<&DateTime<FixedOffset>>,
    bounds: Bounds,
) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let slot = enclosing_start(slots, start, bounds)?;

    let to = match end {
        None => slot.to,
        Some(end) => enclosing_end(slots, end).map(|slot| slot.to).unwrap_or(*end),
    };

    Some((slot.from, to))
}

pub fn format_availability(slots: &[Slot]) -> String {
    let days = slots.iter().group_by(|slot| slot.from.date_naive());

    let mut s = String::new();

    for (day, slots) in &days {
        let _ = writeln!(s, "{}", day.format("%a %b %d %Y"));

        for slot in slots {
            let _ = writeln!(s, "- {}", slot);
        }
    }

    s
}
