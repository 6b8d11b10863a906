use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::api::transport::{ReqwestTransport, Transport};
use crate::api::{tables, Args, ResourceGroup, Session};
use crate::error::Result;
use crate::model::{seat, space, Booking, BookingId, BookingRecord, Location, LocationRecord, Seat, Space};
use crate::oauth::TokenManager;

pub const DEFAULT_API_URL: &str = "https://api2.libcal.com/";

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{}/", url)
    }
}

#[derive(Clone)]
pub struct Credentials {
    base_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            api_url: DEFAULT_API_URL.to_owned(),
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = with_trailing_slash(api_url);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Entry point to the booking service.
pub struct LibCal {
    session: Arc<Session>,
    spaces: ResourceGroup,
    room_bookings: ResourceGroup,
    equipment: ResourceGroup,
    appointments: ResourceGroup,
    events: ResourceGroup,
    calendars: ResourceGroup,
    hours: ResourceGroup,
}

impl LibCal {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(credentials, Arc::new(transport))
    }

    pub fn with_transport(credentials: Credentials, transport: Arc<dyn Transport>) -> Result<Self> {
        let tokens = TokenManager::new(&credentials, transport.clone())?;
        let session = Arc::new(Session::new(
            credentials.base_url().to_owned(),
            tokens,
            transport,
        ));

        let group = |name, endpoints| ResourceGroup::new(name, session.clone(), endpoints);

        Ok(Self {
            spaces: group("spaces", tables::spaces()),
            room_bookings: group("roombookings", tables::room_bookings()),
            equipment: group("equipment", tables::equipment()),
            appointments: group("appointments", tables::appointments()),
            events: group("events", tables::events()),
            calendars: group("calendars", tables::calendars()),
            hours: group("hours", tables::hours()),
            session,
        })
    }

    pub fn spaces(&self) -> &ResourceGroup {
        &self.spaces
    }

    pub fn room_bookings(&self) -> &ResourceGroup {
        &self.room_bookings
    }

    pub fn equipment(&self) -> &ResourceGroup {
        &self.equipment
    }

    pub fn appointments(&self) -> &ResourceGroup {
        &self.appointments
    }

    pub fn events(&self) -> &ResourceGroup {
        &self.events
    }

    pub fn calendars(&self) -> &ResourceGroup {
        &self.calendars
    }

    pub fn hours(&self) -> &ResourceGroup {
        &self.hours
    }

    pub fn groups(&self) -> [&ResourceGroup; 7] {
        [
            &self.spaces,
            &self.room_bookings,
            &self.equipment,
            &self.appointments,
            &self.events,
            &self.calendars,
            &self.hours,
        ]
    }

    pub fn group(&self, name: &str) -> Option<&ResourceGroup> {
        self.groups().into_iter().find(|group| group.name() == name)
    }

    /// Scopes granted with the current token.
    pub fn scope(&self) -> Vec<String> {
        self.session.tokens().scope()
    }

    pub async fn locations(&self) -> Result<Vec<Location<'_>>> {
        let response = self.spaces.call("locations", Args::new()).await?;
        let records: Vec<LocationRecord> = serde_json::from_value(response)?;

        Ok(records
            .into_iter()
            .map(|record| Location::new(self, record))
            .collect())
    }

    pub async fn find_bookings(&self, ids: &[BookingId]) -> Result<Vec<Booking<'_>>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let book_ids: Vec<Value> = ids.iter().map(Value::from).collect();
        let response = self
            .spaces
            .call("booking", Args::new().with("book_ids", book_ids))
            .await?;
        let records: Vec<BookingRecord> = serde_json::from_value(response)?;

        records
            .into_iter()
            .map(|record| Booking::new(self, record))
            .filter(|booking| match booking {
                Ok(booking) => ids.contains(booking.id()),
                Err(_) => true,
            })
            .collect()
    }

    /// Walks every location, space and seat. Fine for one institution's
    /// inventory, nothing is indexed.
    pub async fn find_seats(&self, ids: &[u64]) -> Result<Vec<Seat<'_>>> {
        let mut found = vec![];

        for location in self.locations().await? {
            for space in location.spaces().await? {
                for seat in space.seats().await? {
                    if ids.contains(&seat.id()) {
                        found.push(seat);
                    }
                }
            }
        }

        Ok(found)
    }

    pub async fn space(&self, id: u64) -> Result<Space<'_>> {
        let record = space::fetch_space(self, id, None).await?;
        Ok(Space::new(self, record))
    }

    /// Like [`space`](Self::space), with availability on `date`. Seats listed
    /// from the returned space carry the same date.
    pub async fn space_on(&self, id: u64, date: NaiveDate) -> Result<Space<'_>> {
        let record = space::fetch_space(self, id, Some(date)).await?;
        Ok(Space::new(self, record).with_date(date))
    }

    pub async fn seat(&self, id: u64) -> Result<Seat<'_>> {
        let record = seat::fetch_seat(self, id, None).await?;
        Ok(Seat::new(self, record))
    }
}

impl std::fmt::Debug for LibCal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibCal")
            .field("base_url", &self.session.base_url())
            .finish_non_exhaustive()
    }
}
