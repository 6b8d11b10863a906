//! Client for the LibCal booking API.
//!
//! [`LibCal`] holds one resource group per area of the API (spaces, events,
//! hours, ...). Each group calls its documented endpoints by name with
//! keyword [`Args`](api::Args), and the spaces group is wrapped by typed
//! [`model`] objects for locations, spaces, seats and bookings.

pub mod api;
pub mod client;
pub mod datetime;
pub mod error;
pub mod model;
pub mod oauth;

#[cfg(test)]
mod testing;

pub use client::{Credentials, LibCal};
pub use error::{Error, Result};
