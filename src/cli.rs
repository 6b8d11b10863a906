use chrono::prelude::*;
use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde_json::Value;

use libcal::client::DEFAULT_API_URL;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Base URL of your institution's LibCal site
    #[arg(long, env = "LIBCAL_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// URL of the LibCal API host
    #[arg(long, env = "LIBCAL_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// OAuth client id of your API application
    #[arg(long, env = "LIBCAL_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret (default: the secret saved with `credentials store`)
    #[arg(long, env = "LIBCAL_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub client_secret: Option<String>,

    /// Log more, repeat for more detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Parses `MM/DD/YYYY`.
fn parse_date(arg: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(arg, "%m/%d/%Y")
}

/// Parses an RFC 3339 timestamp, or `MM/DD/YYYY HH:MM` in local time.
fn parse_datetime(arg: &str) -> anyhow::Result<DateTime<FixedOffset>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(arg) {
        return Ok(datetime);
    }

    let naive = NaiveDateTime::parse_from_str(arg, "%m/%d/%Y %H:%M")?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow::anyhow!("{} does not exist in the local timezone", arg))?;

    Ok(DateTime::<FixedOffset>::from(local))
}

/// Parses `key=value`, reading the value as JSON when it is valid JSON.
fn parse_keyword(arg: &str) -> anyhow::Result<(String, Value)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected key=value, got \"{}\"", arg))?;

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
    Ok((key.to_owned(), value))
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Manages the client secret saved in the system keyring
    Credentials(CredentialsCmd),
    /// Lists locations, their categories, spaces and seats
    Locations,
    /// Shows the open time slots of a space
    Availability(AvailabilityCmd),
    /// Reserves a space, or one of its seats
    Reserve(ReserveCmd),
    /// Shows bookings by id
    Bookings(BookingsCmd),
    /// Cancels a booking
    Cancel(CancelCmd),
    /// Finds seats by id across every location
    Seats(SeatsCmd),
    /// Calls any endpoint and prints the JSON response
    Call(CallCmd),
}

#[derive(Args)]
pub(crate) struct CredentialsCmd {
    #[command(subcommand)]
    pub command: CredentialsCommands,
}

#[derive(Subcommand)]
pub(crate) enum CredentialsCommands {
    /// Saves the client secret for the client id
    Store,
    /// Removes the saved client secret
    Remove,
}

#[derive(Args)]
pub(crate) struct AvailabilityCmd {
    /// Id of the space
    pub space: u64,

    /// Day to show in the form of MM/DD/YYYY (default today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Args)]
pub(crate) struct ReserveCmd {
    /// Id of the space
    pub space: u64,

    /// Id of a seat in the space, to reserve only that seat
    #[arg(long)]
    pub seat: Option<u64>,

    /// Start of the reservation, RFC 3339 or MM/DD/YYYY HH:MM (default now)
    #[arg(long, value_parser = parse_datetime)]
    pub start: Option<DateTime<FixedOffset>>,

    /// End of the reservation, RFC 3339 or MM/DD/YYYY HH:MM (default end of the starting slot)
    #[arg(long, value_parser = parse_datetime)]
    pub end: Option<DateTime<FixedOffset>>,

    #[arg(long, env = "LIBCAL_FIRST_NAME")]
    pub first_name: String,

    #[arg(long, env = "LIBCAL_LAST_NAME")]
    pub last_name: String,

    #[arg(long, env = "LIBCAL_EMAIL")]
    pub email: String,
}

#[derive(Args)]
pub(crate) struct BookingsCmd {
    /// Booking ids
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub(crate) struct CancelCmd {
    /// Booking id
    pub id: String,
}

#[derive(Args)]
pub(crate) struct SeatsCmd {
    /// Seat ids
    #[arg(required = true)]
    pub ids: Vec<u64>,
}

#[derive(Args)]
pub(crate) struct CallCmd {
    /// Resource group, e.g. spaces or hours
    pub group: String,

    /// Operation within the group, e.g. locations
    pub operation: String,

    /// Arguments as key=value; values are read as JSON when possible
    #[arg(value_parser = parse_keyword)]
    pub args: Vec<(String, Value)>,
}

pub(crate) struct ProgressIndicator {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl ProgressIndicator {
    pub fn new() -> anyhow::Result<Self> {
        Ok(ProgressIndicator {
            multi: MultiProgress::new(),
            style: ProgressStyle::with_template("{spinner:.green} {wide_msg}")?
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈✔"),
        })
    }

    pub fn add(&self, p: ProgressBar) -> ProgressBar {
        self.multi.add(p).with_style(self.style.clone())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.multi.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("03/14/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
        );
        assert!(parse_date("2024-03-14").is_err());
    }

    #[test]
    fn test_parse_datetime() {
        let parsed = parse_datetime("2024-03-14T10:00:00-04:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-14T10:00:00-04:00");

        let local = parse_datetime("03/14/2024 10:30").unwrap();
        assert_eq!(local.naive_local().format("%H:%M").to_string(), "10:30");

        assert!(parse_datetime("tomorrow").is_err());
    }

    #[test]
    fn test_parse_keyword() {
        assert_eq!(parse_keyword("cid=10").unwrap(), ("cid".to_owned(), json!(10)));
        assert_eq!(parse_keyword("ids=[1,2]").unwrap(), ("ids".to_owned(), json!([1, 2])));
        assert_eq!(
            parse_keyword("email=ada@example.edu").unwrap(),
            ("email".to_owned(), json!("ada@example.edu"))
        );
        assert!(parse_keyword("details").is_err());
    }

    #[test]
    fn test_cli_parses_reserve() {
        let cli = Cli::try_parse_from([
            "libcal",
            "--base-url",
            "https://lib.example.edu",
            "--client-id",
            "42",
            "reserve",
            "100",
            "--seat",
            "1000",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--email",
            "ada@example.edu",
        ])
        .unwrap();

        match cli.command {
            Commands::Reserve(cmd) => {
                assert_eq!(cmd.space, 100);
                assert_eq!(cmd.seat, Some(1000));
                assert!(cmd.start.is_none());
            }
            _ => panic!("expected reserve"),
        }
    }
}
