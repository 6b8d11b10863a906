use anyhow::Context;
use chrono::prelude::*;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use indicatif::ProgressBar;
use itertools::Itertools;
use serde_json::Value;

use libcal::datetime::availability::format_availability;
use libcal::model::{Booking, BookingId, Contact};
use libcal::LibCal;

use crate::cli::{ProgressIndicator, ReserveCmd};

pub fn store_credentials(client_id: &str) -> anyhow::Result<()> {
    let secret = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Client secret for \"{}\"", client_id))
        .interact()?;

    crate::store::store_secret(client_id, &secret)?;
    println!("Successfully stored credentials.");

    Ok(())
}

pub fn remove_credentials(client_id: &str) -> anyhow::Result<()> {
    if Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Do you want to delete the secret for \"{}\"?", client_id))
        .interact()?
    {
        crate::store::delete_secret(client_id)?;
        println!("Successfully removed credentials.");
    }

    Ok(())
}

fn availability_label(available: bool) -> colored::ColoredString {
    if available {
        "available now".green()
    } else {
        "unavailable".red()
    }
}

pub async fn list_locations(libcal: &LibCal) -> anyhow::Result<()> {
    let locations = libcal.locations().await.context("Failed to list locations")?;

    if locations.is_empty() {
        println!("Locations: None");
        return Ok(());
    }

    for location in locations {
        println!("{} ({})", location.name().bold().blue(), location.id());

        let categories = location.categories().await?;
        println!(
            "  Categories: {}",
            categories.iter().map(|c| format!("{} ({})", c, c.id())).join(", ")
        );

        for space in location.spaces().await? {
            println!(
                "  - {} ({}): {}",
                space.name().bold(),
                space.id(),
                availability_label(space.is_available_now().await?)
            );

            for seat in space.seats().await? {
                println!(
                    "      - {} ({}): {}",
                    seat.name(),
                    seat.id(),
                    availability_label(seat.is_available_now().await?)
                );
            }
        }
    }

    Ok(())
}

pub async fn show_availability(
    libcal: &LibCal,
    space_id: u64,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let space = match date {
        None => libcal.space(space_id).await?,
        Some(date) => libcal.space_on(space_id, date).await?,
    };

    let slots = space.availability().await?;

    println!("{}", space.name().bold().blue());
    if slots.is_empty() {
        println!("No availability.");
    } else {
        print!("{}", format_availability(&slots));
    }

    Ok(())
}

pub async fn reserve(libcal: &LibCal, cmd: &ReserveCmd) -> anyhow::Result<()> {
    let contact = Contact::new(&cmd.first_name, &cmd.last_name, &cmd.email);
    // Slots are listed per day, so look at the day the reservation starts.
    let space = match cmd.start {
        None => libcal.space(cmd.space).await?,
        Some(start) => libcal.space_on(cmd.space, start.date_naive()).await?,
    };

    let seat = match cmd.seat {
        None => None,
        Some(seat_id) => Some(
            space
                .seats()
                .await?
                .into_iter()
                .find(|seat| seat.id() == seat_id)
                .with_context(|| format!("Seat {} is not in {}", seat_id, space.name()))?,
        ),
    };

    let target = match &seat {
        Some(seat) => seat.to_string(),
        None => space.to_string(),
    };
    let start = cmd
        .start
        .map(|start| start.format("%a %b %d %I:%M %p").to_string())
        .unwrap_or_else(|| "now".to_owned());

    if !Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Reserve {} starting {} for {} {}?",
            target, start, contact.first_name, contact.last_name
        ))
        .interact()?
    {
        return Ok(());
    }

    let booking = match &seat {
        Some(seat) => seat.reserve(&contact, cmd.start, cmd.end).await,
        None => space.reserve(&contact, cmd.start, cmd.end).await,
    }
    .with_context(|| format!("Failed to reserve {}", target))?;

    println!("Successfully reserved {}: booking {}", target, booking.id().to_string().bold());

    Ok(())
}

async fn print_booking(booking: &Booking<'_>) -> anyhow::Result<()> {
    let when = match (booking.start().await?, booking.end().await?) {
        (Some(start), Some(end)) => format!(
            "{} to {}",
            start.format("%a %b %d %I:%M %p"),
            end.format("%I:%M %p")
        ),
        _ => "unknown time".to_owned(),
    };

    println!(
        "- {} {} at {}, {}{}",
        booking.id().to_string().bold(),
        booking.space_name().await?.unwrap_or("unknown space"),
        booking.location_name().await?.unwrap_or("unknown location"),
        when,
        if booking.is_cancelled() { " (cancelled)".red() } else { "".normal() }
    );

    Ok(())
}

pub async fn show_bookings(libcal: &LibCal, ids: &[String]) -> anyhow::Result<()> {
    let ids: Vec<BookingId> = ids.iter().map(|id| BookingId::from(id.as_str())).collect();
    let bookings = libcal.find_bookings(&ids).await.context("Failed to find bookings")?;

    if bookings.is_empty() {
        println!("Bookings: None");
    }
    for booking in &bookings {
        print_booking(booking).await?;
    }

    Ok(())
}

pub async fn cancel_booking(libcal: &LibCal, id: &str) -> anyhow::Result<()> {
    let mut booking = libcal
        .find_bookings(&[BookingId::from(id)])
        .await?
        .into_iter()
        .next()
        .with_context(|| format!("Booking {} not found", id))?;

    print_booking(&booking).await?;

    if Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Do you want to cancel booking \"{}\"?", id))
        .interact()?
    {
        booking.cancel().await.context("Failed to cancel booking")?;

        if booking.is_cancelled() {
            println!("Successfully cancelled booking.");
        } else {
            let reason = booking
                .record()
                .extra
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("no reason given");
            println!("{} {}", "Booking was not cancelled:".red(), reason);
        }
    }

    Ok(())
}

pub async fn find_seats(libcal: &LibCal, ids: &[u64]) -> anyhow::Result<()> {
    let progress = ProgressIndicator::new()?;
    let pb = progress.add(ProgressBar::new(1));
    pb.set_message("Searching every location...");
    pb.enable_steady_tick(std::time::Duration::from_millis(250));

    let seats = libcal.find_seats(ids).await?;

    pb.finish_with_message(format!("Found {} of {} seat(s).", seats.len(), ids.len()));
    progress.clear()?;

    for seat in &seats {
        println!(
            "- {} ({}): {}",
            seat.to_string().bold(),
            seat.id(),
            availability_label(seat.is_available_now().await?)
        );
    }

    Ok(())
}

pub async fn call(
    libcal: &LibCal,
    group: &str,
    operation: &str,
    args: Vec<(String, Value)>,
) -> anyhow::Result<()> {
    let group = libcal.group(group).with_context(|| {
        format!(
            "Unknown group \"{}\", expected one of: {}",
            group,
            libcal.groups().iter().map(|g| g.name()).join(", ")
        )
    })?;

    let response = group.call(operation, args.into_iter().collect()).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
