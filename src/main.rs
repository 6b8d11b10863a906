mod cli;
mod commands;
mod store;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CredentialsCommands};
use libcal::{Credentials, LibCal};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn credentials(cli: &Cli) -> anyhow::Result<Credentials> {
    let base_url = cli
        .base_url
        .as_deref()
        .context("Missing --base-url (or LIBCAL_BASE_URL)")?;
    let client_id = client_id(cli)?;

    let client_secret = match &cli.client_secret {
        Some(secret) => secret.to_owned(),
        None => store::get_secret(client_id).with_context(|| {
            format!(
                "No client secret given and none stored for \"{}\"; run `libcal credentials store`",
                client_id
            )
        })?,
    };

    Ok(Credentials::new(base_url, client_id, &client_secret).with_api_url(&cli.api_url))
}

fn client_id(cli: &Cli) -> anyhow::Result<&str> {
    cli.client_id
        .as_deref()
        .context("Missing --client-id (or LIBCAL_CLIENT_ID)")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Credentials(cmd) = &cli.command {
        let client_id = client_id(&cli)?;
        return match cmd.command {
            CredentialsCommands::Store => commands::store_credentials(client_id),
            CredentialsCommands::Remove => commands::remove_credentials(client_id),
        };
    }

    let libcal = LibCal::new(credentials(&cli)?)?;

    match &cli.command {
        Commands::Credentials(_) => Ok(()),
        Commands::Locations => commands::list_locations(&libcal).await,
        Commands::Availability(cmd) => {
            commands::show_availability(&libcal, cmd.space, cmd.date).await
        }
        Commands::Reserve(cmd) => commands::reserve(&libcal, cmd).await,
        Commands::Bookings(cmd) => commands::show_bookings(&libcal, &cmd.ids).await,
        Commands::Cancel(cmd) => commands::cancel_booking(&libcal, &cmd.id).await,
        Commands::Seats(cmd) => commands::find_seats(&libcal, &cmd.ids).await,
        Commands::Call(cmd) => {
            commands::call(&libcal, &cmd.group, &cmd.operation, cmd.args.clone()).await
        }
    }
}
