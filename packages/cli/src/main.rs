#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the SpotOn carpark finder.
//!
//! Runs the API server, ranks carparks for a single destination from the
//! terminal, or refreshes the registry snapshot from data.gov.sg.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use spot_on_carpark_models::{Destination, LatLon, VehicleType};
use spot_on_registry::{DEFAULT_REGISTRY_PATH, hdb};

#[derive(Parser)]
#[command(name = "spot_on", about = "SpotOn carpark finder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server (`BIND_ADDR`, `PORT`)
    Serve,
    /// Rank carparks near a destination and print them as JSON
    Rank {
        /// Destination address, as returned by OneMap search
        #[arg(long)]
        address: String,
        /// Destination latitude (WGS84)
        #[arg(long)]
        lat: f64,
        /// Destination longitude (WGS84)
        #[arg(long)]
        lon: f64,
        /// Vehicle type: "Car/Van", "Motorcycle" or "Heavy"
        #[arg(long, default_value = "Car/Van")]
        vehicle: String,
    },
    /// Download HDB carpark information and write a registry snapshot
    SyncRegistry {
        /// Snapshot file to write
        #[arg(long, default_value = DEFAULT_REGISTRY_PATH)]
        out: PathBuf,
        /// Datastore search endpoint
        #[arg(long, default_value = hdb::DATASTORE_URL)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(spot_on_server::run_server())
            })
            .await??;
        }
        Commands::Rank {
            address,
            lat,
            lon,
            vehicle,
        } => {
            let vehicle = VehicleType::from_label(&vehicle)?;
            let destination = Destination {
                address,
                location: LatLon::new(lat, lon),
            };

            let ranker = spot_on_server::ranker_from_env().await?;
            let ranked = ranker.rank_carparks(&destination, vehicle).await?;

            if ranked.is_empty() {
                log::warn!("No carparks found.");
            }
            for carpark in &ranked {
                log::info!(
                    "{} {:.0} m, {} lots: {}",
                    carpark.record.carpark_id,
                    carpark.distance.unwrap_or_default(),
                    carpark.lots_available,
                    carpark.record.address
                );
            }
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        Commands::SyncRegistry { out, url } => {
            let client = reqwest::Client::new();
            let count = hdb::sync_snapshot(&client, &url, &out).await?;
            println!("Wrote {count} carparks to {}", out.display());
        }
    }

    Ok(())
}
