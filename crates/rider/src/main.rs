//! # Rider - Waypoint Terminal Client
//!
//! Joins a Beacon relay as the admin/user or the bus, reports a position on
//! an interval, and prints a dashboard of both parties. The admin also gets
//! the straight-line distance to the bus and, with an OpenRouteService key,
//! the routed distance and ETA.
//!
//! ## Usage
//! ```bash
//! # Wait for the bus at a fixed spot
//! rider --role admin --lat 12.9716 --lon 77.5946 --ors-api-key $ORS_API_KEY
//!
//! # Drive a simulated bus north-east at 30 km/h
//! rider --role bus --lat 12.9600 --lon 77.5800 --simulate --heading 45 --speed-kmh 30
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use waypoint_common::constants::DEFAULT_SERVER_URL;
use waypoint_common::{Coordinates, Role};

mod dashboard;
mod motion;
mod routing;
mod session;

use motion::PositionSource;
use routing::RouteClient;
use session::SessionConfig;

/// Waypoint Rider - share your location through a Beacon relay
#[derive(Parser, Debug)]
#[command(name = "rider")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL
    #[arg(short, long, default_value = DEFAULT_SERVER_URL, env = "WAYPOINT_SERVER")]
    server: String,

    /// Role to claim (admin or bus)
    #[arg(short, long)]
    role: Role,

    /// Starting latitude
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Starting longitude
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Seconds between position reports
    #[arg(short, long, default_value = "5")]
    interval_secs: u64,

    /// Move along a straight line instead of staying put
    #[arg(long)]
    simulate: bool,

    /// Heading for --simulate, degrees clockwise from north
    #[arg(long, default_value = "0")]
    heading: f64,

    /// Speed for --simulate
    #[arg(long, default_value = "30")]
    speed_kmh: f64,

    /// OpenRouteService API key (enables routed ETA for the admin)
    #[arg(long, env = "ORS_API_KEY")]
    ors_api_key: Option<String>,

    /// Minimum seconds between route lookups
    #[arg(long, default_value = "15")]
    eta_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .context("Failed to initialize logging")?;

    let start = Coordinates::new(args.lat, args.lon).context("Invalid starting position")?;
    if args.interval_secs == 0 {
        anyhow::bail!("--interval-secs must be at least 1");
    }
    let report_interval = Duration::from_secs(args.interval_secs);

    let source = if args.simulate {
        PositionSource::simulated(start, args.heading, args.speed_kmh, report_interval)
    } else {
        PositionSource::fixed(start)
    };

    let route_client = match (&args.ors_api_key, args.role) {
        (Some(key), Role::Admin) => Some(RouteClient::new(key.clone())?),
        (None, Role::Admin) => {
            tracing::info!("No ORS_API_KEY set, showing straight-line distance only");
            None
        }
        _ => None,
    };

    let config = SessionConfig {
        server_url: args.server,
        role: args.role,
        report_interval,
        eta_interval: Duration::from_secs(args.eta_interval_secs),
    };

    session::run(config, source, route_client).await
}
