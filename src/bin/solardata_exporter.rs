// solardata_exporter - Prometheus metrics exporter for HamQSL solar data
//
// Copyright 2025 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use reqwest::{Client, Url};
use solardata_exporter::client::SolarDataClient;
use solardata_exporter::http::RequestContext;
use solardata_exporter::reading;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::{Instrument, Level};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9101);
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
const DEFAULT_FEED_URL: &str = "https://www.hamqsl.com/solarxml.php";

#[derive(Debug, Parser)]
#[clap(name = "solardata_exporter", version = clap::crate_version!())]
struct SolarDataExporterApplication {
    /// URL of the HamQSL solar data XML feed
    #[clap(long, default_value = DEFAULT_FEED_URL)]
    feed_url: Url,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timeout for fetching the solar data feed, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Address to bind to. By default, solardata_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = SolarDataExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    if let Err(e) = reading::check_vocabularies() {
        tracing::error!(message = "inconsistent status vocabulary", error = %e);
        process::exit(1)
    }

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    // Make an initial request for the feed. Failures are only logged since the feed may be
    // temporarily unavailable and every scrape fetches it again anyway.
    let client = SolarDataClient::new(http_client, opts.feed_url.clone());
    match client
        .reading()
        .instrument(tracing::span!(Level::DEBUG, "solar_reading"))
        .await
    {
        Err(e) => {
            tracing::warn!(message = "failed to fetch initial solar data", url = %opts.feed_url, error = %e);
        }
        Ok(r) => {
            tracing::debug!(message = "verified solar data feed", url = %opts.feed_url, updated = %r.updated_at);
        }
    }

    let context = Arc::new(RequestContext::new(client));
    let handler = solardata_exporter::http::router(context);
    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    tracing::info!(message = "server started", address = %opts.bind, feed_url = %opts.feed_url);
    server
        .serve(handler.into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
