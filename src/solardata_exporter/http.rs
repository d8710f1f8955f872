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

use crate::client::SolarDataClient;
use crate::metrics;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus_client::encoding::text::encode;
use std::fmt;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, Level};

const OPENMETRICS_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// State shared by every request to the metrics endpoint.
///
/// Nothing here is mutated by a scrape: each request fetches the feed and builds a new
/// registry, so concurrent scrapes don't interact.
#[derive(Debug)]
pub struct RequestContext {
    client: SolarDataClient,
}

impl RequestContext {
    pub fn new(client: SolarDataClient) -> Self {
        RequestContext { client }
    }

    /// Fetch and decode the feed, then encode the resulting metrics in text format.
    ///
    /// Failing to fetch or decode the feed is not an error here, it's reported as `solar_up 0`.
    pub async fn scrape(&self) -> Result<String, fmt::Error> {
        let observations = match self
            .client
            .reading()
            .instrument(tracing::span!(Level::DEBUG, "solar_reading"))
            .await
        {
            Ok(reading) => {
                let observations = metrics::project(&reading);
                tracing::debug!(
                    message = "fetched solar data",
                    updated = %reading.updated_at,
                    observations = observations.len(),
                );
                Some(observations)
            }
            Err(e) => {
                tracing::error!(
                    message = "failed to fetch solar data",
                    url = %self.client.feed_url(),
                    error = %e,
                );
                None
            }
        };

        let registry = metrics::scrape_registry(observations.as_deref());
        let mut buf = String::new();
        encode(&mut buf, &registry)?;
        Ok(buf)
    }
}

/// Router exposing metrics at `/metrics`.
pub fn router(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/metrics", get(text_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    match context.scrape().await {
        Ok(buf) => {
            tracing::debug!(message = "encoded metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, OPENMETRICS_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
