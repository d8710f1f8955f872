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

use crate::decode::{self, DecodeError};
use crate::reading::Reading;
use bytes::Bytes;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use std::error;
use std::fmt;

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    Unexpected(StatusCode, Url),
    Decode(DecodeError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Decode(e) => write!(f, "unable to decode feed: {}", e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Client for fetching the HamQSL solar data XML feed.
#[derive(Debug)]
pub struct SolarDataClient {
    client: Client,
    feed_url: Url,
}

impl SolarDataClient {
    const USER_AGENT: &'static str = concat!(
        "solardata_exporter/",
        env!("CARGO_PKG_VERSION"),
        " (https://github.com/tzermias/solardata_exporter)"
    );
    const XML_RESPONSE: &'static str = "application/xml, text/xml";

    pub fn new(client: Client, feed_url: Url) -> Self {
        SolarDataClient { client, feed_url }
    }

    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    /// Fetch the raw bytes of the feed, failing for anything other than a 200 response.
    pub async fn fetch(&self) -> Result<Bytes, ClientError> {
        tracing::debug!(message = "making solar data request", url = %self.feed_url);

        let res = self
            .client
            .get(self.feed_url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::XML_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(ClientError::Unexpected(status, self.feed_url.clone()));
        }

        res.bytes().await.map_err(ClientError::Internal)
    }

    /// Fetch the feed and decode it into a `Reading`.
    pub async fn reading(&self) -> Result<Reading, ClientError> {
        let raw = self.fetch().await?;
        decode::decode(&raw).map_err(ClientError::Decode)
    }
}
