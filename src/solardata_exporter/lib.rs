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

//! Prometheus metrics exporter for HamQSL solar data
//!
//! ## Features
//!
//! `solardata_exporter` fetches the [N0NBH solar data feed] from hamqsl.com each time it is
//! scraped and emits the current space weather indices as Prometheus metrics. The following
//! metrics are emitted, all as gauges.
//!
//! * `solar_up` - 1 if the feed was fetched and decoded successfully, 0 otherwise. No other
//!   metrics are emitted when this is 0.
//! * `solar_solarflux` - Solar Flux Index.
//! * `solar_sunspots` - Sunspot Number, 0 when not reported.
//! * `solar_aindex` - Planetary A Index.
//! * `solar_kindex` - Planetary K Index.
//! * `solar_xrays` - Solar X-rays, scaled by class (`A` = 1, `B` = 10, `C` = 100, `M` = 1000, `X` = 10000).
//! * `solar_heliumline` - Helium Line index.
//! * `solar_protonflux` - Proton Flux, 0 when not reported.
//! * `solar_electronflux` - Electron Flux, 0 when not reported.
//! * `solar_aurora` - Aurora activity.
//! * `solar_aurora_latitude` - Aurora latitude, in degrees.
//! * `solar_normalization` - Normalization factor.
//! * `solar_solarwind` - Solar wind speed.
//! * `solar_magneticfield` - Magnetic field, Bz component.
//! * `solar_updated_timestamp_seconds` - Time the feed was last updated by N0NBH.
//! * `solar_hf_condition{band_name=$BAND, time=$TIME}` - Calculated HF conditions (0 = Poor, 1 = Fair, 2 = Good).
//! * `solar_vhf_condition{phenomenon=$PHENOMENON, location=$LOCATION}` - Calculated VHF conditions
//!   (0 = Band Closed, 1 = High MUF, 2 = 50MHz ES, 3 = 70MHz ES, 4 = 144MHz ES, 5 = MID LAT AUR,
//!   6 = High LAT AUR).
//!
//! [N0NBH solar data feed]: https://www.hamqsl.com/solar.html
//!
//! ## Build
//!
//! `solardata_exporter` is a Rust program and must be built from source using a
//! [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! The feed is only fetched when Prometheus scrapes the exporter so there is nothing to
//! configure beyond where to listen.
//!
//! ```text
//! ./solardata_exporter --bind 0.0.0.0:9101
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `9101` at `/metrics`. The feed is only updated every
//! few hours, so there's no need to scrape it more often than every few minutes.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: solardata_exporter
//!   scrape_interval: 5m
//!   static_configs:
//!   - targets: ['example:9101']
//! ```
//!

pub mod client;
pub mod decode;
pub mod http;
pub mod metrics;
pub mod reading;
