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

use crate::reading::{Reading, Status};
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

/// Prefix shared by every exported metric name.
pub const NAMESPACE: &str = "solar";

const LABEL_BAND_NAME: &str = "band_name";
const LABEL_TIME: &str = "time";
const LABEL_PHENOMENON: &str = "phenomenon";
const LABEL_LOCATION: &str = "location";

const SOLARFLUX: &str = "solarflux";
const SUNSPOTS: &str = "sunspots";
const AINDEX: &str = "aindex";
const KINDEX: &str = "kindex";
const XRAYS: &str = "xrays";
const HELIUMLINE: &str = "heliumline";
const PROTONFLUX: &str = "protonflux";
const ELECTRONFLUX: &str = "electronflux";
const AURORA: &str = "aurora";
const AURORA_LATITUDE: &str = "aurora_latitude";
const NORMALIZATION: &str = "normalization";
const SOLARWIND: &str = "solarwind";
const MAGNETICFIELD: &str = "magneticfield";
const UPDATED: &str = "updated_timestamp_seconds";
const HF_CONDITION: &str = "hf_condition";
const VHF_CONDITION: &str = "vhf_condition";

/// Name, help text and label keys of an exported metric.
///
/// Names and label keys are what dashboards and alerts are written against, changing
/// them requires a version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

impl Descriptor {
    const fn scalar(name: &'static str, help: &'static str) -> Self {
        Descriptor { name, help, labels: &[] }
    }
}

/// Success of the last fetch and decode of the feed. Set by the caller of `project`.
pub const UP: Descriptor = Descriptor::scalar("up", "Was the last scrape of the feed successful");

/// Every metric that can be emitted from a `Reading`, in emission order.
pub static DESCRIPTORS: &[Descriptor] = &[
    Descriptor::scalar(SOLARFLUX, "Solar Flux Index"),
    Descriptor::scalar(SUNSPOTS, "Sunspot Number"),
    Descriptor::scalar(AINDEX, "Planetary A Index"),
    Descriptor::scalar(KINDEX, "Planetary K Index"),
    Descriptor::scalar(XRAYS, "Solar X-Rays"),
    Descriptor::scalar(HELIUMLINE, "Helium Line (304A) index"),
    Descriptor::scalar(PROTONFLUX, "Proton Flux"),
    Descriptor::scalar(ELECTRONFLUX, "Electron Flux"),
    Descriptor::scalar(AURORA, "Aurora"),
    Descriptor::scalar(AURORA_LATITUDE, "Aurora Latitude"),
    Descriptor::scalar(NORMALIZATION, "Normalization factor"),
    Descriptor::scalar(SOLARWIND, "Solar Wind"),
    Descriptor::scalar(MAGNETICFIELD, "Magnetic Field (Bz component)"),
    Descriptor::scalar(UPDATED, "Time the feed was last updated, as a UNIX timestamp"),
    Descriptor {
        name: HF_CONDITION,
        help: "Calculated HF conditions (0 = Poor, 1 = Fair, 2 = Good)",
        labels: &[LABEL_BAND_NAME, LABEL_TIME],
    },
    Descriptor {
        name: VHF_CONDITION,
        help: "Calculated VHF conditions (0 = Band Closed, 1 = High MUF, 2 = 50MHz ES, 3 = 70MHz ES, \
               4 = 144MHz ES, 5 = MID LAT AUR, 6 = High LAT AUR)",
        labels: &[LABEL_PHENOMENON, LABEL_LOCATION],
    },
];

pub type Labels = Vec<(&'static str, String)>;

/// A single named value, with labels in the order of its `Descriptor`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub name: &'static str,
    pub value: f64,
    pub labels: Labels,
}

impl Observation {
    fn scalar(name: &'static str, value: f64) -> Self {
        Observation {
            name,
            value,
            labels: Vec::new(),
        }
    }
}

/// Map every field of a `Reading` to observations.
///
/// Scalar fields come first in `DESCRIPTORS` order, followed by HF and VHF conditions in
/// feed order with the status ordinal as value. The textual K index trend is not emitted.
pub fn project(reading: &Reading) -> Vec<Observation> {
    let mut out = vec![
        Observation::scalar(SOLARFLUX, reading.solar_flux_index as f64),
        Observation::scalar(SUNSPOTS, f64::from(reading.sunspot_number)),
        Observation::scalar(AINDEX, reading.planetary_a_index as f64),
        Observation::scalar(KINDEX, reading.planetary_k_index as f64),
        Observation::scalar(XRAYS, reading.x_ray_flux),
        Observation::scalar(HELIUMLINE, reading.helium_line_index),
        Observation::scalar(PROTONFLUX, reading.proton_flux as f64),
        Observation::scalar(ELECTRONFLUX, reading.electron_flux as f64),
        Observation::scalar(AURORA, reading.aurora_activity as f64),
        Observation::scalar(AURORA_LATITUDE, reading.aurora_latitude),
        Observation::scalar(NORMALIZATION, reading.normalization_factor),
        Observation::scalar(SOLARWIND, reading.solar_wind_speed),
        Observation::scalar(MAGNETICFIELD, reading.magnetic_field_bz),
        Observation::scalar(UPDATED, reading.updated_at.timestamp() as f64),
    ];

    out.extend(reading.hf_conditions.iter().map(|c| Observation {
        name: HF_CONDITION,
        value: f64::from(c.status.ordinal()),
        labels: vec![(LABEL_BAND_NAME, c.band.clone()), (LABEL_TIME, c.observed_at.clone())],
    }));

    out.extend(reading.vhf_conditions.iter().map(|c| Observation {
        name: VHF_CONDITION,
        value: f64::from(c.status.ordinal()),
        labels: vec![(LABEL_PHENOMENON, c.phenomenon.clone()), (LABEL_LOCATION, c.location.clone())],
    }));

    out
}

/// Build a registry holding the result of a single scrape.
///
/// `None` means the scrape failed and only `up` (set to 0) is registered. Otherwise `up` is
/// 1 and every descriptor with at least one observation is registered as a gauge, or as a
/// gauge family if it has label keys.
pub fn scrape_registry(observations: Option<&[Observation]>) -> Registry {
    let mut registry = Registry::with_prefix(NAMESPACE);
    let up: Gauge = Gauge::default();
    registry.register(UP.name, UP.help, up.clone());

    let observations = match observations {
        Some(o) => o,
        None => return registry,
    };

    up.set(1);
    for desc in DESCRIPTORS {
        let mut matching = observations.iter().filter(|o| o.name == desc.name).peekable();
        if matching.peek().is_none() {
            continue;
        }

        if desc.labels.is_empty() {
            let gauge = Gauge::<f64, AtomicU64>::default();
            matching.for_each(|o| {
                gauge.set(o.value);
            });
            registry.register(desc.name, desc.help, gauge);
        } else {
            let family = Family::<Labels, Gauge<f64, AtomicU64>>::default();
            matching.for_each(|o| {
                family.get_or_create(&o.labels).set(o.value);
            });
            registry.register(desc.name, desc.help, family);
        }
    }

    registry
}
