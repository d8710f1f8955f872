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

use chrono::{DateTime, Utc};
use std::error;
use std::fmt;

/// Snapshot of the solar data feed for a single scrape.
///
/// Every field is always present. Fields the feed reports as "NoRpt" (sunspots, proton
/// flux, electron flux) are set to zero rather than failing the whole decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub updated_at: DateTime<Utc>,
    pub solar_flux_index: i64,
    pub planetary_a_index: i64,
    pub planetary_k_index: i64,
    pub k_index_trend: String,
    /// X-ray flux scaled by class (`M6.3` is `6300.0`), never negative.
    pub x_ray_flux: f64,
    pub sunspot_number: u32,
    pub helium_line_index: f64,
    pub normalization_factor: f64,
    pub solar_wind_speed: f64,
    pub magnetic_field_bz: f64,
    pub aurora_latitude: f64,
    pub proton_flux: u64,
    pub electron_flux: u64,
    pub aurora_activity: i64,
    pub hf_conditions: Vec<HfCondition>,
    pub vhf_conditions: Vec<VhfCondition>,
}

/// Calculated HF propagation for a band and time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HfCondition {
    pub band: String,
    pub observed_at: String,
    pub status: HfStatus,
}

/// Calculated VHF propagation for a phenomenon in some region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VhfCondition {
    pub phenomenon: String,
    pub location: String,
    pub status: VhfStatus,
}

/// A closed vocabulary of status text reported by the feed.
///
/// Ordinals are exported as metric values and alerted on downstream, so variants
/// must never be reordered.
pub trait Status: Copy + Eq + fmt::Debug + 'static {
    /// Name of the feed element the status text comes from, used in errors.
    const ELEMENT: &'static str;
    /// Number of declared variants.
    const COUNT: usize;
    /// Feed text for every variant, indexed by ordinal.
    const VOCABULARY: &'static [(&'static str, Self)];

    fn ordinal(self) -> u8;

    /// Look up the variant for exact feed text, `None` for anything not in the vocabulary.
    fn from_feed(text: &str) -> Option<Self> {
        Self::VOCABULARY
            .iter()
            .find(|(name, _)| *name == text)
            .map(|(_, status)| *status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HfStatus {
    Poor = 0,
    Fair = 1,
    Good = 2,
}

impl Status for HfStatus {
    const ELEMENT: &'static str = "calculatedconditions.band";
    const COUNT: usize = 3;
    const VOCABULARY: &'static [(&'static str, Self)] =
        &[("Poor", HfStatus::Poor), ("Fair", HfStatus::Fair), ("Good", HfStatus::Good)];

    fn ordinal(self) -> u8 {
        self as u8
    }
}

// Full list of values from https://www.hamqsl.com/shortcut.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VhfStatus {
    BandClosed = 0,
    HighMuf = 1,
    Es50Mhz = 2,
    Es70Mhz = 3,
    Es144Mhz = 4,
    MidLatAur = 5,
    HighLatAur = 6,
}

impl Status for VhfStatus {
    const ELEMENT: &'static str = "calculatedvhfconditions.phenomenon";
    const COUNT: usize = 7;
    const VOCABULARY: &'static [(&'static str, Self)] = &[
        ("Band Closed", VhfStatus::BandClosed),
        ("High MUF", VhfStatus::HighMuf),
        ("50MHz ES", VhfStatus::Es50Mhz),
        ("70MHz ES", VhfStatus::Es70Mhz),
        ("144MHz ES", VhfStatus::Es144Mhz),
        ("MID LAT AUR", VhfStatus::MidLatAur),
        ("High LAT AUR", VhfStatus::HighLatAur),
    ];

    fn ordinal(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum VocabularyError {
    Incomplete(&'static str, usize, usize),
    Misplaced(&'static str, &'static str, usize),
    Duplicate(&'static str, &'static str),
}

impl fmt::Display for VocabularyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete(element, expected, actual) => {
                write!(f, "{} vocabulary has {} entries, expected {}", element, actual, expected)
            }
            Self::Misplaced(element, name, index) => {
                write!(f, "{} vocabulary entry \"{}\" at {} does not match its ordinal", element, name, index)
            }
            Self::Duplicate(element, name) => write!(f, "{} vocabulary repeats \"{}\"", element, name),
        }
    }
}

impl error::Error for VocabularyError {}

/// Verify that a status lookup table covers its whole enum exactly once, in ordinal order.
pub fn check_vocabulary<S: Status>() -> Result<(), VocabularyError> {
    let table = S::VOCABULARY;
    if table.len() != S::COUNT {
        return Err(VocabularyError::Incomplete(S::ELEMENT, S::COUNT, table.len()));
    }

    for (i, &(name, status)) in table.iter().enumerate() {
        if usize::from(status.ordinal()) != i {
            return Err(VocabularyError::Misplaced(S::ELEMENT, name, i));
        }

        if table[..i].iter().any(|(other, _)| *other == name) {
            return Err(VocabularyError::Duplicate(S::ELEMENT, name));
        }
    }

    Ok(())
}

/// Check every status vocabulary the decoder relies on. Run once at startup.
pub fn check_vocabularies() -> Result<(), VocabularyError> {
    check_vocabulary::<HfStatus>()?;
    check_vocabulary::<VhfStatus>()
}
