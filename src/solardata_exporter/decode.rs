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

//! Decoding of the HamQSL `solarxml.php` feed into a [`Reading`].
//!
//! Timestamps, X-ray classes and HF/VHF status text are strict: any value that does not
//! match the expected format fails the whole decode, since it means the feed changed. Sunspots,
//! proton flux and electron flux are lenient and become zero when they don't parse, because the
//! feed regularly reports them as "NoRpt".
//!
//! Only the `updated` timestamp must be present. Any other scalar element that is absent takes
//! its zero value, but one that is present and doesn't parse is still an error.

use crate::reading::{HfCondition, Reading, Status, VhfCondition};
use chrono::{DateTime, NaiveDateTime, Utc};
use roxmltree::{Document, Node};
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::str::FromStr;

const ROOT_ELEMENT: &str = "solar";
const DATA_ELEMENT: &str = "solardata";
const HF_ELEMENT: &str = "calculatedconditions";
const VHF_ELEMENT: &str = "calculatedvhfconditions";

const TIMESTAMP_FIELD: &str = "updated";
const TIMESTAMP_FORMAT: &str = " %d %b %Y %H%M GMT";
// 'd' is any digit, 'a' is any letter, everything else must match exactly.
const TIMESTAMP_SHAPE: &[u8] = b" dd aaa dddd dddd GMT";

const XRAY_FIELD: &str = "xray";
// Class letter and the power of ten it scales the magnitude by.
const XRAY_CLASSES: [(char, i32); 5] = [('A', 0), ('B', 1), ('C', 2), ('M', 3), ('X', 4)];

#[derive(Debug)]
pub enum DecodeError {
    Malformed(roxmltree::Error),
    UnexpectedRoot(String),
    Missing(&'static str),
    InvalidField(&'static str, String),
}

impl DecodeError {
    /// True if the payload didn't have the expected structure at all, as opposed to a
    /// single field failing to parse.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::InvalidField(_, _))
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed feed: {}", e),
            Self::UnexpectedRoot(name) => write!(f, "unexpected root element <{}>", name),
            Self::Missing(name) => write!(f, "missing {}", name),
            Self::InvalidField(field, value) => write!(f, "invalid value \"{}\" for {}", value, field),
        }
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

/// Decode a raw feed payload into a `Reading`.
pub fn decode(raw: &[u8]) -> Result<Reading, DecodeError> {
    let text = feed_text(raw);
    let doc = Document::parse(&text).map_err(DecodeError::Malformed)?;

    let root = doc.root_element();
    if root.tag_name().name() != ROOT_ELEMENT {
        return Err(DecodeError::UnexpectedRoot(root.tag_name().name().to_owned()));
    }

    let data = child(root, DATA_ELEMENT).ok_or(DecodeError::Missing(DATA_ELEMENT))?;

    Ok(Reading {
        updated_at: parse_timestamp(required(data, TIMESTAMP_FIELD)?)?,
        solar_flux_index: parse_strict(data, "solarflux")?,
        planetary_a_index: parse_strict(data, "aindex")?,
        planetary_k_index: parse_strict(data, "kindex")?,
        k_index_trend: optional(data, "kindexnt").unwrap_or_default().to_owned(),
        x_ray_flux: optional(data, XRAY_FIELD).map(parse_xray).transpose()?.unwrap_or_default(),
        sunspot_number: parse_lenient(data, "sunspots"),
        helium_line_index: parse_strict(data, "heliumline")?,
        normalization_factor: parse_strict(data, "normalization")?,
        solar_wind_speed: parse_strict(data, "solarwind")?,
        magnetic_field_bz: parse_strict(data, "magneticfield")?,
        aurora_latitude: parse_strict(data, "latdegree")?,
        proton_flux: parse_lenient(data, "protonflux"),
        // Misspelled in the feed itself
        electron_flux: parse_lenient(data, "electonflux"),
        aurora_activity: parse_strict(data, "aurora")?,
        hf_conditions: hf_conditions(data)?,
        vhf_conditions: vhf_conditions(data)?,
    })
}

fn feed_text(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(s) => Cow::Borrowed(s),
        // The feed is declared as ISO-8859-1, where every byte is its own code point.
        Err(_) => Cow::Owned(raw.iter().map(|&b| char::from(b)).collect()),
    }
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.tag_name().name() == name)
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("")
}

fn optional<'a>(data: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(data, name).map(text)
}

fn required<'a>(data: Node<'a, '_>, name: &'static str) -> Result<&'a str, DecodeError> {
    optional(data, name).ok_or(DecodeError::Missing(name))
}

fn invalid(field: &'static str, value: &str) -> DecodeError {
    DecodeError::InvalidField(field, value.to_owned())
}

fn parse_strict<T: FromStr + Default>(data: Node<'_, '_>, name: &'static str) -> Result<T, DecodeError> {
    match optional(data, name) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(name, raw)),
        None => Ok(T::default()),
    }
}

fn parse_lenient<T: FromStr + Default>(data: Node<'_, '_>, name: &'static str) -> T {
    child(data, name)
        .and_then(|n| text(n).parse().ok())
        .unwrap_or_default()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    let shaped = raw.len() == TIMESTAMP_SHAPE.len()
        && raw.bytes().zip(TIMESTAMP_SHAPE).all(|(b, &s)| match s {
            b'd' => b.is_ascii_digit(),
            b'a' => b.is_ascii_alphabetic(),
            _ => b == s,
        });

    if !shaped {
        return Err(invalid(TIMESTAMP_FIELD, raw));
    }

    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|_| invalid(TIMESTAMP_FIELD, raw))
}

fn parse_xray(raw: &str) -> Result<f64, DecodeError> {
    let mut chars = raw.chars();
    let exponent = chars
        .next()
        .and_then(|c| XRAY_CLASSES.iter().find(|(class, _)| *class == c))
        .map(|(_, exp)| *exp);
    let magnitude = chars.as_str();

    match exponent {
        // Shift the decimal point instead of multiplying so C1.1 is exactly 110
        Some(exp) if is_decimal(magnitude) => format!("{}e{}", magnitude, exp)
            .parse()
            .map_err(|_| invalid(XRAY_FIELD, raw)),
        _ => Err(invalid(XRAY_FIELD, raw)),
    }
}

// Digits with an optional decimal point, such as "6.3", "6", "6." or ".3"
fn is_decimal(s: &str) -> bool {
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    !(whole.is_empty() && fraction.is_empty()) && whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
}

fn parse_status<S: Status>(raw: &str) -> Result<S, DecodeError> {
    S::from_feed(raw).ok_or_else(|| invalid(S::ELEMENT, raw))
}

fn attribute(node: Node<'_, '_>, name: &str, field: &'static str) -> Result<String, DecodeError> {
    node.attribute(name)
        .map(str::to_owned)
        .ok_or(DecodeError::Missing(field))
}

fn hf_conditions(data: Node<'_, '_>) -> Result<Vec<HfCondition>, DecodeError> {
    let Some(container) = child(data, HF_ELEMENT) else {
        return Ok(Vec::new());
    };

    container
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "band")
        .map(|band| {
            Ok(HfCondition {
                band: attribute(band, "name", "band@name")?,
                observed_at: attribute(band, "time", "band@time")?,
                status: parse_status(text(band))?,
            })
        })
        .collect()
}

fn vhf_conditions(data: Node<'_, '_>) -> Result<Vec<VhfCondition>, DecodeError> {
    let Some(container) = child(data, VHF_ELEMENT) else {
        return Ok(Vec::new());
    };

    container
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "phenomenon")
        .map(|phenomenon| {
            Ok(VhfCondition {
                phenomenon: attribute(phenomenon, "name", "phenomenon@name")?,
                location: attribute(phenomenon, "location", "phenomenon@location")?,
                status: parse_status(text(phenomenon))?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{decode, parse_timestamp, parse_xray, DecodeError};
    use crate::reading::{HfCondition, HfStatus, VhfCondition, VhfStatus};
    use chrono::{TimeZone, Utc};

    const FIXTURE: &str = include_str!("testdata/success.xml");

    fn replaced(from: &str, to: &str) -> String {
        assert!(FIXTURE.contains(from), "fixture does not contain {}", from);
        FIXTURE.replace(from, to)
    }

    #[test]
    fn test_decode_success() {
        let reading = decode(FIXTURE.as_bytes()).unwrap();

        assert_eq!(Utc.with_ymd_and_hms(2025, 3, 1, 23, 56, 0).unwrap(), reading.updated_at);
        assert_eq!(145, reading.solar_flux_index);
        assert_eq!(19, reading.planetary_a_index);
        assert_eq!(3, reading.planetary_k_index);
        assert_eq!("No Report", reading.k_index_trend);
        assert_eq!(720.0, reading.x_ray_flux);
        assert_eq!(105, reading.sunspot_number);
        assert_eq!(142.3, reading.helium_line_index);
        assert_eq!(80, reading.proton_flux);
        assert_eq!(2100, reading.electron_flux);
        assert_eq!(1, reading.aurora_activity);
        assert_eq!(67.5, reading.aurora_latitude);
        assert_eq!(1.99, reading.normalization_factor);
        assert_eq!(604.7, reading.solar_wind_speed);
        assert_eq!(1.9, reading.magnetic_field_bz);

        assert_eq!(8, reading.hf_conditions.len());
        assert_eq!(
            HfCondition {
                band: "80m-40m".to_owned(),
                observed_at: "day".to_owned(),
                status: HfStatus::Fair,
            },
            reading.hf_conditions[0]
        );
        assert_eq!(HfStatus::Poor, reading.hf_conditions[7].status);

        assert_eq!(5, reading.vhf_conditions.len());
        assert_eq!(
            VhfCondition {
                phenomenon: "vhf-aurora".to_owned(),
                location: "northern_hemi".to_owned(),
                status: VhfStatus::MidLatAur,
            },
            reading.vhf_conditions[0]
        );
        assert_eq!(VhfStatus::Es50Mhz, reading.vhf_conditions[3].status);
    }

    #[test]
    fn test_decode_idempotent() {
        let first = decode(FIXTURE.as_bytes()).unwrap();
        let second = decode(FIXTURE.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_no_report() {
        let feed = replaced("<sunspots>105</sunspots>", "<sunspots>NoRpt</sunspots>")
            .replace("<protonflux>80</protonflux>", "<protonflux>NoRpt</protonflux>")
            .replace("<electonflux>2100</electonflux>", "<electonflux>NoRpt</electonflux>");
        let reading = decode(feed.as_bytes()).unwrap();

        assert_eq!(0, reading.sunspot_number);
        assert_eq!(0, reading.proton_flux);
        assert_eq!(0, reading.electron_flux);
    }

    #[test]
    fn test_decode_partial_no_report() {
        let feed = r#"<?xml version="1.0"?>
	<solar>
			<solardata>
				<source url="http://www.hamqsl.com/solar.html">N0NBH</source>
				<updated> 09 Jan 2026 0851 GMT</updated>
				<solarflux>140</solarflux>
				<sunspots>84</sunspots>
				<heliumline>128.2</heliumline>
				<protonflux>NoRpt</protonflux>
				<electonflux>NoRpt</electonflux>
			</solardata>
		</solar>
"#;
        let reading = decode(feed.as_bytes()).unwrap();

        assert_eq!(Utc.with_ymd_and_hms(2026, 1, 9, 8, 51, 0).unwrap(), reading.updated_at);
        assert_eq!(140, reading.solar_flux_index);
        assert_eq!(84, reading.sunspot_number);
        assert_eq!(128.2, reading.helium_line_index);
        assert_eq!(0, reading.proton_flux);
        assert_eq!(0, reading.electron_flux);
        assert_eq!(0, reading.planetary_a_index);
        assert_eq!(0.0, reading.x_ray_flux);
        assert_eq!("", reading.k_index_trend);
        assert!(reading.hf_conditions.is_empty());
    }

    #[test]
    fn test_decode_padded_numeric() {
        let feed = replaced("<aindex>19</aindex>", "<aindex> 19</aindex>")
            .replace("<solarwind>604.7</solarwind>", "<solarwind>604.7\n</solarwind>");
        let reading = decode(feed.as_bytes()).unwrap();

        assert_eq!(19, reading.planetary_a_index);
        assert_eq!(604.7, reading.solar_wind_speed);
    }

    #[test]
    fn test_decode_padded_numeric_invalid() {
        let feed = replaced("<aindex>19</aindex>", "<aindex> NoRpt </aindex>");
        let err = decode(feed.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField("aindex", ref v) if v == " NoRpt "));
    }

    #[test]
    fn test_decode_lenient_missing() {
        let feed = replaced("<sunspots>105</sunspots>", "");
        let reading = decode(feed.as_bytes()).unwrap();
        assert_eq!(0, reading.sunspot_number);
    }

    #[test]
    fn test_decode_unknown_hf_status() {
        let feed = replaced(
            r#"<band name="30m-20m" time="day">Good</band>"#,
            r#"<band name="30m-20m" time="day">Excellent</band>"#,
        );
        let err = decode(feed.as_bytes()).unwrap_err();

        assert!(!err.is_structural());
        assert!(matches!(
            err,
            DecodeError::InvalidField("calculatedconditions.band", ref v) if v == "Excellent"
        ));
    }

    #[test]
    fn test_decode_unknown_vhf_status() {
        let feed = replaced(
            r#"<phenomenon name="E-Skip" location="europe">Band Closed</phenomenon>"#,
            r#"<phenomenon name="E-Skip" location="europe">Band Open</phenomenon>"#,
        );
        let err = decode(feed.as_bytes()).unwrap_err();

        assert!(matches!(
            err,
            DecodeError::InvalidField("calculatedvhfconditions.phenomenon", ref v) if v == "Band Open"
        ));
    }

    #[test]
    fn test_decode_cdata_status() {
        let feed = replaced(
            r#"<band name="80m-40m" time="day">Fair</band>"#,
            r#"<band name="80m-40m" time="day"><![CDATA[Good]]></band>"#,
        )
        .replace(
            r#"<phenomenon name="E-Skip" location="europe">Band Closed</phenomenon>"#,
            r#"<phenomenon name="E-Skip" location="europe"><![CDATA[High MUF]]></phenomenon>"#,
        );
        let reading = decode(feed.as_bytes()).unwrap();

        assert_eq!(HfStatus::Good, reading.hf_conditions[0].status);
        assert_eq!(VhfStatus::HighMuf, reading.vhf_conditions[1].status);
    }

    #[test]
    fn test_decode_invalid_xray() {
        let feed = replaced("<xray>C7.2</xray>", "<xray>Q7.2</xray>");
        let err = decode(feed.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField("xray", ref v) if v == "Q7.2"));
    }

    #[test]
    fn test_decode_invalid_timestamp() {
        let feed = replaced(
            "<updated> 01 Mar 2025 2356 GMT</updated>",
            "<updated>2025-03-01T23:56:00Z</updated>",
        );
        let err = decode(feed.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField("updated", _)));
    }

    #[test]
    fn test_decode_invalid_integer() {
        let feed = replaced("<aindex>19</aindex>", "<aindex>NoRpt</aindex>");
        let err = decode(feed.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField("aindex", ref v) if v == "NoRpt"));
    }

    #[test]
    fn test_decode_missing_timestamp() {
        let feed = replaced("<updated> 01 Mar 2025 2356 GMT</updated>", "");
        let err = decode(feed.as_bytes()).unwrap_err();

        assert!(err.is_structural());
        assert!(matches!(err, DecodeError::Missing("updated")));
    }

    #[test]
    fn test_decode_missing_scalar() {
        let feed = replaced("<solarflux>145</solarflux>", "").replace("<xray>C7.2</xray>", "");
        let reading = decode(feed.as_bytes()).unwrap();

        assert_eq!(0, reading.solar_flux_index);
        assert_eq!(0.0, reading.x_ray_flux);
    }

    #[test]
    fn test_decode_missing_attribute() {
        let feed = replaced(
            r#"<band name="80m-40m" time="day">Fair</band>"#,
            r#"<band name="80m-40m">Fair</band>"#,
        );
        let err = decode(feed.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Missing("band@time")));
    }

    #[test]
    fn test_decode_empty_conditions() {
        let start = FIXTURE.find("<calculatedconditions>").unwrap();
        let end = FIXTURE.find("<geomagfield>").unwrap();
        let feed = format!("{}{}", &FIXTURE[..start], &FIXTURE[end..]);
        let reading = decode(feed.as_bytes()).unwrap();

        assert!(reading.hf_conditions.is_empty());
        assert!(reading.vhf_conditions.is_empty());
    }

    #[test]
    fn test_decode_malformed() {
        let err = decode(b"<solar><solardata>").unwrap_err();
        assert!(err.is_structural());
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decode_unexpected_root() {
        let err = decode(b"<rss><channel></channel></rss>").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedRoot(ref name) if name == "rss"));
    }

    #[test]
    fn test_decode_latin1() {
        let mut feed = replaced("<kindexnt>No Report</kindexnt>", "<kindexnt>\u{fffd}</kindexnt>").into_bytes();
        let pos = feed.windows(3).position(|w| w == "\u{fffd}".as_bytes()).unwrap();
        // Replace the three byte UTF-8 sequence with a single ISO-8859-1 degree sign
        feed.splice(pos..pos + 3, [0xb0]);

        let reading = decode(&feed).unwrap();
        assert_eq!("\u{b0}", reading.k_index_trend);
    }

    #[test]
    fn test_parse_xray() {
        assert_eq!(6300.0, parse_xray("M6.3").unwrap());
        assert_eq!(110.0, parse_xray("C1.1").unwrap());
        assert_eq!(5.0, parse_xray("A5.0").unwrap());
        assert_eq!(10000.0, parse_xray("X1.0").unwrap());
        assert_eq!(72.0, parse_xray("B7.2").unwrap());
        assert_eq!(2000.0, parse_xray("M2").unwrap());
        assert_eq!(1000.0, parse_xray("M1.").unwrap());
        assert_eq!(500.0, parse_xray("M.5").unwrap());
    }

    #[test]
    fn test_parse_xray_invalid() {
        for raw in ["", "M", "Z1.0", "m6.3", "M-1.0", "Minf", "MNaN", "M1e3", "M.", "M1.2.3", "M 6.3"] {
            assert!(
                matches!(parse_xray(raw), Err(DecodeError::InvalidField("xray", _))),
                "expected {:?} to be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            Utc.with_ymd_and_hms(2025, 3, 1, 23, 56, 0).unwrap(),
            parse_timestamp(" 01 Mar 2025 2356 GMT").unwrap()
        );
        assert_eq!(
            Utc.with_ymd_and_hms(2026, 1, 9, 8, 51, 0).unwrap(),
            parse_timestamp(" 09 Jan 2026 0851 GMT").unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        for raw in [
            "01 Mar 2025 2356 GMT",
            " 1 Mar 2025 2356 GMT",
            " 01 Mar 2025 23:56 GMT",
            " 01 Mar 2025 2356 UTC",
            " 01 Mar 2025 2356 GMT ",
            " 32 Mar 2025 2356 GMT",
            " 01 Foo 2025 2356 GMT",
            " 01 Mar 2025 2460 GMT",
            "",
        ] {
            assert!(
                matches!(parse_timestamp(raw), Err(DecodeError::InvalidField("updated", _))),
                "expected {:?} to be rejected",
                raw
            );
        }
    }
}
