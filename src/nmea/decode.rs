// src/nmea/decode.rs
//! Typed decoding for the sentence kinds carried on the HDV and INS channels

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::sentence::{ParseError, SentenceRecord};

/// Sentence kinds with a known field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentenceKind {
    Gga,
    Rmc,
    Gll,
    Hdg,
    Hdm,
    Hdt,
    Rot,
    Xdr,
    Mwv,
    Vhw,
    Vwr,
    Dbt,
    Dpt,
    Dbk,
    Mtw,
    Zda,
}

impl SentenceKind {
    pub fn from_type(sentence_type: &str) -> Option<Self> {
        let kind = match sentence_type {
            "GGA" => Self::Gga,
            "RMC" => Self::Rmc,
            "GLL" => Self::Gll,
            "HDG" => Self::Hdg,
            "HDM" => Self::Hdm,
            "HDT" => Self::Hdt,
            "ROT" => Self::Rot,
            "XDR" => Self::Xdr,
            "MWV" => Self::Mwv,
            "VHW" => Self::Vhw,
            "VWR" => Self::Vwr,
            "DBT" => Self::Dbt,
            "DPT" => Self::Dpt,
            "DBK" => Self::Dbk,
            "MTW" => Self::Mtw,
            "ZDA" => Self::Zda,
            _ => return None,
        };
        Some(kind)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Gga => "Global Positioning System Fix Data",
            Self::Rmc => "Recommended Minimum Navigation Information",
            Self::Gll => "Geographic Position, Latitude and Longitude",
            Self::Hdg => "Heading, Deviation and Variation",
            Self::Hdm => "Heading, Magnetic",
            Self::Hdt => "Heading, True",
            Self::Rot => "Rate of Turn",
            Self::Xdr => "Transducer Measurements",
            Self::Mwv => "Wind Speed and Angle",
            Self::Vhw => "Water Speed and Heading",
            Self::Vwr => "Relative Wind Speed and Angle",
            Self::Dbt => "Depth Below Transducer",
            Self::Dpt => "Depth of Water",
            Self::Dbk => "Depth Below Keel",
            Self::Mtw => "Mean Temperature of Water",
            Self::Zda => "Time and Date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingReference {
    Magnetic,
    True,
}

/// Typed view of a sentence. Every numeric value is optional because
/// instruments routinely leave fields empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decoded {
    Position {
        latitude: Option<f64>,
        longitude: Option<f64>,
        fix_quality: Option<u8>,
        satellites: Option<u8>,
        hdop: Option<f64>,
        altitude: Option<f64>,
    },
    Course {
        active: bool,
        latitude: Option<f64>,
        longitude: Option<f64>,
        speed_knots: Option<f64>,
        course: Option<f64>,
    },
    Heading {
        reference: HeadingReference,
        heading: Option<f64>,
        deviation: Option<f64>,
        variation: Option<f64>,
    },
    Wind {
        relative: bool,
        angle: Option<f64>,
        speed: Option<f64>,
        unit: String,
    },
    Depth {
        depth_m: Option<f64>,
        offset_m: Option<f64>,
    },
    WaterTemperature {
        celsius: Option<f64>,
    },
    WaterSpeed {
        heading_true: Option<f64>,
        heading_magnetic: Option<f64>,
        speed_knots: Option<f64>,
        speed_kmh: Option<f64>,
    },
    RateOfTurn {
        valid: bool,
        /// Degrees per minute, negative to port
        degrees_per_minute: Option<f64>,
    },
    Transducers {
        measurements: Vec<Measurement>,
    },
    Time {
        /// UTC date and time, if both parts were present
        utc: Option<NaiveDateTime>,
        zone_hours: Option<i8>,
        zone_minutes: Option<u8>,
    },
}

/// One quadruple of an XDR sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub transducer: String,
    pub value: Option<f64>,
    pub unit: String,
    pub name: String,
}

impl Decoded {
    pub fn from_record(record: &SentenceRecord) -> Result<Self, ParseError> {
        let kind = SentenceKind::from_type(record.sentence_type())
            .ok_or_else(|| ParseError::UnknownSentence(record.sentence_type().to_string()))?;

        match kind {
            SentenceKind::Gga => decode_gga(record),
            SentenceKind::Rmc => decode_rmc(record),
            SentenceKind::Hdg => decode_hdg(record),
            SentenceKind::Hdm => decode_single_heading(record, HeadingReference::Magnetic),
            SentenceKind::Hdt => decode_single_heading(record, HeadingReference::True),
            SentenceKind::Mwv => decode_mwv(record),
            SentenceKind::Dpt => decode_dpt(record),
            SentenceKind::Dbt | SentenceKind::Dbk => decode_feet_metres_depth(record),
            SentenceKind::Mtw => decode_mtw(record),
            SentenceKind::Gll => decode_gll(record),
            SentenceKind::Rot => decode_rot(record),
            SentenceKind::Xdr => decode_xdr(record),
            SentenceKind::Vhw => decode_vhw(record),
            SentenceKind::Vwr => decode_vwr(record),
            SentenceKind::Zda => decode_zda(record),
        }
    }
}

fn require_fields(record: &SentenceRecord, count: usize) -> Result<(), ParseError> {
    if record.fields().len() < count {
        return Err(ParseError::MalformedFrame(format!(
            "{} needs {} fields, got {}",
            record.sentence_type(),
            count,
            record.fields().len()
        )));
    }
    Ok(())
}

fn number<T: std::str::FromStr>(record: &SentenceRecord, index: usize) -> Option<T> {
    record
        .field(index)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<T>().ok())
}

/// Convert `ddmm.mmmm` plus hemisphere into signed decimal degrees.
fn coordinate(value: &str, hemisphere: &str, negative: &str) -> Option<f64> {
    if value.is_empty() || hemisphere.is_empty() {
        return None;
    }
    let raw = value.parse::<f64>().ok()?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    Some(if hemisphere == negative { -decimal } else { decimal })
}

fn field_str(record: &SentenceRecord, index: usize) -> &str {
    record.field(index).unwrap_or_default()
}

/// GGA: time, lat, N/S, lon, E/W, quality, satellites, hdop, altitude, ...
fn decode_gga(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 9)?;
    Ok(Decoded::Position {
        latitude: coordinate(field_str(record, 1), field_str(record, 2), "S"),
        longitude: coordinate(field_str(record, 3), field_str(record, 4), "W"),
        fix_quality: number(record, 5),
        satellites: number(record, 6),
        hdop: number(record, 7),
        altitude: number(record, 8),
    })
}

/// RMC: time, status, lat, N/S, lon, E/W, speed (knots), course, ...
fn decode_rmc(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 8)?;
    Ok(Decoded::Course {
        active: field_str(record, 1) == "A",
        latitude: coordinate(field_str(record, 2), field_str(record, 3), "S"),
        longitude: coordinate(field_str(record, 4), field_str(record, 5), "W"),
        speed_knots: number(record, 6),
        course: number(record, 7),
    })
}

fn signed(value: Option<f64>, direction: &str) -> Option<f64> {
    value.map(|v| if direction == "W" { -v } else { v })
}

/// HDG: heading, deviation, E/W, variation, E/W
fn decode_hdg(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 5)?;
    Ok(Decoded::Heading {
        reference: HeadingReference::Magnetic,
        heading: number(record, 0),
        deviation: signed(number(record, 1), field_str(record, 2)),
        variation: signed(number(record, 3), field_str(record, 4)),
    })
}

fn decode_single_heading(
    record: &SentenceRecord,
    reference: HeadingReference,
) -> Result<Decoded, ParseError> {
    require_fields(record, 1)?;
    Ok(Decoded::Heading {
        reference,
        heading: number(record, 0),
        deviation: None,
        variation: None,
    })
}

/// MWV: angle, R/T, speed, unit, status
fn decode_mwv(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 4)?;
    Ok(Decoded::Wind {
        relative: field_str(record, 1) == "R",
        angle: number(record, 0),
        speed: number(record, 2),
        unit: field_str(record, 3).to_string(),
    })
}

fn decode_dpt(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 1)?;
    Ok(Decoded::Depth {
        depth_m: number(record, 0),
        offset_m: number(record, 1),
    })
}

/// DBT and DBK: feet, f, metres, M, fathoms, F
fn decode_feet_metres_depth(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 3)?;
    let depth_m = number::<f64>(record, 2).or_else(|| number::<f64>(record, 0).map(|ft| ft * 0.3048));
    Ok(Decoded::Depth {
        depth_m,
        offset_m: None,
    })
}

fn decode_mtw(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 1)?;
    Ok(Decoded::WaterTemperature {
        celsius: number(record, 0),
    })
}

/// GLL: lat, N/S, lon, E/W, time, status
fn decode_gll(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 4)?;
    Ok(Decoded::Position {
        latitude: coordinate(field_str(record, 0), field_str(record, 1), "S"),
        longitude: coordinate(field_str(record, 2), field_str(record, 3), "W"),
        fix_quality: None,
        satellites: None,
        hdop: None,
        altitude: None,
    })
}

/// ROT: rate, status
fn decode_rot(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 1)?;
    Ok(Decoded::RateOfTurn {
        valid: field_str(record, 1) == "A",
        degrees_per_minute: number(record, 0),
    })
}

/// XDR: repeated (type, value, unit, name)
fn decode_xdr(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 4)?;
    let measurements = record
        .fields()
        .chunks_exact(4)
        .map(|chunk| Measurement {
            transducer: chunk[0].clone(),
            value: chunk[1].parse().ok(),
            unit: chunk[2].clone(),
            name: chunk[3].clone(),
        })
        .collect();
    Ok(Decoded::Transducers { measurements })
}

/// VHW: heading, T, heading, M, speed, N, speed, K
fn decode_vhw(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 8)?;
    Ok(Decoded::WaterSpeed {
        heading_true: number(record, 0),
        heading_magnetic: number(record, 2),
        speed_knots: number(record, 4),
        speed_kmh: number(record, 6),
    })
}

/// VWR: angle, L/R, knots, N, m/s, M, km/h, K
fn decode_vwr(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 4)?;
    let angle = number::<f64>(record, 0).map(|a| if field_str(record, 1) == "L" { -a } else { a });
    let (speed, unit) = match number::<f64>(record, 2) {
        Some(knots) => (Some(knots), "N"),
        None => (number(record, 4), "M"),
    };
    Ok(Decoded::Wind {
        relative: true,
        angle,
        speed,
        unit: unit.to_string(),
    })
}

/// ZDA: hhmmss.ss, day, month, year, zone hours, zone minutes
fn decode_zda(record: &SentenceRecord) -> Result<Decoded, ParseError> {
    require_fields(record, 4)?;
    let date = match (number(record, 3), number(record, 2), number(record, 1)) {
        (Some(year), Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
        _ => None,
    };
    let utc = date
        .zip(utc_time(field_str(record, 0)))
        .map(|(date, time)| date.and_time(time));
    Ok(Decoded::Time {
        utc,
        zone_hours: number(record, 4),
        zone_minutes: number(record, 5),
    })
}

fn utc_time(value: &str) -> Option<NaiveTime> {
    if value.len() < 6 || !value.is_char_boundary(6) {
        return None;
    }
    let hours = value[0..2].parse().ok()?;
    let minutes = value[2..4].parse().ok()?;
    let seconds: f64 = value[4..].parse().ok()?;
    let millis = ((seconds.fract() * 1000.0).round() as u32).min(999);
    NaiveTime::from_hms_milli_opt(hours, minutes, seconds.trunc() as u32, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::parse_sentence;

    fn decode(line: &str) -> Result<Decoded, ParseError> {
        parse_sentence(line).unwrap().decode()
    }

    #[test]
    fn test_gga_decoding() {
        let decoded = decode("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").unwrap();

        match decoded {
            Decoded::Position {
                latitude,
                longitude,
                fix_quality,
                satellites,
                hdop,
                altitude,
            } => {
                assert!((latitude.unwrap() - 48.1173).abs() < 0.0001);
                assert!((longitude.unwrap() - 11.516_667).abs() < 0.0001);
                assert_eq!(fix_quality, Some(1));
                assert_eq!(satellites, Some(8));
                assert_eq!(hdop, Some(0.9));
                assert_eq!(altitude, Some(545.4));
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_rmc_decoding() {
        let decoded = decode("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A").unwrap();

        match decoded {
            Decoded::Course {
                active,
                speed_knots,
                course,
                ..
            } => {
                assert!(active);
                assert_eq!(speed_knots, Some(22.4));
                assert_eq!(course, Some(84.4));
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_southern_western_hemispheres_are_negative() {
        assert!((coordinate("3352.000", "S", "S").unwrap() + 33.866_667).abs() < 0.0001);
        assert!((coordinate("15112.000", "W", "W").unwrap() + 151.2).abs() < 0.0001);
        assert_eq!(coordinate("", "N", "S"), None);
    }

    #[test]
    fn test_hdg_decoding() {
        let decoded = decode("$IIHDG,181.5,,,2.1,E*2C").unwrap();
        assert_eq!(
            decoded,
            Decoded::Heading {
                reference: HeadingReference::Magnetic,
                heading: Some(181.5),
                deviation: None,
                variation: Some(2.1),
            }
        );
    }

    #[test]
    fn test_hdt_and_hdm_decoding() {
        assert!(matches!(
            decode("$IIHDT,182.3,T*2A").unwrap(),
            Decoded::Heading {
                reference: HeadingReference::True,
                heading: Some(h),
                ..
            } if (h - 182.3).abs() < f64::EPSILON
        ));
        assert!(matches!(
            decode("$IIHDM,179.0,M*2D").unwrap(),
            Decoded::Heading {
                reference: HeadingReference::Magnetic,
                ..
            }
        ));
    }

    #[test]
    fn test_wind_depth_temperature() {
        assert_eq!(
            decode("$IIMWV,045.0,R,12.5,N,A*0A").unwrap(),
            Decoded::Wind {
                relative: true,
                angle: Some(45.0),
                speed: Some(12.5),
                unit: "N".to_string(),
            }
        );
        assert_eq!(
            decode("$IIDPT,12.3,0.5*75").unwrap(),
            Decoded::Depth {
                depth_m: Some(12.3),
                offset_m: Some(0.5),
            }
        );
        assert_eq!(
            decode("$IIDBT,40.4,f,12.3,M,6.7,F*10").unwrap(),
            Decoded::Depth {
                depth_m: Some(12.3),
                offset_m: None,
            }
        );
        assert_eq!(
            decode("$IIMTW,18.5,C*1F").unwrap(),
            Decoded::WaterTemperature {
                celsius: Some(18.5)
            }
        );
    }

    #[test]
    fn test_decoding_edge_cases() {
        let sydney_lat = -(33.0 + 52.0 / 60.0);
        let sydney_lon = -(151.0 + 12.0 / 60.0);
        let cases = vec![
            (
                "$IIHDG,181.5,3.0,W,2.1,W*44",
                Decoded::Heading {
                    reference: HeadingReference::Magnetic,
                    heading: Some(181.5),
                    deviation: Some(-3.0),
                    variation: Some(-2.1),
                },
            ),
            (
                // Metres left empty, depth comes from feet
                "$IIDBT,32.8,f,,M,,F*28",
                Decoded::Depth {
                    depth_m: Some(32.8 * 0.3048),
                    offset_m: None,
                },
            ),
            (
                "$GPGGA,123519,3352.000,S,15112.000,W,1,08,0.9,545.4,M,46.9,M,,*4B",
                Decoded::Position {
                    latitude: Some(sydney_lat),
                    longitude: Some(sydney_lon),
                    fix_quality: Some(1),
                    satellites: Some(8),
                    hdop: Some(0.9),
                    altitude: Some(545.4),
                },
            ),
            (
                "$GPRMC,123519,V,3352.000,S,15112.000,W,0.0,,230394,,*28",
                Decoded::Course {
                    active: false,
                    latitude: Some(sydney_lat),
                    longitude: Some(sydney_lon),
                    speed_knots: Some(0.0),
                    course: None,
                },
            ),
            (
                "$IIMWV,270.0,T,8.0,M,A*35",
                Decoded::Wind {
                    relative: false,
                    angle: Some(270.0),
                    speed: Some(8.0),
                    unit: "M".to_string(),
                },
            ),
        ];

        for (line, expected) in cases {
            assert_eq!(decode(line).unwrap(), expected, "line {}", line);
        }
        assert!((sydney_lat + 33.866_667).abs() < 0.0001);
    }

    #[test]
    fn test_gll_decoding() {
        assert_eq!(
            decode("$GPGLL,4916.45,N,12311.12,W,225444,A*31").unwrap(),
            Decoded::Position {
                latitude: coordinate("4916.45", "N", "S"),
                longitude: coordinate("12311.12", "W", "W"),
                fix_quality: None,
                satellites: None,
                hdop: None,
                altitude: None,
            }
        );
        match decode("$GPGLL,4916.45,N,12311.12,W,225444,A*31").unwrap() {
            Decoded::Position {
                latitude: Some(lat),
                longitude: Some(lon),
                ..
            } => {
                assert!((lat - 49.274_167).abs() < 0.0001);
                assert!((lon + 123.185_333).abs() < 0.0001);
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_rate_of_turn_and_water_speed() {
        assert_eq!(
            decode("$IIROT,-3.2,A*0A").unwrap(),
            Decoded::RateOfTurn {
                valid: true,
                degrees_per_minute: Some(-3.2),
            }
        );
        assert_eq!(
            decode("$IIVHW,,T,182.0,M,5.2,N,9.6,K*78").unwrap(),
            Decoded::WaterSpeed {
                heading_true: None,
                heading_magnetic: Some(182.0),
                speed_knots: Some(5.2),
                speed_kmh: Some(9.6),
            }
        );
    }

    #[test]
    fn test_relative_wind_and_keel_depth() {
        assert_eq!(
            decode("$IIVWR,035.0,L,10.2,N,5.2,M,18.9,K*55").unwrap(),
            Decoded::Wind {
                relative: true,
                angle: Some(-35.0),
                speed: Some(10.2),
                unit: "N".to_string(),
            }
        );
        assert_eq!(
            decode("$IIDBK,33.5,f,10.2,M,5.6,F*0B").unwrap(),
            Decoded::Depth {
                depth_m: Some(10.2),
                offset_m: None,
            }
        );
    }

    #[test]
    fn test_transducer_measurements() {
        let decoded = decode("$IIXDR,C,19.5,C,AIRTEMP,P,1.013,B,BARO*2A").unwrap();
        assert_eq!(
            decoded,
            Decoded::Transducers {
                measurements: vec![
                    Measurement {
                        transducer: "C".to_string(),
                        value: Some(19.5),
                        unit: "C".to_string(),
                        name: "AIRTEMP".to_string(),
                    },
                    Measurement {
                        transducer: "P".to_string(),
                        value: Some(1.013),
                        unit: "B".to_string(),
                        name: "BARO".to_string(),
                    },
                ],
            }
        );
    }

    #[test]
    fn test_time_and_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 23)
            .and_then(|d| d.and_hms_milli_opt(12, 35, 19, 500));
        assert_eq!(
            decode("$IIZDA,123519.50,23,03,2024,-05,30*54").unwrap(),
            Decoded::Time {
                utc: expected,
                zone_hours: Some(-5),
                zone_minutes: Some(30),
            }
        );
        assert_eq!(
            decode("$IIZDA,,,,,,*5F").unwrap(),
            Decoded::Time {
                utc: None,
                zone_hours: None,
                zone_minutes: None,
            }
        );
    }

    #[test]
    fn test_every_known_kind_decodes() {
        let lines = [
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A",
            "$GPGLL,4916.45,N,12311.12,W,225444,A*31",
            "$IIHDG,181.5,,,2.1,E*2C",
            "$IIHDM,179.0,M*2D",
            "$IIHDT,182.3,T*2A",
            "$IIROT,-3.2,A*0A",
            "$IIXDR,C,19.5,C,AIRTEMP,P,1.013,B,BARO*2A",
            "$IIMWV,045.0,R,12.5,N,A*0A",
            "$IIVHW,,T,182.0,M,5.2,N,9.6,K*78",
            "$IIVWR,035.0,L,10.2,N,5.2,M,18.9,K*55",
            "$IIDBT,40.4,f,12.3,M,6.7,F*10",
            "$IIDPT,12.3,0.5*75",
            "$IIDBK,33.5,f,10.2,M,5.6,F*0B",
            "$IIMTW,18.5,C*1F",
            "$IIZDA,123519.50,23,03,2024,-05,30*54",
        ];
        for line in lines {
            assert!(decode(line).is_ok(), "{} did not decode", line);
        }
    }

    #[test]
    fn test_unknown_sentence() {
        assert_eq!(
            decode("$GPHDV,1,2,3*51"),
            Err(ParseError::UnknownSentence("HDV".to_string()))
        );
    }

    #[test]
    fn test_short_sentence_is_malformed() {
        assert!(matches!(
            decode("$IIHDG,181.5"),
            Err(ParseError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_kind_lookup() {
        assert_eq!(SentenceKind::from_type("ZDA"), Some(SentenceKind::Zda));
        assert_eq!(SentenceKind::Zda.description(), "Time and Date");
        assert_eq!(SentenceKind::from_type("HDV"), None);
    }
}
