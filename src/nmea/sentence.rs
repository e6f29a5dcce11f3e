// src/nmea/sentence.rs
//! Framing, checksum verification and field splitting for single NMEA 0183 sentences

use serde::{Serialize, Serializer};
use thiserror::Error;

use super::decode::Decoded;

/// Why a single line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty sentence")]
    Empty,

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("checksum mismatch: computed {expected:02X}, transmitted {found:02X}")]
    ChecksumMismatch { expected: u8, found: u8 },

    #[error("unknown sentence type: {0}")]
    UnknownSentence(String),
}

/// A parsed NMEA sentence. Field values are kept as the raw strings that
/// were transmitted; see [`SentenceRecord::decode`] for typed access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceRecord {
    talker_id: String,
    sentence_type: String,
    fields: Vec<String>,
    raw: String,
    checksum_valid: bool,
}

impl SentenceRecord {
    /// Two-character talker identifier, e.g. `GP` or `II`.
    pub fn talker_id(&self) -> &str {
        &self.talker_id
    }

    /// Message kind, e.g. `GGA` or `HDG`.
    pub fn sentence_type(&self) -> &str {
        &self.sentence_type
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field at `index`, or `None` when the sentence is shorter.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// The trimmed line as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// `true` when the line carried a checksum and it matched. Sentences
    /// sent without a `*hh` suffix are accepted with this set to `false`.
    pub fn checksum_valid(&self) -> bool {
        self.checksum_valid
    }

    /// Re-serialize the sentence with a freshly computed checksum.
    pub fn render(&self) -> String {
        let mut body = format!("{}{}", self.talker_id, self.sentence_type);
        for field in &self.fields {
            body.push(',');
            body.push_str(field);
        }
        format!("${}*{:02X}", body, checksum(&body))
    }

    /// Decode the sentence into typed values if its layout is known.
    pub fn decode(&self) -> Result<Decoded, ParseError> {
        Decoded::from_record(self)
    }
}

#[derive(Serialize)]
struct SentenceView<'a> {
    #[serde(rename = "type")]
    sentence_type: &'a str,
    talker: &'a str,
    data: &'a [String],
    raw: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    decoded: Option<Decoded>,
}

impl Serialize for SentenceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SentenceView {
            sentence_type: &self.sentence_type,
            talker: &self.talker_id,
            data: &self.fields,
            raw: &self.raw,
            decoded: self.decode().ok(),
        }
        .serialize(serializer)
    }
}

/// XOR of every byte in `body`, which must be the text between `$` and `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, byte| acc ^ byte)
}

/// Parse a single NMEA sentence.
///
/// Surrounding whitespace is ignored. The checksum, when present, must match;
/// sentence types are not checked against a known list.
pub fn parse_sentence(line: &str) -> Result<SentenceRecord, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }
    if !line.is_ascii() {
        return Err(ParseError::MalformedFrame("non-ASCII content".to_string()));
    }

    let framed = line
        .strip_prefix('$')
        .ok_or_else(|| ParseError::MalformedFrame("missing leading '$'".to_string()))?;

    let (body, checksum_valid) = match framed.split_once('*') {
        Some((body, transmitted)) => {
            let found = parse_checksum_field(transmitted)?;
            let expected = checksum(body);
            if expected != found {
                return Err(ParseError::ChecksumMismatch { expected, found });
            }
            (body, true)
        }
        None => (framed, false),
    };

    let mut tokens = body.split(',');
    let header = tokens.next().unwrap_or_default();
    if header.len() < 3 || !header.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ParseError::MalformedFrame(format!(
            "invalid sentence header '{}'",
            header
        )));
    }
    let (talker_id, sentence_type) = header.split_at(2);

    Ok(SentenceRecord {
        talker_id: talker_id.to_string(),
        sentence_type: sentence_type.to_string(),
        fields: tokens.map(str::to_string).collect(),
        raw: line.to_string(),
        checksum_valid,
    })
}

fn parse_checksum_field(text: &str) -> Result<u8, ParseError> {
    if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::MalformedFrame(format!(
            "invalid checksum field '{}'",
            text
        )));
    }
    u8::from_str_radix(text, 16)
        .map_err(|e| ParseError::MalformedFrame(format!("invalid checksum field '{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_valid_checksum() {
        let record = parse_sentence("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").unwrap();

        assert_eq!(record.talker_id(), "GP");
        assert_eq!(record.sentence_type(), "GGA");
        assert_eq!(record.fields().len(), 14);
        assert_eq!(record.field(0), Some("123519"));
        assert_eq!(record.field(13), Some(""));
        assert!(record.checksum_valid());
    }

    #[test]
    fn test_recomputed_checksum_matches_transmitted() {
        let line = "$IIHDG,181.5,,,2.1,E*2C";
        let record = parse_sentence(line).unwrap();
        let body = &line[1..line.find('*').unwrap()];
        assert_eq!(format!("{:02X}", checksum(body)), "2C");
        assert_eq!(record.render(), line);
    }

    #[test]
    fn test_lowercase_checksum_accepted() {
        let record = parse_sentence("$IIHDG,181.5,,,2.1,E*2c").unwrap();
        assert!(record.checksum_valid());
    }

    #[test]
    fn test_empty_fields_are_preserved() {
        let record = parse_sentence("$IIHDG,181.5,,,2.1,E*2C").unwrap();
        assert_eq!(record.fields(), &["181.5", "", "", "2.1", "E"]);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let record = parse_sentence("  $IIHDT,182.3,T*2A\r\n").unwrap();
        assert_eq!(record.raw(), "$IIHDT,182.3,T*2A");
    }

    #[test]
    fn test_checksum_mismatch() {
        let err = parse_sentence("$GPHDV,1,2,3*1B").unwrap_err();
        assert_eq!(
            err,
            ParseError::ChecksumMismatch {
                expected: 0x51,
                found: 0x1B
            }
        );
    }

    #[test]
    fn test_missing_checksum_accepted_unverified() {
        let record = parse_sentence("$IIMTW,18.5,C").unwrap();
        assert_eq!(record.sentence_type(), "MTW");
        assert!(!record.checksum_valid());
    }

    #[test]
    fn test_unknown_type_accepted_generically() {
        let record = parse_sentence("$GPHDV,1,2,3*51").unwrap();
        assert_eq!(record.talker_id(), "GP");
        assert_eq!(record.sentence_type(), "HDV");
        assert_eq!(record.fields(), &["1", "2", "3"]);
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_sentence(""), Err(ParseError::Empty));
        assert_eq!(parse_sentence("   \t"), Err(ParseError::Empty));
    }

    #[test]
    fn test_missing_dollar() {
        assert!(matches!(
            parse_sentence("GARBAGE"),
            Err(ParseError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_sentence("!AIVDM,1,1,,A,13aEOK?P00PD2wVMdLDRhgvL289?,0*26"),
            Err(ParseError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_bad_checksum_field() {
        assert!(matches!(
            parse_sentence("$IIHDT,182.3,T*2"),
            Err(ParseError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_sentence("$IIHDT,182.3,T*ZZ"),
            Err(ParseError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_sentence("$IIHDT,182.3,T*2A*2A"),
            Err(ParseError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(parse_sentence("$GP,1,2"), Err(ParseError::MalformedFrame(_))));
        assert!(matches!(parse_sentence("$*00"), Err(ParseError::MalformedFrame(_))));
        assert!(matches!(parse_sentence("$GP-GA,1"), Err(ParseError::MalformedFrame(_))));
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(matches!(
            parse_sentence("$IIMTW,18.5,°C"),
            Err(ParseError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_json_view() {
        let record = parse_sentence("$IIHDT,182.3,T*2A").unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "HDT");
        assert_eq!(json["talker"], "II");
        assert_eq!(json["data"], serde_json::json!(["182.3", "T"]));
        assert_eq!(json["raw"], "$IIHDT,182.3,T*2A");
        assert_eq!(json["decoded"]["kind"], "heading");

        let unknown = parse_sentence("$GPHDV,1,2,3*51").unwrap();
        let json = serde_json::to_value(&unknown).unwrap();
        assert!(json.get("decoded").is_none());
    }
}
