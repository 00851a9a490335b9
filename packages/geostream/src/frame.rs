// Text framing of one time bucket
//
// Wire format: `<time-key> <csv-block>`. The key is the group's time key as
// text, a single space separates it from the payload, and the payload is a
// comma separated block whose header names the four record fields. The
// payload may contain further spaces and newlines; only the first space is a
// delimiter.

use crate::record::{format_coordinate, ColumnMap, Group, Record, TimeKey};
use crate::types::{DecodeError, FeedError, FeedResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Separator between the frame key and the payload
pub const KEY_DELIMITER: char = ' ';

/// Whether decoding checks each row's time against the frame key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCheck {
    /// Reject frames whose rows carry a different time than the key
    #[default]
    Enforce,
    /// Take row times as they are
    Ignore,
}

impl FromStr for KeyCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "enforce" | "strict" | "true" => Ok(Self::Enforce),
            "ignore" | "off" | "false" => Ok(Self::Ignore),
            other => Err(format!(
                "unknown key check '{}' (expected enforce or ignore)",
                other
            )),
        }
    }
}

/// A framed group ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    key: String,
    payload: String,
}

impl Frame {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Wire text: key, one space, payload
    pub fn to_wire(&self) -> String {
        let mut wire = String::with_capacity(self.key.len() + 1 + self.payload.len());
        wire.push_str(&self.key);
        wire.push(KEY_DELIMITER);
        wire.push_str(&self.payload);
        wire
    }
}

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedGroup {
    pub key: TimeKey,
    pub records: Vec<Record>,
}

/// Serialize a group into a frame
pub fn encode(group: &Group, columns: &ColumnMap) -> FeedResult<Frame> {
    if !group.key.is_frameable() {
        return Err(FeedError::Encode(format!(
            "time key '{}' cannot be framed",
            group.key
        )));
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let encode_err = |e: csv::Error| FeedError::Encode(format!("CSV write failed: {}", e));

    writer.write_record(columns.names()).map_err(encode_err)?;
    for record in &group.rows {
        writer
            .write_record([
                format_coordinate(record.longitude),
                format_coordinate(record.latitude),
                record.identity.to_string(),
                record.time.to_string(),
            ])
            .map_err(encode_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FeedError::Encode(format!("CSV flush failed: {}", e)))?;
    let payload = String::from_utf8(bytes)
        .map_err(|e| FeedError::Encode(format!("payload is not UTF-8: {}", e)))?;

    Ok(Frame {
        key: group.key.to_string(),
        payload,
    })
}

/// Split wire text on the first delimiter into (key, payload)
pub fn split_frame(text: &str) -> Result<(&str, &str), DecodeError> {
    let (key, payload) = text
        .split_once(KEY_DELIMITER)
        .ok_or(DecodeError::MissingDelimiter)?;
    if key.is_empty() {
        return Err(DecodeError::EmptyKey);
    }
    Ok((key, payload))
}

/// Decode a raw frame as received from the transport
pub fn decode_bytes(
    data: &[u8],
    columns: &ColumnMap,
    check: KeyCheck,
) -> Result<DecodedGroup, DecodeError> {
    let text = std::str::from_utf8(data).map_err(|_| DecodeError::Utf8)?;
    decode(text, columns, check)
}

/// Decode wire text back into the records of one group.
///
/// Fields are looked up by their header names, so column order inside the
/// payload does not matter and extra columns are ignored.
pub fn decode(text: &str, columns: &ColumnMap, check: KeyCheck) -> Result<DecodedGroup, DecodeError> {
    let (key_text, payload) = split_frame(text)?;
    let key = TimeKey::parse(key_text).ok_or(DecodeError::EmptyKey)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(payload.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DecodeError::Csv(e.to_string()))?
        .clone();
    let index = columns.locate(&headers).map_err(DecodeError::MissingFields)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| DecodeError::Csv(e.to_string()))?;
        let record = index
            .parse(&row)
            .map_err(|reason| DecodeError::InvalidRow { row: i + 1, reason })?;

        if check == KeyCheck::Enforce && record.time != key {
            return Err(DecodeError::KeyMismatch {
                frame_key: key.to_string(),
                row_key: record.time.to_string(),
                row: i + 1,
            });
        }

        records.push(record);
    }

    Ok(DecodedGroup { key, records })
}
