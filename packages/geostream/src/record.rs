// Record model shared by the dataset, the frame codec and renderers

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Interprets a cell as an integer only when that is lossless: the cell must
/// be exactly how the integer prints, so "007" or "+7" stay text.
fn canonical_int(cell: &str) -> Option<i64> {
    let value: i64 = cell.parse().ok()?;
    (value.to_string() == cell).then_some(value)
}

/// Time bucket a record belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeKey {
    Int(i64),
    Text(String),
}

impl TimeKey {
    /// Parse a time cell. Returns `None` for an empty cell.
    pub fn parse(cell: &str) -> Option<Self> {
        if cell.is_empty() {
            return None;
        }
        Some(match canonical_int(cell) {
            Some(value) => Self::Int(value),
            None => Self::Text(cell.to_string()),
        })
    }

    /// Whether this key can be placed in front of a frame payload.
    /// The key/payload delimiter is a single space, so keys may not hold one.
    pub fn is_frameable(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Text(text) => !text.is_empty() && !text.contains(crate::frame::KEY_DELIMITER),
        }
    }
}

/// Numeric reading of a time key: integers as they are, text only when it
/// parses as a finite decimal ("10.5", "-1.5", "1e3"). Values are finite, so
/// float comparisons always succeed.
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Int(a), Self::Float(b)) => cmp_int_float(*a, *b),
            (Self::Float(a), Self::Int(b)) => cmp_int_float(*b, *a).reverse(),
        }
    }
}

/// Exact comparison of an integer with a finite float
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    // i64 spans [-2^63, 2^63)
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if float >= LIMIT {
        return Ordering::Less;
    }
    if float < -LIMIT {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64
            .partial_cmp(&(float - whole))
            .unwrap_or(Ordering::Equal),
        unequal => unequal,
    }
}

impl TimeKey {
    fn numeric(&self) -> Option<Numeric> {
        match self {
            Self::Int(value) => Some(Numeric::Int(*value)),
            Self::Text(text) => text
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Numeric::Float),
        }
    }
}

/// Numeric keys (integers and decimal text) come first in numeric order,
/// then the remaining text keys lexically. Equal values tie-break with
/// integers first, then by text.
impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| match (self, other) {
                (Self::Int(_), Self::Text(_)) => Ordering::Less,
                (Self::Text(_), Self::Int(_)) => Ordering::Greater,
                (Self::Text(a), Self::Text(b)) => a.cmp(b),
                (Self::Int(a), Self::Int(b)) => a.cmp(b),
            }),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self, other) {
                (Self::Text(a), Self::Text(b)) => a.cmp(b),
                // Integers always have a numeric reading
                _ => Ordering::Equal,
            },
        }
    }
}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for TimeKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for TimeKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Identity of the tracked object (integer id or free-form string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    Int(i64),
    Text(String),
}

impl Identity {
    /// Parse an identity cell. Returns `None` for an empty cell.
    pub fn parse(cell: &str) -> Option<Self> {
        if cell.is_empty() {
            return None;
        }
        Some(match canonical_int(cell) {
            Some(value) => Self::Int(value),
            None => Self::Text(cell.to_string()),
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Identity {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One observation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub longitude: f64,
    pub latitude: f64,
    pub identity: Identity,
    pub time: TimeKey,
}

impl Record {
    pub fn new(
        longitude: f64,
        latitude: f64,
        identity: impl Into<Identity>,
        time: impl Into<TimeKey>,
    ) -> Self {
        Self {
            longitude,
            latitude,
            identity: identity.into(),
            time: time.into(),
        }
    }
}

/// All records sharing one time bucket, in dataset row order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub key: TimeKey,
    pub rows: Vec<Record>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a coordinate so that parsing it back yields the identical `f64`.
///
/// `Display` for `f64` already prints the shortest round-tripping digits;
/// integral values get a trailing `.0` so they still read as floats.
pub fn format_coordinate(value: f64) -> String {
    let mut text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Names of the four required columns, used both in the dataset header and
/// in every frame header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub longitude: String,
    pub latitude: String,
    pub identity: String,
    pub time: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            longitude: "long".to_string(),
            latitude: "lat".to_string(),
            identity: "Identity".to_string(),
            time: "TIME".to_string(),
        }
    }
}

impl ColumnMap {
    /// Header row in wire order
    pub fn names(&self) -> [&str; 4] {
        [
            self.longitude.as_str(),
            self.latitude.as_str(),
            self.identity.as_str(),
            self.time.as_str(),
        ]
    }

    /// Check that the names are usable as a header: non-empty and distinct
    pub fn validate(&self) -> Result<(), String> {
        let names = self.names();
        if let Some(empty) = names.iter().position(|name| name.is_empty()) {
            return Err(format!("column name #{} is empty", empty + 1));
        }
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(format!("column name '{}' is used twice", name));
            }
        }
        Ok(())
    }

    /// Find the required columns in a header by name.
    ///
    /// Returns every missing name on failure, in wire order.
    pub fn locate(&self, headers: &StringRecord) -> Result<ColumnIndex, Vec<String>> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let found = self.names().map(position);
        if found.iter().any(Option::is_none) {
            return Err(self
                .names()
                .iter()
                .zip(found.iter())
                .filter(|(_, slot)| slot.is_none())
                .map(|(name, _)| name.to_string())
                .collect());
        }

        let [longitude, latitude, identity, time] = found.map(|slot| slot.unwrap_or_default());
        Ok(ColumnIndex {
            longitude,
            latitude,
            identity,
            time,
            width: headers.len(),
        })
    }
}

/// Positions of the required columns inside one particular header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    longitude: usize,
    latitude: usize,
    identity: usize,
    time: usize,
    width: usize,
}

impl ColumnIndex {
    /// Number of columns the header declared
    pub fn width(&self) -> usize {
        self.width
    }

    /// Build a record from one CSV row
    pub fn parse(&self, row: &StringRecord) -> Result<Record, String> {
        let cell = |index: usize, what: &str| {
            row.get(index)
                .ok_or_else(|| format!("missing {} cell", what))
        };

        let longitude = parse_coordinate(cell(self.longitude, "longitude")?, "longitude")?;
        let latitude = parse_coordinate(cell(self.latitude, "latitude")?, "latitude")?;

        let identity = Identity::parse(cell(self.identity, "identity")?)
            .ok_or_else(|| "identity is empty".to_string())?;

        let time = TimeKey::parse(cell(self.time, "time")?)
            .ok_or_else(|| "time is empty".to_string())?;

        Ok(Record {
            longitude,
            latitude,
            identity,
            time,
        })
    }
}

fn parse_coordinate(cell: &str, what: &str) -> Result<f64, String> {
    cell.trim()
        .parse::<f64>()
        .map_err(|_| format!("{} '{}' is not a number", what, cell))
}
