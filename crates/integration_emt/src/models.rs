//! Stop and line models
//!
//! Typed representations of a bus stop and the lines serving it, plus the raw
//! payload fragments they are built from.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::EmtError;

/// A bus line serving a stop, with its live arrival estimates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    id: String,
    direction: String,
    #[serde(with = "minutes")]
    min_freq: Duration,
    #[serde(with = "minutes")]
    max_freq: Duration,
    #[serde(with = "seconds_list")]
    arrival_times: Vec<Duration>,
}

impl Line {
    /// Create a line without arrival estimates
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        direction: impl Into<String>,
        min_freq: Duration,
        max_freq: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            direction: direction.into(),
            min_freq,
            max_freq,
            arrival_times: Vec::new(),
        }
    }

    /// Line label (e.g. "27")
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Header text of the direction this line travels from the stop
    #[must_use]
    pub fn direction(&self) -> &str {
        &self.direction
    }

    /// Shortest scheduled interval between buses
    #[must_use]
    pub const fn min_freq(&self) -> Duration {
        self.min_freq
    }

    /// Longest scheduled interval between buses
    #[must_use]
    pub const fn max_freq(&self) -> Duration {
        self.max_freq
    }

    /// Estimated time until each upcoming bus arrives, in server order
    #[must_use]
    pub fn arrival_times(&self) -> &[Duration] {
        &self.arrival_times
    }

    /// Replace the arrival estimates wholesale
    pub fn set_arrival_times(&mut self, arrival_times: Vec<Duration>) {
        self.arrival_times = arrival_times;
    }

    /// The soonest arrival estimate, if any
    #[must_use]
    pub fn next_arrival(&self) -> Option<Duration> {
        self.arrival_times.iter().min().copied()
    }

    /// Format the arrival estimates as a compact list (e.g. "2 min, 5 min")
    #[must_use]
    pub fn format_arrivals(&self) -> String {
        if self.arrival_times.is_empty() {
            return String::from("no estimates");
        }

        self.arrival_times
            .iter()
            .map(|d| format_wait(*d))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🚌 {} → {} (every {}-{} min): {}",
            self.id,
            self.direction,
            self.min_freq.as_secs() / 60,
            self.max_freq.as_secs() / 60,
            self.format_arrivals()
        )
    }
}

/// Format a waiting time as whole minutes, or "arriving" under a minute
fn format_wait(wait: Duration) -> String {
    let mins = wait.as_secs() / 60;
    if mins == 0 {
        String::from("arriving")
    } else {
        format!("{mins} min")
    }
}

/// A bus stop and the lines serving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stop {
    id: u32,
    lines: Vec<Line>,
}

impl Stop {
    /// Create a stop from already-fetched lines
    #[must_use]
    pub const fn new(id: u32, lines: Vec<Line>) -> Self {
        Self { id, lines }
    }

    /// Operator-assigned stop identifier
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Lines serving this stop, in server order
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Find a line by its label
    #[must_use]
    pub fn line(&self, id: &str) -> Option<&Line> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [Line] {
        &mut self.lines
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "🚏 Stop {}", self.id)?;
        for line in &self.lines {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

// --- Raw payload fragments ---

/// One entry of a stop detail `dataLine` array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawLine {
    label: String,
    #[serde(deserialize_with = "lenient_int")]
    direction: i64,
    header0: String,
    header1: String,
    #[serde(deserialize_with = "lenient_int")]
    min_freq: i64,
    #[serde(deserialize_with = "lenient_int")]
    max_freq: i64,
}

impl TryFrom<RawLine> for Line {
    type Error = EmtError;

    fn try_from(raw: RawLine) -> Result<Self, Self::Error> {
        let RawLine {
            label,
            direction,
            header0,
            header1,
            min_freq,
            max_freq,
        } = raw;

        let headers = [header0, header1];
        let direction = usize::try_from(direction)
            .ok()
            .and_then(|index| headers.into_iter().nth(index))
            .ok_or_else(|| {
                EmtError::Decode(format!(
                    "line {label}: direction index {direction} is not 0 or 1"
                ))
            })?;

        Ok(Self::new(
            label.clone(),
            direction,
            whole_minutes(&label, "minFreq", min_freq)?,
            whole_minutes(&label, "maxFreq", max_freq)?,
        ))
    }
}

fn whole_minutes(label: &str, field: &str, value: i64) -> Result<Duration, EmtError> {
    let mins = u64::try_from(value)
        .map_err(|_| EmtError::Decode(format!("line {label}: negative {field} {value}")))?;
    mins.checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| EmtError::Decode(format!("line {label}: {field} {value} out of range")))
}

/// One entry of an arrivals `Arrive` array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawArrival {
    #[serde(deserialize_with = "lenient_int")]
    estimate_arrive: i64,
}

impl TryFrom<RawArrival> for Duration {
    type Error = EmtError;

    fn try_from(raw: RawArrival) -> Result<Self, Self::Error> {
        u64::try_from(raw.estimate_arrive)
            .map(Self::from_secs)
            .map_err(|_| {
                EmtError::Decode(format!(
                    "negative estimateArrive {}",
                    raw.estimate_arrive
                ))
            })
    }
}

/// Integer fields arrive either as JSON numbers or as numeric strings
#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Text(String),
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(value) => Ok(value),
        IntOrString::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected an integer, got {text:?}"))),
    }
}

mod minutes {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs() / 60)
    }
}

mod seconds_list {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(values: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(Duration::as_secs))
    }
}
