//! Stop lines and arrival estimates
//!
//! Builds [`Stop`] and [`Line`] values from the stop detail and arrivals
//! endpoints, and keeps their arrival estimates current.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::ArrivalDateFormat;
use crate::envelope::{ARRIVALS_POINTER, DATA_CODES, STOP_LINES_POINTER};
use crate::error::EmtError;
use crate::models::{Line, RawArrival, RawLine, Stop};
use crate::session::Session;

/// Stop detail endpoint
#[must_use]
pub fn stop_detail_path(stop_id: u32) -> String {
    format!("v1/transport/busemtmad/stops/{stop_id}/detail/")
}

/// Arrival estimates endpoint for one line at one stop
///
/// The line label comes from the server and is percent-encoded as a single
/// path segment.
#[must_use]
pub fn arrivals_path(stop_id: u32, line_id: &str) -> String {
    format!(
        "v2/transport/busemtmad/stops/{stop_id}/arrives/{}/",
        urlencoding::encode(line_id)
    )
}

/// Body of an arrivals request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalsRequest {
    #[serde(rename = "cultureInfo")]
    culture_info: &'static str,
    #[serde(rename = "Text_StopRequired_YN")]
    stop_required: &'static str,
    #[serde(rename = "Text_EstimationsRequired_YN")]
    estimations_required: &'static str,
    #[serde(rename = "Text_IncidencesRequired_YN")]
    incidences_required: &'static str,
    #[serde(rename = "DateTime_Referenced_Incidencies_YYYYMMDD")]
    reference_date: String,
}

impl ArrivalsRequest {
    /// Build the request body for a given reference date
    #[must_use]
    pub fn new(date: NaiveDate, format: ArrivalDateFormat) -> Self {
        Self {
            culture_info: "EN",
            stop_required: "Y",
            estimations_required: "Y",
            incidences_required: "Y",
            reference_date: format.render(date),
        }
    }

    /// Build the request body for today's local date
    #[must_use]
    pub fn for_today(format: ArrivalDateFormat) -> Self {
        Self::new(Local::now().date_naive(), format)
    }

    /// The rendered reference date
    #[must_use]
    pub fn reference_date(&self) -> &str {
        &self.reference_date
    }
}

/// Fetch the lines serving a stop, without arrival estimates
///
/// # Errors
///
/// Returns [`EmtError::Server`] unless the operator answers `"00"`, and
/// [`EmtError::Decode`] if the payload lacks `data[0][0][0].dataLine` or a
/// line entry is malformed.
#[instrument(skip(session))]
pub async fn fetch_lines(session: &Session, stop_id: u32) -> Result<Vec<Line>, EmtError> {
    let envelope = session
        .authenticated_get(&stop_detail_path(stop_id))
        .await?
        .expect_code(DATA_CODES)?;

    let raw: Vec<RawLine> = envelope.extract(STOP_LINES_POINTER)?;
    let lines = raw
        .into_iter()
        .map(Line::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if lines.is_empty() {
        warn!(stop_id, "Stop has no lines");
    }

    debug!(stop_id, count = lines.len(), "Lines fetched");
    Ok(lines)
}

/// Fetch the arrival estimates of one line at a stop, in server order
///
/// # Errors
///
/// Returns [`EmtError::Server`] unless the operator answers `"00"`, and
/// [`EmtError::Decode`] if the payload lacks `data[0].Arrive`.
#[instrument(skip(session))]
pub async fn fetch_arrival_times(
    session: &Session,
    stop_id: u32,
    line_id: &str,
) -> Result<Vec<Duration>, EmtError> {
    let body = ArrivalsRequest::for_today(session.config().arrival_date_format);

    let envelope = session
        .authenticated_post(&arrivals_path(stop_id, line_id), &body)
        .await?
        .expect_code(DATA_CODES)?;

    let raw: Vec<RawArrival> = envelope.extract(ARRIVALS_POINTER)?;
    let arrivals = raw
        .into_iter()
        .map(Duration::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    debug!(stop_id, line_id, count = arrivals.len(), "Arrivals fetched");
    Ok(arrivals)
}

impl Stop {
    /// Fetch a stop's lines and populate every line's arrival estimates
    ///
    /// Nothing is returned unless every request succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the first failure of [`fetch_lines`] or
    /// [`fetch_arrival_times`].
    #[instrument(skip(session))]
    pub async fn fetch(session: &Session, stop_id: u32) -> Result<Self, EmtError> {
        let mut lines = fetch_lines(session, stop_id).await?;
        for line in &mut lines {
            let arrivals = fetch_arrival_times(session, stop_id, line.id()).await?;
            line.set_arrival_times(arrivals);
        }

        Ok(Self::new(stop_id, lines))
    }

    /// Re-fetch and replace the arrival estimates of every line, in order
    ///
    /// Stops at the first failing line. Lines refreshed before it keep their
    /// new estimates; the rest keep their previous ones.
    ///
    /// # Errors
    ///
    /// Propagates the first failure of [`fetch_arrival_times`].
    #[instrument(skip(self, session), fields(stop_id = self.id()))]
    pub async fn refresh_arrivals(&mut self, session: &Session) -> Result<(), EmtError> {
        let stop_id = self.id();
        for line in self.lines_mut() {
            let arrivals = fetch_arrival_times(session, stop_id, line.id()).await?;
            line.set_arrival_times(arrivals);
        }
        Ok(())
    }
}
