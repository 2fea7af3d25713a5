//! The "Watch Calls" poller.
//!
//! Each [`CallPoller::poll`] walks one pass of
//! `START → FETCH → (FETCH_FAILED | VALIDATE) → (SHAPE_INVALID | FILTER) →
//! (NO_NEW_DATA | EMIT) → END`, fetching the most recent page of calls and
//! emitting those newer than the trigger's watermark.
//!
//! Deduplication is by timestamp alone: a call is new when its effective
//! timestamp is strictly greater than the watermark, so a call whose
//! timestamp ties the watermark is never emitted, and calls that fall off
//! the page between polls are not seen.

use crate::error::{PollError, WatermarkError};
use crate::event::CallEvent;
use crate::record::{CallRecord, CallStatus, ShapeDiagnostic, parse_page};
use crate::watermark::{Watermark, WatermarkStore};
use openmic_core::TriggerId;
use openmic_integration::{ApiFetcher, ApiRequest, FetchError};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

/// Path of the calls listing.
pub const CALLS_PATH: &str = "/v1/calls";

/// Largest page the calls listing accepts.
pub const MAX_LIMIT: u32 = 1000;

fn default_limit() -> u32 {
    50
}

/// User-facing trigger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Only calls in this status are listed.
    #[serde(default, rename = "status")]
    pub status_filter: CallStatus,
    /// Page size, 1 to [`MAX_LIMIT`].
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Only calls handled by this bot are listed.
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            status_filter: CallStatus::default(),
            limit: default_limit(),
            bot_id: None,
        }
    }
}

impl PollConfig {
    /// Checks the configuration before anything is fetched.
    ///
    /// # Errors
    ///
    /// Returns `PollError::Configuration` for a limit outside `1..=1000` or
    /// a status the listing cannot filter by.
    pub fn validate(&self) -> Result<(), PollError> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(PollError::Configuration {
                reason: format!("limit must be between 1 and {MAX_LIMIT}, got {}", self.limit),
            });
        }
        if !self.status_filter.is_known() {
            return Err(PollError::Configuration {
                reason: format!("unsupported call status filter: {}", self.status_filter),
            });
        }
        Ok(())
    }

    /// The bot filter, with blank values treated as absent.
    #[must_use]
    pub fn bot_id(&self) -> Option<&str> {
        self.bot_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// The listing request for this configuration.
    #[must_use]
    pub fn request(&self) -> ApiRequest {
        ApiRequest::get(CALLS_PATH)
            .with_query("limit", self.limit)
            .with_query("call_status", self.status_filter.as_str())
            .with_optional_query("bot_id", self.bot_id())
    }
}

/// Stages of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStage {
    Start,
    Fetch,
    FetchFailed,
    Validate,
    ShapeInvalid,
    Filter,
    NoNewData,
    Emit,
    End,
}

impl PollStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Fetch => "fetch",
            Self::FetchFailed => "fetch_failed",
            Self::Validate => "validate",
            Self::ShapeInvalid => "shape_invalid",
            Self::Filter => "filter",
            Self::NoNewData => "no_new_data",
            Self::Emit => "emit",
            Self::End => "end",
        }
    }
}

impl fmt::Display for PollStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal result of a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing newer than the watermark. `watermark` is the stored value
    /// after the poll, which may have advanced.
    NoNewData { watermark: Option<Watermark> },
    /// New calls, in the order the API listed them.
    Emitted {
        events: Vec<CallEvent>,
        watermark: Option<Watermark>,
    },
    /// The response could not be understood; the watermark was not touched.
    InvalidResponse(ShapeDiagnostic),
}

impl PollOutcome {
    /// The emitted events, empty for every other outcome.
    #[must_use]
    pub fn events(&self) -> &[CallEvent] {
        match self {
            Self::Emitted { events, .. } => events,
            _ => &[],
        }
    }

    /// The stage the poll ended in.
    #[must_use]
    pub fn stage(&self) -> PollStage {
        match self {
            Self::NoNewData { .. } => PollStage::NoNewData,
            Self::Emitted { .. } => PollStage::Emit,
            Self::InvalidResponse(_) => PollStage::ShapeInvalid,
        }
    }
}

/// Calls selected from one page, and the watermark the page implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub new_records: Vec<CallRecord>,
    pub watermark: Option<Watermark>,
}

/// Selects the calls newer than `previous`.
///
/// The returned watermark is the greatest effective timestamp over the whole
/// page, never less than `previous`. Calls without any timestamp are only
/// new when there is no watermark yet.
#[must_use]
pub fn detect(page: Vec<CallRecord>, previous: Option<Watermark>) -> Detection {
    let page_max = page.iter().filter_map(CallRecord::effective_timestamp).max();
    let watermark = match (previous, page_max) {
        (Some(previous), Some(max)) => Some(previous.advance(max)),
        (None, Some(max)) => Some(Watermark::new(max)),
        (previous, None) => previous,
    };

    let new_records = match previous {
        None => page,
        Some(previous) => page
            .into_iter()
            .filter(|call| {
                call.effective_timestamp()
                    .is_some_and(|ts| ts > previous.millis())
            })
            .collect(),
    };

    Detection {
        new_records,
        watermark,
    }
}

fn transport_error(fetch: &FetchError) -> PollError {
    PollError::Transport {
        status: fetch.status(),
        body: fetch.body().map(str::to_string),
        reason: fetch.status().is_none().then(|| fetch.to_string()),
    }
}

/// Polls the calls listing on behalf of one trigger.
#[derive(Debug, Clone)]
pub struct CallPoller<F, S> {
    trigger_id: TriggerId,
    fetcher: F,
    store: S,
}

impl<F: ApiFetcher, S: WatermarkStore> CallPoller<F, S> {
    pub fn new(trigger_id: TriggerId, fetcher: F, store: S) -> Self {
        Self {
            trigger_id,
            fetcher,
            store,
        }
    }

    #[must_use]
    pub fn trigger_id(&self) -> TriggerId {
        self.trigger_id
    }

    fn watermark_error(&self, report: Report<WatermarkError>) -> Report<PollError> {
        report.context(PollError::Watermark {
            trigger_id: self.trigger_id,
        })
    }

    /// Runs one poll and stores the advanced watermark.
    ///
    /// Equivalent to [`prepare`](Self::prepare) followed immediately by
    /// [`commit`](Self::commit). Callers that deliver events somewhere that
    /// can fail should call the two themselves, delivering in between.
    ///
    /// # Errors
    ///
    /// See [`prepare`](Self::prepare) and [`commit`](Self::commit).
    pub async fn poll(&self, config: &PollConfig) -> Result<PollOutcome, Report<PollError>> {
        let pending = self.prepare(config).await?;
        self.commit(pending).await
    }

    /// Fetches and filters one page without touching the stored watermark.
    ///
    /// # Errors
    ///
    /// - `PollError::Configuration` if `config` is invalid; nothing is fetched
    /// - `PollError::Transport` if the listing could not be fetched
    /// - `PollError::Watermark` if the stored watermark could not be read
    #[instrument(
        level = "debug",
        skip(self, config),
        fields(trigger_id = %self.trigger_id, status = %config.status_filter, limit = config.limit)
    )]
    pub async fn prepare(&self, config: &PollConfig) -> Result<PendingPoll, Report<PollError>> {
        debug!(stage = %PollStage::Start, "poll started");
        config.validate()?;

        let previous = self
            .store
            .load(self.trigger_id)
            .await
            .map_err(|report| self.watermark_error(report))?;

        debug!(stage = %PollStage::Fetch, watermark = ?previous, "fetching calls");
        let response = match self.fetcher.fetch(config.request()).await {
            Ok(response) => response,
            Err(report) => {
                let context = transport_error(report.current_context());
                warn!(stage = %PollStage::FetchFailed, error = %context, "fetching calls failed");
                return Err(report.context(context));
            }
        };

        debug!(stage = %PollStage::Validate, "validating response");
        let page = match parse_page(&response) {
            Ok(page) => page,
            Err(diagnostic) => {
                warn!(stage = %PollStage::ShapeInvalid, %diagnostic, "unexpected calls response");
                return Ok(PendingPoll::unchanged(PollOutcome::InvalidResponse(diagnostic)));
            }
        };

        if page.is_empty() {
            debug!(stage = %PollStage::NoNewData, "no calls listed");
            return Ok(PendingPoll::unchanged(PollOutcome::NoNewData {
                watermark: previous,
            }));
        }

        let fetched = page.len();
        let Detection {
            new_records,
            watermark,
        } = detect(page, previous);
        debug!(
            stage = %PollStage::Filter,
            fetched,
            new = new_records.len(),
            watermark = ?watermark,
            "filtered calls"
        );

        let outcome = if new_records.is_empty() {
            PollOutcome::NoNewData { watermark }
        } else {
            PollOutcome::Emitted {
                events: new_records.into_iter().map(CallEvent::from).collect(),
                watermark,
            }
        };
        Ok(PendingPoll {
            outcome,
            advance_to: watermark.filter(|w| previous.is_none_or(|p| *w > p)),
        })
    }

    /// Stores the watermark a prepared poll advanced to, if any.
    ///
    /// The store is written at most once, and only with a greater value.
    ///
    /// # Errors
    ///
    /// Returns `PollError::Watermark` if the store could not be written.
    #[instrument(level = "debug", skip_all, fields(trigger_id = %self.trigger_id))]
    pub async fn commit(&self, pending: PendingPoll) -> Result<PollOutcome, Report<PollError>> {
        if let Some(advanced) = pending.advance_to {
            self.store
                .save(self.trigger_id, advanced)
                .await
                .map_err(|report| self.watermark_error(report))?;
        }
        debug!(stage = %PollStage::End, outcome = %pending.outcome.stage(), "poll finished");
        Ok(pending.outcome)
    }
}

/// A prepared poll whose watermark has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct PendingPoll {
    outcome: PollOutcome,
    advance_to: Option<Watermark>,
}

impl PendingPoll {
    fn unchanged(outcome: PollOutcome) -> Self {
        Self {
            outcome,
            advance_to: None,
        }
    }

    /// The outcome that [`CallPoller::commit`] will return.
    pub fn outcome(&self) -> &PollOutcome {
        &self.outcome
    }

    /// The watermark commit will store, if it advances.
    #[must_use]
    pub fn advance_to(&self) -> Option<Watermark> {
        self.advance_to
    }
}
