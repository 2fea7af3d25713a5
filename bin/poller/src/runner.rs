//! One scheduled poll: run the detector, then write its output.
//!
//! Each emitted call becomes one JSON line. A shape diagnostic is written
//! as a line too, so consumers see why a poll produced nothing. The
//! watermark is committed only after the output is flushed, so calls whose
//! lines could not be written are emitted again by the next poll.

use crate::error::RunError;
use openmic_integration::ApiFetcher;
use openmic_trigger::{CallPoller, PollConfig, PollError, PollOutcome, WatermarkStore};
use rootcause::Report;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

async fn write_line<W, T>(out: &mut W, value: &T) -> Result<(), RunError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value).map_err(|e| RunError::Output {
        reason: e.to_string(),
    })?;
    line.push(b'\n');
    out.write_all(&line).await.map_err(|e| RunError::Output {
        reason: e.to_string(),
    })
}

/// Runs one poll and writes its output to `out`.
///
/// # Errors
///
/// Returns `RunError::Poll` if the poll failed and `RunError::Output` if
/// the output could not be written.
#[instrument(level = "debug", skip_all, fields(trigger_id = %poller.trigger_id()))]
pub async fn run_once<F, S, W>(
    poller: &CallPoller<F, S>,
    config: &PollConfig,
    out: &mut W,
) -> Result<PollOutcome, Report<RunError>>
where
    F: ApiFetcher,
    S: WatermarkStore,
    W: AsyncWrite + Unpin + Send,
{
    let poll_failed = |report: Report<PollError>| {
        let fatal = !report.current_context().is_transient();
        report.context(RunError::Poll { fatal })
    };

    let pending = poller.prepare(config).await.map_err(poll_failed)?;

    match pending.outcome() {
        PollOutcome::Emitted { events, watermark } => {
            info!(count = events.len(), watermark = ?watermark, "new calls");
            for event in events {
                write_line(out, event).await?;
            }
        }
        PollOutcome::NoNewData { watermark } => {
            debug!(watermark = ?watermark, "no new calls");
        }
        PollOutcome::InvalidResponse(diagnostic) => {
            warn!(%diagnostic, "calls listing had an unexpected shape");
            write_line(out, diagnostic).await?;
        }
    }

    out.flush().await.map_err(|e| RunError::Output {
        reason: e.to_string(),
    })?;

    poller.commit(pending).await.map_err(poll_failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use openmic_core::TriggerId;
    use openmic_integration::{ApiRequest, FetchError};
    use openmic_trigger::{InMemoryWatermarkStore, Watermark};
    use serde_json::{Value as JsonValue, json};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Answers every request with the same result.
    struct FixedFetcher(Result<JsonValue, FetchError>);

    #[async_trait]
    impl ApiFetcher for FixedFetcher {
        async fn fetch(&self, _: ApiRequest) -> Result<JsonValue, Report<FetchError>> {
            self.0.clone().map_err(Report::from)
        }
    }

    fn poller(
        response: Result<JsonValue, FetchError>,
    ) -> CallPoller<FixedFetcher, InMemoryWatermarkStore> {
        CallPoller::new(
            TriggerId::nil(),
            FixedFetcher(response),
            InMemoryWatermarkStore::new(),
        )
    }

    /// Writer whose reader has gone away.
    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn lines(out: &[u8]) -> Vec<JsonValue> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn writes_one_line_per_new_call() {
        let poller = poller(Ok(json!({"calls": [
            {"call_id": "a", "call_status": "ended", "end_timestamp": 2000},
            {"call_id": "b", "call_status": "ended", "end_timestamp": 1000},
        ]})));
        let mut out = Vec::new();

        let outcome = run_once(&poller, &PollConfig::default(), &mut out)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            PollOutcome::Emitted { watermark: Some(w), .. } if w == Watermark::new(2000)
        ));
        let written = lines(&out);
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["id"], "a");
        assert_eq!(written[0]["endedAt"], "1970-01-01T00:00:02.000Z");
        assert_eq!(written[1]["id"], "b");
    }

    #[tokio::test]
    async fn second_run_writes_nothing() {
        let poller = poller(Ok(json!({"calls": [{"call_id": "a", "end_timestamp": 2000}]})));
        let mut out = Vec::new();

        run_once(&poller, &PollConfig::default(), &mut out).await.unwrap();
        out.clear();
        let outcome = run_once(&poller, &PollConfig::default(), &mut out)
            .await
            .unwrap();

        assert!(matches!(outcome, PollOutcome::NoNewData { .. }));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn writes_diagnostic_line() {
        let poller = poller(Ok(json!({"items": []})));
        let mut out = Vec::new();

        run_once(&poller, &PollConfig::default(), &mut out)
            .await
            .unwrap();

        let written = lines(&out);
        assert_eq!(written.len(), 1);
        assert_eq!(written[0]["_error"], true);
        assert_eq!(written[0]["error"], "Invalid response structure");
    }

    #[tokio::test]
    async fn transport_failure_is_not_fatal() {
        let poller = poller(Err(FetchError::Status {
            status: 502,
            body: String::new(),
        }));
        let mut out = Vec::new();

        let report = run_once(&poller, &PollConfig::default(), &mut out)
            .await
            .unwrap_err();

        assert!(!report.current_context().is_fatal());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn configuration_failure_is_fatal() {
        let poller = poller(Ok(json!({"calls": []})));
        let config = PollConfig {
            limit: 0,
            ..PollConfig::default()
        };

        let report = run_once(&poller, &config, &mut Vec::new())
            .await
            .unwrap_err();

        assert!(report.current_context().is_fatal());
    }

    #[tokio::test]
    async fn failed_output_keeps_watermark_for_redelivery() {
        let store = InMemoryWatermarkStore::new();
        let poller = CallPoller::new(
            TriggerId::nil(),
            FixedFetcher(Ok(json!({"calls": [{"call_id": "a", "end_timestamp": 2000}]}))),
            store.clone(),
        );

        let report = run_once(&poller, &PollConfig::default(), &mut BrokenPipe)
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), RunError::Output { .. }));
        assert_eq!(store.load(TriggerId::nil()).await.unwrap(), None);

        let mut out = Vec::new();
        run_once(&poller, &PollConfig::default(), &mut out)
            .await
            .unwrap();
        assert_eq!(lines(&out)[0]["id"], "a");
        assert_eq!(
            store.load(TriggerId::nil()).await.unwrap(),
            Some(Watermark::new(2000))
        );
    }
}
