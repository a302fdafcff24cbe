// Self-correcting capture loop
//
// Captures fire at the session's pacing interval. The time a capture takes is
// measured and subtracted from the following sleep, so slow captures shorten
// the wait instead of stretching the cadence. No sleep follows the last capture.

use crate::capture::CaptureDevice;
use crate::errors::SessionError;
use crate::models::{CaptureSession, SessionReport};
use tokio::time::{sleep, Instant};
use tracing::{error, info, instrument};

/// Run a bounded capture session against `device`
///
/// A failing capture aborts the remaining sequence; the error carries the
/// number of captures completed before it.
#[instrument(
    skip(session, device),
    fields(
        planned = session.effective_count(),
        interval_seconds = session.interval_seconds()
    )
)]
pub async fn run_session<D>(
    session: &CaptureSession,
    device: &D,
) -> Result<SessionReport, SessionError>
where
    D: CaptureDevice + ?Sized,
{
    let planned = session.effective_count() as usize;
    let mut report = SessionReport {
        planned,
        results: Vec::with_capacity(planned),
        delays: Vec::with_capacity(planned.saturating_sub(1)),
    };

    for index in 0..planned {
        let started = Instant::now();
        let result = match device.capture(index).await {
            Ok(result) => result,
            Err(source) => {
                error!(index = index, error = %source, "Capture failed, aborting session");
                return Err(SessionError::Aborted {
                    completed: report.results.len(),
                    planned,
                    source,
                });
            }
        };

        if index + 1 == planned {
            info!(output = %result.output, "Captured");
            report.results.push(result);
            break;
        }

        let delay = session.delay_after(started.elapsed());
        info!(
            output = %result.output,
            delay_ms = delay.as_millis() as u64,
            "Captured, sleeping"
        );
        report.results.push(result);
        report.delays.push(delay);
        sleep(delay).await;
    }

    info!(completed = report.completed(), "Capture session finished");
    Ok(report)
}
