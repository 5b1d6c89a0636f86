use std::io;

use tokio::sync::mpsc;

use crate::executor::types::{RunEvent, RunSummary};

/// Output formatter plugin (controls how a run is presented).
pub trait ResultFormatter: Send {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    /// Whether results are written as they arrive rather than at end of run.
    fn supports_streaming(&self) -> bool {
        false
    }
    fn render(&mut self, event: &RunEvent) -> io::Result<()>;
}

/// Feeds every event from `events` to `formatter` until the producer hangs up.
///
/// Returns the run summary when the stream ended with an end marker, or
/// `None` when the run stopped before producing one.
pub async fn drive_formatter(
    formatter: &mut dyn ResultFormatter,
    mut events: mpsc::Receiver<RunEvent>,
) -> io::Result<Option<RunSummary>> {
    let mut summary = None;
    while let Some(event) = events.recv().await {
        formatter.render(&event)?;
        if let RunEvent::End(s) = event {
            summary = Some(s);
        }
    }
    Ok(summary)
}
