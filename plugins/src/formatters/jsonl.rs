use std::io::{self, Write};

use oneach_core::api::{ResultFormatter, RunEvent};
use serde_json::json;

/// One JSON object per line, written as soon as each event arrives.
pub struct JsonlFormatter {
    out: Box<dyn Write + Send>,
}

impl JsonlFormatter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    fn write_line(&mut self, value: &impl serde::Serialize) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl Default for JsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for JsonlFormatter {
    fn name(&self) -> &str {
        "jsonl-formatter"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn render(&mut self, event: &RunEvent) -> io::Result<()> {
        match event {
            RunEvent::Result(result) => self.write_line(result),
            RunEvent::Plan { target, operation } => self.write_line(&json!({
                "dry_run": true,
                "target": target,
                "operation": operation,
            })),
            RunEvent::Start { .. } | RunEvent::End(_) => Ok(()),
        }
    }
}
