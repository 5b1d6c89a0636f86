use std::io::{self, Write};

use oneach_core::api::{
    ConfigurationError, ExecutionResult, ProgressMonitor, ResultFormatter, RunEvent, RunSummary,
    Target,
};

const SERVICE_WIDTH: usize = 16;
const ZONE_WIDTH: usize = 8;
const HOSTNAME_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineMode {
    /// Last non-blank line of output per target, in columns.
    One,
    /// Banner plus full output per target.
    #[default]
    Multi,
    /// One-line unless some target printed more than one line.
    Auto,
}

#[derive(Debug, Clone)]
pub struct TextFormatterConfig {
    pub omit_header: bool,
    /// Buffer all results and print them sorted at end of run.
    pub batched: bool,
    pub line_mode: LineMode,
    /// Host-context columns; also taken from the run's start event.
    pub host_context: bool,
    /// Draw a progress bar on stderr while buffering.
    pub show_progress: bool,
    /// Print a one-line summary to stderr at end of run.
    pub summary: bool,
}

impl Default for TextFormatterConfig {
    fn default() -> Self {
        Self {
            omit_header: false,
            batched: true,
            line_mode: LineMode::Auto,
            host_context: false,
            show_progress: false,
            summary: true,
        }
    }
}

pub struct TextFormatter {
    config: TextFormatterConfig,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    buffered: Vec<ExecutionResult>,
    progress: Option<ProgressMonitor>,
    header_written: bool,
}

impl TextFormatter {
    pub fn new(config: TextFormatterConfig) -> Result<Self, ConfigurationError> {
        Self::with_writers(config, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(
        config: TextFormatterConfig,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Result<Self, ConfigurationError> {
        if config.line_mode == LineMode::Auto && !config.batched {
            return Err(ConfigurationError::Invalid(
                "automatic line mode requires batched output".into(),
            ));
        }

        Ok(Self {
            config,
            out,
            err,
            buffered: Vec::new(),
            progress: None,
            header_written: false,
        })
    }

    fn on_start(
        &mut self,
        total_targets: usize,
        host_context: bool,
        dry_run: bool,
    ) -> io::Result<()> {
        self.config.host_context = host_context;

        if dry_run {
            return Ok(());
        }
        if self.config.batched {
            self.progress = Some(ProgressMonitor::new(
                total_targets,
                self.config.show_progress,
            ));
        } else if self.config.line_mode == LineMode::One {
            self.write_header()?;
        }
        Ok(())
    }

    fn on_result(&mut self, result: &ExecutionResult) -> io::Result<()> {
        if !self.config.batched {
            let one_line = self.config.line_mode == LineMode::One;
            return self.write_result(result, one_line);
        }

        if let Some(progress) = self.progress.as_mut() {
            progress.complete_target(result.target.label(), result.outcome.is_success());
        }
        self.buffered.push(result.clone());
        Ok(())
    }

    fn on_end(&mut self, summary: &RunSummary) -> io::Result<()> {
        if let Some(progress) = self.progress.take() {
            progress.clear();
        }

        if self.config.batched && !self.buffered.is_empty() {
            let mut results = std::mem::take(&mut self.buffered);
            results.sort_by(|a, b| sort_key(&a.target).cmp(&sort_key(&b.target)));

            let one_line = match self.config.line_mode {
                LineMode::One => true,
                LineMode::Multi => false,
                LineMode::Auto => results.iter().all(|r| non_blank_lines(r) <= 1),
            };
            if one_line {
                self.write_header()?;
            }
            for result in &results {
                self.write_result(result, one_line)?;
            }
        }
        self.out.flush()?;

        if self.config.summary {
            writeln!(self.err, "{}", summary_line(summary))?;
            self.err.flush()?;
        }
        Ok(())
    }

    fn write_header(&mut self) -> io::Result<()> {
        if self.config.omit_header || self.header_written {
            return Ok(());
        }
        self.header_written = true;
        if self.config.host_context {
            writeln!(self.out, "{:<w$} OUTPUT", "HOSTNAME", w = HOSTNAME_WIDTH)
        } else {
            writeln!(
                self.out,
                "{:<sw$} {:<zw$} OUTPUT",
                "SERVICE",
                "ZONE",
                sw = SERVICE_WIDTH,
                zw = ZONE_WIDTH
            )
        }
    }

    fn write_result(&mut self, result: &ExecutionResult, one_line: bool) -> io::Result<()> {
        if one_line {
            let text = result.output_text();
            let line = last_non_blank_line(&text);
            let target = &result.target;
            return match (&target.zonename, &target.service) {
                (Some(zone), service) => writeln!(
                    self.out,
                    "{:<sw$} {:<zw$} {}",
                    service.as_deref().unwrap_or("-"),
                    truncate(zone, ZONE_WIDTH),
                    line,
                    sw = SERVICE_WIDTH,
                    zw = ZONE_WIDTH
                ),
                (None, _) => writeln!(
                    self.out,
                    "{:<w$} {}",
                    target.hostname,
                    line,
                    w = HOSTNAME_WIDTH
                ),
            };
        }

        writeln!(self.out, "{}", banner(&result.target))?;
        let text = result.output_text();
        self.out.write_all(text.as_bytes())?;
        if !text.is_empty() && !text.ends_with('\n') {
            writeln!(self.out)?;
        }
        writeln!(self.out)
    }
}

impl ResultFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text-formatter"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn supports_streaming(&self) -> bool {
        !self.config.batched
    }

    fn render(&mut self, event: &RunEvent) -> io::Result<()> {
        match event {
            RunEvent::Start {
                total_targets,
                host_context,
                dry_run,
                ..
            } => self.on_start(*total_targets, *host_context, *dry_run),
            RunEvent::Plan { operation, .. } => {
                writeln!(self.out, "{}", operation)?;
                self.out.flush()
            }
            RunEvent::Result(result) => self.on_result(result),
            RunEvent::End(summary) => self.on_end(summary),
        }
    }
}

fn banner(target: &Target) -> String {
    match (&target.zonename, &target.service) {
        (Some(zone), Some(service)) => format!(
            "=== Output from {} on {} ({}):",
            zone, target.hostname, service
        ),
        (Some(zone), None) => format!("=== Output from {} on {}:", zone, target.hostname),
        (None, _) => format!(
            "=== Output from {} ({}):",
            target.compute_node_id, target.hostname
        ),
    }
}

fn sort_key(target: &Target) -> (Option<&str>, Option<&str>, &str) {
    (
        target.service.as_deref(),
        target.zonename.as_deref(),
        target.hostname.as_str(),
    )
}

fn non_blank_lines(result: &ExecutionResult) -> usize {
    result
        .output_text()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count()
}

fn last_non_blank_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(str::trim_end)
        .unwrap_or("")
}

fn truncate(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn summary_line(summary: &RunSummary) -> String {
    if summary.dry_run {
        return format!("dry run: {} target(s) selected, nothing executed", summary.targets);
    }

    let failed = summary.failures();
    let mut line = format!(
        "{} target(s): {} ok, {} failed",
        summary.targets,
        summary.completed.saturating_sub(failed),
        failed
    );
    if summary.timeouts > 0 {
        line.push_str(&format!(" ({} timed out)", summary.timeouts));
    }
    line.push_str(&format!(" in {}ms", summary.duration_ms));
    line
}
