// src/reporter.rs
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Side effects visible to the surrounding pipeline: log lines, step
/// outputs and the step's failure message.
pub trait Reporter {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    /// Reports an error without failing the step.
    fn error(&self, message: &str);
    fn set_output(&self, name: &str, value: &str);
    /// Marks the step as failed. The process exits non-zero at the end.
    fn set_failed(&self, message: &str);
}

/// Reporter speaking the GitHub Actions workflow command protocol.
#[derive(Debug)]
pub struct ActionsReporter {
    output_file: Option<PathBuf>,
    annotate: bool,
    failed: AtomicBool,
}

impl ActionsReporter {
    pub fn new(output_file: Option<PathBuf>, annotate: bool) -> Self {
        Self {
            output_file,
            annotate,
            failed: AtomicBool::new(false),
        }
    }

    /// Uses `GITHUB_OUTPUT` for outputs and annotates when `GITHUB_ACTIONS=true`.
    pub fn from_env() -> Self {
        let output_file = std::env::var_os("GITHUB_OUTPUT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let annotate = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
        Self::new(output_file, annotate)
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn command(&self, name: &str, message: &str) {
        if self.annotate {
            println!("::{}::{}", name, escape_data(message));
        }
    }

    fn append_output(&self, path: &Path, name: &str, value: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(format_output(name, value).as_bytes())
    }
}

impl Reporter for ActionsReporter {
    fn debug(&self, message: &str) {
        if self.annotate {
            self.command("debug", message);
        } else {
            debug!("{}", message);
        }
    }

    fn info(&self, message: &str) {
        info!("{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
        self.command("warning", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
        self.command("error", message);
    }

    fn set_output(&self, name: &str, value: &str) {
        match &self.output_file {
            Some(path) => {
                if let Err(e) = self.append_output(path, name, value) {
                    error!("❌ Could not write output '{}' to {}: {}", name, path.display(), e);
                }
            }
            None => info!("Output {}={}", name, value),
        }
    }

    fn set_failed(&self, message: &str) {
        self.failed.store(true, Ordering::SeqCst);
        self.error(message);
    }
}

/// Formats one `GITHUB_OUTPUT` entry. Multi-line values use a heredoc
/// block with a random delimiter.
pub fn format_output(name: &str, value: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

/// Escapes a workflow command message.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Debug(String),
    Info(String),
    Warning(String),
    Error(String),
    Output { name: String, value: String },
    Failed(String),
}

/// Reporter that records everything in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn outputs(&self) -> HashMap<String, String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Output { name, value } => Some((name, value)),
                _ => None,
            })
            .collect()
    }

    pub fn failure(&self) -> Option<String> {
        self.events().into_iter().find_map(|e| match e {
            ReportEvent::Failed(message) => Some(message),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Reporter for MemoryReporter {
    fn debug(&self, message: &str) {
        self.push(ReportEvent::Debug(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(ReportEvent::Info(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(ReportEvent::Warning(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(ReportEvent::Error(message.to_string()));
    }

    fn set_output(&self, name: &str, value: &str) {
        self.push(ReportEvent::Output {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn set_failed(&self, message: &str) {
        self.push(ReportEvent::Failed(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_output() {
        assert_eq!(format_output("time", "12:00:00"), "time=12:00:00\n");

        let multi = format_output("body", "a\nb");
        let mut lines = multi.lines();
        let header = lines.next().unwrap();
        let delimiter = header.strip_prefix("body<<").unwrap();
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(lines.next(), Some("a"));
        assert_eq!(lines.next(), Some("b"));
        assert_eq!(lines.next(), Some(delimiter));
    }

    #[test]
    fn test_escape_data() {
        assert_eq!(escape_data("50% done\r\nnext"), "50%25 done%0D%0Anext");
    }

    #[test]
    fn test_actions_reporter_writes_outputs_and_tracks_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        let reporter = ActionsReporter::new(Some(path.clone()), false);

        reporter.set_output("evaluation-session-id", "s1");
        reporter.set_output("report-link", "http://x");
        assert!(!reporter.has_failed());
        reporter.set_failed("boom");
        assert!(reporter.has_failed());

        let written = std::fs::read_to_string(path).unwrap();
        assert_eq!(written, "evaluation-session-id=s1\nreport-link=http://x\n");
    }

    #[test]
    fn test_memory_reporter() {
        let reporter = MemoryReporter::new();
        reporter.info("hello");
        reporter.set_output("a", "1");
        reporter.error("oops");
        reporter.set_failed("done for");

        assert_eq!(reporter.outputs().get("a").map(String::as_str), Some("1"));
        assert_eq!(reporter.errors(), vec!["oops".to_string()]);
        assert_eq!(reporter.failure().as_deref(), Some("done for"));
        assert_eq!(reporter.events().len(), 4);
    }
}
