//! JSONL file writer for pre-requisite step events.
//!
//! Each [`StepEvent`] is serialized as a single JSON line with a `type`
//! field and `timestamp`, appended to the file via a buffered writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use toolgate_application::{StepEvent, StepEventSink};
use tracing::warn;

/// JSONL step logger that appends one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlStepLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlStepLogger {
    /// Open (or create) the log at `path`, creating parent directories.
    ///
    /// Returns `None` if the file cannot be opened; step logging is then
    /// simply disabled.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create step log directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open step log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StepEventSink for JsonlStepLogger {
    fn emit(&self, event: StepEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let Ok(serde_json::Value::Object(mut record)) = serde_json::to_value(&event) else {
            return;
        };
        record.insert("type".to_string(), serde_json::Value::from("step"));
        record.insert("timestamp".to_string(), serde_json::Value::String(timestamp));

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlStepLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use toolgate_application::StepStatus;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_step_logger_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("steps.jsonl");
        let logger = JsonlStepLogger::new(&path).unwrap();

        logger.emit(StepEvent::new("get_invoice", StepStatus::Executing));
        logger.emit(
            StepEvent::new("get_invoice", StepStatus::Blocked)
                .with_duration(12)
                .with_data(json!({"reason": "Invoice INV-1 is PAID"})),
        );
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        for line in &lines {
            assert_eq!(line["type"], "step");
            assert!(line.get("timestamp").is_some());
        }
        assert_eq!(lines[0]["status"], "executing");
        assert!(lines[0].get("durationMs").is_none());
        assert_eq!(lines[1]["status"], "blocked");
        assert_eq!(lines[1]["durationMs"], 12);
        assert_eq!(lines[1]["data"]["reason"], "Invoice INV-1 is PAID");
    }

    #[test]
    fn test_step_logger_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.jsonl");

        JsonlStepLogger::new(&path)
            .unwrap()
            .emit(StepEvent::new("list_accounts", StepStatus::Passed));
        JsonlStepLogger::new(&path)
            .unwrap()
            .emit(StepEvent::new("get_invoice", StepStatus::Failed));

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["tool"], "get_invoice");
    }
}
