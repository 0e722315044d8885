//! Append-only audit trail of the files an agent creates or modifies.
//!
//! Every file-mutating tool call becomes one entry in a bounded JSON
//! history file. Recording is best-effort by contract: a failed audit is
//! reported on stderr and must never fail the tool call it audits.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

/// Maximum number of entries kept in the history file.
pub const HISTORY_LIMIT: usize = 50;

const HISTORY_FILE: &str = "report_history.json";

/// One audited file mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Local wall-clock time the entry was recorded, ISO-8601.
    pub timestamp: String,
    /// File name without its directory.
    pub file: String,
    /// Path exactly as the tool received it.
    pub path: String,
    pub action: AuditAction,
    pub word_count: usize,
    /// Name of the tool that touched the file.
    pub tool: String,
}

/// How the file was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Modified,
}

impl AuditAction {
    fn as_str(self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Modified => "modified",
        }
    }
}

/// On-disk shape of the history file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportHistory {
    pub reports: Vec<AuditEntry>,
}

/// Default location for the audit history, under the user's home.
pub fn default_audit_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".annals").join("audit"))
}

/// Records file mutations into a history file under a fixed directory.
pub struct AuditRecorder {
    history_file: PathBuf,
}

impl AuditRecorder {
    /// Create a recorder writing to `<audit_dir>/report_history.json`.
    pub fn new(audit_dir: impl Into<PathBuf>) -> Self {
        Self {
            history_file: audit_dir.into().join(HISTORY_FILE),
        }
    }

    /// Record one file-mutating tool call.
    ///
    /// A missing or empty `file_path` in the input is a no-op, not an
    /// error. Any failure past that point is reported on stderr and
    /// swallowed; the call always returns. `tool_response` is accepted
    /// for hook-signature compatibility and unused.
    pub fn record(&self, tool_name: &str, tool_input: &Value, _tool_response: &Value) {
        eprintln!("🔍 Hook called for tool: {tool_name}");

        let file_path = tool_input
            .get("file_path")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if file_path.is_empty() {
            eprintln!("⚠️ No file_path in tool_input");
            return;
        }
        eprintln!("📝 Tracking file: {file_path}");

        if let Err(e) = self.append_entry(tool_name, tool_input, file_path) {
            eprintln!("Report tracking error: {e}");
        }
    }

    fn append_entry(&self, tool_name: &str, tool_input: &Value, file_path: &str) -> Result<()> {
        let mut history = self.load_history()?;

        let action = if tool_name == "Write" {
            AuditAction::Created
        } else {
            AuditAction::Modified
        };

        // Word count comes from the written content; edits carry it in
        // new_string instead.
        let content = tool_input
            .get("content")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .or_else(|| tool_input.get("new_string").and_then(|v| v.as_str()))
            .unwrap_or("");
        let word_count = content.split_whitespace().count();

        let file = Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string());

        history.reports.push(AuditEntry {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            file: file.clone(),
            path: file_path.to_string(),
            action,
            word_count,
            tool: tool_name.to_string(),
        });

        // Keep only the most recent entries.
        if history.reports.len() > HISTORY_LIMIT {
            let excess = history.reports.len() - HISTORY_LIMIT;
            history.reports.drain(..excess);
        }

        self.store_history(&history)?;
        eprintln!("📊 File tracked: {file} ({})", action.as_str());
        Ok(())
    }

    /// Load the current history, or an empty one if no file exists yet.
    /// A file that exists but doesn't parse is an error, never a reset.
    fn load_history(&self) -> Result<ReportHistory> {
        if !self.history_file.exists() {
            return Ok(ReportHistory::default());
        }
        let data = fs::read_to_string(&self.history_file)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Rewrite the history file in full, via a temp file in the same
    /// directory renamed into place so readers never see a half-written
    /// file.
    fn store_history(&self, history: &ReportHistory) -> Result<()> {
        let parent = self.history_file.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let tmp = NamedTempFile::new_in(parent)?.into_temp_path();
        fs::write(&tmp, serde_json::to_string_pretty(history)?)?;
        tmp.persist(&self.history_file)?;
        Ok(())
    }
}
