use std::fs;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{ContentBlock, SessionEvent};

/// Derive the Claude Code log directory for a given project path.
/// Claude stores logs at ~/.claude/projects/<slug>/ where slug is the
/// absolute path with `/` replaced by `-` and leading `-`.
pub fn log_dir_for_project(project_path: &Path) -> Option<PathBuf> {
    let canonical = project_path.canonicalize().ok()?;
    let slug = canonical
        .to_string_lossy()
        .replace('/', "-")
        .replace('.', "-");  // Claude Code also replaces dots with hyphens
    let home = dirs_home()?;
    let dir = home.join(".claude").join("projects").join(&slug);
    if dir.is_dir() {
        Some(dir)
    } else {
        None
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Find the most recent session ID. Tries sessions-index.json first (legacy),
/// then falls back to scanning for UUID-named .jsonl files by modification time.
pub fn find_latest_session(log_dir: &Path) -> Option<String> {
    // Try sessions-index.json first (present in older Claude Code versions).
    if let Some(session) = find_session_from_index(log_dir) {
        return Some(session);
    }
    // Fall back: scan for UUID-named .jsonl files, pick most recent by mtime.
    find_session_from_files(log_dir)
}

/// Try to find the latest session from sessions-index.json.
fn find_session_from_index(log_dir: &Path) -> Option<String> {
    let index_path = log_dir.join("sessions-index.json");
    let data = fs::read_to_string(&index_path).ok()?;
    let obj: Value = serde_json::from_str(&data).ok()?;
    let entries = obj.get("entries")?.as_array()?;

    entries
        .iter()
        .filter(|e| {
            !e.get("isSidechain")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
        })
        .max_by_key(|e| {
            e.get("modified")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        })
        .and_then(|e| e.get("sessionId")?.as_str().map(|s| s.to_string()))
}

/// Find the latest session by scanning for UUID-named .jsonl files.
fn find_session_from_files(log_dir: &Path) -> Option<String> {
    let entries = fs::read_dir(log_dir).ok()?;

    entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.file_name()?.to_str()?;
            // Match UUID pattern: xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx.jsonl
            if !name.ends_with(".jsonl") {
                return None;
            }
            let stem = name.strip_suffix(".jsonl")?;
            if !is_uuid(stem) {
                return None;
            }
            // Skip empty files.
            let meta = fs::metadata(&path).ok()?;
            if meta.len() == 0 {
                return None;
            }
            let mtime = meta.modified().ok()?;
            Some((stem.to_string(), mtime))
        })
        .max_by_key(|(_, mtime)| *mtime)
        .map(|(session_id, _)| session_id)
}

/// Check if a string looks like a UUID (8-4-4-4-12 hex chars).
fn is_uuid(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 5 {
        return false;
    }
    let expected_lens = [8, 4, 4, 4, 12];
    parts.iter().zip(expected_lens.iter()).all(|(part, &len)| {
        part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit())
    })
}

/// Parse all events from a JSONL log file, in order.
pub fn parse_log_file(path: &Path) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(_) => return events,
    };
    let reader = BufReader::new(file);

    for line in reader.lines().map_while(Result::ok) {
        events.extend(parse_line(&line));
    }
    events
}

/// Parse a single JSONL line from a Claude Code session log.
/// Returns `None` for blank lines, invalid JSON, and record types that
/// carry no session event (summaries, non-init system lines, ...).
pub fn parse_line(line: &str) -> Option<SessionEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let obj: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return None,
    };

    match obj.get("type").and_then(|v| v.as_str())? {
        "system" => {
            if obj.get("subtype").and_then(|v| v.as_str()) != Some("init") {
                return None;
            }
            let session_id = obj
                .get("session_id")
                .or_else(|| obj.get("sessionId"))
                .and_then(|v| v.as_str())
                .map(String::from);
            Some(SessionEvent::Init { session_id })
        }
        "assistant" => Some(SessionEvent::Assistant {
            content: message_blocks(&obj)?,
        }),
        "user" => Some(SessionEvent::User {
            content: message_blocks(&obj)?,
        }),
        "result" => serde_json::from_value(obj).ok().map(SessionEvent::Result),
        _ => None,
    }
}

/// Extract the typed content blocks of a message envelope. String-form
/// content (plain user prompts) becomes a single text block; a malformed
/// block is dropped without taking the rest of the message with it.
fn message_blocks(obj: &Value) -> Option<Vec<ContentBlock>> {
    match obj.pointer("/message/content") {
        Some(Value::Array(blocks)) => Some(
            blocks
                .iter()
                .filter_map(|b| serde_json::from_value(b.clone()).ok())
                .collect(),
        ),
        Some(Value::String(text)) => Some(vec![ContentBlock::Text { text: text.clone() }]),
        _ => None,
    }
}

/// Incrementally tails a session log file, tracking the read position.
pub struct LogTailer {
    path: PathBuf,
    pos: u64,
}

impl LogTailer {
    /// Create a tailer starting at the current end of the file
    /// (i.e., only new lines will be read on subsequent calls).
    pub fn new(path: PathBuf) -> Self {
        // Start at the current end of file so we only get new events.
        let pos = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self { path, pos }
    }

    /// Create a tailer starting at the beginning of the file, so the
    /// first read returns events already in the log.
    pub fn from_start(path: PathBuf) -> Self {
        Self { path, pos: 0 }
    }

    /// Read new lines appended since the last read, as parsed events.
    pub fn read_new_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        let current_len = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if current_len <= self.pos {
            return events;
        }

        if let Ok(file) = fs::File::open(&self.path) {
            let mut reader = BufReader::new(file);
            if reader.seek(SeekFrom::Start(self.pos)).is_ok() {
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) => events.extend(parse_line(&line)),
                        Err(_) => break,
                    }
                }
            }
        }

        self.pos = current_len;
        events
    }
}
