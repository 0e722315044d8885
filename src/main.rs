use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use serde_json::Value;

use annals::audit::{default_audit_dir, AuditRecorder};
use annals::ingest::claude;
use annals::timeline;

#[derive(Parser, Debug)]
#[command(name = "annals", about = "Render and audit Claude agent sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the full conversation timeline of a session log.
    Timeline {
        #[command(flatten)]
        source: SessionSource,
    },
    /// Print the final result and cost summary of a session log.
    Result {
        #[command(flatten)]
        source: SessionSource,
    },
    /// Follow a session log, printing one activity line per new event.
    Watch {
        #[command(flatten)]
        source: SessionSource,

        /// Also print lines for events already in the log.
        #[arg(long)]
        replay: bool,
    },
    /// Record a file-mutating tool call from a hook payload on stdin.
    Track {
        /// Directory holding the audit history file.
        #[arg(long)]
        audit_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SessionSource {
    /// Path to a session .jsonl file (skips auto-detection).
    file: Option<PathBuf>,

    /// Project path whose Claude Code logs should be used.
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Session ID to load (auto-detects latest if omitted).
    #[arg(short, long)]
    session: Option<String>,

    /// Path to Claude Code log directory (auto-derived if omitted).
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl SessionSource {
    /// Resolve the flags down to a concrete session log path.
    fn resolve(&self) -> Result<PathBuf> {
        if let Some(file) = &self.file {
            if !file.is_file() {
                return Err(eyre!("session log not found: {}", file.display()));
            }
            return Ok(file.clone());
        }

        let log_dir = match &self.log_dir {
            Some(dir) => dir.clone(),
            None => {
                let project = self.project.clone().unwrap_or_else(|| PathBuf::from("."));
                claude::log_dir_for_project(&project).ok_or_else(|| {
                    eyre!("no Claude Code logs found for {}", project.display())
                })?
            }
        };

        let session_id = match &self.session {
            Some(id) => id.clone(),
            None => claude::find_latest_session(&log_dir)
                .ok_or_else(|| eyre!("no sessions in {}", log_dir.display()))?,
        };

        let path = log_dir.join(format!("{session_id}.jsonl"));
        if !path.is_file() {
            return Err(eyre!("session log not found: {}", path.display()));
        }
        Ok(path)
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Timeline { source } => {
            let events = claude::parse_log_file(&source.resolve()?);
            print!("{}", timeline::render_timeline(&events));
            print!("{}", timeline::render_final_result(&events));
        }
        Commands::Result { source } => {
            let events = claude::parse_log_file(&source.resolve()?);
            print!("{}", timeline::render_final_result(&events));
        }
        Commands::Watch { source, replay } => {
            run_watch(&source.resolve()?, replay)?;
        }
        Commands::Track { audit_dir } => run_track(audit_dir),
    }

    Ok(())
}

/// Tail the session log forever, printing one activity line per event.
fn run_watch(log_path: &Path, replay: bool) -> Result<()> {
    let (tx, rx) = mpsc::channel::<()>();

    // Wake on changes to the log file; the recv timeout below still
    // polls regularly in case a notification is missed.
    let watched = log_path.to_path_buf();
    let mut _watcher = notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                && event.paths.iter().any(|p| p == &watched)
            {
                let _ = tx.send(());
            }
        }
    })?;
    let watch_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    _watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

    let mut tailer = if replay {
        claude::LogTailer::from_start(log_path.to_path_buf())
    } else {
        claude::LogTailer::new(log_path.to_path_buf())
    };

    loop {
        for event in tailer.read_new_events() {
            if let Some(line) = timeline::activity_line(&event) {
                println!("{line}");
            }
        }

        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(()) => {}
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Read one hook payload from stdin and hand it to the recorder.
/// Never fails the process: a hook exit code other than 0 could block
/// the tool call being audited.
fn run_track(audit_dir: Option<PathBuf>) {
    let mut raw = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut raw) {
        eprintln!("Report tracking error: {e}");
        return;
    }

    let payload: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Report tracking error: {e}");
            return;
        }
    };

    let dir = match audit_dir.or_else(default_audit_dir) {
        Some(d) => d,
        None => {
            eprintln!("Report tracking error: no audit directory available");
            return;
        }
    };

    let tool_name = payload
        .get("tool_name")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let null = Value::Null;
    let tool_input = payload.get("tool_input").unwrap_or(&null);
    let tool_response = payload.get("tool_response").unwrap_or(&null);

    AuditRecorder::new(dir).record(tool_name, tool_input, tool_response);
}
