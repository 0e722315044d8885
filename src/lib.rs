//! Renders and audits Claude Code agent sessions from their JSONL logs.

pub mod audit;
pub mod ingest;
pub mod timeline;
