//! Human-readable rendering of agent session event streams.
//!
//! This module provides three views over a session: a one-line activity
//! feed for live progress, a full conversation timeline, and a final
//! result summary with cost information.

use serde_json::Value;

use crate::ingest::{ContentBlock, SessionEvent};

/// Longest text preview shown in a timeline section, in characters.
const PREVIEW_LIMIT: usize = 500;

/// One short status line for a single event, suitable for a live feed.
///
/// An assistant turn that calls a tool reports the first tool's name;
/// one that doesn't reports generic thinking. A user event is a tool
/// result coming back. Init and result events produce no line.
pub fn activity_line(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Assistant { content } => {
            for block in content {
                if let ContentBlock::ToolUse { name, .. } = block {
                    return Some(format!("🤖 Using: {name}()"));
                }
            }
            Some("🤖 Thinking...".to_string())
        }
        SessionEvent::User { .. } => Some("✓ Tool completed".to_string()),
        SessionEvent::Init { .. } | SessionEvent::Result(_) => None,
    }
}

/// Render the whole conversation as a banner-framed timeline, one
/// section per event in input order.
pub fn render_timeline(events: &[SessionEvent]) -> String {
    let banner = "=".repeat(60);
    let mut output = String::new();
    output.push_str(&format!("\n{banner}\n"));
    output.push_str("🤖 AGENT CONVERSATION TIMELINE\n");
    output.push_str(&format!("{banner}\n\n"));

    for event in events {
        match event {
            SessionEvent::Init { session_id } => {
                output.push_str("⚙️  System Initialized\n");
                if let Some(id) = session_id {
                    output.push_str(&format!("   Session: {}...\n", short_id(id)));
                }
                output.push('\n');
            }
            SessionEvent::Assistant { content } => {
                output.push_str("🤖 Assistant:\n");
                for block in content {
                    match block {
                        ContentBlock::Text { text } => {
                            output.push_str(&format!(
                                "   💬 {}\n",
                                truncate(text, PREVIEW_LIMIT)
                            ));
                        }
                        ContentBlock::ToolUse { name, input } => {
                            output.push_str(&format!("   🔧 Using tool: {name}\n"));
                            if name == "WebSearch" {
                                if let Some(query) =
                                    input.get("query").and_then(|v| v.as_str())
                                {
                                    output.push_str(&format!("      Query: \"{query}\"\n"));
                                }
                            } else if name == "TodoWrite" {
                                if let Some(todos) =
                                    input.get("todos").and_then(|v| v.as_array())
                                {
                                    let completed = count_status(todos, "completed");
                                    let in_progress = count_status(todos, "in_progress");
                                    output.push_str(&format!(
                                        "      📋 {completed} completed, {in_progress} in progress\n"
                                    ));
                                }
                            }
                        }
                        ContentBlock::Thinking { .. }
                        | ContentBlock::ToolResult { .. }
                        | ContentBlock::Unknown => {}
                    }
                }
                output.push('\n');
            }
            SessionEvent::User { content } => {
                for block in content {
                    if let ContentBlock::ToolResult { tool_use_id, content } = block {
                        output.push_str("👤 Tool Result Received\n");
                        let id = tool_use_id.as_deref().unwrap_or("unknown");
                        output.push_str(&format!("   ID: {}...\n", short_id(id)));
                        if let Some(text) = content.as_ref().and_then(|v| v.as_str()) {
                            output.push_str(&format!(
                                "   📥 {}\n",
                                truncate(text, PREVIEW_LIMIT)
                            ));
                        }
                    }
                }
                output.push('\n');
            }
            SessionEvent::Result(result) => {
                output.push_str("✅ Conversation Complete\n");
                if let Some(turns) = result.num_turns {
                    output.push_str(&format!("   Turns: {turns}\n"));
                }
                if let Some(cost) = result.total_cost_usd {
                    output.push_str(&format!("   Cost: ${cost:.2}\n"));
                }
                if let Some(ms) = result.duration_ms {
                    output.push_str(&format!("   Duration: {:.2}s\n", ms as f64 / 1000.0));
                }
                if let Some(usage) = result.usage {
                    output.push_str(&format!(
                        "   Tokens: {}\n",
                        group_thousands(usage.total())
                    ));
                }
                output.push('\n');
            }
        }
    }

    output.push_str(&format!("{banner}\n\n"));
    output
}

/// Render the final assistant answer plus trailing cost information.
///
/// Scanning backward, the most recent assistant turn that carries a text
/// block contributes the text of its first one; turns made of tool calls
/// only are passed over. Cost and duration are appended when the session
/// ended with a result event.
pub fn render_final_result(events: &[SessionEvent]) -> String {
    let mut output = String::new();

    let final_text = events.iter().rev().find_map(|event| match event {
        SessionEvent::Assistant { content } => content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        }),
        _ => None,
    });
    if let Some(text) = final_text {
        output.push_str(&format!("\n📝 Final Result:\n{text}\n"));
    }

    if let Some(SessionEvent::Result(result)) = events.last() {
        if let Some(cost) = result.total_cost_usd {
            output.push_str(&format!("\n📊 Cost: ${cost:.2}\n"));
        }
        if let Some(ms) = result.duration_ms {
            output.push_str(&format!("⏱️  Duration: {:.2}s\n", ms as f64 / 1000.0));
        }
    }

    output
}

/// Count todo items carrying the given status. Items with any other
/// shape or status are simply not counted.
fn count_status(todos: &[Value], status: &str) -> usize {
    todos
        .iter()
        .filter(|t| t.get("status").and_then(|v| v.as_str()) == Some(status))
        .count()
}

/// Truncate display text at a character limit, marking the cut with an
/// ellipsis. Text at or under the limit passes through unchanged.
fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// First eight characters of an ID, for compact display.
fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Format a count with thousands separators (1234567 → "1,234,567").
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{SessionResult, TokenUsage};
    use serde_json::json;

    fn text(s: &str) -> ContentBlock {
        ContentBlock::Text { text: s.to_string() }
    }

    fn tool_use(name: &str, input: Value) -> ContentBlock {
        ContentBlock::ToolUse { name: name.to_string(), input }
    }

    fn tool_result(id: Option<&str>, content: Option<Value>) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: id.map(String::from),
            content,
        }
    }

    fn assistant(content: Vec<ContentBlock>) -> SessionEvent {
        SessionEvent::Assistant { content }
    }

    #[test]
    fn test_activity_tool_call_wins_over_text() {
        let event = assistant(vec![
            text("Let me check."),
            tool_use("WebSearch", json!({"query": "rust"})),
            tool_use("Read", json!({})),
        ]);
        assert_eq!(activity_line(&event).unwrap(), "🤖 Using: WebSearch()");
    }

    #[test]
    fn test_activity_text_only_is_thinking() {
        let event = assistant(vec![text("Pondering.")]);
        assert_eq!(activity_line(&event).unwrap(), "🤖 Thinking...");

        // An empty turn still counts as thinking.
        let empty = assistant(vec![]);
        assert_eq!(activity_line(&empty).unwrap(), "🤖 Thinking...");
    }

    #[test]
    fn test_activity_user_and_silent_events() {
        let user = SessionEvent::User { content: vec![] };
        assert_eq!(activity_line(&user).unwrap(), "✓ Tool completed");

        let init = SessionEvent::Init { session_id: None };
        assert!(activity_line(&init).is_none());
        assert!(activity_line(&SessionEvent::Result(SessionResult::default())).is_none());
    }

    #[test]
    fn test_timeline_sections_in_order() {
        let events = vec![
            SessionEvent::Init {
                session_id: Some("c4d0275f-5c57-4192-962e-ada3c2efec60".to_string()),
            },
            assistant(vec![text("Hello"), tool_use("Read", json!({}))]),
            SessionEvent::User {
                content: vec![tool_result(Some("toolu_0123456789"), Some(json!("ok")))],
            },
            SessionEvent::Result(SessionResult {
                num_turns: Some(4),
                total_cost_usd: Some(0.0534),
                duration_ms: Some(12490),
                usage: Some(TokenUsage {
                    input_tokens: 1_200_000,
                    output_tokens: 34_567,
                }),
            }),
        ];

        let out = render_timeline(&events);
        let banner = "=".repeat(60);
        assert!(out.starts_with(&format!("\n{banner}\n🤖 AGENT CONVERSATION TIMELINE\n{banner}\n\n")));
        assert!(out.ends_with(&format!("{banner}\n\n")));
        assert!(out.contains("⚙️  System Initialized\n   Session: c4d0275f...\n"));
        assert!(out.contains("🤖 Assistant:\n   💬 Hello\n   🔧 Using tool: Read\n"));
        assert!(out.contains("👤 Tool Result Received\n   ID: toolu_01...\n   📥 ok\n"));
        assert!(out.contains(
            "✅ Conversation Complete\n   Turns: 4\n   Cost: $0.05\n   Duration: 12.49s\n   Tokens: 1,234,567\n"
        ));

        // Sections appear in input order.
        let init_at = out.find("System Initialized").unwrap();
        let assistant_at = out.find("Assistant:").unwrap();
        let result_at = out.find("Conversation Complete").unwrap();
        assert!(init_at < assistant_at && assistant_at < result_at);
    }

    #[test]
    fn test_timeline_truncates_past_limit() {
        let long = "x".repeat(501);
        let out = render_timeline(&[assistant(vec![text(&long)])]);
        assert!(out.contains(&format!("   💬 {}...\n", "x".repeat(500))));

        // Exactly at the limit nothing is cut and no ellipsis is added.
        let exact = "y".repeat(500);
        let out = render_timeline(&[assistant(vec![text(&exact)])]);
        assert!(out.contains(&format!("   💬 {exact}\n")));
        assert!(!out.contains("y..."));
    }

    #[test]
    fn test_timeline_truncation_is_char_safe() {
        let long = "é".repeat(501);
        let out = render_timeline(&[assistant(vec![text(&long)])]);
        assert!(out.contains(&format!("   💬 {}...\n", "é".repeat(500))));
    }

    #[test]
    fn test_timeline_websearch_query_line() {
        let event = assistant(vec![tool_use(
            "WebSearch",
            json!({"query": "claude agent sdk"}),
        )]);
        let out = render_timeline(&[event]);
        assert!(out.contains("   🔧 Using tool: WebSearch\n      Query: \"claude agent sdk\"\n"));

        // No query key, no query line.
        let bare = render_timeline(&[assistant(vec![tool_use("WebSearch", json!({}))])]);
        assert!(!bare.contains("Query:"));
    }

    #[test]
    fn test_timeline_todo_counts_ignore_other_statuses() {
        let event = assistant(vec![tool_use(
            "TodoWrite",
            json!({"todos": [
                {"content": "a", "status": "completed"},
                {"content": "b", "status": "completed"},
                {"content": "c", "status": "in_progress"},
                {"content": "d", "status": "pending"},
                {"content": "e"},
            ]}),
        )]);
        let out = render_timeline(&[event]);
        assert!(out.contains("      📋 2 completed, 1 in progress\n"));
    }

    #[test]
    fn test_timeline_missing_tool_use_id_placeholder() {
        let event = SessionEvent::User {
            content: vec![tool_result(None, Some(json!("fine")))],
        };
        let out = render_timeline(&[event]);
        assert!(out.contains("   ID: unknown...\n"));
    }

    #[test]
    fn test_timeline_non_string_result_content_not_rendered() {
        let event = SessionEvent::User {
            content: vec![tool_result(
                Some("toolu_0123456789"),
                Some(json!([{"type": "text", "text": "structured"}])),
            )],
        };
        let out = render_timeline(&[event]);
        assert!(out.contains("👤 Tool Result Received\n"));
        assert!(!out.contains("📥"));
    }

    #[test]
    fn test_timeline_result_skips_absent_fields() {
        let out = render_timeline(&[SessionEvent::Result(SessionResult {
            num_turns: Some(2),
            ..Default::default()
        })]);
        assert!(out.contains("✅ Conversation Complete\n   Turns: 2\n\n"));
        assert!(!out.contains("Cost:"));
        assert!(!out.contains("Duration:"));
        assert!(!out.contains("Tokens:"));
    }

    #[test]
    fn test_final_result_picks_latest_text_turn() {
        let events = vec![
            assistant(vec![text("first answer")]),
            assistant(vec![tool_use("Bash", json!({"command": "ls"}))]),
            assistant(vec![text("second answer")]),
        ];
        let out = render_final_result(&events);
        assert_eq!(out, "\n📝 Final Result:\nsecond answer\n");
    }

    #[test]
    fn test_final_result_passes_over_tool_only_turns() {
        let events = vec![
            assistant(vec![text("the real answer")]),
            assistant(vec![tool_use("Write", json!({}))]),
        ];
        let out = render_final_result(&events);
        assert_eq!(out, "\n📝 Final Result:\nthe real answer\n");
    }

    #[test]
    fn test_final_result_appends_cost_and_duration() {
        let events = vec![
            assistant(vec![text("Done")]),
            SessionEvent::Result(SessionResult {
                num_turns: Some(3),
                total_cost_usd: Some(0.05),
                duration_ms: Some(12490),
                usage: None,
            }),
        ];
        let out = render_final_result(&events);
        assert_eq!(
            out,
            "\n📝 Final Result:\nDone\n\n📊 Cost: $0.05\n⏱️  Duration: 12.49s\n"
        );
    }

    #[test]
    fn test_final_result_empty_events() {
        assert_eq!(render_final_result(&[]), "");
    }

    #[test]
    fn test_truncate_boundary() {
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("abcd", 3), "abc...");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn test_short_id_shorter_than_prefix() {
        assert_eq!(short_id("unknown"), "unknown");
        assert_eq!(short_id("0123456789abcdef"), "01234567");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
