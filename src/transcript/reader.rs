//! Transcript reader (C5): synchronous JSONL parsing.
//!
//! On any I/O or parse failure, returns an empty excerpt — this reader never
//! propagates an error (spec.md §4.5, §7 taxonomy item 4).

use serde_json::Value;

use super::types::{Role, ToolUseSummary, TranscriptExcerpt, TranscriptMessage};

const TOOL_INPUT_TRUNCATE: usize = 120;

/// Read `path` (a JSONL transcript) and extract the `user`/`assistant`
/// messages. `last_n`, if given, truncates the returned `messages` to the
/// tail; `total_messages` always reflects the full matching-line count.
pub fn read_transcript(path: &str, last_n: Option<usize>) -> TranscriptExcerpt {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return TranscriptExcerpt::default(),
    };

    let mut messages = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if let Some(msg) = parse_line(&value) {
            messages.push(msg);
        }
    }

    let total_messages = messages.len();
    let messages = match last_n {
        Some(n) if n < messages.len() => messages.split_off(messages.len() - n),
        _ => messages,
    };

    TranscriptExcerpt {
        messages,
        total_messages,
    }
}

fn parse_line(value: &Value) -> Option<TranscriptMessage> {
    let line_type = value.get("type")?.as_str()?;
    if line_type != "user" && line_type != "assistant" {
        return None;
    }
    let role = if line_type == "user" { Role::User } else { Role::Assistant };

    let message = value.get("message")?;
    let content = message.get("content")?;

    let (text, tool_uses) = match content {
        Value::String(s) => (s.clone(), Vec::new()),
        Value::Array(blocks) => {
            let mut text = String::new();
            let mut tool_uses = Vec::new();
            for block in blocks {
                match block.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        if let Some(t) = block.get("text").and_then(Value::as_str) {
                            if !text.is_empty() {
                                text.push('\n');
                            }
                            text.push_str(t);
                        }
                    }
                    Some("tool_use") => {
                        let name = block
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_owned();
                        let input = block.get("input").cloned().unwrap_or(Value::Null);
                        let rendered = serde_json::to_string(&input).unwrap_or_default();
                        let input_summary = truncate(&rendered, TOOL_INPUT_TRUNCATE);
                        tool_uses.push(ToolUseSummary { name, input_summary });
                    }
                    _ => {}
                }
            }
            (text, tool_uses)
        }
        _ => return None,
    };

    Some(TranscriptMessage { role, text, tool_uses })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        s.chars().take(max).collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f
    }

    #[test]
    fn missing_file_yields_empty_excerpt() {
        let excerpt = read_transcript("/nonexistent/path.jsonl", None);
        assert_eq!(excerpt, TranscriptExcerpt::default());
    }

    #[test]
    fn extracts_string_content_messages() {
        let f = write_lines(&[
            r#"{"type":"user","message":{"role":"user","content":"hello"}}"#,
            r#"{"type":"assistant","message":{"role":"assistant","content":"hi there"}}"#,
        ]);
        let excerpt = read_transcript(f.path().to_str().unwrap(), None);
        assert_eq!(excerpt.total_messages, 2);
        assert_eq!(excerpt.messages[0].role, Role::User);
        assert_eq!(excerpt.messages[0].text, "hello");
        assert_eq!(excerpt.messages[1].text, "hi there");
    }

    #[test]
    fn extracts_array_content_with_tool_use() {
        let f = write_lines(&[
            r#"{"type":"assistant","message":{"role":"assistant","content":[
                {"type":"text","text":"Let me check"},
                {"type":"tool_use","name":"Read","input":{"file_path":"/x"}}
            ]}}"#,
        ]);
        let excerpt = read_transcript(f.path().to_str().unwrap(), None);
        assert_eq!(excerpt.messages[0].text, "Let me check");
        assert_eq!(excerpt.messages[0].tool_uses.len(), 1);
        assert_eq!(excerpt.messages[0].tool_uses[0].name, "Read");
    }

    #[test]
    fn ignores_non_user_assistant_lines() {
        let f = write_lines(&[
            r#"{"type":"summary","message":{}}"#,
            r#"{"type":"user","message":{"role":"user","content":"x"}}"#,
        ]);
        let excerpt = read_transcript(f.path().to_str().unwrap(), None);
        assert_eq!(excerpt.total_messages, 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let f = write_lines(&[
            "not json at all",
            r#"{"type":"user","message":{"role":"user","content":"x"}}"#,
        ]);
        let excerpt = read_transcript(f.path().to_str().unwrap(), None);
        assert_eq!(excerpt.total_messages, 1);
    }

    #[test]
    fn last_n_returns_tail_but_total_reflects_full_count() {
        let lines: Vec<String> = (0..10)
            .map(|i| format!(r#"{{"type":"user","message":{{"role":"user","content":"msg{i}"}}}}"#))
            .collect();
        let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let f = write_lines(&line_refs);
        let excerpt = read_transcript(f.path().to_str().unwrap(), Some(3));
        assert_eq!(excerpt.total_messages, 10);
        assert_eq!(excerpt.messages.len(), 3);
        assert_eq!(excerpt.messages[0].text, "msg7");
        assert_eq!(excerpt.messages[2].text, "msg9");
    }

    #[test]
    fn tool_input_is_truncated_to_120_chars() {
        let long_value = "x".repeat(300);
        let line = format!(
            r#"{{"type":"assistant","message":{{"role":"assistant","content":[
                {{"type":"tool_use","name":"Bash","input":{{"command":"{long_value}"}}}}
            ]}}}}"#
        );
        let f = write_lines(&[&line]);
        let excerpt = read_transcript(f.path().to_str().unwrap(), None);
        assert!(excerpt.messages[0].tool_uses[0].input_summary.chars().count() <= 120);
    }
}
