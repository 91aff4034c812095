//! Hook-bridge installer — SPEC_FULL.md §6.
//!
//! Patches the agent's settings JSON (default `~/.claude/settings.json`)
//! with one `hooks` entry per event, each invoking a generated shell bridge
//! script. Idempotent: entries tagged with the `claudecube` substring are
//! replaced in place; every other entry is left untouched.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

const HOOK_TAG: &str = "claudecube";

struct HookSpec {
    event: &'static str,
    timeout_seconds: u64,
}

const HOOKS: &[HookSpec] = &[
    HookSpec { event: "PreToolUse", timeout_seconds: 120 },
    HookSpec { event: "Stop", timeout_seconds: 30 },
    HookSpec { event: "SessionStart", timeout_seconds: 5 },
    HookSpec { event: "SessionEnd", timeout_seconds: 5 },
    HookSpec { event: "Notification", timeout_seconds: 5 },
];

pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("settings.json"))
}

pub fn default_bridge_script_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claudecube").join("bin").join("hook-bridge.sh"))
}

const BRIDGE_SCRIPT_TEMPLATE: &str = r#"#!/bin/sh
# claudecube hook bridge: reads one JSON hook payload from stdin and posts
# it to the local ClaudeCube service. Exits 0 on any failure so the agent
# is never blocked by this service being unavailable.
event="$1"
port="${CLAUDECUBE_PORT:-7080}"
payload="$(cat)"

case "$payload" in
  *'"stop_hook_active":true'*) echo "$payload"; exit 0 ;;
esac

response="$(curl -s --max-time 60 -X POST "http://localhost:${port}/hooks/${event}" \
  -H 'Content-Type: application/json' -d "$payload" 2>/dev/null)" || exit 0

echo "$response"
exit 0
"#;

pub fn install(settings_path: &Path, bridge_script_path: &Path, port: u16) -> Result<(), String> {
    write_bridge_script(bridge_script_path)?;

    let mut settings = read_settings(settings_path)?;
    let hooks = settings
        .as_object_mut()
        .ok_or_else(|| "settings file root is not a JSON object".to_owned())?
        .entry("hooks")
        .or_insert_with(|| json!({}));
    let hooks = hooks.as_object_mut().ok_or_else(|| "'hooks' key is not a JSON object".to_owned())?;

    for spec in HOOKS {
        let entries = hooks.entry(spec.event).or_insert_with(|| json!([])).as_array_mut().cloned().unwrap_or_default();
        let mut retained: Vec<Value> = entries.into_iter().filter(|e| !is_claudecube_entry(e)).collect();
        retained.push(hook_entry(spec, bridge_script_path, port));
        hooks.insert(spec.event.to_owned(), Value::Array(retained));
    }

    write_settings(settings_path, &settings)
}

pub fn uninstall(settings_path: &Path) -> Result<(), String> {
    let mut settings = read_settings(settings_path)?;
    let Some(hooks) = settings.as_object_mut().and_then(|o| o.get_mut("hooks")).and_then(|h| h.as_object_mut()) else {
        return Ok(());
    };

    for spec in HOOKS {
        if let Some(entries) = hooks.get(spec.event).and_then(|v| v.as_array()).cloned() {
            let retained: Vec<Value> = entries.into_iter().filter(|e| !is_claudecube_entry(e)).collect();
            hooks.insert(spec.event.to_owned(), Value::Array(retained));
        }
    }

    write_settings(settings_path, &settings)
}

fn hook_entry(spec: &HookSpec, bridge_script_path: &Path, port: u16) -> Value {
    json!({
        "matcher": "*",
        "hooks": [{
            "type": "command",
            "command": format!("CLAUDECUBE_PORT={port} {} {}", bridge_script_path.display(), spec.event),
            "timeout": spec.timeout_seconds,
        }],
    })
}

fn is_claudecube_entry(entry: &Value) -> bool {
    entry
        .get("hooks")
        .and_then(|h| h.as_array())
        .map(|hooks| {
            hooks.iter().any(|h| {
                h.get("command").and_then(|c| c.as_str()).is_some_and(|c| c.contains(HOOK_TAG))
            })
        })
        .unwrap_or(false)
}

fn read_settings(path: &Path) -> Result<Value, String> {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).map_err(|e| format!("invalid settings JSON at {path:?}: {e}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(json!({})),
        Err(e) => Err(format!("failed to read {path:?}: {e}")),
    }
}

fn write_settings(path: &Path, settings: &Value) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let pretty = serde_json::to_string_pretty(settings).map_err(|e| e.to_string())?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, pretty).map_err(|e| e.to_string())?;
    std::fs::rename(&tmp_path, path).map_err(|e| e.to_string())
}

fn write_bridge_script(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    std::fs::write(path, BRIDGE_SCRIPT_TEMPLATE).map_err(|e| e.to_string())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).map_err(|e| e.to_string())?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).map_err(|e| e.to_string())?;
    }

    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn install_into_missing_file_creates_hooks_for_every_event() {
        let dir = TempDir::new().unwrap();
        let settings_path = dir.path().join("settings.json");
        let bridge_path = dir.path().join("bin").join("hook-bridge.sh");

        install(&settings_path, &bridge_path, 7080).unwrap();

        let settings: Value = serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
        for spec in HOOKS {
            assert!(settings["hooks"][spec.event].is_array(), "missing hooks for {}", spec.event);
        }
        assert!(bridge_path.exists());
    }

    #[test]
    fn install_preserves_foreign_hook_entries() {
        let dir = TempDir::new().unwrap();
        let settings_path = dir.path().join("settings.json");
        let bridge_path = dir.path().join("hook-bridge.sh");

        let existing = json!({
            "hooks": {
                "PreToolUse": [{"matcher": "*", "hooks": [{"type": "command", "command": "some-other-tool", "timeout": 10}]}]
            }
        });
        std::fs::write(&settings_path, existing.to_string()).unwrap();

        install(&settings_path, &bridge_path, 7080).unwrap();

        let settings: Value = serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
        let entries = settings["hooks"]["PreToolUse"].as_array().unwrap();
        assert_eq!(entries.len(), 2, "foreign entry plus the new claudecube entry");
    }

    #[test]
    fn install_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let settings_path = dir.path().join("settings.json");
        let bridge_path = dir.path().join("hook-bridge.sh");

        install(&settings_path, &bridge_path, 7080).unwrap();
        install(&settings_path, &bridge_path, 7080).unwrap();

        let settings: Value = serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
        let entries = settings["hooks"]["PreToolUse"].as_array().unwrap();
        assert_eq!(entries.len(), 1, "re-install replaces rather than duplicates");
    }

    #[test]
    fn uninstall_removes_only_claudecube_entries() {
        let dir = TempDir::new().unwrap();
        let settings_path = dir.path().join("settings.json");
        let bridge_path = dir.path().join("hook-bridge.sh");

        let existing = json!({
            "hooks": {
                "PreToolUse": [{"matcher": "*", "hooks": [{"type": "command", "command": "some-other-tool", "timeout": 10}]}]
            }
        });
        std::fs::write(&settings_path, existing.to_string()).unwrap();
        install(&settings_path, &bridge_path, 7080).unwrap();
        uninstall(&settings_path).unwrap();

        let settings: Value = serde_json::from_str(&std::fs::read_to_string(&settings_path).unwrap()).unwrap();
        let entries = settings["hooks"]["PreToolUse"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0]["hooks"][0]["command"].as_str().unwrap().contains("some-other-tool"));
    }
}
