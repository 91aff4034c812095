//! tmux adapter: shells out to the `tmux` CLI binary.
//!
//! Grounded on the `spawn_blocking` + `std::process::Command` pattern used to
//! execute shell commands elsewhere in this codebase; there is no tmux
//! client crate in the dependency pack, so this adapter talks to the `tmux`
//! binary's `list-panes`/`send-keys` subcommands directly, which is itself
//! the idiomatic way to drive tmux from a host process.

use async_trait::async_trait;

use super::traits::{MultiplexerAdapter, PaneInfo};

/// Substring tmux's `list-panes -a` reports for panes running the agent CLI.
const AGENT_COMMAND_MARKER: &str = "claude";

pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn run_tmux(args: Vec<String>) -> Result<String, String> {
        tokio::task::spawn_blocking(move || {
            std::process::Command::new("tmux")
                .args(&args)
                .output()
                .map_err(|e| format!("failed to spawn tmux: {e}"))
        })
        .await
        .map_err(|e| format!("blocking task panicked: {e}"))?
        .map(|output| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Parse one line of
    /// `tmux list-panes -a -F '#{session_name}\t#{window_index}\t#{window_name}\t#{pane_index}\t#{pane_id}\t#{pane_current_path}\t#{pane_current_command}'`.
    fn parse_pane_line(line: &str) -> Option<PaneInfo> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return None;
        }
        Some(PaneInfo {
            session_name: fields[0].to_owned(),
            window_index: fields[1].parse().ok()?,
            window_name: fields[2].to_owned(),
            pane_index: fields[3].parse().ok()?,
            pane_id: fields[4].to_owned(),
            pane_cwd: fields[5].to_owned(),
            command: fields[6].to_owned(),
        })
    }
}

impl Default for TmuxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MultiplexerAdapter for TmuxAdapter {
    async fn list_panes(&self) -> Vec<PaneInfo> {
        let format = "#{session_name}\t#{window_index}\t#{window_name}\t#{pane_index}\t#{pane_id}\t#{pane_current_path}\t#{pane_current_command}";
        let output = match Self::run_tmux(vec![
            "list-panes".to_owned(),
            "-a".to_owned(),
            "-F".to_owned(),
            format.to_owned(),
        ])
        .await
        {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(error = %e, "tmux list-panes failed");
                return Vec::new();
            }
        };

        output
            .lines()
            .filter_map(Self::parse_pane_line)
            .filter(|p| p.command.contains(AGENT_COMMAND_MARKER))
            .collect()
    }

    async fn find_pane_for_cwd(&self, cwd: &str) -> Option<String> {
        self.list_panes()
            .await
            .into_iter()
            .find(|p| p.pane_cwd == cwd)
            .map(|p| p.pane_id)
    }

    async fn send_keys(&self, pane_id: &str, text: &str) -> Result<(), String> {
        let output = Self::run_tmux(vec![
            "send-keys".to_owned(),
            "-t".to_owned(),
            pane_id.to_owned(),
            text.to_owned(),
            "Enter".to_owned(),
        ])
        .await;
        output.map(|_| ())
    }

    async fn resolve_label(&self, cwd: &str) -> Option<String> {
        self.list_panes()
            .await
            .into_iter()
            .find(|p| p.pane_cwd == cwd)
            .map(|p| p.window_name)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pane_line_happy_path() {
        let line = "main\t0\teditor\t1\t%3\t/home/user/project\tclaude";
        let pane = TmuxAdapter::parse_pane_line(line).unwrap();
        assert_eq!(pane.session_name, "main");
        assert_eq!(pane.window_index, 0);
        assert_eq!(pane.window_name, "editor");
        assert_eq!(pane.pane_id, "%3");
        assert_eq!(pane.pane_cwd, "/home/user/project");
        assert_eq!(pane.command, "claude");
    }

    #[test]
    fn parse_pane_line_rejects_malformed_input() {
        assert!(TmuxAdapter::parse_pane_line("too\tfew\tfields").is_none());
    }

    #[test]
    fn parse_pane_line_rejects_non_numeric_index() {
        let line = "main\tNaN\teditor\t1\t%3\t/home/user\tclaude";
        assert!(TmuxAdapter::parse_pane_line(line).is_none());
    }
}
