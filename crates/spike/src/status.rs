// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `spike status` command implementation.
//!
//! Queries `/v1/status` on the configured server and shows readiness, lock
//! state and restore progress. An unreachable server is reported, not
//! treated as a command failure.

use std::io::IsTerminal;

use serde::Serialize;
use spike_config::SpikeConfig;
use spike_core::SpikeError;
use spike_gateway::api::StatusResponse;

use crate::operator::operator_peer;

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the `spike status` command.
pub async fn run_status(config: &SpikeConfig, json: bool, plain: bool) -> Result<(), SpikeError> {
    let peer = operator_peer(config)?;
    let report = match peer.status().await {
        Ok(status) => StatusReport {
            running: true,
            server_url: peer.base_url().to_string(),
            status: Some(status),
            error: None,
        },
        Err(e) => StatusReport {
            running: false,
            server_url: peer.base_url().to_string(),
            status: None,
            error: Some(e.to_string()),
        },
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print!("{}", render(&report, use_color));
    }
    Ok(())
}

fn state_line(ok: bool, text: &str, use_color: bool) -> String {
    if use_color {
        use colored::Colorize;
        if ok {
            format!("{} {}", "✓".green(), text.green())
        } else {
            format!("{} {}", "✗".red(), text.red())
        }
    } else if ok {
        format!("[OK] {text}")
    } else {
        format!("[FAIL] {text}")
    }
}

fn render(report: &StatusReport, use_color: bool) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str("  spike status\n");
    out.push_str(&format!("  {}\n", "-".repeat(35)));
    out.push_str(&format!("    Server:   {}\n", report.server_url));

    let Some(status) = &report.status else {
        out.push_str(&format!("    State:    {}\n", state_line(false, "unreachable", use_color)));
        if let Some(error) = &report.error {
            out.push_str(&format!("    Error:    {error}\n"));
        }
        out.push('\n');
        return out;
    };

    if status.ready {
        out.push_str(&format!("    State:    {}\n", state_line(true, "ready", use_color)));
        if let Some(kek) = status.active_kek {
            out.push_str(&format!("    KEK:      {kek}\n"));
        }
    } else {
        out.push_str(&format!(
            "    State:    {}\n",
            state_line(false, "awaiting restore", use_color)
        ));
        out.push_str(&format!(
            "    Restore:  {} collected, {} remaining\n",
            status.restore.shards_collected, status.restore.shards_remaining
        ));
    }
    let lock = if status.locked { "locked" } else { "unlocked" };
    out.push_str(&format!("    Lock:     {}\n", state_line(!status.locked, lock, use_color)));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use spike_core::RestoreStatus;

    fn awaiting() -> StatusReport {
        StatusReport {
            running: true,
            server_url: "http://127.0.0.1:8553".to_string(),
            status: Some(StatusResponse {
                ready: false,
                locked: true,
                restore: RestoreStatus {
                    shards_collected: 1,
                    shards_remaining: 2,
                    restored: false,
                },
                active_kek: None,
            }),
            error: None,
        }
    }

    #[test]
    fn plain_render_shows_restore_progress() {
        let text = render(&awaiting(), false);
        assert!(text.contains("[FAIL] awaiting restore"));
        assert!(text.contains("1 collected, 2 remaining"));
        assert!(text.contains("[FAIL] locked"));
    }

    #[test]
    fn plain_render_ready() {
        let mut report = awaiting();
        if let Some(status) = report.status.as_mut() {
            status.ready = true;
            status.locked = false;
            status.active_kek = Some(3);
        }
        let text = render(&report, false);
        assert!(text.contains("[OK] ready"));
        assert!(text.contains("KEK:      3"));
        assert!(text.contains("[OK] unlocked"));
        assert!(!text.contains("remaining"));
    }

    #[test]
    fn unreachable_report_serializes_without_status() {
        let report = StatusReport {
            running: false,
            server_url: "http://127.0.0.1:1".to_string(),
            status: None,
            error: Some("connection refused".to_string()),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"running\":false"));
        assert!(!json.contains("\"status\""));
        assert!(render(&report, false).contains("[FAIL] unreachable"));
    }
}
