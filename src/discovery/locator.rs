//! Process enumeration: one OS listing per call, first match wins

#[cfg(target_os = "windows")]
use super::cmdline::parse_process_info_json;
#[cfg(not(target_os = "windows"))]
use super::cmdline::parse_command_line;
use super::ports::{pick_http_port, resolve_listening_ports};
use super::RawProcess;
use crate::config::Settings;
use crate::error::DiscoveryError;
use crate::types::ProcessInfo;
use crate::utils::process::run_command;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct ProcessLocator {
    process_match: String,
    token_min_len: usize,
    command_timeout: Duration,
}

impl ProcessLocator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            process_match: settings.process_match.clone(),
            token_min_len: settings.token_min_len,
            command_timeout: settings.command_timeout,
        }
    }

    /// Locate the language server and recover everything needed to call it.
    #[instrument(skip(self), fields(needle = %self.process_match))]
    pub async fn discover(&self) -> Result<ProcessInfo, DiscoveryError> {
        let mut info = self.locate().await?;
        debug!(pid = info.pid, "Found language server process");

        let listening = resolve_listening_ports(info.pid, self.command_timeout).await;
        info.http_port = pick_http_port(info.connect_port, &listening);
        debug!(
            connect_port = info.connect_port,
            http_port = info.http_port,
            "Resolved connection parameters"
        );

        Ok(info)
    }

    /// PID and command-line parameters of the first matching process.
    #[cfg(not(target_os = "windows"))]
    async fn locate(&self) -> Result<ProcessInfo, DiscoveryError> {
        let listing = run_command("ps", &["-ax", "-o", "pid=,command="], self.command_timeout)
            .await
            .map_err(|e| DiscoveryError::NotFound(e.to_string()))?;

        let raw = find_in_listing(&listing, &self.process_match, std::process::id()).ok_or_else(|| {
            DiscoveryError::NotFound(format!("no process matching '{}'", self.process_match))
        })?;
        let params = parse_command_line(&raw.command_line, self.token_min_len)?;
        Ok(ProcessInfo::new(raw.pid, params))
    }

    /// PID and command-line parameters of the first matching process.
    #[cfg(target_os = "windows")]
    async fn locate(&self) -> Result<ProcessInfo, DiscoveryError> {
        // Same preference as `find_in_listing`: an Antigravity-marked row first
        let query = format!(
            "$p = @(Get-CimInstance Win32_Process -Filter \"Name LIKE '%{}%'\"); \
             $m = $p | Where-Object {{ $_.CommandLine -like '*--app_data_dir*antigravity*' -or \
             $_.CommandLine -like '*\\antigravity\\*' -or $_.CommandLine -like '*/antigravity/*' }} | \
             Select-Object -First 1; \
             if (-not $m) {{ $m = $p | Select-Object -First 1 }}; \
             $m | Select-Object ProcessId,CommandLine | ConvertTo-Json -Compress",
            self.process_match.replace('\'', "''")
        );
        let output = run_command(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", &query],
            self.command_timeout,
        )
        .await
        .map_err(|e| DiscoveryError::NotFound(e.to_string()))?;

        if output.trim().is_empty() {
            return Err(DiscoveryError::NotFound(format!(
                "no process matching '{}'",
                self.process_match
            )));
        }
        parse_process_info_json(&output, self.token_min_len)
    }
}

/// Whether a command line belongs to Antigravity rather than another
/// Codeium-based editor shipping the same `language_server` binary.
#[cfg_attr(target_os = "windows", allow(dead_code))]
pub fn is_antigravity_command(command: &str) -> bool {
    let command = command.to_lowercase();
    (command.contains("--app_data_dir") && command.contains("antigravity"))
        || command.contains("/antigravity/")
        || command.contains("\\antigravity\\")
}

/// Pick a `pid command...` row whose command contains `needle`, case-insensitively.
///
/// Rows marked as Antigravity win over plain matches; otherwise the first
/// plain match is used.
#[cfg_attr(target_os = "windows", allow(dead_code))]
pub fn find_in_listing(listing: &str, needle: &str, self_pid: u32) -> Option<RawProcess> {
    let needle = needle.to_lowercase();
    let mut fallback = None;
    for line in listing.lines() {
        let Some((pid, command)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        let Ok(pid) = pid.parse::<u32>() else {
            continue;
        };
        if pid == self_pid || !command.to_lowercase().contains(&needle) {
            continue;
        }
        let raw = RawProcess {
            pid,
            command_line: command.trim().to_string(),
        };
        if is_antigravity_command(&raw.command_line) {
            return Some(raw);
        }
        if fallback.is_none() {
            debug!(pid, "Matching process is not marked as Antigravity, keeping as fallback");
            fallback = Some(raw);
        }
    }
    fallback
}
