//! Listening-port lookup from OS socket tables
//!
//! Understands Windows `netstat -ano`, Linux `ss -tlnp` and `lsof -nP -iTCP
//! -sTCP:LISTEN` rows. Lines in any other shape are ignored.

use crate::utils::process::run_command;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::Duration;
use tracing::debug;

static SS_PID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"pid=(\d+)").expect("ss pid regex"));

/// Distinct TCP ports `pid` is listening on, in first-seen order.
pub fn parse_listening_ports(dump: &str, pid: u32) -> Vec<u16> {
    let mut ports = Vec::new();
    for line in dump.lines() {
        if let Some(port) = listening_port_for(line, pid) {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
    }
    ports
}

/// Port to use for the plaintext retry: the first listener that is not the connect port.
pub fn pick_http_port(connect_port: u16, listening: &[u16]) -> u16 {
    listening
        .iter()
        .copied()
        .find(|port| *port != connect_port)
        .unwrap_or(connect_port)
}

fn listening_port_for(line: &str, pid: u32) -> Option<u16> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    netstat_entry(&tokens, pid)
        .or_else(|| ss_entry(line, &tokens, pid))
        .or_else(|| lsof_entry(&tokens, pid))
}

// TCP    127.0.0.1:42100    0.0.0.0:0    LISTENING    12345
fn netstat_entry(tokens: &[&str], pid: u32) -> Option<u16> {
    if tokens.len() < 5 || !tokens[0].to_ascii_uppercase().starts_with("TCP") {
        return None;
    }
    if !matches!(tokens[3], "LISTENING" | "LISTEN") {
        return None;
    }
    let owner: u32 = tokens.last()?.parse().ok()?;
    if owner != pid {
        return None;
    }
    port_of(tokens[1])
}

// LISTEN 0 4096 127.0.0.1:42100 0.0.0.0:* users:(("language_server",pid=12345,fd=10))
fn ss_entry(line: &str, tokens: &[&str], pid: u32) -> Option<u16> {
    if tokens.len() < 5 || tokens[0] != "LISTEN" {
        return None;
    }
    let owned = SS_PID_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .any(|owner| owner == pid);
    if !owned {
        return None;
    }
    port_of(tokens[3])
}

// language_ 12345 user 23u IPv4 0x123 0t0 TCP 127.0.0.1:42100 (LISTEN)
fn lsof_entry(tokens: &[&str], pid: u32) -> Option<u16> {
    let listen_idx = tokens.iter().position(|t| *t == "(LISTEN)")?;
    if listen_idx < 2 {
        return None;
    }
    let owner: u32 = tokens.get(1)?.parse().ok()?;
    if owner != pid {
        return None;
    }
    port_of(tokens[listen_idx - 1])
}

fn port_of(addr: &str) -> Option<u16> {
    let (_, port) = addr.rsplit_once(':')?;
    port.parse::<u16>().ok().filter(|p| *p != 0)
}

/// Ask the OS which TCP ports `pid` is listening on.
///
/// Any tool failure yields an empty list; the caller keeps its connect port.
pub async fn resolve_listening_ports(pid: u32, timeout: Duration) -> Vec<u16> {
    #[cfg(not(target_os = "windows"))]
    let pid_arg = pid.to_string();

    #[cfg(target_os = "windows")]
    let attempts: Vec<(&str, Vec<&str>)> = vec![("netstat", vec!["-ano", "-p", "TCP"])];

    #[cfg(target_os = "macos")]
    let attempts: Vec<(&str, Vec<&str>)> = vec![(
        "lsof",
        vec!["-nP", "-iTCP", "-sTCP:LISTEN", "-a", "-p", pid_arg.as_str()],
    )];

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let attempts: Vec<(&str, Vec<&str>)> = vec![
        ("ss", vec!["-tlnp"]),
        ("lsof", vec!["-nP", "-iTCP", "-sTCP:LISTEN", "-a", "-p", pid_arg.as_str()]),
    ];

    for (cmd, args) in attempts {
        match run_command(cmd, &args, timeout).await {
            Ok(dump) => {
                let ports = parse_listening_ports(&dump, pid);
                debug!(cmd, pid, ?ports, "Resolved listening ports");
                if !ports.is_empty() {
                    return ports;
                }
            }
            Err(e) => debug!(cmd, pid, error = %e, "Socket table lookup failed"),
        }
    }

    Vec::new()
}
