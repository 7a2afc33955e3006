//! Extraction of the connect port and CSRF token from process arguments
//!
//! Works on whatever text the OS listing produced: a bare argv string, a full
//! `ps aux` row with user/CPU/memory columns, or the `CommandLine` field of a
//! PowerShell `Win32_Process` query. Token extraction runs in two passes: the
//! exact `--csrf_token` flag, then a shape-based heuristic that accepts any
//! long alphanumeric flag value so a renamed flag does not break discovery.

use super::RawProcess;
use crate::error::DiscoveryError;
use crate::types::{ConnectionParams, ProcessInfo};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;

const PORT_FLAG: &str = "extension_server_port";

static PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"--extension_server_port(?:=|\s+)["']?(\d+)"#).expect("port regex"));

// Values must start alphanumeric so a following `--flag` is never read as a value
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"--csrf_token(?:=|\s+)["']?([A-Za-z0-9][A-Za-z0-9_-]*)"#).expect("token regex")
});

static ANY_FLAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"--([A-Za-z0-9_-]+)(?:=|\s+)["']?([A-Za-z0-9][A-Za-z0-9-]*)"#).expect("flag regex")
});

/// Value of `--extension_server_port`, if present and a valid non-zero port.
pub fn extract_port(cmd_line: &str) -> Option<u16> {
    PORT_RE
        .captures(cmd_line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .filter(|port| *port != 0)
}

/// Value of `--csrf_token`, first pass.
pub fn extract_csrf_token(cmd_line: &str) -> Option<String> {
    TOKEN_RE
        .captures(cmd_line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First flag value that looks like a token, second pass.
///
/// A candidate is a contiguous `[A-Za-z0-9-]` run of at least `min_len`
/// characters ending at whitespace, a quote, or the end of the input. The port
/// flag is never a candidate.
pub fn extract_token_heuristic(cmd_line: &str, min_len: usize) -> Option<String> {
    for caps in ANY_FLAG_RE.captures_iter(cmd_line) {
        let (Some(flag), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if flag.as_str() == PORT_FLAG || value.as_str().len() < min_len {
            continue;
        }
        let bounded = cmd_line[value.end()..]
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || c == '"' || c == '\'');
        if bounded {
            return Some(value.as_str().to_string());
        }
    }
    None
}

/// Exact flag first, heuristic only when it is absent.
pub fn extract_token(cmd_line: &str, min_len: usize) -> Option<String> {
    extract_csrf_token(cmd_line).or_else(|| extract_token_heuristic(cmd_line, min_len))
}

/// Recover port and token from free-form command-line text.
pub fn parse_command_line(cmd_line: &str, token_min_len: usize) -> Result<ConnectionParams, DiscoveryError> {
    let connect_port = extract_port(cmd_line).ok_or(DiscoveryError::MissingPort)?;
    let csrf_token = extract_token(cmd_line, token_min_len).ok_or(DiscoveryError::MissingToken)?;
    Ok(ConnectionParams {
        connect_port,
        csrf_token,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StructuredProcess {
    #[serde(default)]
    process_id: Option<u64>,
    #[serde(default)]
    command_line: Option<String>,
}

/// Parse one `{ProcessId, CommandLine}` object from a structured OS query.
pub fn parse_structured_listing(json: &str) -> Result<RawProcess, DiscoveryError> {
    let json = json.trim();
    if json.is_empty() {
        return Err(DiscoveryError::InvalidInput("empty output".to_string()));
    }

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| DiscoveryError::InvalidInput(e.to_string()))?;
    if !value.is_object() {
        return Err(DiscoveryError::InvalidInput(format!("expected a JSON object, got {}", value)));
    }
    let process =
        StructuredProcess::deserialize(value).map_err(|e| DiscoveryError::InvalidInput(e.to_string()))?;

    let pid = process
        .process_id
        .and_then(|id| u32::try_from(id).ok())
        .filter(|id| *id != 0)
        .ok_or(DiscoveryError::MissingPid)?;

    Ok(RawProcess {
        pid,
        command_line: process.command_line.unwrap_or_default(),
    })
}

/// Structured listing straight to connection parameters.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub fn parse_process_info_json(json: &str, token_min_len: usize) -> Result<ProcessInfo, DiscoveryError> {
    let raw = parse_structured_listing(json)?;
    let params = parse_command_line(&raw.command_line, token_min_len)?;
    Ok(ProcessInfo::new(raw.pid, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TOKEN_MIN_LEN;

    fn parse(cmd: &str) -> Result<ConnectionParams, DiscoveryError> {
        parse_command_line(cmd, DEFAULT_TOKEN_MIN_LEN)
    }

    #[test]
    fn test_ps_aux_row_with_spaces() {
        let cmd = "user 12345 0.5 1.2 12345 67890 ? Ssl Dec29 10:00 /path/to/language_server --extension_server_port 42100 --csrf_token abc123def456ghi789xyz12";
        let params = parse(cmd).unwrap();
        assert_eq!(params.connect_port, 42100);
        assert_eq!(params.csrf_token, "abc123def456ghi789xyz12");
    }

    #[test]
    fn test_equals_form() {
        let cmd = "/opt/antigravity/language_server --extension_server_port=55000 --csrf_token=my-csrf-token-12345678901234567890";
        let params = parse(cmd).unwrap();
        assert_eq!(params.connect_port, 55000);
        assert_eq!(params.csrf_token, "my-csrf-token-12345678901234567890");
    }

    #[test]
    fn test_macos_ps_row() {
        let cmd = "tung             98765   0.0  0.3  4567890  12345   ??  S    10:30AM   0:05.23 /Applications/Antigravity.app/Contents/MacOS/language_server --extension_server_port 8080 --csrf_token abcdefghij1234567890abcdefghij12";
        let params = parse(cmd).unwrap();
        assert_eq!(params.connect_port, 8080);
        assert_eq!(params.csrf_token, "abcdefghij1234567890abcdefghij12");
    }

    #[test]
    fn test_trailing_noise() {
        let cmd = "language_server --extension_server_port 9999 --csrf_token token123456789012345678901234 PID=12345";
        let params = parse(cmd).unwrap();
        assert_eq!(params.connect_port, 9999);
        assert_eq!(params.csrf_token, "token123456789012345678901234");
    }

    #[test]
    fn test_quoted_values() {
        let cmd = r#"language_server --extension_server_port "42100" --csrf_token='abc123def456'"#;
        let params = parse(cmd).unwrap();
        assert_eq!(params.connect_port, 42100);
        assert_eq!(params.csrf_token, "abc123def456");
    }

    #[test]
    fn test_mixed_forms_in_any_order() {
        let cmd = "language_server --csrf_token=aaaa-bbbb-cccc --random_seed 7 --extension_server_port 31337";
        let params = parse(cmd).unwrap();
        assert_eq!(params.connect_port, 31337);
        assert_eq!(params.csrf_token, "aaaa-bbbb-cccc");
    }

    #[test]
    fn test_missing_port_and_token() {
        assert!(parse("some random process without relevant args").is_err());
        assert_eq!(parse("").unwrap_err(), DiscoveryError::MissingPort);
    }

    #[test]
    fn test_missing_port_is_distinct() {
        let err = parse("language_server --csrf_token abc123def456ghi789xyz12").unwrap_err();
        assert_eq!(err, DiscoveryError::MissingPort);
    }

    #[test]
    fn test_missing_token_is_distinct() {
        let err = parse("language_server --extension_server_port 42100 --verbose").unwrap_err();
        assert_eq!(err, DiscoveryError::MissingToken);
    }

    #[test]
    fn test_out_of_range_port_is_missing() {
        let err = parse("language_server --extension_server_port 99999 --csrf_token abc").unwrap_err();
        assert_eq!(err, DiscoveryError::MissingPort);
        let err = parse("language_server --extension_server_port 0 --csrf_token abc").unwrap_err();
        assert_eq!(err, DiscoveryError::MissingPort);
    }

    #[test]
    fn test_heuristic_picks_renamed_flag() {
        let cmd = "language_server --extension_server_port 5000 --some_flag abcdefghijklmnopqrstuvwxyz123456";
        let params = parse(cmd).unwrap();
        assert_eq!(params.connect_port, 5000);
        assert_eq!(params.csrf_token, "abcdefghijklmnopqrstuvwxyz123456");
    }

    #[test]
    fn test_exact_flag_wins_over_heuristic() {
        let cmd = "language_server --session_id zzzzzzzzzzzzzzzzzzzzzzzzzzzzzz --extension_server_port 5000 --csrf_token short-tok";
        assert_eq!(extract_token(cmd, 20), Some("short-tok".to_string()));
    }

    #[test]
    fn test_heuristic_rejects_short_values() {
        let cmd = "language_server --extension_server_port 5000 --mode production";
        assert_eq!(extract_token_heuristic(cmd, 20), None);
    }

    #[test]
    fn test_heuristic_threshold_is_configurable() {
        let cmd = "language_server --session abcdefghij12";
        assert_eq!(extract_token_heuristic(cmd, 20), None);
        assert_eq!(extract_token_heuristic(cmd, 12), Some("abcdefghij12".to_string()));
    }

    #[test]
    fn test_heuristic_ignores_port_flag() {
        let cmd = "language_server --extension_server_port 123456789012345678901234";
        assert_eq!(extract_token_heuristic(cmd, 20), None);
    }

    #[test]
    fn test_heuristic_ignores_path_fragments() {
        let cmd = "language_server --app_data_dir antigravityuserdatadirectory/sub --other x";
        assert_eq!(extract_token_heuristic(cmd, 20), None);
    }

    #[test]
    fn test_heuristic_does_not_swallow_next_flag() {
        let cmd = "language_server --enable_lsp --some_flag abcdefghijklmnopqrstuvwxyz123456";
        assert_eq!(
            extract_token_heuristic(cmd, 20),
            Some("abcdefghijklmnopqrstuvwxyz123456".to_string())
        );
    }

    #[test]
    fn test_structured_listing() {
        let json = r#"{"ProcessId":12345,"CommandLine":"C:\\path\\language_server.exe --extension_server_port 42100 --csrf_token abc123def456"}"#;
        let info = parse_process_info_json(json, DEFAULT_TOKEN_MIN_LEN).unwrap();
        assert_eq!(info.pid, 12345);
        assert_eq!(info.connect_port, 42100);
        assert_eq!(info.http_port, 42100);
        assert_eq!(info.csrf_token, "abc123def456");
    }

    #[test]
    fn test_structured_listing_with_quoted_path() {
        let json = r#"{"ProcessId":99999,"CommandLine":"\"C:\\Program Files\\Antigravity\\language_server.exe\" --extension_server_port 55555 --csrf_token my-long-csrf-token-here"}"#;
        let info = parse_process_info_json(json, DEFAULT_TOKEN_MIN_LEN).unwrap();
        assert_eq!(info.pid, 99999);
        assert_eq!(info.http_port, 55555);
        assert_eq!(info.csrf_token, "my-long-csrf-token-here");
    }

    #[test]
    fn test_structured_listing_invalid_input() {
        for input in ["", "   ", "null", "not valid json", "[1,2]", "42"] {
            let err = parse_process_info_json(input, DEFAULT_TOKEN_MIN_LEN).unwrap_err();
            assert!(matches!(err, DiscoveryError::InvalidInput(_)), "input {:?} gave {:?}", input, err);
        }
    }

    #[test]
    fn test_structured_listing_missing_pid() {
        let err = parse_process_info_json(r#"{"ProcessId":0,"CommandLine":""}"#, DEFAULT_TOKEN_MIN_LEN).unwrap_err();
        assert_eq!(err, DiscoveryError::MissingPid);

        let err = parse_process_info_json(
            r#"{"CommandLine":"language_server --extension_server_port 1 --csrf_token a"}"#,
            DEFAULT_TOKEN_MIN_LEN,
        )
        .unwrap_err();
        assert_eq!(err, DiscoveryError::MissingPid);
    }

    #[test]
    fn test_structured_listing_without_args() {
        let err = parse_process_info_json(r#"{"ProcessId":42,"CommandLine":null}"#, DEFAULT_TOKEN_MIN_LEN).unwrap_err();
        assert_eq!(err, DiscoveryError::MissingPort);
    }

    #[test]
    fn test_empty_csrf_flag_does_not_swallow_next_flag() {
        let cmd = "language_server --extension_server_port 42100 --csrf_token --random_seed 7";
        assert_eq!(extract_csrf_token(cmd), None);
        assert_eq!(parse(cmd), Err(DiscoveryError::MissingToken));

        let cmd = "language_server --extension_server_port 42100 --csrf_token --api_key abcdef0123456789abcdef01";
        assert_eq!(parse(cmd).unwrap().csrf_token, "abcdef0123456789abcdef01");
    }
}
