//! Human-readable error descriptions and structured JSON error formatting.

use latency_core::error::{BuildError, LatencyError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid analysis settings ({msg}).\nLikely causes: Out-of-range [analysis] values in the TOML or on the command line.\nHow to fix: Keep threshold in [0, 1], hold_min_s > 0, hold_max_s >= hold_min_s and capacity >= 1."
        );
    }

    if let Some(le) = err.downcast_ref::<LatencyError>() {
        return match le {
            LatencyError::Timeout => "What happened: The sensor did not deliver a frame in time.\nLikely causes: Capture pipeline stalled, wrong frame size, or read timeout too low.\nHow to fix: Check the frame source and raise sensor.read_timeout_ms in the config.".to_string(),
            LatencyError::Sink(detail) => format!(
                "What happened: Writing the sample record failed ({detail}).\nLikely causes: Disk full, file removed, or no write permission.\nHow to fix: Choose another --record path or free up space, then rerun."
            ),
            LatencyError::Config(detail) if detail.contains("replay CSV must have headers") => {
                "Invalid headers in replay CSV. Expected 't_s,level'.".to_string()
            }
            LatencyError::Config(detail) => format!(
                "What happened: Configuration is invalid ({detail}).\nLikely causes: Missing or out-of-range values in the TOML, or an unreadable replay file.\nHow to fix: Edit the named key or file and rerun; `latency self-check` validates without measuring."
            ),
            LatencyError::Hardware(detail) | LatencyError::HardwareFault(detail) => format!(
                "What happened: The sensor or screen failed ({detail}).\nLikely causes: Wrong sensor.raw_path, capture process not running, or terminal unavailable.\nHow to fix: Verify the frame source exists and is readable, or use --screen null."
            ),
            LatencyError::Io(detail) => format!(
                "What happened: I/O error ({detail}).\nLikely causes: Missing file or insufficient permissions.\nHow to fix: Check the paths given on the command line and in the config."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();

    if lower.contains("replay csv must have headers") {
        return "Invalid headers in replay CSV. Expected 't_s,level'.".to_string();
    }

    if lower.contains("read config") || lower.contains("parse config") {
        return format!(
            "What happened: The config file could not be loaded.\nLikely causes: Wrong --config path or TOML syntax error.\nHow to fix: Check the file; every section is optional, so an empty file is valid. Detail: {err:#}"
        );
    }

    if ["analysis.", "sensor.", "sim.", "runner.", "logging."]
        .iter()
        .any(|k| lower.contains(k))
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range value for the named key.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 config, 4 sensor/screen, 5 record/io, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<LatencyError>() {
        Some(LatencyError::Config(_)) => 3,
        Some(
            LatencyError::Hardware(_) | LatencyError::HardwareFault(_) | LatencyError::Timeout,
        ) => 4,
        Some(LatencyError::Sink(_) | LatencyError::Io(_)) => 5,
        None => 1,
    }
}

/// Short stable name for the JSON `reason` field.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<LatencyError>() {
        Some(LatencyError::Config(_)) => "InvalidConfig",
        Some(LatencyError::Hardware(_)) => "Hardware",
        Some(LatencyError::HardwareFault(_)) => "HardwareFault",
        Some(LatencyError::Timeout) => "Timeout",
        Some(LatencyError::Sink(_)) => "Sink",
        Some(LatencyError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "event": "error",
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LatencyError::Config("x".into()), 3, "InvalidConfig")]
    #[case(LatencyError::Timeout, 4, "Timeout")]
    #[case(LatencyError::Hardware("x".into()), 4, "Hardware")]
    #[case(LatencyError::Sink("x".into()), 5, "Sink")]
    #[case(LatencyError::Io("x".into()), 5, "Io")]
    fn exit_codes_are_stable(#[case] e: LatencyError, #[case] code: i32, #[case] name: &str) {
        let report = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&report), code);
        assert_eq!(reason_name(&report), name);
    }

    #[test]
    fn wrapped_errors_keep_their_code() {
        use eyre::WrapErr;
        let r: Result<(), LatencyError> = Err(LatencyError::Sink("disk full".into()));
        let report = r.wrap_err("flushing record sink").unwrap_err();
        assert_eq!(exit_code_for_error(&report), 5);
    }

    #[test]
    fn build_error_is_humanized() {
        let report = eyre::Report::new(BuildError::InvalidConfig("hold_min must be > 0"));
        let text = humanize(&report);
        assert!(text.starts_with("What happened: Invalid analysis settings"));
        assert!(text.contains("hold_min must be > 0"));
        assert_eq!(exit_code_for_error(&report), 3);
    }

    #[test]
    fn replay_header_message() {
        let report = eyre::eyre!("replay CSV must have headers 't_s,level', got: a,b");
        assert_eq!(
            humanize(&report),
            "Invalid headers in replay CSV. Expected 't_s,level'."
        );
    }

    #[test]
    fn error_json_shape() {
        let report = eyre::Report::new(LatencyError::Timeout);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["event"], "error");
        assert_eq!(v["reason"], "Timeout");
        assert_eq!(v["exit_code"], 4);
        assert!(v["message"].as_str().unwrap().contains("What happened"));
    }
}
