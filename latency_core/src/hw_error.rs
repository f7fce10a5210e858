//! Maps `Box<dyn Error>` from trait boundaries to typed `LatencyError`.
//!
//! The traits in `latency_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `latency_hardware::error::HwError` downcasting.

use crate::error::LatencyError;

/// Map a trait-boundary error to a typed `LatencyError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> LatencyError {
    #[cfg(feature = "hardware-errors")]
    {
        use latency_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => LatencyError::Timeout,
                HwError::Io(io) => LatencyError::Io(io.to_string()),
                other => LatencyError::HardwareFault(other.to_string()),
            };
        }
    }
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        if io.kind() == std::io::ErrorKind::TimedOut {
            return LatencyError::Timeout;
        }
        return LatencyError::Io(io.to_string());
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        LatencyError::Timeout
    } else {
        LatencyError::Hardware(s)
    }
}
