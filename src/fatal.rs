//! Halt-on-error policy for callers that cannot continue without a log
//!
//! The logger itself only returns errors. Firmware that treats a lost log as
//! unrecoverable can route fatal errors through [`halt`] (or [`or_halt`]) to
//! get the classic behaviour: print a diagnostic, then stop for good.

use crate::error::{LogError, Result};
use tracing::error;

/// Emit the diagnostic for `err`
///
/// Includes the operator hint for faults that need a power cycle and the
/// device error code and data when the device reported one.
pub fn report(err: &LogError) {
    error!("Error: {err}");
    if let Some(hint) = err.remediation() {
        error!("{hint}");
    }
    if let Some(fault) = err.device_fault() {
        error!(code = fault.code, data = fault.data, "{fault}");
    }
}

/// Report `err` and idle forever
pub fn halt(err: &LogError) -> ! {
    report(err);
    loop {
        std::hint::spin_loop();
    }
}

/// Unwrap `result`, halting on fatal errors
///
/// Non-fatal errors are reported and returned as `None`.
pub fn or_halt<T>(result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) if err.is_fatal() => halt(&err),
        Err(err) => {
            report(&err);
            None
        }
    }
}
