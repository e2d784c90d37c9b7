// Headless frame loop
//
// Drives the script against in-memory surfaces for a fixed number of
// frames. Used by `--headless`, the integration tests and the benches.

use crate::error::ConsoleError;
use crate::script::{report_script_error, ScriptHost};
use std::thread;
use std::time::Duration;
use tracing::info;

/// Run up to `frames` frames, sleeping `pace` between them when given
///
/// Stops early when the draw hook fails (the error is reported) or when
/// every device has been released. Returns the number of frames presented.
///
/// # Errors
/// Presentation failures are returned unchanged.
pub fn run_headless(
    host: &ScriptHost,
    frames: u64,
    pace: Option<Duration>,
) -> Result<u64, ConsoleError> {
    let mut presented = 0;

    while presented < frames {
        if host.console().borrow().registry().is_empty() {
            info!("no devices left, stopping");
            break;
        }

        if let Err(err) = host.update() {
            report_script_error(&err);
            break;
        }
        host.present()?;
        presented += 1;

        if let Some(pace) = pace {
            thread::sleep(pace);
        }
    }

    info!(frames = presented, "headless run finished");
    Ok(presented)
}
