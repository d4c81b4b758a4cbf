use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until `is_ready` returns true, or a timeout expires.
/// Sleeps `poll_interval` between checks to avoid spinning.
pub fn wait_until_with_timeout(
    mut is_ready: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !is_ready() {
        if Instant::now() >= deadline {
            return Err(HwError::WaitTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Wait for a device node to appear, checking every `check_period`.
pub fn wait_for_path(path: &Path, timeout: Duration, check_period: Duration) -> Result<()> {
    wait_until_with_timeout(|| path.exists(), timeout, check_period)
}
