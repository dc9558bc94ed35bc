//! Process hygiene: forceful termination of stale host applications.
//!
//! Both host applications expose single-instance, file-locking automation
//! surfaces. A leftover instance from a crashed run holds the source files
//! open and makes the next run fail in opaque ways, so a run is preceded by
//! killing any stale processes by image name.
//!
//! Two policies matter here:
//!
//! * A target that is **not running** is success — the precondition "no stale
//!   instance" already holds.
//! * A kill that genuinely fails (permissions, broken tool) is reported as
//!   [`ConvertError::Hygiene`] but is non-fatal: the caller decides whether
//!   to attempt the conversion anyway.

use crate::config::DocumentFamily;
use crate::error::ConvertError;
use std::process::Command;
use tracing::{debug, info};

/// Image name of the diagram application's process.
pub const DIAGRAM_PROCESS: &str = "visio.exe";

#[cfg(windows)]
const KILL_TOOL: &str = "taskkill";
#[cfg(not(windows))]
const KILL_TOOL: &str = "pkill";

/// Exit code the kill tool uses for "no such process".
#[cfg(windows)]
const NOT_RUNNING: i32 = 128;
#[cfg(not(windows))]
const NOT_RUNNING: i32 = 1;

#[cfg(windows)]
fn kill_command(process: &str) -> Command {
    let mut cmd = Command::new(KILL_TOOL);
    cmd.args(["/F", "/IM", process]);
    cmd
}

#[cfg(not(windows))]
fn kill_command(process: &str) -> Command {
    let mut cmd = Command::new(KILL_TOOL);
    cmd.arg("-x").arg(process);
    cmd
}

/// Forcefully terminate every process with the given image name.
///
/// Returns `Ok(())` when the processes were killed *or* none were running.
pub fn terminate(process: &str) -> Result<(), ConvertError> {
    let output = kill_command(process)
        .output()
        .map_err(|e| ConvertError::Hygiene {
            process: process.to_string(),
            detail: format!("failed to run {KILL_TOOL}: {e}"),
        })?;

    match output.status.code() {
        Some(0) => {
            info!(%process, "terminated stale process");
            Ok(())
        }
        Some(code) if code == NOT_RUNNING => {
            debug!(%process, "not running; nothing to terminate");
            Ok(())
        }
        code => Err(ConvertError::Hygiene {
            process: process.to_string(),
            detail: format!(
                "{KILL_TOOL} exited with {code:?}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }),
    }
}

/// Kill the diagram application and every process name of the chosen
/// document-application family.
///
/// Failures are collected, not propagated; an empty vector means a clean
/// slate. Callers typically log each entry and proceed.
pub fn pre_run(family: DocumentFamily) -> Vec<ConvertError> {
    let mut targets = vec![DIAGRAM_PROCESS];
    targets.extend_from_slice(family.process_names());
    terminate_all(&targets)
}

/// Terminate each named process, collecting failures instead of stopping at
/// the first.
fn terminate_all(processes: &[&str]) -> Vec<ConvertError> {
    let mut failures = Vec::new();
    for process in processes {
        if let Err(e) = terminate(process) {
            failures.push(e);
        }
    }
    failures
}
