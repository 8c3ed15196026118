use std::{
    env,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{anyhow, bail, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::{info, warn};

use crate::config::ConfigArgs;

use super::daemon_path::to_daemon_path;

/// Terminates every process started from the executable at `name`, except the current one and
/// its children.
pub fn kill_previous_servers(name: &Path) -> Result<()> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping daemon {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
        }
    }
    Ok(())
}

/// Stops a running daemon and starts a new one with `config`. The daemon binary detaches by
/// itself, so this only waits for the launcher to exit.
pub fn restart_daemon(config: &ConfigArgs) -> Result<()> {
    let daemon = to_daemon_path(env::current_exe()?);
    if !daemon.exists() {
        bail!("Daemon executable {daemon:?} is missing");
    }
    kill_previous_servers(&daemon)?;

    let status = Command::new(&daemon)
        .args(config.to_command_args())
        .stdin(Stdio::null())
        .status()?;
    if !status.success() {
        bail!("Daemon launcher exited with {status}");
    }
    println!("Tracker daemon started");
    Ok(())
}

pub fn stop_daemon() -> Result<()> {
    kill_previous_servers(&to_daemon_path(env::current_exe()?))?;
    println!("Tracker daemon stopped");
    Ok(())
}

/// Launches the companion desktop application.
pub fn start_companion(name: &str) -> Result<()> {
    println!("Starting {name}...");
    #[cfg(target_os = "macos")]
    let mut command = {
        let mut command = Command::new("open");
        command.args(["-a", name]);
        command
    };
    #[cfg(not(target_os = "macos"))]
    let mut command = Command::new(name);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[allow(clippy::zombie_processes)]
    let _ = command.spawn()?;
    Ok(())
}

/// Asks the companion desktop application to quit. Failures are only reported.
pub fn stop_companion(name: &str) {
    println!("Stopping {name}...");
    #[cfg(target_os = "macos")]
    {
        let script = format!("quit app \"{}\"", name.replace('"', "\\\""));
        match Command::new("osascript").args(["-e", &script]).status() {
            Ok(status) if status.success() => (),
            Ok(status) => warn!("Failed to stop {name}: osascript exited with {status}"),
            Err(e) => warn!("Failed to stop {name}: {e}"),
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        let system = System::new_all();
        let mut stopped = 0;
        for process in system.processes().values() {
            if process.name().to_string_lossy() == name {
                if process.kill_with(Signal::Term).is_none() {
                    process.kill();
                }
                stopped += 1;
            }
        }
        if stopped == 0 {
            warn!("Failed to stop {name}: no such process");
        }
    }
}
