use std::process::Command;

use anyhow::{anyhow, bail, Result};
use tracing::instrument;

use super::WindowManager;

const FRONTMOST_APP_SCRIPT: &str =
    r#"tell application "System Events" to get name of first application process whose frontmost is true"#;

/// Asks System Events for the frontmost application. Requires the accessibility permission for
/// the terminal or the daemon binary.
pub struct MacWindowManager;

impl WindowManager for MacWindowManager {
    #[instrument(skip(self))]
    fn get_foreground_app(&mut self) -> Result<String> {
        let output = Command::new("osascript")
            .args(["-e", FRONTMOST_APP_SCRIPT])
            .output()?;
        if !output.status.success() {
            return Err(anyhow!(
                "osascript failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if name.is_empty() {
            bail!("osascript returned no application name");
        }
        Ok(name)
    }
}
