//! Contains logic for discovering the application the user is currently working in.
//! [GenericWindowManager] is the main artifact of this module that abstracts
//! the operations.

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::path::Path;

use anyhow::Result;

/// Intended to serve as a contract windows, linux and macos systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowManager: Send {
    /// Name of the application owning the focused window, for example `firefox` or `Code`.
    fn get_foreground_app(&mut self) -> Result<String>;
}

/// Serves as a cross-compatible WindowManager implementation.
pub struct GenericWindowManager {
    inner: Box<dyn WindowManager>,
}

impl GenericWindowManager {
    /// Fails when the binary was built without a backend for the current platform.
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowManager;
                Ok(Self {
                    inner: Box::new(WindowsWindowManager::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowManager;
                Ok(Self {
                    inner: Box::new(LinuxWindowManager::new()?),
                })
            }
            else if #[cfg(target_os = "macos")] {
                Ok(Self {
                    inner: Box::new(macos::MacWindowManager),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window manager was specified, build with the `x11` or `win` feature"
                ))
            }
        }
    }
}

impl WindowManager for GenericWindowManager {
    fn get_foreground_app(&mut self) -> Result<String> {
        self.inner.get_foreground_app()
    }
}

/// Turns an executable path into an application name: `/usr/bin/firefox` becomes `firefox`,
/// `C:\Programs\Code.exe` becomes `Code`.
pub fn app_name_from_path(value: &str) -> String {
    let path = Path::new(value);
    let is_exe = path
        .extension()
        .is_some_and(|v| v.eq_ignore_ascii_case("exe"));
    let name = if is_exe {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::app_name_from_path;

    #[test]
    fn app_names_from_paths() {
        assert_eq!(app_name_from_path("/usr/bin/firefox"), "firefox");
        assert_eq!(app_name_from_path("/opt/Code.exe"), "Code");
        assert_eq!(app_name_from_path("/opt/org.app.Name"), "org.app.Name");
        assert_eq!(app_name_from_path("nvim"), "nvim");
        assert_eq!(app_name_from_path(""), "");
    }
}
