//! Host capability probe

use std::path::PathBuf;

use tracing::debug;

use crate::application::ports::PlatformProbe;

/// Checks the local host for the primitives the conversion paths need
pub struct HostPlatform {
    scratch_root: PathBuf,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self {
            scratch_root: std::env::temp_dir(),
        }
    }

    /// Probe scratch directories under `root` instead of the system temp dir
    pub fn with_scratch_root(root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: root.into(),
        }
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformProbe for HostPlatform {
    fn shared_memory_supported(&self) -> bool {
        match tempfile::tempdir_in(&self.scratch_root) {
            Ok(_) => true,
            Err(e) => {
                debug!(root = %self.scratch_root.display(), error = %e, "scratch directory unavailable");
                false
            }
        }
    }

    #[cfg(unix)]
    fn secure_context(&self) -> bool {
        use std::os::unix::fs::PermissionsExt;

        let Ok(dir) = tempfile::tempdir_in(&self.scratch_root) else {
            return false;
        };
        match std::fs::metadata(dir.path()) {
            Ok(meta) => meta.permissions().mode() & 0o077 == 0,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    fn secure_context(&self) -> bool {
        self.shared_memory_supported()
    }

    fn recorder_api_supported(&self) -> bool {
        !cpal::available_hosts().is_empty()
    }
}
