//! Capability verdict for the conversion paths

use super::result::StrategyKind;

/// Snapshot of what the host can do, computed once and cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityVerdict {
    pub shared_memory_supported: bool,
    pub secure_context: bool,
    pub recorder_api_supported: bool,
    pub transcoder_loaded: bool,
    pub native_pipeline_supported: bool,
}

impl CapabilityVerdict {
    /// Transcoder path prerequisites, including a successful load
    pub fn transcoder_usable(&self) -> bool {
        self.recorder_api_supported
            && self.shared_memory_supported
            && self.secure_context
            && self.transcoder_loaded
    }

    /// Native pipeline prerequisites
    pub fn native_usable(&self) -> bool {
        self.recorder_api_supported && self.native_pipeline_supported
    }

    /// Strategy to use, transcoder first
    pub fn preferred_strategy(&self, native_fallback: bool) -> Option<StrategyKind> {
        if self.transcoder_usable() {
            Some(StrategyKind::Transcoder)
        } else if native_fallback && self.native_usable() {
            Some(StrategyKind::Native)
        } else {
            None
        }
    }
}
