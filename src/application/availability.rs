//! Conversion availability gate
//!
//! Probes the host once, caches the verdict, and answers whether any
//! conversion path can run.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::conversion::{CapabilityVerdict, StrategyKind};

use super::conversion::SharedTranscoder;
use super::ports::{NativeCodec, PlatformProbe};

/// Cached capability check for the conversion paths
pub struct AvailabilityGate {
    platform: Arc<dyn PlatformProbe>,
    engine: Arc<SharedTranscoder>,
    codec: Option<Arc<dyn NativeCodec>>,
    native_fallback: bool,
    cached: Mutex<Option<CapabilityVerdict>>,
}

impl AvailabilityGate {
    pub fn new(
        platform: Arc<dyn PlatformProbe>,
        engine: Arc<SharedTranscoder>,
        codec: Option<Arc<dyn NativeCodec>>,
        native_fallback: bool,
    ) -> Self {
        Self {
            platform,
            engine,
            codec,
            native_fallback,
            cached: Mutex::new(None),
        }
    }

    /// Whether any conversion strategy is usable.
    ///
    /// The first call probes the host; concurrent callers wait for that
    /// probe instead of starting their own.
    pub async fn check_support(&self) -> bool {
        self.strategy().await.is_some()
    }

    /// Strategy a conversion would use right now
    pub async fn strategy(&self) -> Option<StrategyKind> {
        self.verdict().await.preferred_strategy(self.native_fallback)
    }

    /// The cached verdict, probing on first use
    pub async fn verdict(&self) -> CapabilityVerdict {
        let mut cached = self.cached.lock().await;
        if let Some(verdict) = *cached {
            return verdict;
        }
        let verdict = self.probe().await;
        *cached = Some(verdict);
        verdict
    }

    /// Drop the cached verdict and probe again
    pub async fn recheck(&self) -> CapabilityVerdict {
        let mut cached = self.cached.lock().await;
        let verdict = self.probe().await;
        *cached = Some(verdict);
        verdict
    }

    async fn probe(&self) -> CapabilityVerdict {
        let shared_memory_supported = self.platform.shared_memory_supported();
        let secure_context = self.platform.secure_context();
        let recorder_api_supported = self.platform.recorder_api_supported();

        let transcoder_loaded = if shared_memory_supported && secure_context {
            match self.engine.get().await {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "transcoder unavailable");
                    false
                }
            }
        } else {
            debug!(
                shared_memory_supported,
                secure_context, "skipping transcoder load"
            );
            false
        };

        let native_pipeline_supported = self
            .codec
            .as_ref()
            .map(|c| c.is_supported())
            .unwrap_or(false);

        let verdict = CapabilityVerdict {
            shared_memory_supported,
            secure_context,
            recorder_api_supported,
            transcoder_loaded,
            native_pipeline_supported,
        };
        info!(
            ?verdict,
            strategy = ?verdict.preferred_strategy(self.native_fallback),
            "conversion capabilities probed"
        );
        verdict
    }
}
