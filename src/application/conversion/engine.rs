//! Process-wide transcoder handle

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::application::ports::{EngineError, Transcoder, TranscoderLoader};

/// Lazily loaded transcoder shared by every conversion.
///
/// Concurrent first callers wait on a single load. A failed load leaves
/// the cell empty so the next caller tries again.
pub struct SharedTranscoder {
    loader: Arc<dyn TranscoderLoader>,
    engine: OnceCell<Arc<dyn Transcoder>>,
}

impl SharedTranscoder {
    pub fn new(loader: Arc<dyn TranscoderLoader>) -> Self {
        Self {
            loader,
            engine: OnceCell::new(),
        }
    }

    /// The loaded engine, loading it on first use
    pub async fn get(&self) -> Result<Arc<dyn Transcoder>, EngineError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                match self.loader.load().await {
                    Ok(engine) => {
                        info!(engine = %engine.describe(), "transcoder loaded");
                        Ok(engine)
                    }
                    Err(e) => {
                        warn!(error = %e, "transcoder load failed");
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }
}
