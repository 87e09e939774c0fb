//! Ctrl-C handling for an in-flight recording

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

/// Background task waiting for the first interrupt.
///
/// The task is aborted when the listener is dropped, so an interrupt after
/// the recording finished falls through to the default handler.
pub struct InterruptListener {
    fired: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl InterruptListener {
    /// Start listening and run `on_interrupt` once the first interrupt arrives
    pub fn spawn<F>(on_interrupt: F) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let mut interrupt = interrupt_stream()?;

        let task = tokio::spawn(async move {
            if interrupt.next().await {
                info!("interrupt received");
                flag.store(true, Ordering::SeqCst);
                on_interrupt();
            }
        });

        Ok(Self { fired, task })
    }

    /// Whether the interrupt already arrived
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(unix)]
struct InterruptStream(tokio::signal::unix::Signal);

#[cfg(unix)]
fn interrupt_stream() -> std::io::Result<InterruptStream> {
    use tokio::signal::unix::{signal, SignalKind};
    Ok(InterruptStream(signal(SignalKind::interrupt())?))
}

#[cfg(unix)]
impl InterruptStream {
    async fn next(&mut self) -> bool {
        self.0.recv().await.is_some()
    }
}

#[cfg(not(unix))]
struct InterruptStream;

#[cfg(not(unix))]
fn interrupt_stream() -> std::io::Result<InterruptStream> {
    Ok(InterruptStream)
}

#[cfg(not(unix))]
impl InterruptStream {
    async fn next(&mut self) -> bool {
        tokio::signal::ctrl_c().await.is_ok()
    }
}
