use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

/// One progress notification. `percent` is clamped to `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub status: String,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Sending half of the progress stream.
///
/// A reporter without a channel only logs. Sending never blocks and a dropped
/// receiver is ignored, so reporting can't fail an installation.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, status: impl Into<String>, percent: u32) {
        self.send(status.into(), percent, None);
    }

    pub fn emit_with(&self, status: impl Into<String>, percent: u32, details: impl Into<String>) {
        self.send(status.into(), percent, Some(details.into()));
    }

    fn send(&self, status: String, percent: u32, details: Option<String>) {
        let percent = percent.min(100) as u8;
        match &details {
            Some(d) => info!("[{:>3}%] {} ({})", percent, status, d),
            None => info!("[{:>3}%] {}", percent, status),
        }
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                status,
                percent,
                details,
            });
        }
    }
}

/// Map `done / total` into the `[from, to]` percent window.
pub fn scaled(from: u32, to: u32, done: usize, total: usize) -> u32 {
    if total == 0 {
        return to;
    }
    let span = to.saturating_sub(from) as usize;
    from + (span * done.min(total) / total) as u32
}
