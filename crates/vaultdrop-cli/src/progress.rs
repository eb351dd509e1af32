//! Transfer progress display with progress bars.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vaultdrop_transfer::{TransferProgress, TransferStatus};

const BAR_TEMPLATE: &str = "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Render transfer snapshots from `rx` on a progress bar until the transfer
/// finishes or the sender side of the channel is dropped.
pub fn spawn_progress_bar(label: String, mut rx: watch::Receiver<TransferProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(label);

        loop {
            let snapshot = *rx.borrow_and_update();
            bar.set_length(snapshot.bytes_total);
            bar.set_position(snapshot.bytes_done);

            match snapshot.status {
                TransferStatus::Completed => {
                    bar.finish_with_message("Transfer complete!");
                    return;
                }
                TransferStatus::Failed => {
                    bar.abandon_with_message("Transfer failed");
                    return;
                }
                TransferStatus::Pending | TransferStatus::Active => {}
            }

            if rx.changed().await.is_err() {
                bar.abandon();
                return;
            }
        }
    })
}

/// Wait for a progress bar task to stop.
///
/// Returns `false` and logs if the task panicked or was cancelled.
pub async fn join_progress_bar(bar: JoinHandle<()>) -> bool {
    match bar.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("progress display failed: {e}");
            false
        }
    }
}

/// Format bytes in human-readable format
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{size:.2} {}", UNITS[unit_idx])
}

/// Format duration in human-readable format
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
