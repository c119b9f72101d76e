//! indicatif progress bars driven by downloader events

use std::collections::HashMap;

use album_dl::{Event, MessageId};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Background task turning [`Event`]s into one bar per active transfer
pub struct ProgressRenderer {
    done: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressRenderer {
    /// Start rendering events from `events`
    pub fn spawn(mut events: Receiver<Event>) -> Self {
        let done = CancellationToken::new();
        let stop = done.clone();
        let handle = tokio::spawn(async move {
            let mut bars = Bars::new();
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => bars.apply(event),
                        Err(RecvError::Lagged(missed)) => {
                            tracing::debug!(missed, "Progress renderer lagged behind");
                        }
                        Err(RecvError::Closed) => return,
                    },
                }
            }
            // Drain whatever was sent before the run finished
            loop {
                match events.try_recv() {
                    Ok(event) => bars.apply(event),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        });
        Self { done, handle }
    }

    /// Render remaining events and stop
    pub async fn finish(self) {
        self.done.cancel();
        self.handle.await.ok();
    }
}

struct Bars {
    mp: MultiProgress,
    style: ProgressStyle,
    active: HashMap<MessageId, ProgressBar>,
}

impl Bars {
    fn new() -> Self {
        let style = ProgressStyle::with_template(
            "{prefix:>24.dim} [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        Self {
            mp: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
            style,
            active: HashMap::new(),
        }
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::GroupStarted { folder, files } => {
                self.mp
                    .println(format!("Processing group: {} ({files} files)", folder.display()))
                    .ok();
            }
            Event::TransferStarted {
                id,
                filename,
                total_bytes,
            } => {
                let bar = self.mp.add(ProgressBar::new(total_bytes.unwrap_or(0)));
                bar.set_style(self.style.clone());
                bar.set_prefix(filename);
                self.active.insert(id, bar);
            }
            Event::TransferProgress {
                id,
                bytes_done,
                total_bytes,
            } => {
                if let Some(bar) = self.active.get(&id) {
                    if let Some(total) = total_bytes {
                        bar.set_length(total);
                    }
                    bar.set_position(bytes_done);
                }
            }
            Event::TransferRetrying { id, attempt, error } => {
                if let Some(bar) = self.active.get(&id) {
                    bar.set_position(0);
                    bar.set_message(format!("retry after attempt {attempt}: {error}"));
                }
            }
            Event::TransferComplete { id, path, .. } => {
                if let Some(bar) = self.active.remove(&id) {
                    bar.finish_and_clear();
                }
                self.mp.println(format!("Saved {}", path.display())).ok();
            }
            Event::TransferSkipped { path, .. } => {
                self.mp
                    .println(format!("Skipping {} (already complete)", path.display()))
                    .ok();
            }
            Event::TransferFailed { id, error } => {
                if let Some(bar) = self.active.remove(&id) {
                    bar.abandon_with_message(format!("failed: {error}"));
                } else {
                    self.mp.println(format!("Message {id} failed: {error}")).ok();
                }
            }
            Event::GroupSettled {
                folder,
                downloaded,
                skipped,
                failed,
            } => {
                self.mp
                    .println(format!(
                        "Finished {}: {downloaded} downloaded, {skipped} skipped, {failed} failed",
                        folder.display()
                    ))
                    .ok();
            }
        }
    }
}
