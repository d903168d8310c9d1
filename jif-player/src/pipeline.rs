//! Background frame processing
//!
//! A job composites every sub-frame, rasterizes each snapshot for the
//! requested glyph grid, and reports back over a channel. Composited
//! snapshots do not depend on terminal size, so the first job keeps them for
//! every later job to reuse.

use crate::controller::Message;
use crate::{Error, Result};
use crossbeam_channel::Sender;
use image::RgbaImage;
use jif_core::FrameSource;
use jif_render::{halfblock, FrameCompositor};
use log::{debug, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Capacity of the channel carrying worker messages to the host loop
pub const CHANNEL_CAPACITY: usize = 100;

/// Shared handle to the decoded animation and its composited snapshots
#[derive(Debug, Clone)]
pub struct Pipeline {
    source: Arc<FrameSource>,
    composited: Arc<OnceLock<Vec<RgbaImage>>>,
}

impl Pipeline {
    pub fn new(source: FrameSource) -> Self {
        Self {
            source: Arc::new(source),
            composited: Arc::new(OnceLock::new()),
        }
    }

    pub fn source(&self) -> &FrameSource {
        &self.source
    }

    /// Per-frame delays in hundredths of a second
    pub fn delays(&self) -> Vec<u16> {
        self.source.frames().iter().map(|f| f.delay).collect()
    }

    /// Runs `job` on a new worker thread. Progress for frame 0 and the final
    /// frame list are delivered through `tx`.
    pub fn spawn(
        &self,
        job: u64,
        cell_width: u32,
        cell_height: u32,
        tx: Sender<Message>,
    ) -> Result<JoinHandle<()>> {
        let pipeline = self.clone();
        thread::Builder::new()
            .name(format!("jif-job-{job}"))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    pipeline.process(job, cell_width, cell_height, &tx)
                }));
                if tx.send(completion(job, outcome)).is_err() {
                    debug!("Host loop gone, dropping result of job {}", job);
                }
            })
            .map_err(|source| Error::Spawn {
                name: "pipeline",
                source,
            })
    }

    /// Rasterizes every frame on the calling thread
    pub fn process(
        &self,
        job: u64,
        cell_width: u32,
        cell_height: u32,
        tx: &Sender<Message>,
    ) -> Vec<String> {
        let started = Instant::now();
        let render = |index: usize, snapshot: &RgbaImage| -> String {
            if index > 0 {
                return halfblock::rasterize(snapshot, cell_width, cell_height);
            }
            halfblock::rasterize_with_progress(snapshot, cell_width, cell_height, |progress| {
                // The host only drops the receiver when quitting
                let _ = tx.send(Message::Progress { job, progress });
            })
        };

        let frames = match self.composited.get() {
            Some(snapshots) => snapshots
                .iter()
                .enumerate()
                .map(|(index, snapshot)| render(index, snapshot))
                .collect(),
            None => {
                let mut snapshots = Vec::with_capacity(self.source.len());
                let mut frames = Vec::with_capacity(self.source.len());
                for (index, snapshot) in FrameCompositor::new(self.source.frames()).enumerate() {
                    frames.push(render(index, &snapshot));
                    snapshots.push(snapshot);
                }
                if self.composited.set(snapshots).is_err() {
                    warn!("Composited frames were already cached");
                }
                frames
            }
        };

        debug!(
            "Job {} rasterized {} frames into {}x{} cells in {:.1?}",
            job,
            frames.len(),
            cell_width,
            cell_height,
            started.elapsed()
        );
        frames
    }
}

/// Final message for a job, turning a worker panic into a failure report
fn completion(job: u64, outcome: thread::Result<Vec<String>>) -> Message {
    match outcome {
        Ok(frames) => Message::ProcessingComplete { job, frames },
        Err(payload) => Message::ProcessingFailed {
            job,
            reason: panic_reason(payload.as_ref()),
        },
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        reason.to_string()
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.clone()
    } else {
        "worker panicked".to_string()
    }
}
