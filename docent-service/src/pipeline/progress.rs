//! Progress reporting and cancellation checkpoints for pipeline runs.

use crate::error::{ProcessingError, ServiceResult};

/// Receives progress updates from a pipeline run and answers cancellation queries
pub trait ProgressSink: Send + Sync {
    /// Record overall progress (0-100) and a description of the current step
    fn report(&self, progress: u8, step: &str);

    /// Whether the run should stop at its next checkpoint
    fn is_cancelled(&self) -> bool;
}

/// Sink for inline runs that nobody polls and nobody can cancel
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _progress: u8, _step: &str) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

pub(crate) const LOADED_PROGRESS: u8 = 10;
pub(crate) const EXTRACTED_PROGRESS: u8 = 90;
pub(crate) const COMPLETE_PROGRESS: u8 = 100;

/// Stop the run if cancellation was requested.
pub(crate) fn checkpoint(sink: &dyn ProgressSink) -> ServiceResult<()> {
    if sink.is_cancelled() {
        Err(ProcessingError::Cancelled.into())
    } else {
        Ok(())
    }
}

/// Progress within the 10-90 extraction band.
///
/// Each page gets an equal share. Within page `page_index` (0-based) the share
/// is split into `units_total` units: one for the page text and one per image.
/// `units_done` counts finished units on that page.
pub(crate) fn page_progress(
    page_index: usize,
    page_count: usize,
    units_done: usize,
    units_total: usize,
) -> u8 {
    if page_count == 0 || units_total == 0 {
        return EXTRACTED_PROGRESS;
    }

    let band = (EXTRACTED_PROGRESS - LOADED_PROGRESS) as usize;
    let done = page_index * units_total + units_done.min(units_total);
    let total = page_count * units_total;
    LOADED_PROGRESS + (band * done / total) as u8
}
