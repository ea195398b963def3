use crossbeam_channel::Sender;

use task::Task;

use crate::error::ScanError;

/// Destination for the planner's ordered task stream.
///
/// The planner never closes its sink; the owner does, which is what lets a
/// channel-backed sink signal completion to downstream consumers only after
/// `scan` has returned.
pub trait TaskSink {
    /// Hands one task to the consumer, blocking if it applies backpressure.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::SinkClosed`] when the consumer is gone.
    fn accept(&mut self, task: Task) -> Result<(), ScanError>;
}

impl TaskSink for Sender<Task> {
    fn accept(&mut self, task: Task) -> Result<(), ScanError> {
        self.send(task).map_err(|_| ScanError::SinkClosed)
    }
}

/// In-memory sink used by listings and tests.
impl TaskSink for Vec<Task> {
    fn accept(&mut self, task: Task) -> Result<(), ScanError> {
        self.push(task);
        Ok(())
    }
}
