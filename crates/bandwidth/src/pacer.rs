use std::num::NonZeroU64;
use std::thread;
use std::time::{Duration, Instant};

/// Largest chunk a throttled copy loop should move between sleeps.
const MAX_THROTTLED_CHUNK: u64 = 32 * 1024;

/// Sleep-based pacing for a single transfer.
///
/// The pacer owns the task's start instant; callers report the running byte
/// total before each write and the pacer sleeps long enough that elapsed
/// wall-clock never lags the ideal transfer time at the configured rate.
#[derive(Debug)]
pub struct Pacer {
    limit: NonZeroU64,
    started: Instant,
}

impl Pacer {
    /// Creates a pacer for one task, starting its clock now.
    #[must_use]
    pub fn new(limit: NonZeroU64) -> Self {
        Self {
            limit,
            started: Instant::now(),
        }
    }

    /// Returns the configured limit in bytes per second.
    #[must_use]
    pub const fn limit(&self) -> NonZeroU64 {
        self.limit
    }

    /// Size of the read/write buffer a throttled loop should use.
    ///
    /// Capped at 32 KiB and never larger than one second's worth of budget,
    /// with a floor of a single byte so tiny limits still make progress.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        let len = MAX_THROTTLED_CHUNK.min(self.limit.get()).max(1);
        usize::try_from(len).unwrap_or(1)
    }

    /// Sleeps off the difference between the ideal and actual elapsed time.
    ///
    /// `written` is the byte total *after* the upcoming write, so the sleep
    /// lands before the bytes hit the destination.
    pub fn pace(&self, written: u64) {
        let deficit = self.deficit(written, self.started.elapsed());
        if !deficit.is_zero() {
            thread::sleep(deficit);
        }
    }

    fn deficit(&self, written: u64, elapsed: Duration) -> Duration {
        let expected = Duration::from_secs_f64(written as f64 / self.limit.get() as f64);
        expected.saturating_sub(elapsed)
    }
}
