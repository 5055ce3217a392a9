//! Fork/join execution on a fixed worker pool.
//!
//! - [`Scheduler`]: eagerly started pool of OS threads with ordered
//!   fork/join and best-effort cancellation of the rest of a batch.
//! - [`CancelToken`]: explicit cooperative cancellation, passed into every
//!   long-running call instead of relying on thread interruption.
//! - [`TiledReducer`]: data-parallel reduction over a 2-D float grid split
//!   into interlaced row bands.
//!
//! Every batch entry point distinguishes three outcomes: a complete result,
//! an explicit [`Outcome::Cancelled`], or a typed [`JobError`].

mod cancel;
mod scheduler;
mod tiled;

pub use cancel::CancelToken;
pub use scheduler::{JobHandle, JobStatus, Scheduler, SchedulerConfig, SchedulerState};
pub use tiled::{FloatGrid, GridShapeError, ReducerConfig, Reduction, TiledReducer, ValueStats};

use thiserror::Error;

/// Boxed fault raised by a unit of work.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`Scheduler::fork_and_join`] and friends.
#[derive(Debug, Error)]
pub enum JobError {
    /// Cancellation was observed before submission or while waiting on a join.
    ///
    /// This is an expected outcome rather than a fault.
    #[error("job interrupted by cancellation")]
    Interrupted,

    /// A unit of work failed or panicked.
    #[error("job `{job}` failed")]
    Failed {
        /// Name of the failing job.
        job: String,

        /// Underlying fault.
        #[source]
        source: BoxError,
    },
}

/// Result of a cancellable computation that did not fail.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome<T> {
    /// The computation ran to completion.
    Completed(T),

    /// Cancellation was observed; any partial work was discarded.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Folds a join result into an outcome, turning interruption into
    /// [`Outcome::Cancelled`] and passing genuine failures through.
    ///
    /// # Errors
    ///
    /// Returns the [`JobError::Failed`] carried by `result`, if any.
    pub fn from_join(result: Result<T, JobError>) -> Result<Self, JobError> {
        match result {
            Ok(value) => Ok(Self::Completed(value)),
            Err(JobError::Interrupted) => Ok(Self::Cancelled),
            Err(err) => Err(err),
        }
    }

    /// Maps the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Returns the completed value, if any.
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Row band owned by one unit of work.
///
/// Band `i` of `n` covers rows `i, i + n, i + 2n, …`. Interlacing keeps the
/// per-band workload similar when the cost varies smoothly across rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAssignment {
    pub band_index: usize,
    pub band_count: usize,
}

impl TileAssignment {
    /// The assignment covering every row.
    pub const WHOLE: Self = Self {
        band_index: 0,
        band_count: 1,
    };

    #[must_use]
    pub fn new(band_index: usize, band_count: usize) -> Self {
        debug_assert!(band_index < band_count, "band index out of range");
        Self {
            band_index,
            band_count,
        }
    }

    /// Rows of a grid with `height` rows belonging to this band.
    pub fn rows(self, height: usize) -> impl Iterator<Item = usize> {
        (self.band_index..height).step_by(self.band_count.max(1))
    }

    /// Half-open index range of the `band_index`-th of `band_count`
    /// contiguous chunks over `len` items.
    #[must_use]
    pub fn chunk(self, len: usize) -> std::ops::Range<usize> {
        let count = self.band_count.max(1);
        let start = len * self.band_index / count;
        let end = len * (self.band_index + 1) / count;
        start..end
    }
}

/// A named unit of work.
pub struct Job<T> {
    name: String,
    task: Box<dyn FnOnce(&JobContext) -> Result<T, BoxError> + Send>,
}

impl<T> Job<T> {
    pub fn new(
        name: impl Into<String>,
        task: impl FnOnce(&JobContext) -> Result<T, BoxError> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            task: Box::new(task),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("name", &self.name).finish_non_exhaustive()
    }
}

/// What a running job can see of its surroundings.
#[derive(Debug, Clone)]
pub struct JobContext {
    cancel: CancelToken,
    assignment: TileAssignment,
}

impl JobContext {
    pub(crate) fn new(cancel: CancelToken, assignment: TileAssignment) -> Self {
        Self { cancel, assignment }
    }

    /// Returns `true` once the job, its batch, or the caller was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[must_use]
    pub fn assignment(&self) -> TileAssignment {
        self.assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interlaced_rows() {
        let rows: Vec<_> = TileAssignment::new(1, 3).rows(8).collect();
        assert_eq!(rows, vec![1, 4, 7]);
        assert_eq!(TileAssignment::WHOLE.rows(3).count(), 3);
    }

    #[test]
    fn chunks_cover_everything_once() {
        let len = 103;
        let mut seen = vec![0_u8; len];
        for band in 0..7 {
            for i in TileAssignment::new(band, 7).chunk(len) {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn outcome_from_join() {
        assert_eq!(
            Outcome::from_join(Ok::<_, JobError>(3)).unwrap(),
            Outcome::Completed(3)
        );
        assert!(Outcome::<u8>::from_join(Err(JobError::Interrupted)).unwrap().is_cancelled());

        let failed = Outcome::<u8>::from_join(Err(JobError::Failed {
            job: "x".into(),
            source: "boom".into(),
        }));
        assert!(matches!(failed, Err(JobError::Failed { .. })));
    }
}
