use std::sync::Arc;

use log::debug;
use thiserror::Error;

use super::{CancelToken, Job, JobContext, JobError, Outcome, Scheduler};

/// Tiled reduction settings.
#[derive(Debug, Clone, Copy)]
pub struct ReducerConfig {
    /// Grids with more cells than this are split across the pool.
    pub split_threshold: usize,

    /// Allows splitting at all; `false` forces a single band on the caller.
    pub use_threads: bool,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            split_threshold: 65_536,
            use_threads: true,
        }
    }
}

/// Error returned when a value buffer does not fit the grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridShapeError {
    #[error("a {width}x{height} grid needs {expected} values, got {actual}")]
    LengthMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("a {width}x{height} grid has more cells than can be addressed")]
    TooLarge { width: usize, height: usize },
}

/// Immutable row-major 2-D array of `f32` values.
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatGrid {
    width: usize,
    height: usize,
    values: Arc<[f32]>,
}

impl FloatGrid {
    /// Wraps a row-major buffer of `width · height` values.
    ///
    /// # Errors
    ///
    /// Returns a [`GridShapeError`] if the buffer length does not match.
    pub fn new(
        width: usize,
        height: usize,
        values: impl Into<Arc<[f32]>>,
    ) -> Result<Self, GridShapeError> {
        let values = values.into();
        let expected = Self::cell_count(width, height)?;
        if values.len() != expected {
            return Err(GridShapeError::LengthMismatch {
                width,
                height,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Builds a grid by evaluating `f(col, row)` for every cell.
    ///
    /// # Errors
    ///
    /// Returns [`GridShapeError::TooLarge`] if `width · height` overflows.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> f32,
    ) -> Result<Self, GridShapeError> {
        let mut values = Vec::with_capacity(Self::cell_count(width, height)?);
        for row in 0..height {
            for col in 0..width {
                values.push(f(col, row));
            }
        }
        Ok(Self {
            width,
            height,
            values: values.into(),
        })
    }

    /// Number of cells of a `width`×`height` grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridShapeError::TooLarge`] if the product overflows.
    pub fn cell_count(width: usize, height: usize) -> Result<usize, GridShapeError> {
        width
            .checked_mul(height)
            .ok_or(GridShapeError::TooLarge { width, height })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f32] {
        &self.values[row * self.width..(row + 1) * self.width]
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// A per-cell visitor with an associative, commutative merge.
///
/// Each band folds its cells into its own accumulator; the accumulators are
/// merged single-threaded once every band has finished. The merge order is
/// unspecified, so floating-point sums may round differently from a
/// single-band run.
pub trait Reduction: Send + Sync + 'static {
    type Acc: Send + 'static;

    /// Fresh accumulator for one band.
    fn init(&self) -> Self::Acc;

    /// Folds one cell into the band's accumulator.
    fn visit(&self, acc: &mut Self::Acc, col: usize, row: usize, value: f32);

    /// Merges the accumulators of all bands.
    fn combine(&self, parts: Vec<Self::Acc>) -> Self::Acc;
}

/// Interlaced row-band map/reduce over a [`FloatGrid`].
#[derive(Debug, Clone, Copy)]
pub struct TiledReducer<'a> {
    scheduler: &'a Scheduler,
    config: ReducerConfig,
}

impl<'a> TiledReducer<'a> {
    #[must_use]
    pub fn new(scheduler: &'a Scheduler, config: ReducerConfig) -> Self {
        Self { scheduler, config }
    }

    /// Number of bands a grid of `cells` cells is split into.
    #[must_use]
    pub fn band_count(&self, cells: usize) -> usize {
        if self.config.use_threads
            && self.scheduler.is_enabled()
            && cells > self.config.split_threshold
        {
            self.scheduler.max_parallelism()
        } else {
            1
        }
    }

    /// Runs `reduction` over every cell of `grid`.
    ///
    /// Bands poll `cancel` after each row and stop early when it trips; the
    /// partial accumulators are then discarded and [`Outcome::Cancelled`] is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Failed`] if a band panics.
    pub fn reduce<R: Reduction>(
        &self,
        grid: &FloatGrid,
        reduction: Arc<R>,
        cancel: &CancelToken,
    ) -> Result<Outcome<R::Acc>, JobError> {
        let bands = self.band_count(grid.len());
        debug!(
            "reducing {}x{} grid over {bands} band(s)",
            grid.width(),
            grid.height()
        );

        let jobs = (0..bands)
            .map(|band| {
                let grid = grid.clone();
                let reduction = Arc::clone(&reduction);
                Job::new(format!("tile-band-{band}"), move |ctx: &JobContext| {
                    let mut acc = reduction.init();
                    for row in ctx.assignment().rows(grid.height()) {
                        for (col, &value) in grid.row(row).iter().enumerate() {
                            reduction.visit(&mut acc, col, row, value);
                        }
                        if ctx.is_cancelled() {
                            break;
                        }
                    }
                    Ok(acc)
                })
            })
            .collect();

        let parts = Outcome::from_join(self.scheduler.fork_and_join(jobs, true, cancel))?;
        Ok(parts.map(|parts| reduction.combine(parts)))
    }
}

/// Count, sum and range of the values of a grid.
///
/// `NaN` cells are counted but take no part in the sum or the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueStats {
    pub count: u64,
    pub sum: f64,
    pub min: f32,
    pub max: f32,
}

impl Default for ValueStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }
}

impl ValueStats {
    /// Returns the observed `(min, max)`, or `None` if no value was seen.
    #[must_use]
    pub fn range(&self) -> Option<(f32, f32)> {
        (self.min <= self.max).then_some((self.min, self.max))
    }

    fn merge(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Reduction for ValueStats {
    type Acc = ValueStats;

    fn init(&self) -> Self::Acc {
        Self::default()
    }

    fn visit(&self, acc: &mut Self::Acc, _col: usize, _row: usize, value: f32) {
        acc.count += 1;
        if value.is_nan() {
            return;
        }
        acc.sum += f64::from(value);
        acc.min = acc.min.min(value);
        acc.max = acc.max.max(value);
    }

    fn combine(&self, parts: Vec<Self::Acc>) -> Self::Acc {
        parts.into_iter().fold(Self::default(), Self::merge)
    }
}
