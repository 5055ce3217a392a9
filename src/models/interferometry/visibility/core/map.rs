//! Amplitude and phase images of a model list over a UV rectangle.

mod color;

pub use color::{ColorMap, ColorScale, PixelBuffer};

use std::sync::Arc;

use log::debug;
use num_complex::Complex64;
use thiserror::Error;

use crate::support::{
    constraint::{ConstraintError, Constrained, StrictlyPositive},
    parallel::{
        CancelToken, FloatGrid, GridShapeError, JobError, Outcome, ReducerConfig, Scheduler,
        TiledReducer, ValueStats,
    },
};

use super::{
    error::ModelError,
    record::Model,
    registry::{ComputeConfig, FrequencySamples, ModelRegistry},
};

type Positive<T> = Constrained<T, StrictlyPositive>;

/// Errors raised by [`VisibilityMapService::compute_map`].
#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("value grid does not match the image size")]
    Grid(#[from] GridShapeError),

    #[error("value reduction failed")]
    Job(#[from] JobError),
}

/// Quantity shown by a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageMode {
    /// `|V|`.
    #[default]
    Amplitude,

    /// `atan2(Im V, Re V)`, in `[-π, π]`.
    Phase,

    /// `|V|²`.
    SquaredAmplitude,
}

impl ImageMode {
    #[allow(clippy::cast_possible_truncation)]
    fn extract(self, vis: Complex64) -> f32 {
        match self {
            Self::Amplitude => vis.norm() as f32,
            Self::Phase => vis.arg() as f32,
            Self::SquaredAmplitude => vis.norm_sqr() as f32,
        }
    }
}

/// Rectangle of the UV plane, in rad⁻¹.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u_min: f64,
    pub v_min: f64,
    pub width: Positive<f64>,
    pub height: Positive<f64>,
}

impl UvRect {
    /// # Errors
    ///
    /// Fails unless `width` and `height` are strictly positive.
    pub fn new(u_min: f64, v_min: f64, width: f64, height: f64) -> Result<Self, ConstraintError> {
        Ok(Self {
            u_min,
            v_min,
            width: StrictlyPositive::new(width)?,
            height: StrictlyPositive::new(height)?,
        })
    }

    /// Rectangle centred on the origin with half-extent `max`.
    ///
    /// # Errors
    ///
    /// Fails unless `max` is strictly positive.
    pub fn centred(max: f64) -> Result<Self, ConstraintError> {
        Self::new(-max, -max, 2.0 * max, 2.0 * max)
    }

    #[must_use]
    pub fn u_max(&self) -> f64 {
        self.u_min + *self.width
    }

    #[must_use]
    pub fn v_max(&self) -> f64 {
        self.v_min + *self.height
    }
}

/// Value range the colors are spread over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

/// What to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRequest {
    pub domain: UvRect,
    pub mode: ImageMode,

    /// Pixels along each side of the square image.
    pub image_size: Positive<usize>,

    pub color_map: ColorMap,
    pub color_scale: ColorScale,

    /// Fixed color range, e.g. to keep colors stable across a zoom
    /// sequence. The observed range is used when absent.
    pub reference: Option<ValueRange>,
}

impl MapRequest {
    /// A gray, linear amplitude map.
    #[must_use]
    pub fn new(domain: UvRect, image_size: Positive<usize>) -> Self {
        Self {
            domain,
            mode: ImageMode::default(),
            image_size,
            color_map: ColorMap::default(),
            color_scale: ColorScale::default(),
            reference: None,
        }
    }
}

/// A rendered map and the inputs it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityMapResult {
    mode: ImageMode,
    domain: UvRect,
    value_min: f32,
    value_max: f32,
    color_scale: ColorScale,
    color_map: String,
    values: FloatGrid,
    image: PixelBuffer,
}

impl VisibilityMapResult {
    #[must_use]
    pub fn mode(&self) -> ImageMode {
        self.mode
    }

    #[must_use]
    pub fn image_size(&self) -> usize {
        self.values.width()
    }

    #[must_use]
    pub fn domain(&self) -> &UvRect {
        &self.domain
    }

    /// Smallest value observed, ignoring `NaN`.
    #[must_use]
    pub fn value_min(&self) -> f32 {
        self.value_min
    }

    /// Largest value observed, ignoring `NaN`.
    #[must_use]
    pub fn value_max(&self) -> f32 {
        self.value_max
    }

    #[must_use]
    pub fn color_scale(&self) -> ColorScale {
        self.color_scale
    }

    /// Name of the color map the image was drawn with.
    #[must_use]
    pub fn color_map(&self) -> &str {
        &self.color_map
    }

    /// Raw values; row 0 is the largest V.
    #[must_use]
    pub fn values(&self) -> &FloatGrid {
        &self.values
    }

    #[must_use]
    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    /// Redraws the stored values without recomputing them.
    #[must_use]
    pub fn recolor(
        &self,
        map: &ColorMap,
        scale: ColorScale,
        reference: Option<ValueRange>,
    ) -> PixelBuffer {
        let range = reference.unwrap_or(ValueRange {
            min: self.value_min,
            max: self.value_max,
        });
        PixelBuffer::render(&self.values, map, scale, range.min, range.max)
    }
}

/// Renders visibility maps on a shared worker pool.
#[derive(Debug, Clone)]
pub struct VisibilityMapService {
    registry: Arc<ModelRegistry>,
    scheduler: Arc<Scheduler>,
    compute: ComputeConfig,
    reducer: ReducerConfig,
}

impl VisibilityMapService {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>, scheduler: Arc<Scheduler>) -> Self {
        Self::with_config(
            registry,
            scheduler,
            ComputeConfig::default(),
            ReducerConfig::default(),
        )
    }

    #[must_use]
    pub fn with_config(
        registry: Arc<ModelRegistry>,
        scheduler: Arc<Scheduler>,
        compute: ComputeConfig,
        reducer: ReducerConfig,
    ) -> Self {
        Self {
            registry,
            scheduler,
            compute,
            reducer,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Computes and colors the map described by `request`.
    ///
    /// # Errors
    ///
    /// Model validation failures are returned unchanged inside
    /// [`MapError::Model`]; a failing worker yields a job error.
    pub fn compute_map(
        &self,
        models: &[Model],
        request: &MapRequest,
        cancel: &CancelToken,
    ) -> Result<Outcome<VisibilityMapResult>, MapError> {
        let size = *request.image_size;
        let cells = FloatGrid::cell_count(size, size)?;
        let samples = grid_samples(&request.domain, size, cells)?;

        let vis = match self.registry.compute_all(
            models,
            &samples,
            &self.scheduler,
            &self.compute,
            cancel,
        )? {
            Outcome::Completed(vis) => vis,
            Outcome::Cancelled => {
                debug!("map computation cancelled");
                return Ok(Outcome::Cancelled);
            }
        };

        let values: Vec<f32> = vis.into_iter().map(|z| request.mode.extract(z)).collect();
        let values = FloatGrid::new(size, size, values)?;

        let reducer = TiledReducer::new(&self.scheduler, self.reducer);
        let stats = match reducer.reduce(&values, Arc::new(ValueStats::default()), cancel)? {
            Outcome::Completed(stats) => stats,
            Outcome::Cancelled => {
                debug!("map reduction cancelled");
                return Ok(Outcome::Cancelled);
            }
        };
        let (value_min, value_max) = stats.range().unwrap_or((0.0, 0.0));
        let range = request.reference.unwrap_or(ValueRange {
            min: value_min,
            max: value_max,
        });

        let image = PixelBuffer::render(
            &values,
            &request.color_map,
            request.color_scale,
            range.min,
            range.max,
        );
        debug!("{size}x{size} {:?} map in [{value_min}, {value_max}]", request.mode);

        Ok(Outcome::Completed(VisibilityMapResult {
            mode: request.mode,
            domain: request.domain,
            value_min,
            value_max,
            color_scale: request.color_scale,
            color_map: request.color_map.name().to_string(),
            values,
            image,
        }))
    }
}

/// `count` evenly spaced samples from `start`, the last one exactly at
/// `start + extent`.
fn axis(start: f64, extent: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    #[allow(clippy::cast_precision_loss)]
    let step = extent / (count - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    let mut samples: Vec<f64> = (0..count).map(|i| start + i as f64 * step).collect();
    if let Some(last) = samples.last_mut() {
        *last = start + extent;
    }
    samples
}

/// Row-major samples of a `size`×`size` image; row 0 is the largest V.
fn grid_samples(
    domain: &UvRect,
    size: usize,
    cells: usize,
) -> Result<FrequencySamples, ModelError> {
    let us = axis(domain.u_min, *domain.width, size);
    let vs = axis(domain.v_min, *domain.height, size);
    let mut u = Vec::with_capacity(cells);
    let mut v = Vec::with_capacity(cells);
    for &row_v in vs.iter().rev() {
        u.extend_from_slice(&us);
        v.extend(std::iter::repeat_n(row_v, size));
    }
    FrequencySamples::new(u, v)
}
