use std::{collections::BTreeMap, sync::Arc};

use log::debug;
use num_complex::Complex64;

use crate::support::parallel::{CancelToken, Job, JobContext, Outcome, Scheduler};

use super::{
    error::ModelError,
    kind::ModelKind,
    record::{Model, Parameter},
    shape::{ModelSet, Shape},
};

/// Settings for [`ModelRegistry::compute_all`].
#[derive(Debug, Clone, Copy)]
pub struct ComputeConfig {
    /// Allows splitting the samples across the pool.
    pub use_threads: bool,

    /// Number of cancellation checks over one job's samples.
    ///
    /// The default polls about once per 5% of the samples.
    pub cancel_checks: usize,

    /// Smallest number of samples worth a job of its own.
    pub min_samples_per_job: usize,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            use_threads: true,
            cancel_checks: 20,
            min_samples_per_job: 1024,
        }
    }
}

/// Spatial frequencies at which visibilities are computed, in rad⁻¹.
///
/// Cloning shares the underlying buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySamples {
    u: Arc<[f64]>,
    v: Arc<[f64]>,
}

impl FrequencySamples {
    /// Pairs `u[i]` with `v[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SampleLengthMismatch`] if the lengths differ.
    pub fn new(u: impl Into<Arc<[f64]>>, v: impl Into<Arc<[f64]>>) -> Result<Self, ModelError> {
        let (u, v) = (u.into(), v.into());
        if u.len() != v.len() {
            return Err(ModelError::SampleLengthMismatch {
                u: u.len(),
                v: v.len(),
            });
        }
        Ok(Self { u, v })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.u.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    #[must_use]
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    #[must_use]
    pub fn v(&self) -> &[f64] {
        &self.v
    }
}

/// Maps model type identifiers to model kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRegistry {
    kinds: BTreeMap<String, ModelKind>,
}

impl Default for ModelRegistry {
    /// A registry holding every built-in kind under its own type name.
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in ModelKind::ALL {
            registry.register(kind.type_name(), kind);
        }
        registry
    }
}

impl ModelRegistry {
    /// Creates a registry of the built-in kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Registers `kind` under `model_type`; the last registration wins.
    pub fn register(&mut self, model_type: impl Into<String>, kind: ModelKind) {
        self.kinds.insert(model_type.into(), kind);
    }

    /// Registered type identifiers, sorted.
    pub fn model_types(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Looks up the kind registered under `model_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownModelType`] if nothing is registered.
    pub fn kind(&self, model_type: &str) -> Result<ModelKind, ModelError> {
        self.kinds
            .get(model_type)
            .copied()
            .ok_or_else(|| ModelError::UnknownModelType(model_type.to_string()))
    }

    /// Creates a model of `model_type` with default parameters.
    ///
    /// The model and its parameters are named after their types; use
    /// [`assign_unique_name`](super::naming::assign_unique_name) to make
    /// the names unique within a target.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownModelType`] if nothing is registered.
    pub fn create(&self, model_type: &str) -> Result<Model, ModelError> {
        let kind = self.kind(model_type)?;
        let mut model = Model::new(model_type, model_type);
        model.parameters = kind
            .parameters()
            .iter()
            .map(Parameter::from_spec)
            .collect();
        Ok(model)
    }

    /// Checks a model before evaluation.
    ///
    /// Own parameters are checked in declaration order, then linked ones.
    ///
    /// # Errors
    ///
    /// Fails on the first problem found: an unknown type, child models, or a
    /// parameter outside its bounds.
    pub fn validate(&self, model: &Model) -> Result<(), ModelError> {
        self.kind(&model.model_type)?;
        if !model.child_models.is_empty() {
            return Err(ModelError::CompositeUnsupported(model.name.clone()));
        }
        let linked = model.parameter_links.iter().map(|link| &link.shared);
        for parameter in model.parameters.iter().chain(linked) {
            if let Some(bound) = parameter.violated_bound() {
                return Err(ModelError::ParameterOutOfRange {
                    parameter: parameter.name.clone(),
                    model: model.name.clone(),
                    bound,
                    value: parameter.value,
                });
            }
        }
        Ok(())
    }

    /// Validates `model` and resolves it into an evaluator.
    ///
    /// # Errors
    ///
    /// See [`ModelRegistry::validate`] and [`Shape::new`].
    pub fn prepare(&self, model: &Model) -> Result<Shape, ModelError> {
        self.validate(model)?;
        Shape::new(self.kind(&model.model_type)?, model)
    }

    /// Validates and resolves every model of a list.
    ///
    /// # Errors
    ///
    /// Returns the first failure; nothing is evaluated in that case.
    pub fn prepare_all(&self, models: &[Model]) -> Result<ModelSet, ModelError> {
        models
            .iter()
            .map(|model| self.prepare(model))
            .collect::<Result<_, _>>()
            .map(ModelSet::new)
    }

    /// Restores the registered default value and bounds of one parameter.
    ///
    /// The parameter keeps its name and fixed flag.
    ///
    /// # Errors
    ///
    /// Fails if the model type is unknown or if neither the kind nor the
    /// model declares `param_type`.
    pub fn reset_parameter(&self, model: &mut Model, param_type: &str) -> Result<(), ModelError> {
        let kind = self.kind(&model.model_type)?;
        let name = model.name.clone();
        let missing = || ModelError::MissingParameter {
            model: name.clone(),
            parameter: param_type.to_string(),
        };
        let spec = kind.parameter(param_type).ok_or_else(missing)?;
        let default = Parameter::from_spec(spec);
        let parameter = model.parameter_mut(param_type).ok_or_else(missing)?;
        parameter.value = default.value;
        parameter.min_value = default.min_value;
        parameter.max_value = default.max_value;
        parameter.units = default.units;
        Ok(())
    }

    /// Computes the total visibility of `models` at every sample.
    ///
    /// Every model is validated before any sample is evaluated. Samples are
    /// split into contiguous chunks, one job each; a sequential run gives the
    /// exact same values. Each job polls `cancel` about
    /// [`ComputeConfig::cancel_checks`] times.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or [`ModelError::Job`] if a job failed.
    pub fn compute_all(
        &self,
        models: &[Model],
        samples: &FrequencySamples,
        scheduler: &Scheduler,
        config: &ComputeConfig,
        cancel: &CancelToken,
    ) -> Result<Outcome<Vec<Complex64>>, ModelError> {
        let set = Arc::new(self.prepare_all(models)?);

        let len = samples.len();
        let job_count = job_count(len, scheduler, config);
        debug!(
            "computing {} model(s) at {len} sample(s) in {job_count} job(s)",
            set.len()
        );

        let checks = config.cancel_checks.max(1);
        let jobs = (0..job_count)
            .map(|index| {
                let set = Arc::clone(&set);
                let samples = samples.clone();
                Job::new(format!("visibility-{index}"), move |ctx: &JobContext| {
                    let range = ctx.assignment().chunk(samples.len());
                    let cadence = range.len().div_ceil(checks).max(1);
                    let mut out = Vec::with_capacity(range.len());
                    for (k, i) in range.enumerate() {
                        if k % cadence == 0 && ctx.is_cancelled() {
                            break;
                        }
                        out.push(set.visibility(samples.u[i], samples.v[i]));
                    }
                    Ok(out)
                })
            })
            .collect();

        let parts = Outcome::from_join(scheduler.fork_and_join(jobs, config.use_threads, cancel))?;
        Ok(parts.map(|parts| parts.into_iter().flatten().collect()))
    }

    /// Rescales `vis` so that its largest amplitude is 1.
    ///
    /// Leaves the array untouched if it is all zeros or already normalised.
    pub fn normalize(vis: &mut [Complex64]) {
        let max = vis.iter().map(|z| z.norm()).fold(0.0, f64::max);
        if max == 0.0 || max == 1.0 || !max.is_finite() {
            return;
        }
        for z in vis {
            *z /= max;
        }
    }
}

fn job_count(len: usize, scheduler: &Scheduler, config: &ComputeConfig) -> usize {
    if !config.use_threads || !scheduler.is_enabled() {
        return 1;
    }
    let by_size = len / config.min_samples_per_job.max(1);
    by_size.clamp(1, scheduler.max_parallelism())
}
