//! # UV Models
//!
//! Complex visibilities of analytic astrophysical source models (points,
//! disks, rings, gaussians, limb-darkened disks and their elongated or
//! flattened variants), computed on a shared worker pool and rendered as
//! amplitude or phase maps of the UV plane.
//!
//! ## Crate layout
//!
//! - [`models`]: Source models, the model registry, the map service and
//!   [`twine_core::Model`] adapters.
//! - [`support`]: Supporting utilities used by models: numeric constraints,
//!   unit conversions, Bessel functions, UV geometry and the fork/join
//!   scheduler.
//!
//! ## Concurrency
//!
//! There is no global pool. The composition root builds one
//! [`support::parallel::Scheduler`], shares it (typically behind an
//! [`std::sync::Arc`]) with every consumer, and passes an explicit
//! [`support::parallel::CancelToken`] into each long-running call.
//! Cancellable calls return [`support::parallel::Outcome::Cancelled`]
//! instead of an error when the token trips.
//!
//! Modules in [`support`] are part of the public API because they're useful,
//! but their APIs are not stable.

pub mod models;
pub mod support;
