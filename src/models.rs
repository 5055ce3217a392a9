//! Public models.
//!
//! Models are the primary public interface of this crate.
//!
//! # Organization
//!
//! Models are organized into domain-specific submodules (currently only
//! `interferometry`). This organization may evolve as more models are added.
//!
//! # Model structure
//!
//! Each model lives in its own module and contains an internal `core`
//! submodule where the computation and domain logic live. The public module
//! re-exports the parts of `core` callers need.
//!
//! [`twine_core::Model`] implementations are thin adapters that delegate to
//! the core API, so models can be driven by Twine solvers.

pub mod interferometry;
