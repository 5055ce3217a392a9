//! Type-level numeric constraints with zero runtime cost.
//!
//! Model inputs that must never be negative (diameters, widths) or must be
//! strictly positive (image sizes, pool sizes, domain extents) are carried
//! as [`Constrained<T, C>`] values, so a value that made it past
//! construction is known to satisfy its bound everywhere downstream.
//!
//! # Provided constraints
//!
//! - [`NonNegative`]: Zero or greater
//! - [`StrictlyPositive`]: Greater than zero
//!
//! Each marker provides an associated `new()` constructor
//! (e.g., `StrictlyPositive::new(256_usize)`).
//!
//! # Extending
//!
//! Custom invariants can be added by implementing [`Constraint<T>`] for a
//! zero-sized marker type.

mod non_negative;
mod strictly_positive;

use std::{cmp::Ordering, marker::PhantomData, ops::Deref};

use num_traits::Zero;
use thiserror::Error;

pub use non_negative::NonNegative;
pub use strictly_positive::StrictlyPositive;

/// A trait for enforcing numeric invariants at construction time.
pub trait Constraint<T> {
    /// Checks that the given value satisfies this constraint.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] if the value does not satisfy the constraint.
    fn check(value: &T) -> Result<(), ConstraintError>;
}

/// An error returned when a [`Constraint`] is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConstraintError {
    #[error("value must not be negative")]
    Negative,
    #[error("value must not be zero")]
    Zero,
    #[error("value is not a number")]
    NotANumber,
}

/// A wrapper enforcing a numeric constraint at construction time.
///
/// # Example
///
/// ```
/// use uv_models::support::constraint::{Constrained, StrictlyPositive};
///
/// let size = Constrained::<usize, StrictlyPositive>::new(512).unwrap();
/// assert_eq!(size.into_inner(), 512);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Constrained<T, C: Constraint<T>> {
    value: T,
    _marker: PhantomData<C>,
}

impl<T, C: Constraint<T>> Constrained<T, C> {
    /// Constructs a new constrained value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not satisfy the constraint.
    pub fn new(value: T) -> Result<Self, ConstraintError> {
        C::check(&value)?;
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// Consumes the wrapper and returns the inner value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Returns a reference to the inner unconstrained value.
impl<T, C: Constraint<T>> AsRef<T> for Constrained<T, C> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T, C: Constraint<T>> Deref for Constrained<T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Orders `value` against zero, rejecting unordered values.
fn sign<T: PartialOrd + Zero>(value: &T) -> Result<Ordering, ConstraintError> {
    value
        .partial_cmp(&T::zero())
        .ok_or(ConstraintError::NotANumber)
}
