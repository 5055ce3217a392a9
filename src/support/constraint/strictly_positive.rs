use std::cmp::Ordering;

use num_traits::Zero;

use super::{Constrained, Constraint, ConstraintError, sign};

/// Marker type enforcing that a value is strictly positive (greater than zero).
///
/// Used for counts and extents that cannot be empty: image sizes, worker
/// counts and the width/height of a UV domain.
///
/// # Examples
///
/// ```
/// use uv_models::support::constraint::{Constrained, StrictlyPositive};
///
/// let workers = Constrained::<usize, StrictlyPositive>::new(4).unwrap();
/// assert_eq!(*workers, 4);
///
/// assert!(StrictlyPositive::new(0_usize).is_err());
/// assert!(StrictlyPositive::new(-1.0).is_err());
/// assert!(StrictlyPositive::new(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StrictlyPositive;

impl StrictlyPositive {
    /// Constructs a [`Constrained<T, StrictlyPositive>`] if the value is strictly positive.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is zero, negative, or not a number (`NaN`).
    pub fn new<T: PartialOrd + Zero>(
        value: T,
    ) -> Result<Constrained<T, StrictlyPositive>, ConstraintError> {
        Constrained::<T, StrictlyPositive>::new(value)
    }
}

impl<T: PartialOrd + Zero> Constraint<T> for StrictlyPositive {
    fn check(value: &T) -> Result<(), ConstraintError> {
        match sign(value)? {
            Ordering::Greater => Ok(()),
            Ordering::Equal => Err(ConstraintError::Zero),
            Ordering::Less => Err(ConstraintError::Negative),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let x = Constrained::<usize, StrictlyPositive>::new(1).unwrap();
        assert_eq!(x.into_inner(), 1);

        let y = StrictlyPositive::new(256_usize).unwrap();
        assert_eq!(y.as_ref(), &256);

        assert_eq!(StrictlyPositive::new(0_usize), Err(ConstraintError::Zero));
    }

    #[test]
    fn floats() {
        assert!(StrictlyPositive::new(1e5).is_ok());
        assert_eq!(StrictlyPositive::new(0.0), Err(ConstraintError::Zero));
        assert_eq!(StrictlyPositive::new(-5.0), Err(ConstraintError::Negative));
        assert_eq!(
            StrictlyPositive::new(f64::NAN),
            Err(ConstraintError::NotANumber)
        );
    }
}
