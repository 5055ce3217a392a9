use std::cmp::Ordering;

use num_traits::Zero;

use super::{Constrained, Constraint, ConstraintError, sign};

/// Marker type enforcing that a value is non-negative (zero or greater).
///
/// Shape sizes use this marker: a zero diameter is a legitimate degenerate
/// shape (a disk of zero diameter is a point source), a negative one is not.
///
/// # Examples
///
/// ```
/// use uv_models::support::constraint::{Constrained, NonNegative};
///
/// let diameter = Constrained::<f64, NonNegative>::new(3.5).unwrap();
/// assert_eq!(diameter.into_inner(), 3.5);
///
/// assert!(NonNegative::new(-0.1).is_err());
/// assert!(NonNegative::new(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonNegative;

impl NonNegative {
    /// Constructs a [`Constrained<T, NonNegative>`] if the value is non-negative.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is negative or not a number (`NaN`).
    pub fn new<T: PartialOrd + Zero>(
        value: T,
    ) -> Result<Constrained<T, NonNegative>, ConstraintError> {
        Constrained::<T, NonNegative>::new(value)
    }
}

impl<T: PartialOrd + Zero> Constraint<T> for NonNegative {
    fn check(value: &T) -> Result<(), ConstraintError> {
        match sign(value)? {
            Ordering::Less => Err(ConstraintError::Negative),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use uom::si::{angle::degree, f64::Angle};

    #[test]
    fn floats() {
        assert!(Constrained::<f64, NonNegative>::new(2.0).is_ok());
        assert!(NonNegative::new(0.0).is_ok());
        assert!(NonNegative::new(-0.0).is_ok());
        assert_eq!(NonNegative::new(-2.0), Err(ConstraintError::Negative));
        assert_eq!(NonNegative::new(f64::NAN), Err(ConstraintError::NotANumber));
    }

    #[test]
    fn infinity_is_allowed() {
        assert!(NonNegative::new(f64::INFINITY).is_ok());
        assert!(NonNegative::new(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn angles() {
        assert!(NonNegative::new(Angle::new::<degree>(45.0)).is_ok());
        assert!(NonNegative::new(Angle::new::<degree>(0.0)).is_ok());
        assert!(NonNegative::new(Angle::new::<degree>(-1.0)).is_err());
    }
}
