//! Models of sources observed by optical long-baseline interferometers.

pub mod visibility;
