//! Concrete session backends.

pub mod tcp;
