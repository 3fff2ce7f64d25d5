//! Exchange Common Types
//!
//! Shared building blocks for the exchange workspace: exact decimal parsing,
//! currency code normalisation and time helpers.

pub mod currency;
pub mod error;
pub mod rational;
pub mod time;

pub use currency::*;
pub use error::*;
pub use rational::*;
pub use time::*;

pub use num_rational::BigRational;
