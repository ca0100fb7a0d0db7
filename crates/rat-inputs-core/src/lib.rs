//! Builds the flat, index-based inputs of a reflectivity engine from a
//! name-based project description.

pub mod custom;
pub mod domain;
pub mod events;
pub mod inputs;
pub mod project;
pub mod serialization;

pub use domain::{RatError, RatErrorCategory, RatResult};
pub use inputs::{append_data_background, check_indices, make_input, make_problem};
