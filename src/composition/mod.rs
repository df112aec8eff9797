//! # Trailer Composition
//!
//! Runs the detection pipeline end to end and assembles the admitted moments
//! into a rendered trailer.

pub mod assembler;
pub mod engine;

pub use assembler::{Trailer, TrailerAssembler};
pub use engine::{Detection, MomentCatcher, TrailerReport};
