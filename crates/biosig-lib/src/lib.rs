//! Composite biosignal datasets and the procedures that analyse them.
//!
//! A [`CompositeDataset`] keeps uniformly sampled waves, timestamped point
//! sets and interval parameters under string keys. Procedures are looked up
//! in a [`ProcedureRegistry`] and run through the functions in [`analyzer`],
//! which return detached results for the caller to commit.

pub mod analyzer;
pub mod dataset;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod procedure;
mod procedures;
pub mod signal;

pub use dataset::CompositeDataset;
pub use error::{Error, Result};
pub use procedure::{Arguments, Procedure, ProcedureKind, ProcedureRegistry};
pub use signal::*;
