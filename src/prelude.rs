//! forest-sweep prelude.
//!
//! This module contains the most used types, traits and functions that you can import easily as
//! a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::config::{ForestSettings, ImageFormat, ParamRange, SweepConfig};

#[doc(no_inline)]
pub use crate::forest::{MaxFeatures, RandomForest, RandomForestParams};

#[doc(no_inline)]
pub use crate::pca::Pca;

#[doc(no_inline)]
pub use crate::sweep::{select_best, BestOf, MonteCarlo, Split, SweepResult, SweepResults, Trial};

#[doc(no_inline)]
pub use crate::factor::Factor;

#[doc(no_inline)]
pub use crate::report::Reporter;
