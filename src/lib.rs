//! # heckler
//!
//! `heckler` validates a test suite by mutating the code under test one change at
//! a time and checking that the suite notices:
//! - `heckle::scheduler`: fastest-first, fail-fast test runs with decaying duration estimates
//! - `heckle::calibrate`: timeout bound derived from the unmutated baseline run
//! - `heckle::validator`: apply, test, revert, and classify each mutation trial
//! - `heckle::runner`: class-level orchestration and the final verdict
//!
//! The mutation engine, class resolution, and test discovery are traits in
//! `heckle::engine`; `heckle::manifest` and `heckle::discovery` provide
//! file-based implementations used by the `heckle` binary (feature `cli`).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod heckle;

pub use heckle::{HeckleConfig, HeckleContext, HeckleError, ValidationOrchestrator};
