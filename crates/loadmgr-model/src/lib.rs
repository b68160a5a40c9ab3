//! Shared, serializable types for the load-adaptive executor.
//!
//! Nothing in here owns behavior beyond small accessors; the controller and the executor live in `loadmgr-core`.

mod common;
pub use common::KeyValue;

mod domain;
pub use domain::*;
