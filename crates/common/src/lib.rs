//! Shared plumbing for the tap workspace: layered configuration loading and logging bootstrap.

pub mod utils;
