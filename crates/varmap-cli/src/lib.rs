//! Library side of the `varmap` binary: logging setup and session assembly.

pub mod logging;
pub mod pipeline;
