//! Step definition modules for Cucumber feature tests.

pub mod declaration;
pub mod invocation;
