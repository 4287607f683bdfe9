//! Kite Environment
//!
//! Thin platform queries the runtime needs but does not implement itself.

pub mod disk;
