//! Request handlers.

pub mod health;
pub mod stitch;

pub use health::*;
pub use stitch::*;
