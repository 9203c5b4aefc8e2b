//! Typed signal readings and the cross-browser fusion step

pub mod fusion;
pub mod types;

pub use fusion::{CrossBrowserSignals, FusedIdentity};
pub use types::*;
