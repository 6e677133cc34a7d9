//! Configuration system: YAML types, loading, and validation
//!
//! Configuration follows a layered approach: a minimal file names the
//! model and relies on defaults for everything else, while validation
//! enforces the invariants that must hold before a single request is
//! served - most importantly that the payment endpoint is the sandbox.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;
