//! Data models for the template engine.
//!
//! Field names are camelCase on the wire to match the design tool's frontend.

mod apply;
mod content;
mod entities;
mod revision;
mod template;

pub use apply::*;
pub use content::*;
pub use entities::*;
pub use revision::*;
pub use template::*;
