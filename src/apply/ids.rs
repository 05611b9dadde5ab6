//! Identifiers for sub-entities minted during an apply.

/// Prefix for placed-equipment ids.
pub const PLACEMENT_PREFIX: &str = "pe";
/// Prefix for quote section ids.
pub const SECTION_PREFIX: &str = "section";

/// Random id carrying a readable prefix, e.g. `pe-6f1c...`.
pub fn prefixed_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
