//! Stable opaque identifiers.
//!
//! Entities are identified by an opaque string rather than a typed Uuid
//! newtype per entity — the wire format (JSON bodies, JWT claims, JSON
//! columns) treats ids as strings everywhere, so there is no benefit to
//! the extra per-entity wrapper types.

use uuid::Uuid;

pub type Id = String;

/// Generate a new random id.
pub fn new_id() -> Id {
    Uuid::new_v4().to_string()
}
