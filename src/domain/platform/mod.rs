pub mod entity;
pub mod invariants;

pub use entity::{Platform, PlatformKind};
pub use invariants::validate_platform;
