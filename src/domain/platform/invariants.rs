use super::entity::Platform;
use crate::domain::{DomainError, DomainResult};

/// Validates all Platform invariants
pub fn validate_platform(platform: &Platform) -> DomainResult<()> {
    validate_id(&platform.id)?;
    if platform.name.trim().is_empty() {
        return Err(DomainError::InvariantViolation(format!(
            "Platform '{}' must have a display name",
            platform.id
        )));
    }
    Ok(())
}

/// Ids are used as foreign keys and config keys: non-empty, no surrounding whitespace
pub(crate) fn validate_id(id: &str) -> DomainResult<()> {
    if id.is_empty() {
        return Err(DomainError::InvariantViolation(
            "Platform id cannot be empty".to_string(),
        ));
    }
    if id.trim() != id {
        return Err(DomainError::InvariantViolation(format!(
            "Platform id '{}' has surrounding whitespace",
            id
        )));
    }
    Ok(())
}
