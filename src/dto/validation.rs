//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a display name still has content once surrounding whitespace is removed.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Smashers")  // Ok
/// validate_display_name("  ")        // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Name must not be empty or whitespace only".into());
        return Err(err);
    }

    Ok(())
}
