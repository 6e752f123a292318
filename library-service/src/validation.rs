use bomboni_request::error::{CommonError, RequestError};

/// Rejects a display name or title that is empty or only whitespace.
///
/// The value itself is stored as given.
pub fn required_name(field: &str, value: &str) -> Result<(), RequestError> {
    if value.trim().is_empty() {
        return Err(RequestError::field(field, CommonError::RequiredFieldMissing));
    }
    Ok(())
}
