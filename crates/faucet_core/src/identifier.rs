//! Identifier validator (§4.5 invariant 1, §4.6, §9 "totality").
//!
//! Every identifier the filter/order/field compilers and the SQL builders
//! emit must pass this grammar before it is quoted and spliced into SQL:
//! ASCII letter/digit/underscore, not starting with a digit, <= 64 chars.

use crate::error::FaucetError;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate a bare identifier (no dots, no quoting). Returns the identifier
/// unchanged on success so callers can chain directly into a dialect's
/// `quote_identifier`.
pub fn validate_identifier(name: &str) -> Result<&str, FaucetError> {
    if name.is_empty() {
        return Err(FaucetError::invalid_argument("identifier must not be empty"));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(FaucetError::invalid_argument(format!(
            "identifier '{name}' exceeds {MAX_IDENTIFIER_LEN} characters"
        )));
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(FaucetError::invalid_argument(format!(
            "identifier '{name}' must start with a letter or underscore"
        )));
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(FaucetError::invalid_argument(format!(
            "identifier '{name}' contains invalid character '{bad}'"
        )));
    }

    Ok(name)
}

/// Validate an identifier at a known source position, for use from the
/// filter lexer/parser where errors must carry a location.
pub fn validate_identifier_at(name: &str, position: usize) -> Result<&str, FaucetError> {
    validate_identifier(name).map_err(|e| match e {
        FaucetError::InvalidArgument { message, .. } => {
            FaucetError::invalid_argument_at(message, position)
        }
        other => other,
    })
}
