//! Email address validation
//!
//! Pragmatic syntactic check with the same looseness as an HTML5
//! `type=email` form field: `local@domain`, no RFC 5322 comments, quoting
//! or IP literals.

use std::fmt;
use thiserror::Error;

/// Longest address accepted (RFC 5321 path limit minus the angle brackets)
const MAX_EMAIL_LEN: usize = 254;
const MAX_LABEL_LEN: usize = 63;

/// Characters allowed in the local part besides ASCII alphanumerics
const LOCAL_SPECIALS: &str = ".!#$%&'*+/=?^_`{|}~-";

/// A syntactically valid email address, as submitted (trimmed only)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a submission was rejected. Messages are shown to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("This field is required.")]
    Missing,

    #[error("Invalid email address.")]
    Malformed,
}

/// Validate a raw submission
pub fn validate(raw: &str) -> Result<EmailAddress, ValidationError> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(ValidationError::Missing);
    }
    if candidate.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::Malformed);
    }

    let (local, domain) = candidate
        .split_once('@')
        .ok_or(ValidationError::Malformed)?;

    if !is_valid_local(local) || !is_valid_domain(domain) {
        return Err(ValidationError::Malformed);
    }

    Ok(EmailAddress(candidate.to_string()))
}

fn is_valid_local(local: &str) -> bool {
    !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LOCAL_SPECIALS.contains(c))
}

// Also rejects a second '@', which would land in the domain
fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty() && domain.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
