//! Validation errors shared across the spares workspace

use thiserror::Error;

/// A record failed canonical validation and must not enter the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("spare record has no usable code field (expected 'spareCode' or 'spare_code')")]
    MissingCode,

    #[error("spare '{code}' has no name (expected 'spareName' or 'spare_name')")]
    MissingName { code: String },

    #[error("spare '{code}' has a quantity that is not an integer: {value}")]
    InvalidQuantity { code: String, value: String },
}

impl ValidationError {
    /// Code of the offending record, when one was known
    pub fn code(&self) -> Option<&str> {
        match self {
            ValidationError::MissingCode => None,
            ValidationError::MissingName { code } => Some(code),
            ValidationError::InvalidQuantity { code, .. } => Some(code),
        }
    }
}
