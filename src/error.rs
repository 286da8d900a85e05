//! use chainkit::error::ChainKitError;

use std::path::PathBuf;

use thiserror::Error;

/// Represents errors that can occur while building, signing or writing a chain.
///
/// Every failure aborts the current chain's generation; nothing is retried.
#[derive(Debug, Error)]
pub enum ChainKitError {
    /// A certificate was finalized before the certificate that issues it.
    #[error("Cannot finalize \"{subject}\": issuer \"{issuer}\" is not finalized")]
    DependencyError { subject: String, issuer: String },

    /// A chain handed to the serializer contains an unsigned certificate.
    #[error("Certificate \"{0}\" has not been finalized")]
    UnfinalizedCertificate(String),

    /// A finalized certificate (or its extension set) was mutated.
    #[error("Certificate is finalized and can no longer be modified: {0}")]
    CertificateFinalized(String),

    /// An extension value could not be turned into DER.
    #[error("Invalid value for extension \"{name}\": {reason}")]
    ExtensionValueError { name: String, reason: String },

    /// A certificate handle does not belong to this chain.
    #[error("Unknown certificate handle: {0}")]
    UnknownCertificate(usize),

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error while signing a to-be-signed structure.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),
}

/// A specialized Result type for chainkit operations.
pub type Result<T> = std::result::Result<T, ChainKitError>;

impl ChainKitError {
    pub(crate) fn extension(name: &str, reason: impl Into<String>) -> Self {
        ChainKitError::ExtensionValueError {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ChainKitError::IoError {
            path: path.into(),
            source,
        }
    }
}

impl From<der::Error> for ChainKitError {
    /// Converts a `der::Error` into a `ChainKitError`.
    fn from(err: der::Error) -> Self {
        ChainKitError::EncodingError(err.to_string())
    }
}

impl From<rsa::Error> for ChainKitError {
    fn from(err: rsa::Error) -> Self {
        ChainKitError::RsaError(err.to_string())
    }
}

impl From<pkcs8::Error> for ChainKitError {
    fn from(err: pkcs8::Error) -> Self {
        ChainKitError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for ChainKitError {
    fn from(err: pkcs8::spki::Error) -> Self {
        ChainKitError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for ChainKitError {
    fn from(err: pem::PemError) -> Self {
        ChainKitError::DecodingError(err.to_string())
    }
}

impl From<const_oid::Error> for ChainKitError {
    fn from(err: const_oid::Error) -> Self {
        ChainKitError::InvalidInput(err.to_string())
    }
}

impl From<rsa::signature::Error> for ChainKitError {
    fn from(err: rsa::signature::Error) -> Self {
        ChainKitError::SigningError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_display() {
        let err = ChainKitError::DependencyError {
            subject: "Intermediate".to_string(),
            issuer: "Root".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot finalize \"Intermediate\": issuer \"Root\" is not finalized"
        );
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = ChainKitError::io(
            "/nonexistent/chain.pem",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/nonexistent/chain.pem"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChainKitError>();
    }
}
