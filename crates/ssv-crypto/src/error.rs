use thiserror::Error;

/// Failures specific to the cryptographic layer: malformed encodings and
/// curve-arithmetic failures that `ssv_types::Error` has no vocabulary for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid secret key share encoding")]
    InvalidSecretKey,

    #[error("invalid public key encoding")]
    InvalidPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("duplicate operator id {0} in interpolation set")]
    DuplicateInterpolationPoint(u64),

    #[error("empty interpolation set")]
    EmptyInterpolationSet,

    #[error("no public key share registered for operator {0}")]
    MissingPublicKeyShare(u64),
}
