use core::fmt;

use crate::duty::BeaconRole;

/// Length in bytes of a BLS12-381 G1 public key in compressed form.
pub const VALIDATOR_PUBLIC_KEY_LEN: usize = 48;

/// Total length of a [`MessageId`]: a 48-byte validator public key followed by
/// an 8-byte role tag.
pub const MESSAGE_ID_LEN: usize = VALIDATOR_PUBLIC_KEY_LEN + 8;

/// A validator's BLS public key, stored as raw compressed bytes.
///
/// This type is intentionally crypto-agnostic: verifying anything against it
/// is the job of `ssv-crypto`, which converts it to and from its internal
/// `blst` representation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ValidatorPublicKey(#[serde(with = "hex::serde")] [u8; VALIDATOR_PUBLIC_KEY_LEN]);

impl ValidatorPublicKey {
    pub const fn new(bytes: [u8; VALIDATOR_PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; VALIDATOR_PUBLIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for ValidatorPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorPublicKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for ValidatorPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Immutable 56-byte identifier for a running duty: `validator public key ‖ beacon-role tag`.
///
/// Two [`MessageId`]s are equal iff they identify the same validator and role;
/// all messages exchanged for one duty carry the same `MessageId`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct MessageId {
    validator_public_key: ValidatorPublicKey,
    role: BeaconRole,
}

impl MessageId {
    pub fn new(validator_public_key: ValidatorPublicKey, role: BeaconRole) -> Self {
        Self {
            validator_public_key,
            role,
        }
    }

    pub fn validator_public_key(&self) -> ValidatorPublicKey {
        self.validator_public_key
    }

    pub fn role(&self) -> BeaconRole {
        self.role
    }

    /// Encode to the canonical 56-byte wire representation.
    pub fn to_bytes(&self) -> [u8; MESSAGE_ID_LEN] {
        let mut bytes = [0u8; MESSAGE_ID_LEN];
        bytes[..VALIDATOR_PUBLIC_KEY_LEN].copy_from_slice(self.validator_public_key.as_bytes());
        bytes[VALIDATOR_PUBLIC_KEY_LEN..].copy_from_slice(&self.role.tag());
        bytes
    }

    /// Decode from the canonical 56-byte wire representation.
    pub fn from_bytes(bytes: &[u8; MESSAGE_ID_LEN]) -> Option<Self> {
        let mut pk = [0u8; VALIDATOR_PUBLIC_KEY_LEN];
        pk.copy_from_slice(&bytes[..VALIDATOR_PUBLIC_KEY_LEN]);

        let mut tag = [0u8; 8];
        tag.copy_from_slice(&bytes[VALIDATOR_PUBLIC_KEY_LEN..]);

        Some(Self {
            validator_public_key: ValidatorPublicKey::new(pk),
            role: BeaconRole::from_tag(tag)?,
        })
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({}/{})", self.validator_public_key, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_bytes() {
        let pk = ValidatorPublicKey::new([7u8; VALIDATOR_PUBLIC_KEY_LEN]);
        let id = MessageId::new(pk, BeaconRole::Aggregator);
        let bytes = id.to_bytes();
        assert_eq!(bytes.len(), MESSAGE_ID_LEN);
        assert_eq!(MessageId::from_bytes(&bytes), Some(id));
    }
}
