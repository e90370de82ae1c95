//! The on-the-wire envelope every message kind is carried in, per spec §6:
//! a type tag, the duty it belongs to, and an opaque encoded payload. The
//! payload encoding (SSZ for consensus/DKG, JSON for partial signatures) is
//! an engine-external concern; this type only fixes the envelope shape.

use crate::message_id::MessageId;

/// Distinguishes the three kinds of payload an [`SsvMessage`] can carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u64)]
pub enum MsgType {
    Consensus = 1,
    PartialSignature = 2,
    Dkg = 3,
}

/// The envelope every message exchanged between operators is wrapped in.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SsvMessage {
    pub msg_type: MsgType,
    pub msg_id: MessageId,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

impl SsvMessage {
    pub fn new(msg_type: MsgType, msg_id: MessageId, data: Vec<u8>) -> Self {
        Self { msg_type, msg_id, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duty::BeaconRole;
    use crate::message_id::ValidatorPublicKey;

    #[test]
    fn carries_opaque_payload() {
        let msg_id = MessageId::new(ValidatorPublicKey::new([1u8; 48]), BeaconRole::Attester);
        let msg = SsvMessage::new(MsgType::Consensus, msg_id, vec![1, 2, 3]);
        assert_eq!(msg.data, vec![1, 2, 3]);
    }
}
