//! A single operator's complete view of a validator's threshold key
//! material: its own secret share, every operator's public share (needed to
//! verify partial signatures before they're aggregated), and the committee
//! geometry the share was dealt for.

use std::collections::BTreeMap;

use ssv_types::{Committee, OperatorId, ValidatorPublicKey};

use crate::bls::{PublicKeyShare, SecretKeyShare};
use crate::error::CryptoError;

/// Key material for one validator, as held by one operator in the committee.
#[derive(Clone)]
pub struct Share {
    pub operator_id: OperatorId,
    pub validator_public_key: ValidatorPublicKey,
    pub committee: Committee,
    secret_share: SecretKeyShare,
    public_key_shares: BTreeMap<OperatorId, PublicKeyShare>,
}

impl Share {
    pub fn new(
        operator_id: OperatorId,
        validator_public_key: ValidatorPublicKey,
        committee: Committee,
        secret_share: SecretKeyShare,
        public_key_shares: BTreeMap<OperatorId, PublicKeyShare>,
    ) -> Self {
        Self {
            operator_id,
            validator_public_key,
            committee,
            secret_share,
            public_key_shares,
        }
    }

    pub fn secret_share(&self) -> &SecretKeyShare {
        &self.secret_share
    }

    pub fn public_key_share(&self, operator: OperatorId) -> Result<&PublicKeyShare, CryptoError> {
        self.public_key_shares
            .get(&operator)
            .ok_or(CryptoError::MissingPublicKeyShare(operator.value()))
    }

    pub fn own_public_key_share(&self) -> &PublicKeyShare {
        // Present by construction: DKG output always registers the dealer's own share.
        self.public_key_shares
            .get(&self.operator_id)
            .expect("share must contain its own operator's public key share")
    }

    /// Committee threshold required to reconstruct a signature over this
    /// validator's key, i.e. `Committee::quorum`.
    pub fn threshold(&self) -> usize {
        self.committee.quorum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssv_types::ValidatorPublicKey;

    #[test]
    fn threshold_matches_committee_quorum() {
        let committee = Committee::new((1..=4).map(OperatorId::new));
        let mut rng = rand::rngs::OsRng;
        let secret = SecretKeyShare::random(&mut rng);
        let mut shares = BTreeMap::new();
        shares.insert(OperatorId::new(1), secret.public_key_share());
        let share = Share::new(
            OperatorId::new(1),
            ValidatorPublicKey::new([0u8; 48]),
            committee,
            secret,
            shares,
        );
        assert_eq!(share.threshold(), 3);
    }
}
