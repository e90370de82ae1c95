//! The optional `Storage` external-interface boundary (spec §6): lets a
//! controller resume its history window across a process restart instead
//! of replaying every height from height 1.

use ssv_types::{BeaconRole, Error, Height, ValidatorPublicKey};

pub trait Storage: Send + Sync {
    fn save_highest_decided(&self, validator_public_key: ValidatorPublicKey, role: BeaconRole, height: Height) -> Result<(), Error>;
    fn get_highest_decided(&self, validator_public_key: ValidatorPublicKey, role: BeaconRole) -> Result<Option<Height>, Error>;
}
