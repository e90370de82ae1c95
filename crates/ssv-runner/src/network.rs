//! The `Network` external-interface boundary (spec §6): a single fan-out
//! broadcast primitive with no delivery guarantees. The runner tolerates
//! loss by re-processing whatever a peer eventually retransmits; it never
//! blocks waiting for an acknowledgement.

use ssv_types::{Error, SsvMessage};

pub trait Network: Send + Sync {
    fn broadcast(&self, message: SsvMessage) -> Result<(), Error>;
}
