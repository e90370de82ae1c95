//! QBFT/IBFT-style consensus: one `Instance` per height, routed by a
//! `Controller` spanning a bounded history window.

pub mod container;
pub mod controller;
pub mod instance;
pub mod message;
pub mod signer;

pub use controller::{Controller, ValueCheckFactory};
pub use instance::{DecidedValue, Instance, InstanceState, Outcome, ValueCheck};
pub use message::{CommitData, PrepareData, ProposalData, QbftMessage, RoundChangeData, RoundChangeJustification};
pub use signer::{QbftSigner, ShareSigner};
