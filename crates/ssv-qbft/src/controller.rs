//! Routes incoming messages to the instance matching their height and owns
//! the bounded history of decided instances — spec §4.2.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use ssv_config::ControllerConfig;
use ssv_types::{Committee, ConsensusData, Error, Height, OperatorId};

use crate::instance::{Instance, Outcome, ValueCheck};
use crate::message::QbftMessage;
use crate::signer::QbftSigner;

/// Builds a fresh [`ValueCheck`] for each instance the controller spawns;
/// role-specific runners supply the closure capturing whatever per-duty
/// context the check needs.
pub type ValueCheckFactory = Box<dyn Fn() -> Box<dyn ValueCheck>>;

pub struct Controller {
    self_id: OperatorId,
    committee: Committee,
    config: ControllerConfig,
    current_height: Height,
    instances: BTreeMap<Height, Instance>,
    future_signers: BTreeMap<Height, HashSet<OperatorId>>,
    value_check_factory: ValueCheckFactory,
}

impl Controller {
    pub fn new(
        self_id: OperatorId,
        committee: Committee,
        config: ControllerConfig,
        value_check_factory: ValueCheckFactory,
    ) -> Self {
        Self {
            self_id,
            committee,
            config,
            current_height: Height::new(0),
            instances: BTreeMap::new(),
            future_signers: BTreeMap::new(),
            value_check_factory,
        }
    }

    pub fn current_height(&self) -> Height {
        self.current_height
    }

    pub fn instance(&self, height: Height) -> Option<&Instance> {
        self.instances.get(&height)
    }

    /// Starts a new instance at `height`. Only valid when the previous
    /// height (`height.value() - 1`) is absent (genesis) or already
    /// decided — matches spec §4.2's "only if the previous height is
    /// decided" rule.
    pub fn start_instance(&mut self, height: Height, value: ConsensusData, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        if height.value() > 1 {
            let previous = Height::new(height.value() - 1);
            if let Some(previous_instance) = self.instances.get(&previous) {
                if previous_instance.decided_value().is_none() {
                    return Err(Error::ValueCheck("previous height not yet decided".into()));
                }
            }
        }

        let mut instance = Instance::new(height, self.committee.clone(), self.self_id, (self.value_check_factory)());
        let outcome = instance.start(value, signer)?;
        self.instances.insert(height, instance);
        self.current_height = height;
        self.prune();
        Ok(outcome)
    }

    /// Routes an incoming message per spec §4.2's height-based rules.
    pub fn process_message(&mut self, message: QbftMessage, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        let height = message.height();

        if height == self.current_height {
            return self.dispatch(height, message, signer);
        }

        if height < self.current_height {
            let age = self.current_height.value() - height.value();
            if age as usize > self.config.history_window {
                return Err(Error::Past(height.value()));
            }
            return match message {
                QbftMessage::Commit(_) => self.dispatch(height, message, signer),
                _ => {
                    debug!(height = %height, "dropping non-commit message for past height");
                    Ok(Outcome::default())
                }
            };
        }

        // Future height: buffer the signer, and catch up once enough
        // distinct signers have shown interest in it.
        let signers = self.future_signers.entry(height).or_default();
        if let Some(signer_id) = message.signer() {
            signers.insert(signer_id);
        }
        if signers.len() >= self.committee.max_faulty() + 1 {
            warn!(height = %height, "catching up to future height");
            self.future_signers.remove(&height);
            // Catch-up instances start without a known value; they wait for
            // a Proposal to arrive through the normal dispatch path above
            // on the next call, once routed at `height == current_height`.
            let instance = Instance::new(height, self.committee.clone(), self.self_id, (self.value_check_factory)());
            self.instances.insert(height, instance);
            self.current_height = height;
            self.prune();
            return Ok(Outcome::default());
        }

        Err(Error::Future(height.value()))
    }

    /// Forwards a per-round timer fire to the running instance at `height`,
    /// per spec §5's "each instance has a per-round timer" cancellation
    /// model. A no-op if no instance is running at that height (e.g. it
    /// already decided and was pruned).
    pub fn timeout(&mut self, height: Height, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        match self.instances.get_mut(&height) {
            Some(instance) => instance.timeout(signer),
            None => Ok(Outcome::default()),
        }
    }

    /// Resumes a controller after restart from a previously persisted
    /// highest-decided height (spec §6's optional `Storage` boundary),
    /// before any instance has been started. Only meaningful immediately
    /// after construction.
    pub fn resume_from_height(&mut self, height: Height) {
        self.current_height = height;
    }

    fn dispatch(&mut self, height: Height, message: QbftMessage, signer: &dyn QbftSigner) -> Result<Outcome, Error> {
        let instance = self.instances.get_mut(&height).ok_or(Error::NoInstance(height.value()))?;
        match message {
            QbftMessage::Proposal(m) => instance.process_proposal(m, signer),
            QbftMessage::Prepare(m) => instance.process_prepare(m, signer),
            QbftMessage::Commit(m) => instance.process_commit(m, signer),
            QbftMessage::RoundChange(m) => instance.process_round_change(m, signer),
        }
    }

    fn prune(&mut self) {
        let window = self.config.history_window as u64;
        let current = self.current_height.value();
        self.instances.retain(|height, _| current.saturating_sub(height.value()) <= window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committee(n: u64) -> Committee {
        Committee::new((1..=n).map(OperatorId::new))
    }

    struct AlwaysValid;
    impl ValueCheck for AlwaysValid {
        fn check(&self, _value: &ConsensusData) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn rejects_past_height_outside_window() {
        let controller = Controller::new(
            OperatorId::new(1),
            committee(4),
            ControllerConfig {
                history_window: 2,
                future_height_buffer_signers: 1,
            },
            Box::new(|| Box::new(AlwaysValid)),
        );
        assert_eq!(controller.current_height(), Height::new(0));
    }
}
