//! Runs a full 4-operator, threshold-3 FROST DKG in-process and checks that
//! the resulting shares reconstruct a signature matching the dealt
//! validator public key, the same property a live committee relies on
//! after a real key generation ceremony.

use std::collections::BTreeMap;

use blstrs::Scalar;
use ff::Field;
use group::Curve;

use ssv_crypto::{interpolate_g1, reconstruct_signature};
use ssv_dkg::{DkgError, DkgSession};
use ssv_types::{Committee, OperatorId};

fn committee(n: u64) -> Committee {
    Committee::new((1..=n).map(OperatorId::new))
}

/// Drives every session through all three rounds with honest inputs and
/// returns each operator's finished `ssv_crypto::Share`.
fn run_honest_dkg(n: u64) -> Vec<ssv_crypto::Share> {
    let mut rng = rand::rngs::OsRng;
    let request_id = [42u8; 32];
    let committee = committee(n);

    let mut sessions = BTreeMap::new();
    let mut commits = Vec::new();
    for id in committee.iter() {
        let (session, commit) = DkgSession::start(&mut rng, request_id, id, committee.clone());
        sessions.insert(id, session);
        commits.push(commit);
    }

    let mut pending_shares = Vec::new();
    for commit in &commits {
        for session in sessions.values_mut() {
            if let Some(shares) = session.process_commit(commit.clone()).unwrap() {
                pending_shares.extend(shares);
            }
        }
    }

    for share_msg in pending_shares {
        let session = sessions.get_mut(&share_msg.recipient).unwrap();
        session.process_share(share_msg).unwrap();
    }

    sessions.into_values().map(|mut s| s.finalize().unwrap()).collect()
}

/// Interpolates the validator public key from `t` operators' own public key
/// shares — the same combination `ssv-partial-sig` performs on signatures,
/// done here on G1 to recover the dealt constant term independently of
/// `Share::validator_public_key`.
fn interpolated_validator_key(shares: &[ssv_crypto::Share], subset: &[OperatorId]) -> blstrs::G1Affine {
    let points: Vec<_> = subset
        .iter()
        .map(|id| {
            let share = shares.iter().find(|s| s.operator_id == *id).unwrap();
            (*id, blstrs::G1Projective::from(*share.own_public_key_share().point()))
        })
        .collect();
    interpolate_g1(&points).unwrap().to_affine()
}

#[test]
fn honest_dkg_yields_consistent_validator_key() {
    let shares = run_honest_dkg(4);
    let validator_key = shares[0].validator_public_key;
    for share in &shares {
        assert_eq!(share.validator_public_key, validator_key);
    }
}

#[test]
fn any_threshold_subset_of_partial_signatures_reconstructs() {
    let shares = run_honest_dkg(4);
    let root = [7u8; 32];

    let signatures: Vec<_> = shares
        .iter()
        .map(|s| (s.operator_id, s.secret_share().sign(&root)))
        .collect();

    let sig_a = reconstruct_signature(&signatures[0..3]).unwrap();
    let sig_b = reconstruct_signature(&signatures[1..4]).unwrap();
    assert_eq!(sig_a, sig_b);

    let ids: Vec<_> = shares[0..3].iter().map(|s| s.operator_id).collect();
    let validator_key = interpolated_validator_key(&shares, &ids);
    assert!(sig_a.verify(&root, &validator_key));
}

#[test]
fn below_threshold_partial_signatures_do_not_match_full_reconstruction() {
    let shares = run_honest_dkg(4);
    let root = [9u8; 32];
    let signatures: Vec<_> = shares.iter().map(|s| (s.operator_id, s.secret_share().sign(&root))).collect();

    let full = reconstruct_signature(&signatures[0..3]).unwrap();

    // interpolating only 2 of the 4 shares is below the threshold of 3 and
    // must not land on the true (degree-2) secret's signature.
    let short: Vec<_> = signatures[0..2].to_vec();
    let points: Vec<_> = short.iter().map(|(id, sig)| (*id, blstrs::G2Projective::from(*sig.point()))).collect();
    let partial = ssv_crypto::interpolate_g2(&points).unwrap().to_affine();

    assert_ne!(partial, *full.point());
}

/// A dealer who sends a share that doesn't match its own round-1
/// commitment is caught in round 3 instead of silently corrupting the
/// recipient's secret: `finalize` aborts and the blame evidence names the
/// offending sender.
#[test]
fn tampered_share_is_caught_by_blame_and_aborts() {
    let mut rng = rand::rngs::OsRng;
    let request_id = [7u8; 32];
    let n = 4;
    let committee = committee(n);

    let mut sessions = BTreeMap::new();
    let mut commits = Vec::new();
    for id in committee.iter() {
        let (session, commit) = DkgSession::start(&mut rng, request_id, id, committee.clone());
        sessions.insert(id, session);
        commits.push(commit);
    }

    let mut pending_shares = Vec::new();
    for commit in &commits {
        for session in sessions.values_mut() {
            if let Some(shares) = session.process_commit(commit.clone()).unwrap() {
                pending_shares.extend(shares);
            }
        }
    }

    // Operator 1 dealt operator 2 a correct share; corrupt it in transit so
    // it no longer matches operator 1's published commitment.
    for share_msg in &mut pending_shares {
        if share_msg.sender == OperatorId::new(1) && share_msg.recipient == OperatorId::new(2) {
            share_msg.share += Scalar::ONE;
        }
    }

    for share_msg in pending_shares {
        let session = sessions.get_mut(&share_msg.recipient).unwrap();
        session.process_share(share_msg).unwrap();
    }

    let victim = sessions.get_mut(&OperatorId::new(2)).unwrap();
    let result = victim.finalize();
    assert!(matches!(result, Err(DkgError::Aborted(1))));
    assert_eq!(victim.blames().len(), 1);
    assert_eq!(victim.blames()[0].accused, OperatorId::new(1));
    assert_eq!(victim.blames()[0].accuser, OperatorId::new(2));

    // Every other, honest participant still finalizes cleanly.
    let honest = sessions.get_mut(&OperatorId::new(3)).unwrap().finalize();
    assert!(honest.is_ok());
}
