use log::{info, warn};

use crate::error::{Error, Result};
use crate::identity;
use crate::ledger::{Address, ElectionContract, Ledger};
use crate::model::user::{AccountIndex, VoterId};
use crate::store::DocumentStore;

/// Outcome of a voter-validation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Voter IDs that could not be resolved to a wallet account.
    pub invalid: Vec<VoterId>,
    /// Addresses the contract now recognises as valid voters.
    pub granted: Vec<Address>,
}

/// Resolve each voter ID to a ledger address and grant every resolved
/// address the right to vote in one batched transaction signed by the
/// organizer.
///
/// An unresolvable ID never aborts the batch: it is recorded and skipped,
/// and the caller reports the invalid IDs as data rather than failing the
/// whole operation.
pub async fn validate_voters(
    store: &dyn DocumentStore,
    ledger: &dyn Ledger,
    voter_ids: &[VoterId],
    contract_address: &Address,
    organizer_account: AccountIndex,
) -> Result<ValidationOutcome> {
    let mut invalid = Vec::new();
    let mut granted = Vec::new();

    for voter_id in voter_ids {
        match identity::account_of(store, voter_id).await? {
            Some(account) => {
                let address = ledger
                    .resolve_address(account)
                    .await
                    .map_err(Error::from_ledger)?;
                granted.push(address);
            }
            None => {
                warn!("voter {voter_id} is not registered, skipping");
                invalid.push(voter_id.clone());
            }
        }
    }

    let organizer_address = ledger
        .resolve_address(organizer_account)
        .await
        .map_err(Error::from_ledger)?;
    let contract = ElectionContract::at(ledger, contract_address.clone());
    contract
        .give_right_to_vote(&granted, &organizer_address)
        .await
        .map_err(Error::from_ledger)?;

    info!(
        "granted voting rights to {} of {} voters on {contract_address}",
        granted.len(),
        voter_ids.len()
    );
    Ok(ValidationOutcome { invalid, granted })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identity::register;
    use crate::ledger::MockLedger;
    use crate::model::user::UserId;
    use crate::store::MemoryStore;

    async fn registered(store: &MemoryStore, uid: &str) -> UserId {
        let user = UserId::new(uid);
        register(
            store,
            &user,
            uid.to_string(),
            format!("{uid}@example.com"),
        )
        .await
        .unwrap();
        user
    }

    #[rocket::async_test]
    async fn unknown_voters_do_not_abort_the_batch() {
        let store = MemoryStore::new();
        let ledger = MockLedger::default();
        let contract = Address::from("0xelection".to_string());

        let v1 = registered(&store, "v1").await; // account 10
        let v2 = registered(&store, "v2").await; // account 11
        let unknown = UserId::new("nobody");

        let outcome = validate_voters(
            &store,
            &ledger,
            &[v1, unknown.clone(), v2],
            &contract,
            5,
        )
        .await
        .unwrap();

        assert_eq!(outcome.invalid, vec![unknown]);
        assert_eq!(
            outcome.granted,
            vec![
                MockLedger::account_address(10),
                MockLedger::account_address(11),
            ]
        );

        // One batched grant covering exactly the resolved voters.
        let batches = ledger.grant_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], outcome.granted);
        assert!(ledger.voter_status(&MockLedger::account_address(10)).valid_voter);
        assert!(ledger.voter_status(&MockLedger::account_address(11)).valid_voter);
    }

    #[rocket::async_test]
    async fn empty_grant_still_reports_all_invalid() {
        let store = MemoryStore::new();
        let ledger = MockLedger::default();
        let contract = Address::from("0xelection".to_string());

        let outcome = validate_voters(
            &store,
            &ledger,
            &[UserId::new("ghost1"), UserId::new("ghost2")],
            &contract,
            5,
        )
        .await
        .unwrap();

        assert_eq!(outcome.invalid.len(), 2);
        assert!(outcome.granted.is_empty());
        assert_eq!(ledger.grant_batches(), vec![Vec::<Address>::new()]);
    }
}
