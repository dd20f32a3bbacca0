use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::identity;
use crate::ledger::{Address, ElectionContract, Ledger};
use crate::model::auth::Session;
use crate::model::election::{
    BallotStatus, CandidateResult, ElectionId, ElectionRecord, ElectionResults, ElectionSpec,
    OrganizerView, TimeBucket, VoterList, VoterView,
};
use crate::model::timestamp::Timestamp;
use crate::model::user::{AccountIndex, VoterId};
use crate::store::{DocumentStore, StoreError};

use super::validate::validate_voters;

const ELECTIONS_PATH: &str = "elections";

fn election_path(id: &ElectionId) -> String {
    format!("{ELECTIONS_PATH}/{id}")
}

fn address_path(id: &ElectionId) -> String {
    format!("{ELECTIONS_PATH}/{id}/address")
}

/// Outcome of a deployment request. Requesting deployment of an
/// already-deployed election is not an error, but it is reported
/// distinctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Deployed {
        address: Address,
        invalid_voters: Vec<VoterId>,
    },
    AlreadyDeployed {
        address: Address,
    },
}

/// Owns the lifecycle of elections: drafts in the document store, one-way
/// deployment onto the ledger, reconciliation of the two on every read.
pub struct ElectionManager {
    store: Arc<dyn DocumentStore>,
    ledger: Arc<dyn Ledger>,
}

impl ElectionManager {
    pub fn new(store: Arc<dyn DocumentStore>, ledger: Arc<dyn Ledger>) -> Self {
        Self { store, ledger }
    }

    /// Create a draft election. It lives only in the document store until
    /// deployed; the time window must be coherent from the start.
    pub async fn create_draft(
        &self,
        requester: &Session,
        spec: ElectionSpec,
    ) -> Result<ElectionId> {
        require_organizer(requester)?;
        let (start_time, end_time) = parse_window(&spec)?;

        // Resolve the organizer's display name for denormalised storage.
        let organizer = identity::user_record(&*self.store, &requester.user)
            .await?
            .ok_or_else(|| Error::bad_request("organizer is not registered"))?;

        let record = ElectionRecord {
            election_name: spec.election_name,
            organizer_name: organizer.name,
            organizer_id: requester.user.clone(),
            candidates: spec.candidates,
            start_time,
            end_time,
            voters: VoterList::Unresolved(spec.valid_voters),
            address: None,
        };
        let value = serde_json::to_value(&record).expect("serialisation is infallible");
        let key = self.store.push(ELECTIONS_PATH, &value).await?;
        let id = ElectionId::new(key);
        info!("organizer {} created draft election {id}", requester.user);
        Ok(id)
    }

    /// The full election, for its organizer of record only.
    pub async fn organizer_view(
        &self,
        requester: &Session,
        id: &ElectionId,
    ) -> Result<OrganizerView> {
        require_organizer(requester)?;
        let record = self.read_owned(requester, id).await?;
        Ok(record.into())
    }

    /// The filtered election a voter may see. For a deployed election the
    /// requester's own ballot status is read back from the contract; a
    /// draft never touches the ledger.
    pub async fn voter_view(&self, requester: &Session, id: &ElectionId) -> Result<VoterView> {
        let record = self.read_election(id).await?;
        let ballot = match &record.address {
            Some(address) => {
                let mut status = BallotStatus::default();
                if let Some(account) =
                    identity::account_of(&*self.store, &requester.user).await?
                {
                    let on_chain = self
                        .contract_voter_status(address, account)
                        .await?;
                    if on_chain.valid_voter && on_chain.voted {
                        status = BallotStatus {
                            voted: true,
                            voted_for: Some(on_chain.voted_for),
                        };
                    }
                }
                Some(status)
            }
            None => None,
        };
        Ok(VoterView::new(record, ballot))
    }

    /// All elections this organizer runs, in the requested time bucket.
    pub async fn list_for_organizer(
        &self,
        requester: &Session,
        bucket: TimeBucket,
    ) -> Result<HashMap<ElectionId, OrganizerView>> {
        require_organizer(requester)?;
        let now = Timestamp::now();
        let mut views = HashMap::new();
        for (id, record) in self.all_elections().await? {
            if record.organized_by(&requester.user) && record.bucket(now) == bucket {
                views.insert(id, record.into());
            }
        }
        Ok(views)
    }

    /// All deployed elections this voter may vote in, in the requested
    /// time bucket. Eligibility lives on-chain, so this costs one ledger
    /// round-trip per deployed election.
    pub async fn list_for_voter(
        &self,
        requester: &Session,
        bucket: TimeBucket,
    ) -> Result<HashMap<ElectionId, VoterView>> {
        let account = identity::account_of(&*self.store, &requester.user)
            .await?
            .ok_or_else(|| Error::bad_request("voter is not registered"))?;
        let voter_address = self
            .ledger
            .resolve_address(account)
            .await
            .map_err(Error::from_ledger)?;

        let now = Timestamp::now();
        let mut views = HashMap::new();
        for (id, record) in self.all_elections().await? {
            let address = match &record.address {
                Some(address) => address,
                None => continue,
            };
            let contract = ElectionContract::at(&*self.ledger, address.clone());
            let status = contract
                .voter(&voter_address)
                .await
                .map_err(Error::from_ledger)?;
            if status.valid_voter && record.bucket(now) == bucket {
                views.insert(id, VoterView::new(record, None));
            }
        }
        Ok(views)
    }

    /// Replace a draft's contents. Deployment freezes an election: the
    /// contract on the ledger can no longer be made to match, so updates
    /// are refused from then on.
    pub async fn update(
        &self,
        requester: &Session,
        id: &ElectionId,
        spec: ElectionSpec,
    ) -> Result<()> {
        require_organizer(requester)?;
        let record = self.read_owned(requester, id).await?;
        if record.is_deployed() {
            return Err(Error::bad_request(format!(
                "election {id} is deployed and can no longer be modified"
            )));
        }
        let (start_time, end_time) = parse_window(&spec)?;

        let mut fields = Map::new();
        fields.insert("electionName".to_string(), json!(spec.election_name));
        fields.insert("candidates".to_string(), json!(spec.candidates));
        fields.insert("startTime".to_string(), json!(start_time));
        fields.insert("endTime".to_string(), json!(end_time));
        fields.insert(
            "voters".to_string(),
            json!(VoterList::Unresolved(spec.valid_voters)),
        );
        self.store.update(&election_path(id), &fields).await?;
        Ok(())
    }

    /// Publish an election's contract onto the ledger and grant the listed
    /// voters their rights.
    ///
    /// The address is persisted with a conditional write keyed on its
    /// previous absence, making deployment a one-way transition even under
    /// concurrent requests: the loser of a race reports the winner's
    /// address instead of redeploying.
    pub async fn deploy(&self, requester: &Session, id: &ElectionId) -> Result<DeployOutcome> {
        require_organizer(requester)?;
        let record = self.read_owned(requester, id).await?;
        if let Some(address) = record.address {
            return Ok(DeployOutcome::AlreadyDeployed { address });
        }

        let voter_ids = match &record.voters {
            VoterList::Unresolved(ids) => ids.clone(),
            VoterList::Resolved(_) => {
                // Resolved voters without an address should be impossible.
                return Err(Error::bad_request(format!(
                    "election {id} has a resolved voter list but no address"
                )));
            }
        };
        if record.candidates.is_empty() {
            return Err(Error::bad_request(
                "cannot deploy an election without candidates",
            ));
        }

        let organizer_account = identity::account_of(&*self.store, &requester.user)
            .await?
            .ok_or_else(|| Error::bad_request("organizer is not registered"))?;
        let organizer_address = self
            .ledger
            .resolve_address(organizer_account)
            .await
            .map_err(Error::from_ledger)?;

        let deployment = ElectionContract::deploy(
            &*self.ledger,
            &record.candidates,
            record.end_time,
            record.start_time,
            &organizer_address,
        )
        .await
        .map_err(Error::from_ledger)?;

        let claimed = self
            .store
            .compare_and_swap(&address_path(id), None, &json!(deployment.address))
            .await?;
        if !claimed {
            // A concurrent deployment won the race; our contract is orphaned.
            warn!(
                "election {id}: lost deployment race, contract {} unused",
                deployment.address
            );
            let address = self
                .read_election(id)
                .await?
                .address
                .ok_or_else(|| StoreError::Malformed {
                    path: address_path(id),
                    message: "address vanished after losing deployment race".to_string(),
                })?;
            return Ok(DeployOutcome::AlreadyDeployed { address });
        }
        info!(
            "election {id} deployed at {} (tx {})",
            deployment.address, deployment.transaction_hash
        );

        // Grant rights and convert the allow-list to resolved addresses.
        let outcome = validate_voters(
            &*self.store,
            &*self.ledger,
            &voter_ids,
            &deployment.address,
            organizer_account,
        )
        .await?;
        self.write_voter_list(id, VoterList::Resolved(outcome.granted))
            .await?;

        Ok(DeployOutcome::Deployed {
            address: deployment.address,
            invalid_voters: outcome.invalid,
        })
    }

    /// Grant additional voters their rights on an already-deployed
    /// election, appending them to the stored allow-list. Unresolvable IDs
    /// are reported back, not failed on.
    pub async fn add_voters(
        &self,
        requester: &Session,
        id: &ElectionId,
        voter_ids: &[VoterId],
    ) -> Result<Vec<VoterId>> {
        require_organizer(requester)?;
        let record = self.read_owned(requester, id).await?;
        let address = record
            .address
            .clone()
            .ok_or_else(|| Error::NotDeployed(id.clone()))?;

        let organizer_account = identity::account_of(&*self.store, &requester.user)
            .await?
            .ok_or_else(|| Error::bad_request("organizer is not registered"))?;
        let outcome = validate_voters(
            &*self.store,
            &*self.ledger,
            voter_ids,
            &address,
            organizer_account,
        )
        .await?;

        let mut resolved = match record.voters {
            VoterList::Resolved(addresses) => addresses,
            // Deployment was interrupted before the list conversion;
            // rebuild it from this grant.
            VoterList::Unresolved(_) => Vec::new(),
        };
        resolved.extend(outcome.granted);
        self.write_voter_list(id, VoterList::Resolved(resolved))
            .await?;

        Ok(outcome.invalid)
    }

    /// Cast the requester's vote. The contract is the authority on
    /// eligibility and double votes; its rejections are classified by
    /// reason string and reported as final.
    pub async fn cast_vote(
        &self,
        requester: &Session,
        id: &ElectionId,
        candidate: u32,
    ) -> Result<String> {
        if requester.organizer {
            return Err(Error::unauthorized("organizers cannot vote"));
        }
        let account = identity::account_of(&*self.store, &requester.user)
            .await?
            .ok_or_else(|| Error::bad_request("voter is not registered"))?;
        let record = self.read_election(id).await?;
        let address = record.address.ok_or_else(|| Error::NotDeployed(id.clone()))?;

        let voter_address = self
            .ledger
            .resolve_address(account)
            .await
            .map_err(Error::from_ledger)?;
        let contract = ElectionContract::at(&*self.ledger, address);
        let receipt = contract
            .vote(candidate, &voter_address)
            .await
            .map_err(Error::from_ledger)?;
        info!("vote cast on election {id} (tx {})", receipt.transaction_hash);
        Ok(receipt.transaction_hash)
    }

    /// Tally up the results of an ended election: per-candidate counts,
    /// their sum, and the contract's winner.
    pub async fn results(&self, requester: &Session, id: &ElectionId) -> Result<ElectionResults> {
        // Any registered user may see results.
        identity::account_of(&*self.store, &requester.user)
            .await?
            .ok_or_else(|| Error::bad_request("requester is not registered"))?;
        let record = self.read_election(id).await?;
        let address = record.address.ok_or_else(|| Error::NotDeployed(id.clone()))?;

        let contract = ElectionContract::at(&*self.ledger, address);
        let count = contract
            .number_of_candidates()
            .await
            .map_err(Error::from_ledger)?;

        let mut results = Vec::with_capacity(count as usize);
        let mut total_votes = 0;
        for index in 0..count {
            let tally = contract.candidate(index).await.map_err(Error::from_ledger)?;
            total_votes += tally.vote_count;
            results.push(CandidateResult {
                name: tally.name,
                votes: tally.vote_count,
            });
        }
        let winner = contract.winner().await.map_err(Error::from_ledger)?;

        Ok(ElectionResults {
            total_votes,
            results,
            winner,
        })
    }

    /// Read an election or fail with not-found.
    async fn read_election(&self, id: &ElectionId) -> Result<ElectionRecord> {
        let value = self
            .store
            .read(&election_path(id))
            .await?
            .ok_or_else(|| Error::not_found(format!("election {id}")))?;
        decode_record(id, value)
    }

    /// Read an election and check the requester organizes it.
    async fn read_owned(&self, requester: &Session, id: &ElectionId) -> Result<ElectionRecord> {
        let record = self.read_election(id).await?;
        if !record.organized_by(&requester.user) {
            return Err(Error::unauthorized(format!(
                "election {id} belongs to a different organizer"
            )));
        }
        Ok(record)
    }

    /// Read every stored election.
    async fn all_elections(&self) -> Result<Vec<(ElectionId, ElectionRecord)>> {
        let tree = match self.store.read(ELECTIONS_PATH).await? {
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(StoreError::Malformed {
                    path: ELECTIONS_PATH.to_string(),
                    message: "elections root is not an object".to_string(),
                }
                .into())
            }
            None => return Ok(Vec::new()),
        };
        tree.into_iter()
            .map(|(key, value)| {
                let id = ElectionId::new(key);
                let record = decode_record(&id, value)?;
                Ok((id, record))
            })
            .collect()
    }

    async fn write_voter_list(&self, id: &ElectionId, voters: VoterList) -> Result<()> {
        let mut fields = Map::new();
        fields.insert("voters".to_string(), json!(voters));
        self.store.update(&election_path(id), &fields).await?;
        Ok(())
    }

    async fn contract_voter_status(
        &self,
        contract_address: &Address,
        account: AccountIndex,
    ) -> Result<crate::ledger::VoterStatus> {
        let voter_address = self
            .ledger
            .resolve_address(account)
            .await
            .map_err(Error::from_ledger)?;
        let contract = ElectionContract::at(&*self.ledger, contract_address.clone());
        contract
            .voter(&voter_address)
            .await
            .map_err(Error::from_ledger)
    }
}

fn require_organizer(session: &Session) -> Result<()> {
    if session.organizer {
        Ok(())
    } else {
        Err(Error::unauthorized("only organizers may do this"))
    }
}

/// Parse and validate an election spec's time window.
fn parse_window(spec: &ElectionSpec) -> Result<(Timestamp, Timestamp)> {
    let start_time = Timestamp::parse_human(&spec.start_time)?;
    let end_time = Timestamp::parse_human(&spec.end_time)?;
    if start_time >= end_time {
        return Err(Error::bad_request("startTime must be before endTime"));
    }
    Ok((start_time, end_time))
}

fn decode_record(id: &ElectionId, value: Value) -> Result<ElectionRecord> {
    serde_json::from_value(value).map_err(|err| {
        StoreError::Malformed {
            path: election_path(id),
            message: err.to_string(),
        }
        .into()
    })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ElectionManager {
    type Error = ();

    /// Assemble the manager from the managed store and ledger.
    ///
    /// Panics iff either collaborator is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req
            .guard::<&State<Arc<dyn DocumentStore>>>()
            .await
            .unwrap();
        let ledger = req.guard::<&State<Arc<dyn Ledger>>>().await.unwrap();
        request::Outcome::Success(Self::new(store.inner().clone(), ledger.inner().clone()))
    }
}
