use std::collections::HashMap;

use rocket::{http::Status, serde::json::Json, Route};
use serde::{Deserialize, Serialize};

use crate::election::{DeployOutcome, ElectionManager};
use crate::error::Result;
use crate::ledger::Address;
use crate::model::auth::{AnyUser, AuthToken, Organizer, Voter};
use crate::model::election::{
    ElectionId, ElectionResults, ElectionSpec, OrganizerView, TimeBucket, VoterView,
};
use crate::model::user::VoterId;

pub fn routes() -> Vec<Route> {
    routes![
        create,
        get_as_organizer,
        get_as_voter,
        list_as_organizer,
        list_as_voter,
        update,
        deploy,
        validate,
        vote,
        result,
    ]
}

#[derive(Debug, Serialize, Deserialize)]
struct ElectionKey {
    #[serde(rename = "electionID")]
    election_id: ElectionId,
}

#[post("/election/create", data = "<spec>", format = "json")]
async fn create(
    token: AuthToken<AnyUser>,
    spec: Json<ElectionSpec>,
    manager: ElectionManager,
) -> Result<Json<ElectionKey>> {
    let election_id = manager
        .create_draft(&token.session(), spec.into_inner())
        .await?;
    Ok(Json(ElectionKey { election_id }))
}

#[get("/election/<id>", rank = 1)]
async fn get_as_organizer(
    token: AuthToken<Organizer>,
    id: ElectionId,
    manager: ElectionManager,
) -> Result<Json<OrganizerView>> {
    let view = manager.organizer_view(&token.session(), &id).await?;
    Ok(Json(view))
}

#[get("/election/<id>", rank = 2)]
async fn get_as_voter(
    token: AuthToken<Voter>,
    id: ElectionId,
    manager: ElectionManager,
) -> Result<Json<VoterView>> {
    let view = manager.voter_view(&token.session(), &id).await?;
    Ok(Json(view))
}

#[get("/election?<time>", rank = 1)]
async fn list_as_organizer(
    token: AuthToken<Organizer>,
    time: TimeBucket,
    manager: ElectionManager,
) -> Result<Json<HashMap<ElectionId, OrganizerView>>> {
    let views = manager.list_for_organizer(&token.session(), time).await?;
    Ok(Json(views))
}

#[get("/election?<time>", rank = 2)]
async fn list_as_voter(
    token: AuthToken<Voter>,
    time: TimeBucket,
    manager: ElectionManager,
) -> Result<Json<HashMap<ElectionId, VoterView>>> {
    let views = manager.list_for_voter(&token.session(), time).await?;
    Ok(Json(views))
}

#[put("/election/<id>/update", data = "<spec>", format = "json")]
async fn update(
    token: AuthToken<AnyUser>,
    id: ElectionId,
    spec: Json<ElectionSpec>,
    manager: ElectionManager,
) -> Result<Json<ElectionKey>> {
    manager
        .update(&token.session(), &id, spec.into_inner())
        .await?;
    Ok(Json(ElectionKey { election_id: id }))
}

#[derive(Debug, Serialize, Deserialize)]
struct DeployResponse {
    #[serde(rename = "electionID", skip_serializing_if = "Option::is_none")]
    election_id: Option<ElectionId>,
    #[serde(rename = "electionAddress")]
    election_address: Address,
    #[serde(rename = "invalidVoterIDs", skip_serializing_if = "Option::is_none")]
    invalid_voter_ids: Option<Vec<VoterId>>,
}

/// Deploy an election. Requesting deployment again answers 409 with the
/// existing address rather than redeploying.
#[put("/election/<id>/deploy")]
async fn deploy(
    token: AuthToken<AnyUser>,
    id: ElectionId,
    manager: ElectionManager,
) -> Result<(Status, Json<DeployResponse>)> {
    let outcome = manager.deploy(&token.session(), &id).await?;
    Ok(match outcome {
        DeployOutcome::Deployed {
            address,
            invalid_voters,
        } => (
            Status::Ok,
            Json(DeployResponse {
                election_id: Some(id),
                election_address: address,
                invalid_voter_ids: Some(invalid_voters),
            }),
        ),
        DeployOutcome::AlreadyDeployed { address } => (
            Status::Conflict,
            Json(DeployResponse {
                election_id: None,
                election_address: address,
                invalid_voter_ids: None,
            }),
        ),
    })
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    #[serde(rename = "validVoters")]
    valid_voters: Vec<VoterId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ValidateResponse {
    #[serde(rename = "invalidVoterIDs")]
    invalid_voter_ids: Vec<VoterId>,
}

#[put("/election/<id>/validate", data = "<request>", format = "json")]
async fn validate(
    token: AuthToken<AnyUser>,
    id: ElectionId,
    request: Json<ValidateRequest>,
    manager: ElectionManager,
) -> Result<Json<ValidateResponse>> {
    let invalid_voter_ids = manager
        .add_voters(&token.session(), &id, &request.valid_voters)
        .await?;
    Ok(Json(ValidateResponse { invalid_voter_ids }))
}

#[derive(Debug, Deserialize)]
struct VoteRequest {
    #[serde(rename = "candidateID")]
    candidate_id: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct VoteReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
}

#[put("/election/<id>/vote", data = "<request>", format = "json")]
async fn vote(
    token: AuthToken<AnyUser>,
    id: ElectionId,
    request: Json<VoteRequest>,
    manager: ElectionManager,
) -> Result<Json<VoteReceipt>> {
    let transaction_hash = manager
        .cast_vote(&token.session(), &id, request.candidate_id)
        .await?;
    Ok(Json(VoteReceipt { transaction_hash }))
}

#[get("/election/<id>/result")]
async fn result(
    token: AuthToken<AnyUser>,
    id: ElectionId,
    manager: ElectionManager,
) -> Result<Json<ElectionResults>> {
    let results = manager.results(&token.session(), &id).await?;
    Ok(Json(results))
}
