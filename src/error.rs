use log::{error, warn};
use rocket::{http::Status, response::status::Custom, response::Responder};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::model::election::ElectionId;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Bad request: invalid timestamp: {0}")]
    Time(#[from] chrono::ParseError),
    /// Ledger transport or protocol failure. Contract reverts never end up
    /// here; they are classified by [`Error::from_ledger`].
    #[error("Ledger failure: {0}")]
    Ledger(LedgerError),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Election {0} is not deployed")]
    NotDeployed(ElectionId),
    #[error("Not a valid voter")]
    NotAValidVoter,
    #[error("Vote has already been cast")]
    AlreadyVoted,
    #[error("Election has not ended")]
    NotEnded,
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Classify a ledger failure. Contract reverts carry a human-readable
    /// reason string which is matched against the known contract messages;
    /// anything unrecognised becomes a generic bad request. Transport and
    /// protocol failures pass through unchanged.
    pub fn from_ledger(err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted(reason) => {
                if reason.contains("Has no right to vote") {
                    Self::NotAValidVoter
                } else if reason.contains("Already voted") {
                    Self::AlreadyVoted
                } else if reason.contains("Election end time has not passed") {
                    Self::NotEnded
                } else {
                    Self::BadRequest(reason)
                }
            }
            other => Self::Ledger(other),
        }
    }
}

impl<'r> Responder<'r, 'static> for Error {
    /// Map the error to an HTTP status with a short text reason for the body.
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status = match &self {
            Self::Store(_) => Status::InternalServerError,
            Self::Ledger(_) => Status::BadGateway,
            Self::Jwt(_) | Self::Unauthorized(_) => Status::Unauthorized,
            Self::NotFound(_) => Status::NotFound,
            Self::Time(_)
            | Self::BadRequest(_)
            | Self::NotDeployed(_)
            | Self::NotAValidVoter
            | Self::AlreadyVoted
            | Self::NotEnded => Status::BadRequest,
        };
        match status.class() {
            rocket::http::StatusClass::ServerError => error!("{self}"),
            _ => warn!("{self}"),
        }
        Custom(status, self.to_string()).respond_to(req)
    }
}
