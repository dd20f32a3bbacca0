use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{self, FromRequest},
    Request, State,
};
use serde::{Deserialize, Serialize};
use time;

use crate::model::user::UserId;
use crate::Config;

pub const SESSION_COOKIE: &str = "session";

/// The authenticated identity behind a request: who, and with which role.
/// Role checks beyond routing live in the election manager, which takes
/// this struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserId,
    pub organizer: bool,
}

/// A role expectation for a route. Tokens whose role flag the marker does
/// not permit are forwarded, letting a differently-typed route take the
/// request instead.
pub trait Role {
    fn permits(organizer: bool) -> bool;
}

/// Marker for routes only organizers may reach.
pub struct Organizer;

/// Marker for routes only voters may reach.
pub struct Voter;

/// Marker for routes any authenticated user may reach.
pub struct AnyUser;

impl Role for Organizer {
    fn permits(organizer: bool) -> bool {
        organizer
    }
}

impl Role for Voter {
    fn permits(organizer: bool) -> bool {
        !organizer
    }
}

impl Role for AnyUser {
    fn permits(_organizer: bool) -> bool {
        true
    }
}

/// A session token representing a specific user with a specific role.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<R> {
    uid: UserId,
    #[serde(rename = "org")]
    organizer: bool,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl<R> AuthToken<R> {
    /// Issue a token for the given user. The role flag comes from the
    /// identity provider's claims, never from the client.
    pub fn new(uid: UserId, organizer: bool) -> Self {
        Self {
            uid,
            organizer,
            phantom: PhantomData,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.uid
    }

    pub fn is_organizer(&self) -> bool {
        self.organizer
    }

    pub fn session(&self) -> Session {
        Session {
            user: self.uid.clone(),
            organizer: self.organizer,
        }
    }

    /// Serialize this token into a session cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.session_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap(); // Infallible.

        Cookie::build(SESSION_COOKIE, token)
            .max_age(time::Duration::seconds(config.session_ttl().num_seconds()))
            .same_site(SameSite::Strict)
            .http_only(true)
            .finish()
    }

    /// Deserialize a token from a session cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Role,
{
    type Error = JwtError;

    /// Get an AuthToken from the session cookie and verify that its role
    /// flag satisfies this route's role marker.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = req.guard::<&State<Config>>().await.unwrap(); // Valid as `Config` is always managed

        let cookie = try_outcome!(req.cookies().get(SESSION_COOKIE).or_forward(()));
        let token: Self =
            try_outcome!(Self::from_cookie(cookie, config).into_outcome(Status::Unauthorized));

        if R::permits(token.organizer) {
            request::Outcome::Success(token)
        } else {
            request::Outcome::Forward(())
        }
    }
}

/// Claims inside an ID token minted by the identity provider at sign-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// The user's opaque identifier.
    pub sub: UserId,
    #[serde(rename = "isOrganizer", default)]
    pub organizer: bool,
    #[serde(rename = "exp", with = "ts_seconds")]
    pub expire_at: DateTime<Utc>,
}

/// Verify an identity-provider ID token against the shared secret.
pub fn verify_id_token(token: &str, config: &Config) -> Result<IdTokenClaims, JwtError> {
    jsonwebtoken::decode(
        token,
        &DecodingKey::from_secret(config.identity_secret()),
        &Validation::default(),
    )
    .map(|data: TokenData<IdTokenClaims>| data.claims)
}
