mod token;

pub use token::{
    verify_id_token, AnyUser, AuthToken, IdTokenClaims, Organizer, Role, Session, Voter,
    SESSION_COOKIE,
};
