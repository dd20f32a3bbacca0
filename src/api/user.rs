use std::sync::Arc;

use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity;
use crate::model::auth::{AnyUser, AuthToken};
use crate::model::user::UserId;
use crate::store::DocumentStore;

pub fn routes() -> Vec<Route> {
    routes![user_info]
}

#[derive(Debug, Serialize, Deserialize)]
struct UserInfo {
    name: String,
    email: String,
    #[serde(rename = "userID")]
    user_id: UserId,
    #[serde(rename = "accountType")]
    account_type: String,
}

#[get("/user/info")]
async fn user_info(
    token: AuthToken<AnyUser>,
    store: &State<Arc<dyn DocumentStore>>,
) -> Result<Json<UserInfo>> {
    let record = identity::user_record(&**store.inner(), token.id())
        .await?
        .ok_or_else(|| Error::not_found(format!("user {}", token.id())))?;
    Ok(Json(UserInfo {
        name: record.name,
        email: record.email,
        user_id: token.id().clone(),
        account_type: if token.is_organizer() {
            "Organizer".to_string()
        } else {
            "Voter".to_string()
        },
    }))
}
