use std::sync::Arc;

use rocket::{
    http::{Cookie, CookieJar},
    serde::json::Json,
    Route, State,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identity;
use crate::model::auth::{verify_id_token, AnyUser, AuthToken, SESSION_COOKIE};
use crate::store::DocumentStore;
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![login, logout, register]
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(rename = "idToken")]
    id_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LoginResponse {
    #[serde(rename = "isOrganizer")]
    is_organizer: bool,
}

/// Exchange an identity-provider ID token for a session cookie.
#[post("/login", data = "<request>", format = "json")]
async fn login(
    request: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<Json<LoginResponse>> {
    let claims = verify_id_token(&request.id_token, config)?;

    let token = AuthToken::<AnyUser>::new(claims.sub, claims.organizer);
    let is_organizer = token.is_organizer();
    cookies.add(token.into_cookie(config));

    Ok(Json(LoginResponse { is_organizer }))
}

#[get("/logout")]
fn logout(cookies: &CookieJar<'_>) -> &'static str {
    cookies.remove(Cookie::named(SESSION_COOKIE));
    "logged out"
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(rename = "idToken")]
    id_token: String,
    name: String,
    email: String,
}

/// Store the profile of a freshly signed-up user and assign them a wallet
/// account. The identity provider has already created their login; the ID
/// token proves it.
#[post("/register", data = "<request>", format = "json")]
async fn register(
    request: Json<RegisterRequest>,
    store: &State<Arc<dyn DocumentStore>>,
    config: &State<Config>,
) -> Result<&'static str> {
    let request = request.into_inner();
    let claims = verify_id_token(&request.id_token, config)?;
    identity::register(&**store.inner(), &claims.sub, request.name, request.email).await?;
    Ok("User successfully registered")
}

#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};

    use crate::api::testing::{id_token, login_as, setup};
    use crate::identity::user_record;
    use crate::model::user::UserId;

    use super::*;

    #[rocket::async_test]
    async fn register_then_login() {
        let (client, store, _ledger) = setup().await;

        // Register through the API.
        let token = id_token(&client, "org-1", true);
        let response = client
            .post(uri!("/api", register))
            .header(ContentType::JSON)
            .body(
                serde_json::json!({
                    "idToken": token,
                    "name": "Olive",
                    "email": "olive@example.com",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        // The profile landed in the store with the first account index.
        let record = user_record(&*store, &UserId::new("org-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.account, 10);
        assert_eq!(record.name, "Olive");

        // Login issues a session cookie and echoes the role.
        let response = client
            .post(uri!("/api", login))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "idToken": id_token(&client, "org-1", true) }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: LoginResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(body.is_organizer);
        assert!(client.cookies().get(SESSION_COOKIE).is_some());
    }

    #[rocket::async_test]
    async fn duplicate_registration_is_a_bad_request() {
        let (client, _store, _ledger) = setup().await;
        login_as(&client, "v1", false).await;

        let response = client
            .post(uri!("/api", register))
            .header(ContentType::JSON)
            .body(
                serde_json::json!({
                    "idToken": id_token(&client, "v1", false),
                    "name": "Vera",
                    "email": "v1@example.com",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn login_with_a_bad_token_is_unauthorized() {
        let (client, _store, _ledger) = setup().await;

        let response = client
            .post(uri!("/api", login))
            .header(ContentType::JSON)
            .body(serde_json::json!({ "idToken": "not-a-jwt" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
    }

    #[rocket::async_test]
    async fn logout_clears_the_session() {
        let (client, _store, _ledger) = setup().await;
        login_as(&client, "v1", false).await;
        assert!(client.cookies().get(SESSION_COOKIE).is_some());

        let response = client.get(uri!("/api", logout)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert!(client.cookies().get(SESSION_COOKIE).is_none());
    }
}
