use rocket::Route;

mod auth;
mod election;
mod user;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(election::routes());
    routes.extend(user::routes());
    routes
}
