#[macro_use]
extern crate rocket;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod election;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod store;

pub use config::Config;

/// Assemble the server: load config, connect the document store and the
/// ledger gateway, and mount the API.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(config::ConfigFairing)
        .attach(config::StoreFairing)
        .attach(config::LedgerFairing)
        .attach(logging::LoggerFairing)
        .mount("/api", api::routes())
}

/// Assemble a rocket around externally-constructed collaborators.
/// Tests use this to inject an in-memory store and a mock ledger.
#[cfg(test)]
pub(crate) fn rocket_for_collaborators(
    store: std::sync::Arc<dyn store::DocumentStore>,
    ledger: std::sync::Arc<dyn ledger::Ledger>,
) -> Rocket<Build> {
    rocket::build()
        .attach(config::ConfigFairing)
        .manage(store)
        .manage(ledger)
        .mount("/api", api::routes())
}

#[cfg(test)]
pub(crate) async fn test_client(
    store: std::sync::Arc<dyn store::DocumentStore>,
    ledger: std::sync::Arc<dyn ledger::Ledger>,
) -> rocket::local::asynchronous::Client {
    rocket::local::asynchronous::Client::tracked(rocket_for_collaborators(store, ledger))
        .await
        .unwrap()
}
