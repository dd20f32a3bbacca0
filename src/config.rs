use std::sync::Arc;

use chrono::Duration;
use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::ledger::{GatewayLedger, Ledger};
use crate::store::{DocumentStore, FirebaseStore};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    session_ttl: u32,
    // secrets
    jwt_secret: String,
    identity_secret: String,
}

impl Config {
    /// Valid lifetime of session cookies in seconds.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl.into())
    }

    /// Secret key used to sign session JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Shared secret used to verify ID tokens from the identity provider.
    pub fn identity_secret(&self) -> &[u8] {
        self.identity_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the document store.
#[derive(Deserialize)]
struct StoreConfig {
    // non-secrets
    store_url: String,
    // secrets
    store_auth: Option<String>,
}

/// A fairing that loads the document store config, constructs the client,
/// and places it into managed state behind the [`DocumentStore`] trait.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Document store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load document store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let store: Arc<dyn DocumentStore> =
            Arc::new(FirebaseStore::new(config.store_url, config.store_auth));
        info!("Loaded document store config");

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// Configuration for the ledger gateway.
#[derive(Deserialize)]
struct LedgerConfig {
    // non-secrets
    ledger_url: String,
}

/// A fairing that constructs the process-wide ledger client and places it
/// into managed state behind the [`Ledger`] trait. One pooled client serves
/// every request; there is no per-call connection setup.
pub struct LedgerFairing;

#[rocket::async_trait]
impl Fairing for LedgerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Ledger gateway",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<LedgerConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load ledger config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let ledger: Arc<dyn Ledger> = Arc::new(GatewayLedger::new(config.ledger_url));
        info!("Loaded ledger gateway config");

        // Manage the state.
        rocket = rocket.manage(ledger);
        Ok(rocket)
    }
}
