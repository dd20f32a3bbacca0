//! The identity resolver: maps opaque user IDs from the identity provider
//! to stored profiles and wallet account indices.

use log::info;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::model::user::{AccountIndex, UserId, UserRecord};
use crate::store::{DocumentStore, StoreError};

/// Wallet accounts below this index belong to the platform itself.
pub const FIRST_ACCOUNT_INDEX: AccountIndex = 10;

/// Path of the account-counter document.
const ACCOUNTS_PATH: &str = "accounts";

fn user_path(user: &UserId) -> String {
    format!("users/{user}")
}

/// Fetch a user's stored profile, `None` if they never registered.
pub async fn user_record(store: &dyn DocumentStore, user: &UserId) -> Result<Option<UserRecord>> {
    let value = match store.read(&user_path(user)).await? {
        Some(value) => value,
        None => return Ok(None),
    };
    let record = serde_json::from_value(value).map_err(|err| StoreError::Malformed {
        path: user_path(user),
        message: err.to_string(),
    })?;
    Ok(Some(record))
}

/// Resolve a user to their wallet account index, `None` if unregistered.
pub async fn account_of(store: &dyn DocumentStore, user: &UserId) -> Result<Option<AccountIndex>> {
    Ok(user_record(store, user).await?.map(|record| record.account))
}

/// Register a user: store their profile under a freshly-assigned wallet
/// account index. The identity provider has already created their login.
pub async fn register(
    store: &dyn DocumentStore,
    user: &UserId,
    name: String,
    email: String,
) -> Result<UserRecord> {
    if store.read(&user_path(user)).await?.is_some() {
        return Err(Error::bad_request(format!("user {user} already registered")));
    }

    let account = next_account_index(store).await?;
    let record = UserRecord {
        name,
        email,
        account,
    };
    let value = serde_json::to_value(&record).expect("serialisation is infallible");
    store.write(&user_path(user), &value).await?;
    info!("registered user {user} with account {account}");
    Ok(record)
}

/// Claim the next account index with a conditional write on the counter
/// document, retrying until no other registration interleaves.
async fn next_account_index(store: &dyn DocumentStore) -> Result<AccountIndex> {
    loop {
        let current = store.read(ACCOUNTS_PATH).await?;
        let next = match &current {
            None => FIRST_ACCOUNT_INDEX,
            Some(value) => last_assigned(value)? + 1,
        };
        let claimed = store
            .compare_and_swap(ACCOUNTS_PATH, current.as_ref(), &json!({ "account": next }))
            .await?;
        if claimed {
            return Ok(next);
        }
    }
}

fn last_assigned(counter: &Value) -> Result<AccountIndex> {
    counter
        .get("account")
        .and_then(Value::as_u64)
        .and_then(|n| AccountIndex::try_from(n).ok())
        .ok_or_else(|| {
            StoreError::Malformed {
                path: ACCOUNTS_PATH.to_string(),
                message: "no usable account counter".to_string(),
            }
            .into()
        })
}
