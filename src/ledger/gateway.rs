use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::model::user::AccountIndex;

use super::{Address, Deployment, Ledger, LedgerError, TxReceipt};

/// A ledger client speaking to a signing gateway that holds the platform
/// wallet. The gateway derives per-account keys from its mnemonic, encodes
/// ABI calls, and relays them to the network; this client is deliberately
/// ignorant of all three.
pub struct GatewayLedger {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct CallRequest<'a> {
    method: &'a str,
    args: &'a [Value],
}

#[derive(Serialize)]
struct SendRequest<'a> {
    method: &'a str,
    args: &'a [Value],
    from: &'a Address,
}

#[derive(Serialize)]
struct DeployRequest<'a> {
    args: &'a [Value],
    from: &'a Address,
    gas: u64,
}

impl GatewayLedger {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/{}", self.base_url, tail)
    }

    /// Read a successful response body, or classify the failure. Contract
    /// reverts come back as client errors with a `revert` reason field.
    async fn into_result(response: Response) -> Result<Value, LedgerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Err(rejection(status, &body))
    }
}

fn rejection(status: reqwest::StatusCode, body: &Value) -> LedgerError {
    match body.get("revert").and_then(Value::as_str) {
        Some(reason) => LedgerError::Reverted(reason.to_string()),
        None => LedgerError::Protocol(format!("gateway answered {status}: {body}")),
    }
}

#[rocket::async_trait]
impl Ledger for GatewayLedger {
    async fn resolve_address(&self, account: AccountIndex) -> Result<Address, LedgerError> {
        let response = self
            .http
            .get(self.url(&format!("accounts/{account}")))
            .send()
            .await?;
        let body = Self::into_result(response).await?;
        body.get("address")
            .and_then(Value::as_str)
            .map(|addr| Address::from(addr.to_string()))
            .ok_or_else(|| LedgerError::Protocol(format!("no address for account {account}")))
    }

    async fn call(
        &self,
        contract: &Address,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, LedgerError> {
        let response = self
            .http
            .post(self.url(&format!("contracts/{contract}/call")))
            .json(&CallRequest {
                method,
                args: &args,
            })
            .send()
            .await?;
        let body = Self::into_result(response).await?;
        body.get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Protocol(format!("no result from {method}")))
    }

    async fn send(
        &self,
        contract: &Address,
        method: &str,
        args: Vec<Value>,
        from: &Address,
    ) -> Result<TxReceipt, LedgerError> {
        let response = self
            .http
            .post(self.url(&format!("contracts/{contract}/send")))
            .json(&SendRequest {
                method,
                args: &args,
                from,
            })
            .send()
            .await?;
        let body = Self::into_result(response).await?;
        serde_json::from_value(body)
            .map_err(|err| LedgerError::Protocol(format!("bad receipt from {method}: {err}")))
    }

    async fn deploy(
        &self,
        constructor_args: Vec<Value>,
        from: &Address,
        gas: u64,
    ) -> Result<Deployment, LedgerError> {
        let response = self
            .http
            .post(self.url("contracts"))
            .json(&DeployRequest {
                args: &constructor_args,
                from,
                gas,
            })
            .send()
            .await?;
        let body = Self::into_result(response).await?;
        serde_json::from_value(body)
            .map_err(|err| LedgerError::Protocol(format!("bad deployment receipt: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn revert_reasons_are_extracted() {
        let err = rejection(
            StatusCode::BAD_REQUEST,
            &json!({"revert": "Has no right to vote"}),
        );
        assert!(matches!(err, LedgerError::Reverted(r) if r == "Has no right to vote"));
    }

    #[test]
    fn non_revert_failures_are_protocol_errors() {
        let err = rejection(StatusCode::BAD_GATEWAY, &json!({"error": "node down"}));
        assert!(matches!(err, LedgerError::Protocol(_)));
    }
}
