//! Thin client for the Etherscan account API.
//!
//! Two endpoints are used: `action=balance` (current balance in wei) and
//! `action=txlist` (transaction history, newest first). The API wraps every
//! response in `{status, message, result}` where `status != "1"` signals
//! failure; that is surfaced as [`AppError::Provider`] and never retried.

use std::time::Duration;

use serde::Deserialize;

use ethwatch_common::error::AppError;

/// Default request timeout for explorer calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for an Etherscan-compatible explorer API.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Envelope for `action=balance` responses. `result` is an integer wei
/// string on success, an error message otherwise.
#[derive(Debug, Deserialize)]
struct BalanceEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

/// Envelope for `action=txlist` responses.
#[derive(Debug, Deserialize)]
struct TxListEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Vec<TxRecord>,
}

/// One transaction as reported by the explorer. Numeric fields arrive as
/// decimal strings and are parsed during ingestion.
#[derive(Debug, Clone, Deserialize)]
pub struct TxRecord {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(rename = "gasPrice")]
    pub gas_price: String,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(rename = "isError")]
    pub is_error: String,
}

impl TxRecord {
    /// `isError == "0"` means the transaction succeeded.
    pub fn succeeded(&self) -> bool {
        self.is_error == "0"
    }
}

impl EtherscanClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        // Timeout-only builder; cannot fail outside TLS misconfiguration,
        // which should stop startup rather than run without the timeout.
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to construct explorer HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Fetch the current balance of an address, in wei, as an integer string.
    pub async fn fetch_balance(&self, address: &str) -> Result<String, AppError> {
        let envelope: BalanceEnvelope = self
            .http
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Balance request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid balance response: {}", e)))?;

        if envelope.status != "1" {
            return Err(AppError::Provider(format!(
                "Explorer rejected balance query: {}",
                if envelope.message.is_empty() {
                    &envelope.result
                } else {
                    &envelope.message
                }
            )));
        }

        Ok(envelope.result)
    }

    /// Fetch the transaction list for an address, newest first.
    pub async fn fetch_transactions(&self, address: &str) -> Result<Vec<TxRecord>, AppError> {
        let envelope: TxListEnvelope = self
            .http
            .get(&self.base_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("sort", "desc"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Transaction list request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid transaction list response: {}", e)))?;

        if envelope.status != "1" {
            // "No transactions found" comes back as status 0 with an empty
            // result array; that is an empty history, not a failure.
            if envelope.result.is_empty() {
                tracing::debug!(address, message = %envelope.message, "Empty transaction list");
                return Ok(Vec::new());
            }
            return Err(AppError::Provider(format!(
                "Explorer rejected transaction query: {}",
                envelope.message
            )));
        }

        Ok(envelope.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_envelope_parses() {
        let json = r#"{"status":"1","message":"OK","result":"40891626854930000000000"}"#;
        let envelope: BalanceEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status, "1");
        assert_eq!(envelope.result, "40891626854930000000000");
    }

    #[test]
    fn test_txlist_envelope_parses_provider_fields() {
        let json = r#"{
            "status": "1",
            "message": "OK",
            "result": [{
                "blockNumber": "14923678",
                "timeStamp": "1654646411",
                "hash": "0x8a2cf40e9657b3b8a0bbd0a0bafd91ffd5cb07dcb4e3f3b4dc0e0a6b7b72bd4e",
                "from": "0xDE0B295669a9FD93d5F28D9Ec85E40f4cb697BAe",
                "to": "0x3F5CE5FBFe3E9af3971dD833D26bA9b5C936f0bE",
                "value": "1500000000000000000",
                "gasPrice": "37034802557",
                "gasUsed": "21000",
                "isError": "0"
            }]
        }"#;
        let envelope: TxListEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.result.len(), 1);

        let tx = &envelope.result[0];
        assert_eq!(tx.block_number, "14923678");
        assert_eq!(tx.gas_price, "37034802557");
        assert_eq!(tx.gas_used, "21000");
        assert_eq!(tx.time_stamp, "1654646411");
        assert!(tx.succeeded());
    }

    #[test]
    fn test_failed_tx_flag() {
        let json = r#"{
            "blockNumber": "1", "timeStamp": "1654646411", "hash": "0xdead",
            "from": "0xa", "to": "0xb", "value": "0",
            "gasPrice": "1", "gasUsed": "1", "isError": "1"
        }"#;
        let tx: TxRecord = serde_json::from_str(json).unwrap();
        assert!(!tx.succeeded());
    }

    #[test]
    fn test_empty_txlist_status_zero_parses() {
        // Etherscan reports "No transactions found" with status 0 and an
        // empty result array.
        let json = r#"{"status":"0","message":"No transactions found","result":[]}"#;
        let envelope: TxListEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status, "0");
        assert!(envelope.result.is_empty());
    }
}
