//! Billing API: balance and transaction history.
//!
//! Money values are returned and retained as decimal strings, never parsed
//! to floating point, so amounts round-trip without precision loss.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::Transport;

fn default_zero() -> String {
    String::from("0")
}

/// Account balance snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    /// Total balance, as a decimal string.
    #[serde(default = "default_zero", rename = "total_balance")]
    pub total: String,
    /// Rewards balance, as a decimal string.
    #[serde(default = "default_zero", rename = "rewards_balance")]
    pub rewards: String,
    /// Paid balance, as a decimal string.
    #[serde(default = "default_zero", rename = "balance")]
    pub paid: String,
    /// Spendable balance, as a decimal string.
    #[serde(default = "default_zero", rename = "available_balance")]
    pub available: String,
}

/// A single billing transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier.
    #[serde(default)]
    pub id: String,
    /// Owning user identifier.
    #[serde(default)]
    pub user_id: String,
    /// Transaction amount in the account currency.
    #[serde(default)]
    pub amount: f64,
    /// Transaction amount in USD.
    #[serde(default)]
    pub amount_usd: f64,
    /// Transaction type (deposit, job charge, refund, ...).
    #[serde(default)]
    pub transaction_type: String,
    /// Processing status.
    #[serde(default)]
    pub status: String,
    /// Whether the transaction was paid from the rewards balance.
    #[serde(default)]
    pub rewards: bool,
    /// Associated job, if the transaction is a job charge.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Creation timestamp (ISO-8601 string).
    #[serde(default)]
    pub created_at: String,
}

#[derive(Deserialize)]
struct TransactionListResponse {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

/// Billing API namespace.
#[derive(Debug, Clone, Copy)]
pub struct Billing<'a> {
    http: &'a Transport,
}

impl<'a> Billing<'a> {
    pub(crate) const fn new(http: &'a Transport) -> Self {
        Self { http }
    }

    /// Returns the current account balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn balance(&self) -> Result<Balance> {
        self.http.get("/api/balance", &[]).await
    }

    /// Lists transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn transactions(&self, limit: u32, page: u32) -> Result<Vec<Transaction>> {
        let response: TransactionListResponse = self
            .http
            .get(
                "/api/tx",
                &[("page", page.to_string()), ("page_size", limit.to_string())],
            )
            .await?;
        Ok(response.transactions)
    }

    /// Fetches a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the identifier is unknown.
    pub async fn transaction(&self, transaction_id: &str) -> Result<Transaction> {
        self.http.get(&format!("/api/tx/{transaction_id}"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_balance_from_empty_object_defaults_to_zero() {
        let balance: Balance = serde_json::from_value(json!({})).unwrap();
        assert_eq!(balance.total, "0");
        assert_eq!(balance.rewards, "0");
        assert_eq!(balance.paid, "0");
        assert_eq!(balance.available, "0");
    }

    #[test]
    fn test_money_strings_round_trip_without_precision_loss() {
        let balance: Balance = serde_json::from_value(json!({
            "total_balance": "1234567.89",
            "available_balance": "0.000000001"
        }))
        .unwrap();
        assert_eq!(balance.total, "1234567.89");
        assert_eq!(balance.available, "0.000000001");
    }

    #[test]
    fn test_transaction_from_empty_object_defaults() {
        let tx: Transaction = serde_json::from_value(json!({})).unwrap();
        assert_eq!(tx.id, "");
        assert!((tx.amount - 0.0).abs() < f64::EPSILON);
        assert!(!tx.rewards);
        assert!(tx.job_id.is_none());
    }

    #[tokio::test]
    async fn test_transactions_paginates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tx"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transactions": [{"id": "tx1", "amount": 5.0}]
            })))
            .mount(&server)
            .await;

        let transport =
            Transport::new(&server.uri(), "k", std::time::Duration::from_secs(5)).unwrap();
        let billing = Billing::new(&transport);
        let txs = billing.transactions(10, 2).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id, "tx1");
    }
}
