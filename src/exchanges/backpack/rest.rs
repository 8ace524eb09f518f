use crate::core::errors::{BackpackError, Result};
use crate::core::kernel::signer::SignParams;
use crate::core::kernel::{ReqwestRest, RestClient};
use crate::exchanges::backpack::types::{
    BatchOrderResult, ExecuteOrderParams, Market, Order, SystemStatus,
};
use serde_json::{json, Value};
use tracing::instrument;

/// Order to cancel, by exchange id or by client id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    Id(String),
    ClientId(u32),
}

/// Thin typed wrapper around `RestClient` for the Backpack API
///
/// Covers the system endpoints, markets, and the order calls that exercise
/// single and batch signing.
#[derive(Debug)]
pub struct BackpackRestClient<R: RestClient = ReqwestRest> {
    client: R,
}

impl<R: RestClient> BackpackRestClient<R> {
    pub fn new(client: R) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &R {
        &self.client
    }

    /// Get the exchange status
    pub async fn get_status(&self) -> Result<SystemStatus> {
        let value = self.client.get("api/v1/status", &[]).await?;
        ReqwestRest::decode(value)
    }

    /// Ping the exchange
    pub async fn ping(&self) -> Result<()> {
        self.client.get("api/v1/ping", &[]).await?;
        Ok(())
    }

    /// Server time in milliseconds since the UNIX epoch
    pub async fn get_time(&self) -> Result<i64> {
        let value = self.client.get("api/v1/time", &[]).await?;
        server_time(&value)
    }

    /// Get all markets
    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        let value = self.client.get("api/v1/markets", &[]).await?;
        ReqwestRest::decode(value)
    }

    /// Place an order (requires authentication)
    #[instrument(skip(self, order), fields(symbol = %order.symbol, side = ?order.side))]
    pub async fn execute_order(&self, order: &ExecuteOrderParams) -> Result<Order> {
        let body = Value::Object(order.to_sign_params());
        let value = self
            .client
            .post_authenticated("api/v1/order", &body, "orderExecute")
            .await?;
        ReqwestRest::decode(value)
    }

    /// Place several orders in one signed request (requires authentication)
    #[instrument(skip(self, orders), fields(order_count = orders.len()))]
    pub async fn execute_batch_orders(&self, orders: &[ExecuteOrderParams]) -> Result<Vec<BatchOrderResult>> {
        let params: Vec<SignParams> = orders.iter().map(ExecuteOrderParams::to_sign_params).collect();
        let value = self.client.post_batch_orders("api/v1/orders", &params).await?;
        ReqwestRest::decode(value)
    }

    /// Cancel an open order (requires authentication)
    pub async fn cancel_order(&self, symbol: &str, order: &OrderRef) -> Result<Order> {
        let mut body = json!({ "symbol": symbol });
        match order {
            OrderRef::Id(id) => body["orderId"] = json!(id),
            OrderRef::ClientId(client_id) => body["clientId"] = json!(client_id),
        }

        let value = self
            .client
            .delete_authenticated("api/v1/order", &body, "orderCancel")
            .await?;
        ReqwestRest::decode(value)
    }

    /// Get open orders, optionally for one market (requires authentication)
    pub async fn get_open_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>> {
        let mut params = vec![];
        if let Some(symbol) = symbol {
            params.push(("symbol", symbol));
        }

        let value = self
            .client
            .get_authenticated("api/v1/orders", &params, "orderQueryAll")
            .await?;
        ReqwestRest::decode(value)
    }
}

/// `api/v1/time` answers with a bare number; older deployments wrap it
fn server_time(value: &Value) -> Result<i64> {
    let time = match value {
        Value::Object(map) => map.get("serverTime"),
        other => Some(other),
    };

    time.and_then(|t| t.as_i64().or_else(|| t.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| {
            BackpackError::Json(serde::de::Error::custom(format!(
                "unexpected server time response: {}",
                value
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_time_formats() {
        assert_eq!(server_time(&json!(1_700_000_000_000_i64)).unwrap(), 1_700_000_000_000);
        assert_eq!(server_time(&json!("1700000000000")).unwrap(), 1_700_000_000_000);
        assert_eq!(server_time(&json!({"serverTime": 42})).unwrap(), 42);
        assert!(server_time(&json!({"other": 1})).is_err());
    }
}
