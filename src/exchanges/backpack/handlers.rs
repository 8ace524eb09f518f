use crate::core::errors::Result;
use crate::exchanges::backpack::streams::{self, DepthInterval, KlineInterval};
use crate::exchanges::backpack::types::{
    BookTickerUpdate, DepthUpdate, KlineUpdate, LiquidationUpdate, MarkPriceUpdate,
    OpenInterestUpdate, OrderUpdate, PositionUpdate, RfqUpdate, TickerUpdate, TradeUpdate,
};
use crate::exchanges::backpack::BackpackWebSocket;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Typed subscriptions on top of a `BackpackWebSocket`
///
/// Each `on_*` call subscribes one stream and decodes its payloads before
/// calling `callback`. Payloads that do not decode are dropped.
#[derive(Debug, Clone, Copy)]
pub struct StreamHandler<'a> {
    ws: &'a BackpackWebSocket,
}

impl<'a> StreamHandler<'a> {
    pub fn new(ws: &'a BackpackWebSocket) -> Self {
        Self { ws }
    }

    pub async fn on_book_ticker<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(BookTickerUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::book_ticker(symbol), false, callback)
            .await
    }

    pub async fn on_depth<F>(&self, symbol: &str, interval: DepthInterval, callback: F) -> Result<()>
    where
        F: Fn(DepthUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::depth(symbol, interval), false, callback)
            .await
    }

    pub async fn on_kline<F>(&self, symbol: &str, interval: KlineInterval, callback: F) -> Result<()>
    where
        F: Fn(KlineUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::kline(symbol, interval), false, callback)
            .await
    }

    pub async fn on_ticker<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(TickerUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::ticker(symbol), false, callback)
            .await
    }

    pub async fn on_trade<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(TradeUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::trade(symbol), false, callback)
            .await
    }

    pub async fn on_mark_price<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(MarkPriceUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::mark_price(symbol), false, callback)
            .await
    }

    pub async fn on_open_interest<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(OpenInterestUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::open_interest(symbol), false, callback)
            .await
    }

    pub async fn on_liquidation<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(LiquidationUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::liquidation(symbol), false, callback)
            .await
    }

    /// Order updates for `symbol`, or every market when `None`
    pub async fn on_order_update<F>(&self, symbol: Option<&str>, callback: F) -> Result<()>
    where
        F: Fn(OrderUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::order_update(symbol), true, callback)
            .await
    }

    pub async fn on_position_update<F>(&self, symbol: Option<&str>, callback: F) -> Result<()>
    where
        F: Fn(PositionUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::position_update(symbol), true, callback)
            .await
    }

    pub async fn on_rfq_update<F>(&self, symbol: Option<&str>, callback: F) -> Result<()>
    where
        F: Fn(RfqUpdate) + Send + Sync + 'static,
    {
        self.subscribe_typed(streams::rfq_update(symbol), true, callback)
            .await
    }

    async fn subscribe_typed<T, F>(&self, stream: String, private: bool, callback: F) -> Result<()>
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let name = stream.clone();
        let decode = move |data| match serde_json::from_value::<T>(data) {
            Ok(payload) => callback(payload),
            Err(e) => debug!(stream = %name, error = %e, "Dropping undecodable payload"),
        };
        self.ws.subscribe(&[stream], decode, private).await
    }
}
