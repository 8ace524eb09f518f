use crate::core::kernel::signer::SignParams;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Enums

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bid => "Bid",
            Self::Ask => "Ask",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Market => "Market",
            Self::Limit => "Limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    GTC,
    IOC,
    FOK,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GTC => "GTC",
            Self::IOC => "IOC",
            Self::FOK => "FOK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelfTradePrevention {
    RejectTaker,
    RejectMaker,
    RejectBoth,
}

impl SelfTradePrevention {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RejectTaker => "RejectTaker",
            Self::RejectMaker => "RejectMaker",
            Self::RejectBoth => "RejectBoth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
    TriggerPending,
    TriggerFailed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemStatusKind {
    #[serde(alias = "Normal")]
    Ok,
    Maintenance,
    #[serde(other)]
    Unknown,
}

// REST types

/// Response of `GET api/v1/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub status: SystemStatusKind,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    pub min_price: Decimal,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    pub tick_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityFilter {
    pub min_quantity: Decimal,
    #[serde(default)]
    pub max_quantity: Option<Decimal>,
    pub step_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketFilters {
    pub price: PriceFilter,
    pub quantity: QuantityFilter,
}

/// Entry of `GET api/v1/markets`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub symbol: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub market_type: String,
    pub filters: MarketFilters,
    pub order_book_state: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub visible: bool,
}

/// An order as returned by the order endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_at: Option<String>,
    pub order_type: OrderType,
    pub side: Side,
    pub symbol: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub self_trade_prevention: Option<SelfTradePrevention>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub quote_quantity: Option<Decimal>,
    #[serde(default)]
    pub executed_quantity: Option<Decimal>,
    #[serde(default)]
    pub executed_quote_quantity: Option<Decimal>,
    #[serde(default)]
    pub trigger_price: Option<Decimal>,
    #[serde(default)]
    pub post_only: bool,
    #[serde(default)]
    pub reduce_only: Option<bool>,
    #[serde(default)]
    pub client_id: Option<u32>,
    #[serde(default)]
    pub expiry_reason: Option<String>,
}

/// Per-order outcome of a batch execution
///
/// The exchange answers each batch entry with either the accepted order or
/// an error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOrderResult {
    Order(Box<Order>),
    Error {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

impl BatchOrderResult {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Order(order) => Some(order),
            Self::Error { .. } => None,
        }
    }
}

/// Parameters of `POST api/v1/order`, signed under `orderExecute`
#[derive(Debug, Clone)]
pub struct ExecuteOrderParams {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub quote_quantity: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub post_only: Option<bool>,
    pub reduce_only: Option<bool>,
    pub client_id: Option<u32>,
    pub broker_id: Option<u16>,
    pub self_trade_prevention: Option<SelfTradePrevention>,
    pub trigger_price: Option<Decimal>,
    pub trigger_quantity: Option<Decimal>,
    pub auto_borrow: Option<bool>,
    pub auto_borrow_repay: Option<bool>,
    pub auto_lend: Option<bool>,
    pub auto_lend_redeem: Option<bool>,
    pub stop_loss_trigger_price: Option<Decimal>,
    pub stop_loss_limit_price: Option<Decimal>,
    pub take_profit_trigger_price: Option<Decimal>,
    pub take_profit_limit_price: Option<Decimal>,
}

impl ExecuteOrderParams {
    fn base(symbol: impl Into<String>, side: Side, order_type: OrderType) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type,
            price: None,
            quantity: None,
            quote_quantity: None,
            time_in_force: None,
            post_only: None,
            reduce_only: None,
            client_id: None,
            broker_id: None,
            self_trade_prevention: None,
            trigger_price: None,
            trigger_quantity: None,
            auto_borrow: None,
            auto_borrow_repay: None,
            auto_lend: None,
            auto_lend_redeem: None,
            stop_loss_trigger_price: None,
            stop_loss_limit_price: None,
            take_profit_trigger_price: None,
            take_profit_limit_price: None,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: Side, price: Decimal, quantity: Decimal) -> Self {
        Self {
            price: Some(price),
            quantity: Some(quantity),
            ..Self::base(symbol, side, OrderType::Limit)
        }
    }

    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::base(symbol, side, OrderType::Market)
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }

    pub fn with_post_only(mut self, post_only: bool) -> Self {
        self.post_only = Some(post_only);
        self
    }

    pub fn with_reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = Some(reduce_only);
        self
    }

    pub fn with_client_id(mut self, client_id: u32) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_self_trade_prevention(mut self, mode: SelfTradePrevention) -> Self {
        self.self_trade_prevention = Some(mode);
        self
    }

    /// Request fields as a parameter map; the same map is signed and sent
    pub fn to_sign_params(&self) -> SignParams {
        let mut params = SignParams::new();
        params.insert("symbol".into(), Value::String(self.symbol.clone()));
        params.insert("side".into(), self.side.as_str().into());
        params.insert("orderType".into(), self.order_type.as_str().into());

        let decimals = [
            ("price", self.price),
            ("quantity", self.quantity),
            ("quoteQuantity", self.quote_quantity),
            ("triggerPrice", self.trigger_price),
            ("triggerQuantity", self.trigger_quantity),
            ("stopLossTriggerPrice", self.stop_loss_trigger_price),
            ("stopLossLimitPrice", self.stop_loss_limit_price),
            ("takeProfitTriggerPrice", self.take_profit_trigger_price),
            ("takeProfitLimitPrice", self.take_profit_limit_price),
        ];
        for (key, value) in decimals {
            if let Some(value) = value {
                params.insert(key.into(), Value::String(value.normalize().to_string()));
            }
        }

        let flags = [
            ("postOnly", self.post_only),
            ("reduceOnly", self.reduce_only),
            ("autoBorrow", self.auto_borrow),
            ("autoBorrowRepay", self.auto_borrow_repay),
            ("autoLend", self.auto_lend),
            ("autoLendRedeem", self.auto_lend_redeem),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                params.insert(key.into(), Value::Bool(value));
            }
        }

        if let Some(tif) = self.time_in_force {
            params.insert("timeInForce".into(), tif.as_str().into());
        }
        if let Some(mode) = self.self_trade_prevention {
            params.insert("selfTradePrevention".into(), mode.as_str().into());
        }
        if let Some(client_id) = self.client_id {
            params.insert("clientId".into(), client_id.into());
        }
        if let Some(broker_id) = self.broker_id {
            params.insert("brokerId".into(), broker_id.into());
        }

        params
    }
}

// WebSocket stream payloads

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookTickerUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bid_price: Decimal,
    #[serde(rename = "B")]
    pub bid_quantity: Decimal,
    #[serde(rename = "a")]
    pub ask_price: Decimal,
    #[serde(rename = "A")]
    pub ask_quantity: Decimal,
    #[serde(rename = "E")]
    pub event_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    /// `[price, quantity]` pairs; a zero quantity removes the level
    #[serde(rename = "b")]
    pub bids: Vec<[Decimal; 2]>,
    #[serde(rename = "a")]
    pub asks: Vec<[Decimal; 2]>,
    #[serde(rename = "u")]
    pub last_update_id: i64,
    #[serde(rename = "E")]
    pub event_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KlineUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "i", default)]
    pub interval: Option<String>,
    #[serde(rename = "t", deserialize_with = "string_or_number")]
    pub start_time: Option<String>,
    #[serde(rename = "T", default, deserialize_with = "string_or_number")]
    pub close_time: Option<String>,
    #[serde(rename = "o")]
    pub open: Decimal,
    #[serde(rename = "h")]
    pub high: Decimal,
    #[serde(rename = "l")]
    pub low: Decimal,
    #[serde(rename = "c")]
    pub close: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "X", alias = "x", default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c")]
    pub last_price: Decimal,
    #[serde(rename = "h")]
    pub high: Decimal,
    #[serde(rename = "l")]
    pub low: Decimal,
    #[serde(rename = "v")]
    pub volume: Decimal,
    #[serde(rename = "V", alias = "q", default)]
    pub quote_volume: Option<Decimal>,
    #[serde(rename = "E")]
    pub event_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub trade_id: i64,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
    #[serde(rename = "E")]
    pub event_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPriceUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub mark_price: Decimal,
    #[serde(rename = "i", default)]
    pub index_price: Option<Decimal>,
    #[serde(rename = "f", default)]
    pub funding_rate: Option<Decimal>,
    #[serde(rename = "E")]
    pub event_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenInterestUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "o")]
    pub open_interest: Decimal,
    #[serde(rename = "E")]
    pub event_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "S")]
    pub side: Side,
    #[serde(rename = "p")]
    pub price: Decimal,
    #[serde(rename = "q")]
    pub quantity: Decimal,
    #[serde(rename = "E")]
    pub event_time: i64,
}

/// Private `account.orderUpdate` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    /// Event kind, e.g. `orderAccepted`, `orderFill`, `orderCancelled`
    #[serde(rename = "e", default)]
    pub event: Option<String>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "i")]
    pub order_id: String,
    #[serde(rename = "c", default)]
    pub client_id: Option<u32>,
    #[serde(rename = "S")]
    pub side: Side,
    #[serde(rename = "o")]
    pub order_type: OrderType,
    #[serde(rename = "X")]
    pub status: OrderStatus,
    #[serde(rename = "p", default)]
    pub price: Option<Decimal>,
    #[serde(rename = "q", default)]
    pub quantity: Option<Decimal>,
    #[serde(rename = "z", default)]
    pub executed_quantity: Option<Decimal>,
    #[serde(rename = "f", default)]
    pub time_in_force: Option<TimeInForce>,
    #[serde(rename = "E")]
    pub event_time: i64,
}

/// Private `account.positionUpdate` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    #[serde(rename = "s")]
    pub symbol: String,
    /// Signed net quantity
    #[serde(rename = "q", alias = "pa")]
    pub quantity: Decimal,
    #[serde(rename = "B", alias = "ep", default)]
    pub entry_price: Option<Decimal>,
    #[serde(rename = "M", alias = "mp", default)]
    pub mark_price: Option<Decimal>,
    #[serde(rename = "P", alias = "up", default)]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(rename = "l", alias = "lp", default)]
    pub liquidation_price: Option<Decimal>,
    #[serde(rename = "E")]
    pub event_time: i64,
}

/// Private `account.rfqUpdate` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfqUpdate {
    #[serde(rename = "R", alias = "r", deserialize_with = "string_or_number")]
    pub rfq_id: Option<String>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "S", default)]
    pub side: Option<Side>,
    #[serde(rename = "q", default)]
    pub quantity: Option<Decimal>,
    #[serde(rename = "X")]
    pub status: String,
    #[serde(rename = "E")]
    pub event_time: i64,
}

/// Accepts a JSON string or number and keeps its text form
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_limit_order_params() {
        let params = ExecuteOrderParams::limit("SOL_USDC", Side::Bid, dec("20.50"), dec("1"))
            .with_time_in_force(TimeInForce::GTC)
            .with_post_only(true)
            .with_client_id(7)
            .to_sign_params();

        assert_eq!(params["symbol"], json!("SOL_USDC"));
        assert_eq!(params["side"], json!("Bid"));
        assert_eq!(params["orderType"], json!("Limit"));
        assert_eq!(params["price"], json!("20.5"));
        assert_eq!(params["quantity"], json!("1"));
        assert_eq!(params["timeInForce"], json!("GTC"));
        assert_eq!(params["postOnly"], json!(true));
        assert_eq!(params["clientId"], json!(7));
        assert!(!params.contains_key("reduceOnly"));
    }

    #[test]
    fn test_market_order_params_omit_price() {
        let params = ExecuteOrderParams::market("BTC_USDC", Side::Ask, dec("0.01")).to_sign_params();
        assert_eq!(params.len(), 4);
        assert!(!params.contains_key("price"));
    }

    #[test]
    fn test_decode_order() {
        let order: Order = serde_json::from_value(json!({
            "id": "111",
            "createdAt": 1_700_000_000_000_i64,
            "orderType": "Limit",
            "side": "Bid",
            "symbol": "SOL_USDC",
            "status": "New",
            "timeInForce": "GTC",
            "selfTradePrevention": "RejectTaker",
            "price": "20",
            "quantity": "1",
            "executedQuantity": "0",
            "postOnly": true
        }))
        .unwrap();

        assert_eq!(order.id, "111");
        assert_eq!(order.created_at.as_deref(), Some("1700000000000"));
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.price, Some(dec("20")));
        assert!(order.post_only);
    }

    #[test]
    fn test_decode_batch_results() {
        let results: Vec<BatchOrderResult> = serde_json::from_value(json!([
            {"id": "1", "orderType": "Limit", "side": "Bid", "symbol": "SOL_USDC", "status": "New"},
            {"code": "INVALID_ORDER", "message": "Price out of bounds"}
        ]))
        .unwrap();

        assert_eq!(results[0].order().map(|o| o.id.as_str()), Some("1"));
        assert!(matches!(&results[1], BatchOrderResult::Error { code: Some(c), .. } if c == "INVALID_ORDER"));
    }

    #[test]
    fn test_unknown_order_status() {
        let status: OrderStatus = serde_json::from_value(json!("SomethingNew")).unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }

    #[test]
    fn test_decode_stream_payloads() {
        let trade: TradeUpdate = serde_json::from_value(json!({
            "e": "trade", "E": 1_694_687_692_980_000_i64, "s": "SOL_USDC",
            "p": "18.68", "q": "0.122", "t": 12_345, "m": true
        }))
        .unwrap();
        assert_eq!(trade.price, dec("18.68"));
        assert!(trade.buyer_is_maker);

        let depth: DepthUpdate = serde_json::from_value(json!({
            "e": "depth", "E": 1, "s": "SOL_USDC",
            "a": [["18.70", "0.000"]], "b": [["18.67", "0.832"], ["18.66", "1"]],
            "U": 94_978_271, "u": 94_978_272
        }))
        .unwrap();
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.asks[0][1], Decimal::ZERO);

        let order: OrderUpdate = serde_json::from_value(json!({
            "e": "orderAccepted", "E": 1, "s": "SOL_USD", "c": 123, "S": "Bid",
            "o": "Limit", "f": "GTC", "q": "32123", "p": "20", "X": "New", "i": "1111343026172067"
        }))
        .unwrap();
        assert_eq!(order.order_id, "1111343026172067");
        assert_eq!(order.client_id, Some(123));
        assert_eq!(order.time_in_force, Some(TimeInForce::GTC));
    }
}
