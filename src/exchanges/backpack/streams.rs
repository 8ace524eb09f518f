//! Stream name builders
//!
//! Public streams are `<channel>.<symbol>`; private account streams take an
//! optional symbol and cover every market without one.

pub const BOOK_TICKER: &str = "bookTicker";
pub const DEPTH: &str = "depth";
pub const KLINE: &str = "kline";
pub const TICKER: &str = "ticker";
pub const TRADE: &str = "trade";
pub const MARK_PRICE: &str = "markPrice";
pub const OPEN_INTEREST: &str = "openInterest";
pub const LIQUIDATION: &str = "liquidation";

pub const ORDER_UPDATE: &str = "account.orderUpdate";
pub const POSITION_UPDATE: &str = "account.positionUpdate";
pub const RFQ_UPDATE: &str = "account.rfqUpdate";

/// Aggregation period of a depth stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthInterval {
    /// Every update
    #[default]
    Realtime,
    Ms200,
    Ms600,
    Ms1000,
}

impl DepthInterval {
    fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Realtime => None,
            Self::Ms200 => Some("200ms"),
            Self::Ms600 => Some("600ms"),
            Self::Ms1000 => Some("1000ms"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlineInterval {
    Minutes1,
    Minutes3,
    Minutes5,
    Minutes15,
    Minutes30,
    Hours1,
    Hours2,
    Hours4,
    Hours6,
    Hours8,
    Hours12,
    Days1,
    Days3,
    Weeks1,
    Months1,
}

impl KlineInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minutes1 => "1m",
            Self::Minutes3 => "3m",
            Self::Minutes5 => "5m",
            Self::Minutes15 => "15m",
            Self::Minutes30 => "30m",
            Self::Hours1 => "1h",
            Self::Hours2 => "2h",
            Self::Hours4 => "4h",
            Self::Hours6 => "6h",
            Self::Hours8 => "8h",
            Self::Hours12 => "12h",
            Self::Days1 => "1d",
            Self::Days3 => "3d",
            Self::Weeks1 => "1w",
            Self::Months1 => "1M",
        }
    }
}

pub fn book_ticker(symbol: &str) -> String {
    format!("{}.{}", BOOK_TICKER, symbol)
}

pub fn depth(symbol: &str, interval: DepthInterval) -> String {
    match interval.suffix() {
        Some(suffix) => format!("{}.{}.{}", DEPTH, suffix, symbol),
        None => format!("{}.{}", DEPTH, symbol),
    }
}

pub fn kline(symbol: &str, interval: KlineInterval) -> String {
    format!("{}.{}.{}", KLINE, interval.as_str(), symbol)
}

pub fn ticker(symbol: &str) -> String {
    format!("{}.{}", TICKER, symbol)
}

pub fn trade(symbol: &str) -> String {
    format!("{}.{}", TRADE, symbol)
}

pub fn mark_price(symbol: &str) -> String {
    format!("{}.{}", MARK_PRICE, symbol)
}

pub fn open_interest(symbol: &str) -> String {
    format!("{}.{}", OPEN_INTEREST, symbol)
}

pub fn liquidation(symbol: &str) -> String {
    format!("{}.{}", LIQUIDATION, symbol)
}

pub fn order_update(symbol: Option<&str>) -> String {
    account_stream(ORDER_UPDATE, symbol)
}

pub fn position_update(symbol: Option<&str>) -> String {
    account_stream(POSITION_UPDATE, symbol)
}

pub fn rfq_update(symbol: Option<&str>) -> String {
    account_stream(RFQ_UPDATE, symbol)
}

fn account_stream(channel: &str, symbol: Option<&str>) -> String {
    match symbol.filter(|s| !s.is_empty()) {
        Some(symbol) => format!("{}.{}", channel, symbol),
        None => channel.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_stream_names() {
        assert_eq!(book_ticker("SOL_USDC"), "bookTicker.SOL_USDC");
        assert_eq!(depth("SOL_USDC", DepthInterval::Realtime), "depth.SOL_USDC");
        assert_eq!(depth("SOL_USDC", DepthInterval::Ms200), "depth.200ms.SOL_USDC");
        assert_eq!(kline("SOL_USDC", KlineInterval::Minutes1), "kline.1m.SOL_USDC");
        assert_eq!(kline("SOL_USDC", KlineInterval::Months1), "kline.1M.SOL_USDC");
        assert_eq!(trade("BTC_USDC_PERP"), "trade.BTC_USDC_PERP");
        assert_eq!(mark_price("BTC_USDC_PERP"), "markPrice.BTC_USDC_PERP");
    }

    #[test]
    fn test_account_stream_names() {
        assert_eq!(order_update(None), "account.orderUpdate");
        assert_eq!(order_update(Some("")), "account.orderUpdate");
        assert_eq!(order_update(Some("SOL_USDC")), "account.orderUpdate.SOL_USDC");
        assert_eq!(position_update(Some("SOL_USDC_PERP")), "account.positionUpdate.SOL_USDC_PERP");
        assert_eq!(rfq_update(None), "account.rfqUpdate");
    }
}
