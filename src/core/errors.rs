use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackpackError {
    #[error("Invalid key material: {0}")]
    KeyFormat(String),

    #[error("WebSocket is not connected")]
    NotConnected,

    #[error("Authentication required but no credentials configured")]
    AuthRequired,

    #[error("WebSocket session has been closed")]
    SessionClosed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error [{status}]: {}", describe_api_error(.code.as_deref(), .message, .body))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        body: String,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, BackpackError>;

fn describe_api_error(code: Option<&str>, message: &str, body: &str) -> String {
    match code {
        Some(code) if !message.is_empty() => format!("{} - {}", code, message),
        Some(code) => code.to_string(),
        None if !message.is_empty() => message.to_string(),
        None => body.to_string(),
    }
}

impl BackpackError {
    /// Build an `Api` error from a non-success HTTP response.
    ///
    /// The exchange answers with `{"code": .., "message": ..}` for most
    /// failures and `{"error": ..}` for a few legacy endpoints. Anything
    /// else is kept verbatim in `body`.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            code: Option<String>,
            message: Option<String>,
            error: Option<String>,
        }

        let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => (
                parsed.code.filter(|c| !c.is_empty()),
                parsed
                    .message
                    .filter(|m| !m.is_empty())
                    .or(parsed.error)
                    .unwrap_or_default(),
            ),
            Err(_) => (None, String::new()),
        };

        Self::Api {
            status,
            code,
            message,
            body: body.to_string(),
        }
    }

    /// Machine-readable code of an `Api` error, if the exchange sent a known one.
    pub fn api_code(&self) -> Option<ApiErrorCode> {
        match self {
            Self::Api {
                code: Some(code), ..
            } => ApiErrorCode::from_code(code),
            _ => None,
        }
    }

    pub fn has_api_code(&self, code: ApiErrorCode) -> bool {
        self.api_code() == Some(code)
    }

    /// Whether a caller could reasonably retry the failed operation.
    ///
    /// The SDK itself never retries REST calls.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::KeyFormat(_))
            || self.has_api_code(ApiErrorCode::InvalidSignature)
            || self.has_api_code(ApiErrorCode::Unauthorized)
    }
}

/// Error codes documented by the Backpack API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    AccountDeactivated,
    AccountLiquidating,
    BorrowLimit,
    BorrowRequiresLendRedeem,
    Forbidden,
    InsufficientFunds,
    InsufficientMargin,
    InsufficientSupply,
    InvalidAsset,
    InvalidClientRequest,
    InvalidMarket,
    InvalidOrder,
    InvalidPositionId,
    InvalidQuantity,
    InvalidRange,
    InvalidSignature,
    InvalidSource,
    InvalidSymbol,
    InvalidTwoFactorCode,
    LendLimit,
    LendRequiresBorrowRepay,
    Maintenance,
    MaxLeverageReached,
    NotImplemented,
    OrderLimit,
    PositionLimit,
    PreconditionFailed,
    ResourceNotFound,
    ServerError,
    Timeout,
    TooManyRequests,
    TradingPaused,
    Unauthorized,
}

impl ApiErrorCode {
    pub fn from_code(code: &str) -> Option<Self> {
        let parsed = match code {
            "ACCOUNT_DEACTIVATED" => Self::AccountDeactivated,
            "ACCOUNT_LIQUIDATING" => Self::AccountLiquidating,
            "BORROW_LIMIT" => Self::BorrowLimit,
            "BORROW_REQUIRES_LEND_REDEEM" => Self::BorrowRequiresLendRedeem,
            "FORBIDDEN" => Self::Forbidden,
            "INSUFFICIENT_FUNDS" => Self::InsufficientFunds,
            "INSUFFICIENT_MARGIN" => Self::InsufficientMargin,
            "INSUFFICIENT_SUPPLY" => Self::InsufficientSupply,
            "INVALID_ASSET" => Self::InvalidAsset,
            "INVALID_CLIENT_REQUEST" => Self::InvalidClientRequest,
            "INVALID_MARKET" => Self::InvalidMarket,
            "INVALID_ORDER" => Self::InvalidOrder,
            "INVALID_POSITION_ID" => Self::InvalidPositionId,
            "INVALID_QUANTITY" => Self::InvalidQuantity,
            "INVALID_RANGE" => Self::InvalidRange,
            "INVALID_SIGNATURE" => Self::InvalidSignature,
            "INVALID_SOURCE" => Self::InvalidSource,
            "INVALID_SYMBOL" => Self::InvalidSymbol,
            "INVALID_TWO_FACTOR_CODE" => Self::InvalidTwoFactorCode,
            "LEND_LIMIT" => Self::LendLimit,
            "LEND_REQUIRES_BORROW_REPAY" => Self::LendRequiresBorrowRepay,
            "MAINTENANCE" => Self::Maintenance,
            "MAX_LEVERAGE_REACHED" => Self::MaxLeverageReached,
            "NOT_IMPLEMENTED" => Self::NotImplemented,
            "ORDER_LIMIT" => Self::OrderLimit,
            "POSITION_LIMIT" => Self::PositionLimit,
            "PRECONDITION_FAILED" => Self::PreconditionFailed,
            "RESOURCE_NOT_FOUND" => Self::ResourceNotFound,
            "SERVER_ERROR" => Self::ServerError,
            "TIMEOUT" => Self::Timeout,
            "TOO_MANY_REQUESTS" => Self::TooManyRequests,
            "TRADING_PAUSED" => Self::TradingPaused,
            "UNAUTHORIZED" => Self::Unauthorized,
            _ => return None,
        };
        Some(parsed)
    }
}
