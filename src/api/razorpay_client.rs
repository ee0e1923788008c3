// src/api/razorpay_client.rs
//
// Минимальный клиент Razorpay Orders API (https://api.razorpay.com)
// Авторизация: basic auth key_id/key_secret

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com";

/// Таймаут на создание заказа; по истечении — PaymentProviderError,
/// клиент может повторить создание заказа с новым receipt id.
const ORDER_TIMEOUT_SECS: u64 = 10;

fn api_base() -> String {
    std::env::var("RAZORPAY_API_BASE_URL").unwrap_or_else(|_| RAZORPAY_API_BASE.to_string())
}

#[derive(Debug)]
pub enum RazorpayError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl fmt::Display for RazorpayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RazorpayError::Http(e) => write!(f, "http error: {e}"),
            RazorpayError::Api { status, body } => {
                write!(f, "razorpay api error status={status} body={body}")
            }
            RazorpayError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl From<reqwest::Error> for RazorpayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    /// Сумма в минимальных единицах валюты (пайсы), без дробной части.
    pub amount: i64,
    pub currency: String,
    /// Идемпотентный receipt id с нашей стороны; на каждую попытку — новый.
    pub receipt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
}

pub async fn create_order(
    key_id: &str,
    key_secret: &str,
    req: CreateOrderRequest,
) -> Result<OrderResponse, RazorpayError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(ORDER_TIMEOUT_SECS))
        .build()?;

    let resp = client
        .post(format!("{}/v1/orders", api_base()))
        .basic_auth(key_id, Some(key_secret))
        .json(&req)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(RazorpayError::Api {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str::<OrderResponse>(&body)
        .map_err(|e| RazorpayError::InvalidResponse(format!("{e}; body={body}")))
}
