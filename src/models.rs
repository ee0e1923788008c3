// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Тип позиции каталога. Ровно одна цель у entitlement —
/// пара (kind, item_id), а не четыре nullable-колонки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Course,
    MockTest,
    MockBundle,
    Session,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Course => "course",
            ItemKind::MockTest => "mock_test",
            ItemKind::MockBundle => "mock_bundle",
            ItemKind::Session => "session",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "course" => Some(ItemKind::Course),
            "mock_test" => Some(ItemKind::MockTest),
            "mock_bundle" => Some(ItemKind::MockBundle),
            "session" => Some(ItemKind::Session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "success" => Some(PaymentStatus::Success),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogItem {
    pub id: i32,
    pub kind: ItemKind,
    pub title: String,
    /// Базовая цена в целых рупиях.
    pub price: i64,
    /// Админская «цена со скидкой»; если задана — действующая база для quote.
    pub discounted_price: Option<i64>,
    pub status: String, // draft | published
    /// NULL = бессрочный доступ.
    pub access_days: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CatalogItem {
    /// Действующая базовая цена до купона.
    pub fn effective_price(&self) -> i64 {
        self.discounted_price.unwrap_or(self.price)
    }

    pub fn is_published(&self) -> bool {
        self.status == "published"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub discount_type: String, // percentage | flat
    pub discount_value: i64,
    pub max_discount: Option<i64>,
    pub valid_till: DateTime<Utc>,
    /// Если задан — купон применим только к этой позиции каталога.
    pub item_id: Option<i32>,
    pub is_public: bool,
    pub usage_count: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Entitlement {
    pub id: i32,
    pub user_id: i32,
    pub item_kind: ItemKind,
    pub item_id: i32,
    pub payment_status: PaymentStatus,
    pub provider: String,
    pub provider_order_id: Option<String>,
    pub receipt_id: Option<String>,
    pub original_price: i64,
    pub discount_amount: i64,
    pub amount_paid: i64,
    pub coupon_id: Option<i32>,
    pub coupon_code: Option<String>,
    pub access_days: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub external_id: String,
    pub email: Option<String>,
    pub role: String, // student | admin | instructor
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
