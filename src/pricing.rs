// src/pricing.rs
//
// Чистый расчёт цены: никакого I/O, запись применения купона
// происходит только в транзакции подтверждения оплаты.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{CatalogItem, Coupon};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Quote {
    pub base_price: i64,
    pub discount_amount: i64,
    pub final_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_coupon_id: Option<i32>,
}

/// Причина отказа купона на «жёстком» пути валидации.
/// Мягкий quote те же случаи просто игнорирует.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRejection {
    Expired,
    ScopeMismatch,
}

impl CouponRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            CouponRejection::Expired => "coupon expired",
            CouponRejection::ScopeMismatch => "coupon not applicable to this item",
        }
    }
}

/// Проверяет применимость купона к позиции на момент `now`.
/// Граница включительно: valid_till == now — купон ещё действует.
pub fn validate_coupon(
    coupon: &Coupon,
    item: &CatalogItem,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if now > coupon.valid_till {
        return Err(CouponRejection::Expired);
    }
    if let Some(scoped_item) = coupon.item_id {
        if scoped_item != item.id {
            return Err(CouponRejection::ScopeMismatch);
        }
    }
    Ok(())
}

/// Размер скидки по купону от базовой цены.
/// Округление всегда вниз (целочисленное деление), чтобы повторные
/// расчёты давали один и тот же результат.
fn coupon_discount(base_price: i64, coupon: &Coupon) -> i64 {
    let raw = match coupon.discount_type.as_str() {
        "percentage" => {
            let pct = coupon.discount_value.clamp(0, 100);
            let d = base_price * pct / 100;
            match coupon.max_discount {
                Some(cap) => d.min(cap),
                None => d,
            }
        }
        "flat" => coupon.discount_value,
        _ => 0,
    };
    raw.clamp(0, base_price)
}

/// Мягкий расчёт: невалидный/просроченный/чужой купон — это не ошибка,
/// просто цена без скидки.
pub fn quote(item: &CatalogItem, coupon: Option<&Coupon>, now: DateTime<Utc>) -> Quote {
    let base_price = item.effective_price();

    let applied = coupon.filter(|c| validate_coupon(c, item, now).is_ok());

    let discount_amount = match applied {
        Some(c) => coupon_discount(base_price, c),
        None => 0,
    };

    Quote {
        base_price,
        discount_amount,
        final_price: base_price - discount_amount,
        applied_coupon_id: applied.map(|c| c.id),
    }
}
