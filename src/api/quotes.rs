// src/api/quotes.rs

use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::models::ItemKind;
use crate::{db, pricing, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub item_kind: ItemKind,
    pub item_id: i32,
    pub coupon_code: Option<String>,
}

/// Предварительный расчёт цены. Только чтение: купон здесь не «тратится»,
/// сколько бы раз клиент ни запрашивал превью.
#[utoipa::path(
    post,
    path = "/api/quote",
    tag = "pricing",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Price breakdown", body = crate::pricing::Quote),
        (status = 400, description = "Unknown or unpublished item")
    )
)]
#[post("/quote")]
pub async fn quote(
    state: web::Data<AppState>,
    payload: web::Json<QuoteRequest>,
) -> impl Responder {
    let item = match db::get_published_item(&state.pool, payload.item_kind, payload.item_id).await
    {
        Ok(Some(item)) => item,
        Ok(None) => return HttpResponse::BadRequest().json(json!({"error": "invalid item"})),
        Err(e) => {
            eprintln!("quote get_published_item error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let coupon = match payload.coupon_code.as_deref() {
        // Неизвестный код на мягком пути — просто без скидки.
        Some(code) => match db::get_coupon_by_code(&state.pool, code).await {
            Ok(c) => c,
            Err(e) => {
                eprintln!("quote get_coupon_by_code error: {e}");
                return HttpResponse::InternalServerError().finish();
            }
        },
        None => None,
    };

    let quote = pricing::quote(&item, coupon.as_ref(), Utc::now());
    HttpResponse::Ok().json(quote)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub item_kind: ItemKind,
    pub item_id: i32,
    pub code: String,
}

/// Жёсткая валидация купона: в отличие от /quote, невалидный купон —
/// это ошибка с причиной.
#[post("/coupons/validate")]
pub async fn validate_coupon(
    state: web::Data<AppState>,
    payload: web::Json<ValidateCouponRequest>,
) -> impl Responder {
    let item = match db::get_published_item(&state.pool, payload.item_kind, payload.item_id).await
    {
        Ok(Some(item)) => item,
        Ok(None) => return HttpResponse::BadRequest().json(json!({"error": "invalid item"})),
        Err(e) => {
            eprintln!("validate_coupon get_published_item error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let coupon = match db::get_coupon_by_code(&state.pool, &payload.code).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "invalid coupon",
                "reason": "unknown code"
            }));
        }
        Err(e) => {
            eprintln!("validate_coupon get_coupon_by_code error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(rejection) = pricing::validate_coupon(&coupon, &item, Utc::now()) {
        return HttpResponse::BadRequest().json(json!({
            "error": "invalid coupon",
            "reason": rejection.reason()
        }));
    }

    let computed = pricing::quote(&item, Some(&coupon), Utc::now());
    HttpResponse::Ok().json(json!({
        "valid": true,
        "base_price": computed.base_price,
        "discount_amount": computed.discount_amount,
        "final_price": computed.final_price
    }))
}
