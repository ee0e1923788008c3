// src/api/orders.rs

use actix_web::{post, web, HttpResponse, Responder};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::AuthClaims;
use crate::api::{razorpay, razorpay_client};
use crate::db::{self, ConfirmOutcome};
use crate::models::ItemKind;
use crate::{pricing, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub item_kind: ItemKind,
    pub item_id: i32,
    pub coupon_code: Option<String>,
}

/// Создаёт заказ у провайдера и pending-entitlement под него.
/// Порядок важен: сначала провайдер, потом запись — упавший провайдер
/// не оставляет pending-сирот.
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Provider order created"),
        (status = 400, description = "Item not purchasable"),
        (status = 502, description = "Payment provider failure")
    )
)]
#[post("/orders")]
pub async fn create_order(
    state: web::Data<AppState>,
    claims: web::ReqData<AuthClaims>,
    payload: web::Json<CreateOrderRequest>,
) -> impl Responder {
    let claims = claims.into_inner();

    let user = match db::ensure_user(
        &state.pool,
        &claims.sub,
        claims.email.as_deref(),
        &claims.role,
    )
    .await
    {
        Ok(u) => u,
        Err(e) => {
            eprintln!("create_order ensure_user error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let item = match db::get_published_item(&state.pool, payload.item_kind, payload.item_id).await
    {
        Ok(Some(item)) => item,
        Ok(None) => return HttpResponse::BadRequest().json(json!({"error": "invalid item"})),
        Err(e) => {
            eprintln!("create_order get_published_item error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    // Бесплатные позиции идут мимо провайдера — /enrollments/free.
    if item.effective_price() <= 0 {
        return HttpResponse::BadRequest().json(json!({
            "error": "invalid item",
            "reason": "free item, use free enrollment"
        }));
    }

    let coupon = match payload.coupon_code.as_deref() {
        Some(code) => match db::get_coupon_by_code(&state.pool, code).await {
            Ok(c) => c,
            Err(e) => {
                eprintln!("create_order get_coupon_by_code error: {e}");
                return HttpResponse::InternalServerError().finish();
            }
        },
        None => None,
    };

    let now = Utc::now();
    let quote = pricing::quote(&item, coupon.as_ref(), now);

    // Купон может быть передан, но не применён (просрочен/чужой) —
    // в заказ уходит только реально применённый.
    let applied_coupon = coupon
        .as_ref()
        .filter(|c| quote.applied_coupon_id == Some(c.id));

    // Нулевую сумму провайдер не принимает: купон на 100% — это прямой
    // грант, применение купона фиксируется в той же транзакции.
    if quote.final_price == 0 {
        if let Some(c) = applied_coupon {
            let expires_at = item
                .access_days
                .map(|d| now + Duration::days(i64::from(d)));
            return match db::grant_zero_priced_order(
                &state.pool,
                user.id,
                &item,
                quote.base_price,
                c,
                expires_at,
            )
            .await
            {
                Ok(entitlement_id) => HttpResponse::Ok().json(json!({
                    "provider_order_id": null,
                    "amount": 0,
                    "currency": "INR",
                    "final_price": 0,
                    "enrolled": true,
                    "entitlement_id": entitlement_id,
                    "expires_at": expires_at
                })),
                Err(e) => {
                    eprintln!("create_order grant_zero_priced_order error: {e}");
                    HttpResponse::InternalServerError().finish()
                }
            };
        }
    }

    // Новый receipt id на каждую попытку: ретрай не пересекается
    // с ещё висящим прежним заказом.
    let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
    let amount_minor = quote.final_price * 100; // рупии -> пайсы

    log::info!(
        "razorpay create order user_id={} item={}:{} amount_minor={} receipt={}",
        user.id,
        item.kind.as_str(),
        item.id,
        amount_minor,
        receipt
    );

    let order = match razorpay_client::create_order(
        &state.razorpay_key_id,
        &state.razorpay_key_secret,
        razorpay_client::CreateOrderRequest {
            amount: amount_minor,
            currency: "INR".to_string(),
            receipt: receipt.clone(),
            notes: Some(json!({
                "user_id": user.id,
                "item_kind": item.kind.as_str(),
                "item_id": item.id
            })),
        },
    )
    .await
    {
        Ok(o) => o,
        Err(e) => {
            log::error!(
                "razorpay create_order error: {e} user_id={} item={}:{}",
                user.id,
                item.kind.as_str(),
                item.id
            );
            return HttpResponse::BadGateway().json(json!({"error": "payment provider error"}));
        }
    };

    let entitlement_id = match db::insert_pending_entitlement(
        &state.pool,
        user.id,
        &item,
        &order.id,
        &receipt,
        quote.base_price,
        quote.discount_amount,
        quote.final_price,
        applied_coupon,
    )
    .await
    {
        Ok(id) => id,
        Err(e) => {
            eprintln!("create_order insert_pending_entitlement error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(json!({
        "provider_order_id": order.id,
        "amount": order.amount,
        "currency": order.currency,
        "final_price": quote.final_price,
        "entitlement_id": entitlement_id
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Подтверждение оплаты. Может прилетать повторно (ретраи клиента,
/// дубли доставки) — повторный вызов по уже подтверждённому заказу
/// отвечает confirmed без повторных побочных эффектов.
#[utoipa::path(
    post,
    path = "/api/orders/verify",
    tag = "orders",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed"),
        (status = 400, description = "Signature mismatch"),
        (status = 404, description = "No such order")
    )
)]
#[post("/orders/verify")]
pub async fn verify_payment(
    state: web::Data<AppState>,
    payload: web::Json<VerifyPaymentRequest>,
) -> impl Responder {
    let payload = payload.into_inner();

    if !razorpay::verify_payment_signature(
        &state.razorpay_key_secret,
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    ) {
        // Подозрение на подделку. Состояние не трогаем: одиночное
        // несовпадение — не повод помечать заказ failed, клиент может
        // повторить верификацию.
        log::warn!(
            "payment signature mismatch order_id={} payment_id={}",
            payload.razorpay_order_id,
            payload.razorpay_payment_id
        );
        return HttpResponse::BadRequest().json(json!({"error": "invalid signature"}));
    }

    match db::confirm_paid_order(&state.pool, &payload.razorpay_order_id).await {
        Ok(ConfirmOutcome::Confirmed { expires_at, .. }) => {
            log::info!("payment confirmed order_id={}", payload.razorpay_order_id);
            HttpResponse::Ok().json(json!({"confirmed": true, "expires_at": expires_at}))
        }
        Ok(ConfirmOutcome::AlreadyConfirmed { expires_at }) => HttpResponse::Ok().json(json!({
            "confirmed": true,
            "idempotent": true,
            "expires_at": expires_at
        })),
        Ok(ConfirmOutcome::UnknownOrder) => {
            HttpResponse::NotFound().json(json!({"error": "unknown order"}))
        }
        Err(e) => {
            eprintln!("confirm_paid_order error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FreeEnrollRequest {
    pub item_kind: ItemKind,
    pub item_id: i32,
}

/// Запись на бесплатную позицию: success сразу, провайдер не участвует.
#[post("/enrollments/free")]
pub async fn enroll_free(
    state: web::Data<AppState>,
    claims: web::ReqData<AuthClaims>,
    payload: web::Json<FreeEnrollRequest>,
) -> impl Responder {
    let claims = claims.into_inner();

    let user = match db::ensure_user(
        &state.pool,
        &claims.sub,
        claims.email.as_deref(),
        &claims.role,
    )
    .await
    {
        Ok(u) => u,
        Err(e) => {
            eprintln!("enroll_free ensure_user error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let item = match db::get_published_item(&state.pool, payload.item_kind, payload.item_id).await
    {
        Ok(Some(item)) => item,
        Ok(None) => return HttpResponse::BadRequest().json(json!({"error": "invalid item"})),
        Err(e) => {
            eprintln!("enroll_free get_published_item error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if item.effective_price() != 0 {
        return HttpResponse::BadRequest().json(json!({
            "error": "invalid item",
            "reason": "item is not free"
        }));
    }

    // Живой грант уже есть — не плодим дубликаты.
    let now = Utc::now();
    match db::success_entitlements(&state.pool, user.id, item.kind, item.id).await {
        Ok(existing)
            if existing
                .iter()
                .any(|e| e.expires_at.map_or(true, |t| t > now)) =>
        {
            return HttpResponse::Ok().json(json!({"enrolled": true, "idempotent": true}));
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("enroll_free success_entitlements error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    }

    let expires_at = item.access_days.map(|d| now + Duration::days(i64::from(d)));

    match db::insert_direct_grant(&state.pool, user.id, item.kind, item.id, 0, expires_at, None)
        .await
    {
        Ok(entitlement_id) => HttpResponse::Ok().json(json!({
            "enrolled": true,
            "entitlement_id": entitlement_id,
            "expires_at": expires_at
        })),
        Err(e) => {
            eprintln!("enroll_free insert_direct_grant error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
