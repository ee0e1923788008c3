// src/api/admin.rs
//
// Админские оверрайды вне платёжного потока: подарочный грант и
// возврат/коррекция. Оба действия пишутся в лог как аудит.

use actix_web::{delete, post, web, HttpResponse, Responder};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::auth::AuthClaims;
use crate::models::{ItemKind, User};
use crate::{db, AppState};

async fn require_admin(state: &AppState, claims: &AuthClaims) -> Result<User, HttpResponse> {
    let user = db::ensure_user(&state.pool, &claims.sub, claims.email.as_deref(), &claims.role)
        .await
        .map_err(|e| {
            eprintln!("admin ensure_user error: {e}");
            HttpResponse::InternalServerError().finish()
        })?;

    if !user.is_admin() {
        return Err(HttpResponse::Forbidden().json(json!({"error": "forbidden"})));
    }
    Ok(user)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GiftRequest {
    pub user_id: i32,
    pub item_kind: ItemKind,
    pub item_id: i32,
    /// Явный срок; если не задан — считаем от access_days позиции.
    pub expires_at: Option<DateTime<Utc>>,
}

#[post("/admin/entitlements")]
pub async fn gift_entitlement(
    state: web::Data<AppState>,
    claims: web::ReqData<AuthClaims>,
    payload: web::Json<GiftRequest>,
) -> impl Responder {
    let admin = match require_admin(&state, &claims).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let target = match db::get_user_by_id(&state.pool, payload.user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return HttpResponse::BadRequest().json(json!({"error": "unknown user"})),
        Err(e) => {
            eprintln!("gift_entitlement get_user_by_id error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let item = match db::get_published_item(&state.pool, payload.item_kind, payload.item_id).await
    {
        Ok(Some(item)) => item,
        Ok(None) => return HttpResponse::BadRequest().json(json!({"error": "invalid item"})),
        Err(e) => {
            eprintln!("gift_entitlement get_published_item error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let expires_at = payload.expires_at.or_else(|| {
        item.access_days
            .map(|d| Utc::now() + Duration::days(i64::from(d)))
    });

    let entitlement_id = match db::insert_direct_grant(
        &state.pool,
        target.id,
        item.kind,
        item.id,
        item.effective_price(),
        expires_at,
        Some(admin.id),
    )
    .await
    {
        Ok(id) => id,
        Err(e) => {
            eprintln!("gift_entitlement insert_direct_grant error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    log::info!(
        "admin gift admin_id={} user_id={} item={}:{} entitlement_id={}",
        admin.id,
        target.id,
        item.kind.as_str(),
        item.id,
        entitlement_id
    );

    HttpResponse::Ok().json(json!({
        "granted": true,
        "entitlement_id": entitlement_id,
        "expires_at": expires_at
    }))
}

#[delete("/admin/entitlements/{id}")]
pub async fn revoke_entitlement(
    state: web::Data<AppState>,
    claims: web::ReqData<AuthClaims>,
    path: web::Path<i32>,
) -> impl Responder {
    let admin = match require_admin(&state, &claims).await {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let entitlement_id = path.into_inner();

    match db::revoke_entitlement(&state.pool, entitlement_id).await {
        Ok(true) => {
            log::info!(
                "admin revoke admin_id={} entitlement_id={}",
                admin.id,
                entitlement_id
            );
            HttpResponse::Ok().json(json!({"revoked": true}))
        }
        Ok(false) => HttpResponse::NotFound().json(json!({"error": "not found"})),
        Err(e) => {
            eprintln!("revoke_entitlement error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
