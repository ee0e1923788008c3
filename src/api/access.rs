// src/api/access.rs

use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::access::{self, Decision};
use crate::api::auth::AuthClaims;
use crate::models::ItemKind;
use crate::{db, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AccessQuery {
    pub item_kind: ItemKind,
    pub item_id: i32,
}

/// Вызывается на каждый защищённый read (контент курса, вопросы теста).
/// Любая ошибка — отказ, не допуск.
#[utoipa::path(
    get,
    path = "/api/access",
    tag = "access",
    params(AccessQuery),
    responses(
        (status = 200, description = "Access decision")
    )
)]
#[get("/access")]
pub async fn check_access(
    state: web::Data<AppState>,
    claims: web::ReqData<AuthClaims>,
    query: web::Query<AccessQuery>,
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
            eprintln!("check_access ensure_user error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    match access::evaluate(&state.pool, &user, query.item_kind, query.item_id).await {
        Ok(Decision::Allow { expires_at }) => {
            HttpResponse::Ok().json(json!({"access": true, "expires_at": expires_at}))
        }
        Ok(Decision::Deny { reason }) => {
            HttpResponse::Ok().json(json!({"access": false, "reason": reason.as_str()}))
        }
        Err(e) => {
            eprintln!("check_access evaluate error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
