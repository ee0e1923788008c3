// src/access.rs
//
// Решение о доступе на каждый защищённый read. Должно быть дешёвым
// (индексные выборки) и закрываться при любой неоднозначности.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db;
use crate::models::{Entitlement, ItemKind, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotEnrolled,
    Expired,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotEnrolled => "not enrolled",
            DenyReason::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow { expires_at: Option<DateTime<Utc>> },
    Deny { reason: DenyReason },
}

/// expires_at == NULL — бессрочно; истечение строго в прошлом закрывает доступ.
fn is_live(e: &Entitlement, now: DateTime<Utc>) -> bool {
    e.expires_at.map_or(true, |t| t > now)
}

/// Порядок приоритетов: админ -> не записан -> истёк -> allow.
pub async fn evaluate(
    pool: &PgPool,
    user: &User,
    kind: ItemKind,
    item_id: i32,
) -> Result<Decision, sqlx::Error> {
    if user.is_admin() {
        return Ok(Decision::Allow { expires_at: None });
    }

    // Бесплатная опубликованная позиция открыта всем.
    if let Some(item) = db::get_published_item(pool, kind, item_id).await? {
        if item.effective_price() == 0 {
            return Ok(Decision::Allow { expires_at: None });
        }
    }

    let mut entitlements = db::success_entitlements(pool, user.id, kind, item_id).await?;

    // Мок-тест доступен и через подписку на бандл, в чей текущий состав он входит.
    if kind == ItemKind::MockTest {
        entitlements.extend(db::bundle_entitlements_for_mock(pool, user.id, item_id).await?);
    }

    if entitlements.is_empty() {
        return Ok(Decision::Deny {
            reason: DenyReason::NotEnrolled,
        });
    }

    let now = Utc::now();
    let live: Vec<&Entitlement> = entitlements.iter().filter(|e| is_live(e, now)).collect();

    if live.is_empty() {
        return Ok(Decision::Deny {
            reason: DenyReason::Expired,
        });
    }

    // Отдаём самое широкое окно: бессрочный грант побеждает любую дату.
    let expires_at = if live.iter().any(|e| e.expires_at.is_none()) {
        None
    } else {
        live.iter().filter_map(|e| e.expires_at).max()
    };

    Ok(Decision::Allow { expires_at })
}
