// src/db.rs

use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::models::{CatalogItem, Coupon, Entitlement, ItemKind, PaymentStatus, User};

fn item_from_row(r: &PgRow) -> CatalogItem {
    let kind: String = r.get("kind");
    CatalogItem {
        id: r.get("id"),
        kind: ItemKind::parse(&kind).expect("kind constrained by schema"),
        title: r.get("title"),
        price: r.get("price"),
        discounted_price: r.get("discounted_price"),
        status: r.get("status"),
        access_days: r.get("access_days"),
        created_at: r.get("created_at"),
    }
}

fn coupon_from_row(r: &PgRow) -> Coupon {
    Coupon {
        id: r.get("id"),
        code: r.get("code"),
        discount_type: r.get("discount_type"),
        discount_value: r.get("discount_value"),
        max_discount: r.get("max_discount"),
        valid_till: r.get("valid_till"),
        item_id: r.get("item_id"),
        is_public: r.get("is_public"),
        usage_count: r.get("usage_count"),
        created_at: r.get("created_at"),
    }
}

fn entitlement_from_row(r: &PgRow) -> Entitlement {
    let kind: String = r.get("item_kind");
    let status: String = r.get("payment_status");
    Entitlement {
        id: r.get("id"),
        user_id: r.get("user_id"),
        item_kind: ItemKind::parse(&kind).expect("item_kind constrained by schema"),
        item_id: r.get("item_id"),
        payment_status: PaymentStatus::parse(&status).expect("payment_status constrained by schema"),
        provider: r.get("provider"),
        provider_order_id: r.get("provider_order_id"),
        receipt_id: r.get("receipt_id"),
        original_price: r.get("original_price"),
        discount_amount: r.get("discount_amount"),
        amount_paid: r.get("amount_paid"),
        coupon_id: r.get("coupon_id"),
        coupon_code: r.get("coupon_code"),
        access_days: r.get("access_days"),
        expires_at: r.get("expires_at"),
        granted_by: r.get("granted_by"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

const ENTITLEMENT_COLUMNS: &str = r#"id, user_id, item_kind, item_id, payment_status, provider,
    provider_order_id, receipt_id, original_price, discount_amount, amount_paid,
    coupon_id, coupon_code, access_days, expires_at, granted_by, created_at, updated_at"#;

/// Зеркалим внешнюю identity в локальную запись. Роль и email каждый раз
/// берём из токена: источник истины — auth-провайдер.
pub async fn ensure_user(
    pool: &PgPool,
    external_id: &str,
    email: Option<&str>,
    role: &str,
) -> Result<User, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO users (external_id, email, role)
           VALUES ($1, $2, $3)
           ON CONFLICT (external_id)
           DO UPDATE SET
               email = COALESCE(EXCLUDED.email, users.email),
               role = EXCLUDED.role
           RETURNING id, external_id, email, role, created_at"#,
    )
    .bind(external_id)
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(User {
        id: row.get("id"),
        external_id: row.get("external_id"),
        email: row.get("email"),
        role: row.get("role"),
        created_at: row.get("created_at"),
    })
}

pub async fn get_user_by_id(pool: &PgPool, user_id: i32) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, external_id, email, role, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| User {
        id: r.get("id"),
        external_id: r.get("external_id"),
        email: r.get("email"),
        role: r.get("role"),
        created_at: r.get("created_at"),
    }))
}

pub async fn get_published_item(
    pool: &PgPool,
    kind: ItemKind,
    item_id: i32,
) -> Result<Option<CatalogItem>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, kind, title, price, discounted_price, status, access_days, created_at
           FROM catalog_items
           WHERE id = $1 AND kind = $2 AND status = 'published'"#,
    )
    .bind(item_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| item_from_row(&r)))
}

pub async fn get_coupon_by_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<Coupon>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, code, discount_type, discount_value, max_discount, valid_till,
                  item_id, is_public, usage_count, created_at
           FROM coupons
           WHERE code = $1"#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| coupon_from_row(&r)))
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_pending_entitlement(
    pool: &PgPool,
    user_id: i32,
    item: &CatalogItem,
    provider_order_id: &str,
    receipt_id: &str,
    original_price: i64,
    discount_amount: i64,
    amount_paid: i64,
    coupon: Option<&Coupon>,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO entitlements
               (user_id, item_kind, item_id, payment_status, provider, provider_order_id,
                receipt_id, original_price, discount_amount, amount_paid,
                coupon_id, coupon_code, access_days)
           VALUES ($1, $2, $3, 'pending', 'razorpay', $4, $5, $6, $7, $8, $9, $10, $11)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(item.kind.as_str())
    .bind(item.id)
    .bind(provider_order_id)
    .bind(receipt_id)
    .bind(original_price)
    .bind(discount_amount)
    .bind(amount_paid)
    .bind(coupon.map(|c| c.id))
    .bind(coupon.map(|c| c.code.as_str()))
    .bind(item.access_days)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

/// Прямой грант (бесплатная позиция или подарок админа) — сразу success,
/// без провайдера. amount_paid здесь всегда 0.
pub async fn insert_direct_grant(
    pool: &PgPool,
    user_id: i32,
    kind: ItemKind,
    item_id: i32,
    original_price: i64,
    expires_at: Option<DateTime<Utc>>,
    granted_by: Option<i32>,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO entitlements
               (user_id, item_kind, item_id, payment_status, provider,
                original_price, discount_amount, amount_paid, expires_at, granted_by)
           VALUES ($1, $2, $3, 'success', 'none', $4, 0, 0, $5, $6)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(item_id)
    .bind(original_price)
    .bind(expires_at)
    .bind(granted_by)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

/// Заказ, который купон довёл до нуля: провайдер не принимает нулевые
/// суммы, поэтому грантим сразу и фиксируем применение купона в той же
/// транзакции — счётчик и журнал не расходятся.
pub async fn grant_zero_priced_order(
    pool: &PgPool,
    user_id: i32,
    item: &CatalogItem,
    original_price: i64,
    coupon: &Coupon,
    expires_at: Option<DateTime<Utc>>,
) -> Result<i32, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"INSERT INTO entitlements
               (user_id, item_kind, item_id, payment_status, provider,
                original_price, discount_amount, amount_paid,
                coupon_id, coupon_code, access_days, expires_at)
           VALUES ($1, $2, $3, 'success', 'none', $4, $4, 0, $5, $6, $7, $8)
           RETURNING id"#,
    )
    .bind(user_id)
    .bind(item.kind.as_str())
    .bind(item.id)
    .bind(original_price)
    .bind(coupon.id)
    .bind(&coupon.code)
    .bind(item.access_days)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;

    let entitlement_id: i32 = row.get("id");
    apply_coupon_usage(&mut tx, coupon.id, user_id, entitlement_id, original_price).await?;

    tx.commit().await?;
    Ok(entitlement_id)
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Confirmed {
        entitlement_id: i32,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Повторное подтверждение того же заказа — не ошибка и не повторный грант.
    AlreadyConfirmed {
        expires_at: Option<DateTime<Utc>>,
    },
    /// Заказ не найден (или уже выметен GC) — закрываемся, ничего не создаём.
    UnknownOrder,
}

/// Переход pending -> success плюс запись применения купона, всё одной
/// транзакцией. Параллельные подтверждения одного заказа сериализуются
/// блокировкой строки; условный UPDATE по payment_status отличает
/// «перевёл я» от «уже перевели» и решает, выполнять ли побочный эффект.
pub async fn confirm_paid_order(
    pool: &PgPool,
    provider_order_id: &str,
) -> Result<ConfirmOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"SELECT id, user_id, payment_status, coupon_id, discount_amount, access_days, expires_at
           FROM entitlements
           WHERE provider_order_id = $1
           FOR UPDATE"#,
    )
    .bind(provider_order_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Ok(ConfirmOutcome::UnknownOrder);
    };

    let entitlement_id: i32 = row.get("id");
    let user_id: i32 = row.get("user_id");
    let status: String = row.get("payment_status");
    let coupon_id: Option<i32> = row.get("coupon_id");
    let discount_amount: i64 = row.get("discount_amount");
    let access_days: Option<i32> = row.get("access_days");

    match status.as_str() {
        "pending" => {}
        "success" => {
            return Ok(ConfirmOutcome::AlreadyConfirmed {
                expires_at: row.get("expires_at"),
            });
        }
        _ => return Ok(ConfirmOutcome::UnknownOrder),
    }

    // Окно доступа стартует с момента оплаты, не с момента создания заказа.
    let now = Utc::now();
    let expires_at = access_days.map(|d| now + Duration::days(i64::from(d)));

    let updated = sqlx::query(
        r#"UPDATE entitlements
           SET payment_status = 'success', expires_at = $1, updated_at = $2
           WHERE id = $3 AND payment_status = 'pending'"#,
    )
    .bind(expires_at)
    .bind(now)
    .bind(entitlement_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 1 {
        if let Some(coupon_id) = coupon_id {
            apply_coupon_usage(&mut tx, coupon_id, user_id, entitlement_id, discount_amount)
                .await?;
        }
    }

    tx.commit().await?;

    Ok(ConfirmOutcome::Confirmed {
        entitlement_id,
        expires_at,
    })
}

/// Инкремент счётчика и строка журнала — строго в одной транзакции
/// с переходом статуса; уникальный индекс по entitlement_id не даст
/// записать применение дважды.
async fn apply_coupon_usage(
    tx: &mut Transaction<'_, Postgres>,
    coupon_id: i32,
    user_id: i32,
    entitlement_id: i32,
    discount_amount: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE coupons SET usage_count = usage_count + 1 WHERE id = $1")
        .bind(coupon_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"INSERT INTO coupon_usages (coupon_id, user_id, entitlement_id, discount_amount)
           VALUES ($1, $2, $3, $4)"#,
    )
    .bind(coupon_id)
    .bind(user_id)
    .bind(entitlement_id)
    .bind(discount_amount)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn success_entitlements(
    pool: &PgPool,
    user_id: i32,
    kind: ItemKind,
    item_id: i32,
) -> Result<Vec<Entitlement>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"SELECT {ENTITLEMENT_COLUMNS}
           FROM entitlements
           WHERE user_id = $1 AND item_kind = $2 AND item_id = $3
             AND payment_status = 'success'
           ORDER BY created_at DESC"#
    ))
    .bind(user_id)
    .bind(kind.as_str())
    .bind(item_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(entitlement_from_row).collect())
}

/// Подписки на бандлы, в чей ТЕКУЩИЙ состав входит мок-тест.
/// Состав читается вживую, не снапшотом на момент покупки: убрали мок
/// из бандла — доступ у действующих подписчиков пропал.
pub async fn bundle_entitlements_for_mock(
    pool: &PgPool,
    user_id: i32,
    mock_test_id: i32,
) -> Result<Vec<Entitlement>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"SELECT {ENTITLEMENT_COLUMNS}
           FROM entitlements e
           JOIN bundle_members bm ON bm.bundle_id = e.item_id
           WHERE bm.mock_test_id = $1
             AND e.user_id = $2
             AND e.item_kind = 'mock_bundle'
             AND e.payment_status = 'success'"#
    ))
    .bind(mock_test_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(entitlement_from_row).collect())
}

pub async fn get_entitlement(
    pool: &PgPool,
    entitlement_id: i32,
) -> Result<Option<Entitlement>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {ENTITLEMENT_COLUMNS} FROM entitlements WHERE id = $1"#
    ))
    .bind(entitlement_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| entitlement_from_row(&r)))
}

/// Возврат/коррекция: сносим entitlement и каскадно правим журнал купона
/// и его счётчик, чтобы инвариант usage_count == count(usages) устоял.
pub async fn revoke_entitlement(pool: &PgPool, entitlement_id: i32) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT id FROM entitlements WHERE id = $1 FOR UPDATE")
        .bind(entitlement_id)
        .fetch_optional(&mut *tx)
        .await?;

    if row.is_none() {
        return Ok(false);
    }

    let usage = sqlx::query("SELECT id, coupon_id FROM coupon_usages WHERE entitlement_id = $1")
        .bind(entitlement_id)
        .fetch_optional(&mut *tx)
        .await?;

    if let Some(usage) = usage {
        let usage_id: i32 = usage.get("id");
        let coupon_id: i32 = usage.get("coupon_id");

        sqlx::query("UPDATE coupons SET usage_count = GREATEST(usage_count - 1, 0) WHERE id = $1")
            .bind(coupon_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM coupon_usages WHERE id = $1")
            .bind(usage_id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("DELETE FROM entitlements WHERE id = $1")
        .bind(entitlement_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}
