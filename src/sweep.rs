// src/sweep.rs
//
// Фоновая уборка pending-заказов, которые так и не были оплачены.
// Гонка с поздней верификацией безопасна: verify требует существующей
// строки, по выметенному заказу он ответит unknown order.

use chrono::{Duration, Utc};
use sqlx::PgPool;

pub async fn start_pending_sweep(pool: PgPool) {
    let interval = std::env::var("PENDING_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(600);
    let ttl_minutes = std::env::var("PENDING_TTL_MINUTES")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(60);

    tokio::spawn(async move {
        loop {
            match sweep_stale_pending(&pool, ttl_minutes).await {
                Ok(0) => {}
                Ok(n) => log::info!("pending sweep removed {n} stale orders"),
                Err(e) => log::error!("pending sweep error: {e}"),
            }
            tokio::time::sleep(std::time::Duration::from_secs(interval)).await;
        }
    });
}

/// Удаляет pending-строки старше ttl. Только заказы провайдера:
/// прямые гранты provider_order_id не имеют и под уборку не попадают.
pub async fn sweep_stale_pending(pool: &PgPool, ttl_minutes: i64) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - Duration::minutes(ttl_minutes);

    let result = sqlx::query(
        r#"DELETE FROM entitlements
           WHERE payment_status = 'pending'
             AND provider_order_id IS NOT NULL
             AND created_at < $1"#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
