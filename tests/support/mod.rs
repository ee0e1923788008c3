#![allow(dead_code)]

use sqlx::{PgPool, Row};
use std::env;
use std::sync::OnceLock;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use edupay::AppState;

fn split_db_url(url: &str) -> Result<(String, String), String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query)),
        None => (url.to_string(), None),
    };

    let db_start = base
        .rfind('/')
        .ok_or_else(|| "invalid database url".to_string())?;
    if db_start + 1 >= base.len() {
        return Err("database name is empty".to_string());
    }

    let db_name = base[db_start + 1..].to_string();
    let mut admin_url = format!("{}postgres", &base[..db_start + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }

    Ok((admin_url, db_name))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

pub async fn init_test_db() -> TestDb {
    dotenvy::dotenv().ok();
    let test_url = env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let (admin_url, db_name) =
        split_db_url(&test_url).expect("invalid TEST_DATABASE_URL format");

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url)
        .await
        .expect("connect admin db");

    let _ = sqlx::query("SELECT pg_advisory_lock(424242)")
        .execute(&admin_pool)
        .await;

    let quoted_name = quote_identifier(&db_name);
    let drop_sql = format!("DROP DATABASE IF EXISTS {quoted_name} WITH (FORCE)");
    let create_sql = format!("CREATE DATABASE {quoted_name}");

    let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
    let create_result = sqlx::query(&create_sql).execute(&admin_pool).await;
    if let Err(e) = create_result {
        eprintln!("create test db error: {e}");
        let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
        sqlx::query(&create_sql)
            .execute(&admin_pool)
            .await
            .expect("create test db retry");
    }

    let _ = sqlx::query("SELECT pg_advisory_unlock(424242)")
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;

    let pool = PgPool::connect(&test_url)
        .await
        .expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    TestDb { pool, _guard: guard }
}

pub const TEST_RAZORPAY_SECRET: &str = "test-razorpay-secret";

pub fn build_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        razorpay_key_id: "rzp_test_key".to_string(),
        razorpay_key_secret: TEST_RAZORPAY_SECRET.to_string(),
    }
}

pub async fn insert_user(pool: &PgPool, role: &str) -> i32 {
    sqlx::query(
        r#"INSERT INTO users (external_id, email, role)
           VALUES ($1, $2, $3)
           RETURNING id"#,
    )
    .bind(format!("ext_{}", Uuid::new_v4()))
    .bind(format!("user_{}@example.com", Uuid::new_v4().simple()))
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("insert user")
    .get("id")
}

pub async fn insert_item(
    pool: &PgPool,
    kind: &str,
    price: i64,
    discounted_price: Option<i64>,
    status: &str,
    access_days: Option<i32>,
) -> i32 {
    sqlx::query(
        r#"INSERT INTO catalog_items (kind, title, price, discounted_price, status, access_days)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id"#,
    )
    .bind(kind)
    .bind(format!("Test {kind} {}", Uuid::new_v4().simple()))
    .bind(price)
    .bind(discounted_price)
    .bind(status)
    .bind(access_days)
    .fetch_one(pool)
    .await
    .expect("insert catalog item")
    .get("id")
}

pub async fn insert_coupon(
    pool: &PgPool,
    code: &str,
    discount_type: &str,
    discount_value: i64,
    max_discount: Option<i64>,
    valid_till: chrono::DateTime<chrono::Utc>,
    item_id: Option<i32>,
) -> i32 {
    sqlx::query(
        r#"INSERT INTO coupons (code, discount_type, discount_value, max_discount, valid_till, item_id)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id"#,
    )
    .bind(code)
    .bind(discount_type)
    .bind(discount_value)
    .bind(max_discount)
    .bind(valid_till)
    .bind(item_id)
    .fetch_one(pool)
    .await
    .expect("insert coupon")
    .get("id")
}
