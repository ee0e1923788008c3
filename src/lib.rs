pub mod access;
pub mod api;
pub mod db;
pub mod docs;
pub mod models;
pub mod pricing;
pub mod sweep;

use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
}
