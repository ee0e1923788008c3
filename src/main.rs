// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use edupay::{api, docs, sweep, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let razorpay_key_id = env::var("RAZORPAY_KEY_ID").expect("RAZORPAY_KEY_ID required");
    let razorpay_key_secret =
        env::var("RAZORPAY_KEY_SECRET").expect("RAZORPAY_KEY_SECRET required");

    // JWT_SECRET читает middleware; проверим наличие сразу, а не на первом запросе.
    env::var("JWT_SECRET").expect("JWT_SECRET required");

    sweep::start_pending_sweep(pool.clone()).await;

    let state = web::Data::new(AppState {
        pool,
        razorpay_key_id,
        razorpay_key_secret,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Всё платёжное — только под токеном внешнего auth-провайдера
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::quotes::quote)
                    .service(api::quotes::validate_coupon)
                    .service(api::orders::create_order)
                    .service(api::orders::verify_payment)
                    .service(api::orders::enroll_free)
                    .service(api::access::check_access)
                    .service(api::admin::gift_entitlement)
                    .service(api::admin::revoke_entitlement),
            )
    })
    .bind(("0.0.0.0", 8065))?
    .run()
    .await
}
