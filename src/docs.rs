use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::quotes::quote,
        crate::api::orders::create_order,
        crate::api::orders::verify_payment,
        crate::api::access::check_access
    ),
    components(
        schemas(
            crate::models::ItemKind,
            crate::pricing::Quote,
            crate::api::quotes::QuoteRequest,
            crate::api::quotes::ValidateCouponRequest,
            crate::api::orders::CreateOrderRequest,
            crate::api::orders::VerifyPaymentRequest,
            crate::api::orders::FreeEnrollRequest,
            crate::api::admin::GiftRequest
        )
    ),
    tags(
        (name = "pricing", description = "Price quotes and coupon validation"),
        (name = "orders", description = "Provider orders and payment verification"),
        (name = "access", description = "Entitlement access checks")
    )
)]
pub struct ApiDoc;
