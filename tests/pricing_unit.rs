use chrono::{Duration, Utc};

use edupay::models::{CatalogItem, Coupon, ItemKind};
use edupay::pricing::{self, CouponRejection};

fn item(price: i64, discounted_price: Option<i64>) -> CatalogItem {
    CatalogItem {
        id: 1,
        kind: ItemKind::Course,
        title: "Test course".to_string(),
        price,
        discounted_price,
        status: "published".to_string(),
        access_days: None,
        created_at: None,
    }
}

fn coupon(discount_type: &str, value: i64, max_discount: Option<i64>) -> Coupon {
    Coupon {
        id: 7,
        code: "SAVE".to_string(),
        discount_type: discount_type.to_string(),
        discount_value: value,
        max_discount,
        valid_till: Utc::now() + Duration::days(7),
        item_id: None,
        is_public: true,
        usage_count: 0,
        created_at: None,
    }
}

#[test]
fn percentage_discount_basic() {
    let q = pricing::quote(&item(1000, None), Some(&coupon("percentage", 20, None)), Utc::now());
    assert_eq!(q.base_price, 1000);
    assert_eq!(q.discount_amount, 200);
    assert_eq!(q.final_price, 800);
    assert_eq!(q.applied_coupon_id, Some(7));
}

#[test]
fn expired_coupon_soft_passes() {
    let mut c = coupon("percentage", 20, None);
    c.valid_till = Utc::now() - Duration::days(1);

    let q = pricing::quote(&item(1000, None), Some(&c), Utc::now());
    assert_eq!(q.final_price, 1000);
    assert_eq!(q.discount_amount, 0);
    assert_eq!(q.applied_coupon_id, None);
}

#[test]
fn valid_till_boundary_is_inclusive() {
    let now = Utc::now();
    let mut c = coupon("percentage", 10, None);
    c.valid_till = now;

    let q = pricing::quote(&item(1000, None), Some(&c), now);
    assert_eq!(q.discount_amount, 100);
}

#[test]
fn flat_discount_clamped_to_price() {
    let q = pricing::quote(&item(500, None), Some(&coupon("flat", 800, None)), Utc::now());
    assert_eq!(q.discount_amount, 500);
    assert_eq!(q.final_price, 0);
}

#[test]
fn percentage_respects_max_discount_cap() {
    let q = pricing::quote(
        &item(10_000, None),
        Some(&coupon("percentage", 50, Some(2000))),
        Utc::now(),
    );
    assert_eq!(q.discount_amount, 2000);
    assert_eq!(q.final_price, 8000);
}

#[test]
fn percentage_rounds_down() {
    // 10% от 999 = 99.9 — всегда вниз, чтобы повторные расчёты совпадали
    let q = pricing::quote(&item(999, None), Some(&coupon("percentage", 10, None)), Utc::now());
    assert_eq!(q.discount_amount, 99);
    assert_eq!(q.final_price, 900);
}

#[test]
fn scoped_coupon_rejects_other_item() {
    let mut c = coupon("percentage", 20, None);
    c.item_id = Some(999);
    let target = item(1000, None);

    let q = pricing::quote(&target, Some(&c), Utc::now());
    assert_eq!(q.discount_amount, 0);
    assert_eq!(q.applied_coupon_id, None);

    assert_eq!(
        pricing::validate_coupon(&c, &target, Utc::now()),
        Err(CouponRejection::ScopeMismatch)
    );
}

#[test]
fn scoped_coupon_applies_to_its_item() {
    let mut c = coupon("percentage", 20, None);
    c.item_id = Some(1);

    let q = pricing::quote(&item(1000, None), Some(&c), Utc::now());
    assert_eq!(q.discount_amount, 200);
}

#[test]
fn discounted_price_is_quote_base() {
    let q = pricing::quote(
        &item(1000, Some(600)),
        Some(&coupon("percentage", 50, None)),
        Utc::now(),
    );
    assert_eq!(q.base_price, 600);
    assert_eq!(q.discount_amount, 300);
    assert_eq!(q.final_price, 300);
}

#[test]
fn quote_is_deterministic_and_never_negative() {
    let now = Utc::now();
    for price in [0i64, 1, 99, 100, 999, 10_000] {
        for value in [0i64, 1, 50, 100, 5000] {
            for kind in ["percentage", "flat"] {
                let c = coupon(kind, value, None);
                let it = item(price, None);
                let a = pricing::quote(&it, Some(&c), now);
                let b = pricing::quote(&it, Some(&c), now);
                assert!(a.final_price >= 0);
                assert!(a.final_price <= price);
                assert_eq!(a.final_price + a.discount_amount, a.base_price);
                assert_eq!(a.final_price, b.final_price);
            }
        }
    }
}
