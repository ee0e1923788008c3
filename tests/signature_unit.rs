use edupay::api::razorpay::{payment_signature, verify_payment_signature};

const SECRET: &str = "whsec_test123secret456";

#[test]
fn signature_roundtrip_verifies() {
    let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
    assert!(verify_payment_signature(SECRET, "order_abc", "pay_xyz", &sig));
}

#[test]
fn signature_is_lowercase_hex_sha256() {
    let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
    assert_eq!(sig.len(), 64);
    assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn tampered_payment_id_rejected() {
    let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
    assert!(!verify_payment_signature(SECRET, "order_abc", "pay_other", &sig));
}

#[test]
fn tampered_order_id_rejected() {
    let sig = payment_signature(SECRET, "order_abc", "pay_xyz");
    assert!(!verify_payment_signature(SECRET, "order_other", "pay_xyz", &sig));
}

#[test]
fn wrong_secret_rejected() {
    let sig = payment_signature("wrong_secret", "order_abc", "pay_xyz");
    assert!(!verify_payment_signature(SECRET, "order_abc", "pay_xyz", &sig));
}

#[test]
fn garbage_signature_rejected() {
    assert!(!verify_payment_signature(SECRET, "order_abc", "pay_xyz", "not-a-signature"));
}
