// src/api/razorpay.rs

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Каноническая строка подписи Razorpay: "{order_id}|{payment_id}".
/// Алгоритм должен бит-в-бит совпадать с провайдером.
pub fn payment_signature(key_secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Сравнение за константное время: подпись приходит снаружи.
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    supplied: &str,
) -> bool {
    let expected = payment_signature(key_secret, order_id, payment_id);
    subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), supplied.as_bytes()).into()
}
