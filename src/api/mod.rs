pub mod access;
pub mod admin;
pub mod auth;
pub mod orders;
pub mod quotes;
pub mod razorpay;
pub mod razorpay_client;
