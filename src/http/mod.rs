mod client;

pub use client::{load_certificates_from_pem, Builder, HttpsClient};
