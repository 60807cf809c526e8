use std::time::Duration;

use moka::future::Cache;
use once_cell::sync::Lazy;
use rand::Rng;

/// OTPs live for 5 minutes and are consumed on first successful match.
const OTP_TTL_SECS: u64 = 300;

static ADMIN_OTPS: Lazy<Cache<String, String>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(OTP_TTL_SECS))
        .build()
});

pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

pub async fn set(mobile: &str, code: &str) {
    ADMIN_OTPS.insert(mobile.to_string(), code.to_string()).await;
}

/// Check the code for this mobile; a matching code is single-use.
pub async fn verify_and_consume(mobile: &str, code: &str) -> bool {
    match ADMIN_OTPS.get(mobile).await {
        Some(stored) if stored == code => {
            ADMIN_OTPS.invalidate(mobile).await;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn matching_code_verifies_once() {
        set("9000000001", "123456").await;

        assert!(verify_and_consume("9000000001", "123456").await);
        // consumed: second attempt fails
        assert!(!verify_and_consume("9000000001", "123456").await);
    }

    #[actix_web::test]
    async fn wrong_code_does_not_consume() {
        set("9000000002", "654321").await;

        assert!(!verify_and_consume("9000000002", "111111").await);
        assert!(verify_and_consume("9000000002", "654321").await);
    }

    #[actix_web::test]
    async fn unknown_mobile_fails() {
        assert!(!verify_and_consume("9999999999", "123456").await);
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
