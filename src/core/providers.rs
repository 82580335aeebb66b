//! Injected capabilities: the clock and the card secret generator.
//!
//! Both are traits so operations can run against deterministic fakes in tests.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Produces the plaintext secrets printed on a new card.
pub trait SecretGenerator: Send + Sync {
    /// A new card number.
    fn card_number(&self) -> String;
    /// A new security code (CVC).
    fn security_code(&self) -> String;
}

/// Random Mastercard-range numbers and 3-digit codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecretGenerator;

impl SecretGenerator for RandomSecretGenerator {
    fn card_number(&self) -> String {
        let mut rng = rand::thread_rng();
        let mut digits = vec![5, rng.gen_range(1..=5)];
        digits.extend((0..13).map(|_| rng.gen_range(0..=9)));
        digits.push(luhn_check_digit(&digits));
        digits.iter().map(u8::to_string).collect()
    }

    fn security_code(&self) -> String {
        format!("{:03}", rand::thread_rng().gen_range(0..1000))
    }
}

/// Check digit that makes `payload` followed by it pass the Luhn test.
fn luhn_check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = u32::from(d);
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    // sum % 10 < 10, so the cast is lossless
    ((10 - sum % 10) % 10) as u8
}
