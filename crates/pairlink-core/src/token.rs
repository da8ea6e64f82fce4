//! Pairing tokens: the payload encoded into the scannable code shown while
//! a session is waiting to be linked.
//!
//! Format: `pair://v2/{random}-{issued_at_millis}-{device}`. The random and
//! device components are lowercase alphanumeric; the middle component is
//! the issue time in epoch milliseconds, so a token's age can be read back
//! from its text alone.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

pub const TOKEN_SCHEME: &str = "pair://v2/";

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const RANDOM_LEN: usize = 16;
const DEVICE_LEN: usize = 10;

/// An opaque, short-lived pairing token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairingToken {
    value: String,
    issued_at: DateTime<Utc>,
}

impl PairingToken {
    /// Issue a fresh token stamped with the current time.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng(), Utc::now())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Self {
        let random_id = random_component(rng, RANDOM_LEN);
        let device_id = random_component(rng, DEVICE_LEN);
        let value = format!(
            "{TOKEN_SCHEME}{random_id}-{}-{device_id}",
            now.timestamp_millis()
        );
        Self {
            value,
            issued_at: now,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.issued_at
    }

    /// Recover the issue time from a token's text.
    pub fn parse_issued_at(value: &str) -> Option<DateTime<Utc>> {
        let millis = value
            .strip_prefix(TOKEN_SCHEME)?
            .split('-')
            .nth(1)?
            .parse::<i64>()
            .ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

impl fmt::Display for PairingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for PairingToken {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

fn random_component<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn token_has_scheme_and_three_parts() {
        let token = PairingToken::generate();
        let rest = token.as_str().strip_prefix(TOKEN_SCHEME).unwrap();
        let parts: Vec<&str> = rest.split('-').collect();
        assert_eq!(parts.len(), 3, "got: {token}");
        assert_eq!(parts[0].len(), RANDOM_LEN);
        assert_eq!(parts[2].len(), DEVICE_LEN);
        assert!(parts[0]
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn issue_time_is_recoverable() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let token = PairingToken::generate_with(&mut StdRng::seed_from_u64(7), now);
        assert_eq!(token.issued_at(), now);
        assert_eq!(PairingToken::parse_issued_at(token.as_str()), Some(now));
    }

    #[test]
    fn age_is_measured_from_issue() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let token = PairingToken::generate_with(&mut StdRng::seed_from_u64(1), now);
        let later = now + Duration::seconds(20);
        assert_eq!(token.age(later), Duration::seconds(20));
    }

    #[test]
    fn same_instant_tokens_differ() {
        let now = Utc::now();
        let mut rng = rand::thread_rng();
        let a = PairingToken::generate_with(&mut rng, now);
        let b = PairingToken::generate_with(&mut rng, now);
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_foreign_text() {
        assert!(PairingToken::parse_issued_at("https://example.com/abc").is_none());
        assert!(PairingToken::parse_issued_at("pair://v2/abc-notanumber-def").is_none());
        assert!(PairingToken::parse_issued_at("pair://v2/abc").is_none());
    }
}
