//! Expiry inspection for JWT-shaped access tokens.
//!
//! Only the `exp` claim is read; signatures are not verified. Tokens that
//! do not decode as a JWT are treated as opaque.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

fn expiry_validation() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation
}

/// Reads the `exp` claim of a JWT, if the token is one.
#[must_use]
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &expiry_validation())
        .ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

/// Returns true if the token is a JWT expiring within `buffer_secs` of `now`.
///
/// A buffer reaching past the representable time range counts as expiring.
#[must_use]
pub fn is_expiring(token: &str, now: DateTime<Utc>, buffer_secs: i64) -> bool {
    jwt_expiry(token).is_some_and(|exp| {
        TimeDelta::try_seconds(buffer_secs)
            .and_then(|buffer| now.checked_add_signed(buffer))
            .is_none_or(|deadline| exp <= deadline)
    })
}
