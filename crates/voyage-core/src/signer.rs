//! Request signer for the `/interactions` endpoint
//!
//! The remote service checks every submitted interaction against an
//! HMAC-SHA256 whose key is derived from the user id and the one-hour window
//! the request falls into. Nothing here is secret: anyone holding the user id
//! and the timestamp can recompute the key. The arithmetic must match the
//! verifier exactly, including its IEEE-754 double rounding, or submissions
//! are rejected.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

use crate::types::{InteractionRecord, UnsignedInteraction};
use crate::{Result, VoyageError};

/// Length of a signing window in milliseconds
pub const SIGNING_WINDOW_MS: i64 = 3_600_000;

/// Name of the field that carries the signature and is excluded from signing
pub const SIGNATURE_FIELD: &str = "signature";

/// Key material and signature for one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub key_material: String,
    pub signature: String,
}

/// Start and end (exclusive) of the window enclosing `timestamp_ms`
pub fn signing_window(timestamp_ms: i64) -> (i64, i64) {
    let hour_start = timestamp_ms - timestamp_ms.rem_euclid(SIGNING_WINDOW_MS);
    (hour_start, hour_start + SIGNING_WINDOW_MS)
}

/// Derive the HMAC key for `user_id` at `timestamp_ms`
///
/// Produces `hourStart+1|hourEnd|userId*mod|(hourStart*userId) mod 1000000`
/// where `mod = (1337*userId + hourStart mod 10000) mod 9999`.
pub fn derive_key(user_id: u64, timestamp_ms: i64) -> String {
    let (hour_start, hour_end) = signing_window(timestamp_ms);

    // The verifier works on doubles; products past 2^53 round, and so must ours.
    let start = hour_start as f64;
    let user = user_id as f64;
    let modulus = (1337.0 * user + start % 10_000.0) % 9_999.0;

    [
        number_to_string(start + 1.0),
        number_to_string(hour_end as f64),
        number_to_string(user * modulus),
        number_to_string((start * user) % 1_000_000.0),
    ]
    .join("|")
}

/// Decimal rendering of an integral double, without exponent notation
fn number_to_string(value: f64) -> String {
    format!("{}", value)
}

/// Canonical JSON of a payload object
///
/// Top-level keys are emitted in lexicographic order with `signature`
/// dropped. That sorted key list doubles as the property allow-list for
/// nested objects, which is how the verifier serializes (`metadata` comes out
/// as `{}`).
pub fn canonicalize(payload: &Value) -> Result<String> {
    let map = payload.as_object().ok_or_else(|| {
        VoyageError::Validation("signing payload must be a JSON object".to_string())
    })?;

    let mut keys: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| *key != SIGNATURE_FIELD)
        .collect();
    keys.sort_unstable();

    let mut out = String::new();
    write_object(map, &keys, &mut out)?;
    Ok(out)
}

fn write_object(map: &Map<String, Value>, keys: &[&str], out: &mut String) -> Result<()> {
    out.push('{');
    let mut first = true;
    for key in keys {
        let Some(value) = map.get(*key) else {
            continue;
        };
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&serde_json::to_string(key)?);
        out.push(':');
        write_value(value, keys, out)?;
    }
    out.push('}');
    Ok(())
}

fn write_value(value: &Value, keys: &[&str], out: &mut String) -> Result<()> {
    match value {
        Value::Object(map) => write_object(map, keys, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, keys, out)?;
            }
            out.push(']');
            Ok(())
        }
        scalar => {
            out.push_str(&serde_json::to_string(scalar)?);
            Ok(())
        }
    }
}

/// HMAC-SHA256 of `message` under `key`, lowercase hex
pub fn hmac_hex(key: &str, message: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| VoyageError::Other(format!("Failed to initialise HMAC: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Sign an arbitrary payload object for `user_id` at `timestamp_ms`
pub fn sign_value(user_id: u64, payload: &Value, timestamp_ms: i64) -> Result<Signature> {
    let key_material = derive_key(user_id, timestamp_ms);
    let canonical = canonicalize(payload)?;
    let signature = hmac_hex(&key_material, &canonical)?;
    Ok(Signature {
        key_material,
        signature,
    })
}

/// Sign an interaction payload
pub fn sign(unsigned: &UnsignedInteraction, timestamp_ms: i64) -> Result<Signature> {
    let payload = serde_json::to_value(unsigned)?;
    sign_value(unsigned.user_id, &payload, timestamp_ms)
}

/// Sign an interaction and attach the signature
pub fn sign_interaction(
    unsigned: UnsignedInteraction,
    timestamp_ms: i64,
) -> Result<InteractionRecord> {
    let Signature { signature, .. } = sign(&unsigned, timestamp_ms)?;
    tracing::debug!(
        user_id = unsigned.user_id,
        timestamp_ms,
        "Signed interaction payload"
    );
    Ok(InteractionRecord::from_unsigned(unsigned, signature))
}
