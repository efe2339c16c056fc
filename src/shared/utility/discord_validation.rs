use crate::shared::error::InteractionError;

const PUBLIC_KEY_LENGTH: usize = 32;
const SIGNATURE_LENGTH: usize = 64;

/// Verifies a Discord request signature: an Ed25519 signature over `timestamp ++ body`.
///
/// Empty material, malformed hex, wrong lengths and mismatching signatures are all
/// reported as [`InteractionError::SignatureInvalid`].
pub fn verify_signature(
    public_key: &str,
    signature: &str,
    timestamp: &str,
    body: &str,
) -> Result<(), InteractionError> {
    if public_key.is_empty() {
        return Err(InteractionError::SignatureInvalid(
            "no public key configured".into(),
        ));
    }

    if signature.is_empty() || timestamp.is_empty() {
        return Err(InteractionError::SignatureInvalid(
            "missing signature or timestamp header".into(),
        ));
    }

    let signature_bytes = decode_hex(signature, SIGNATURE_LENGTH, "signature")?;
    let public_key_bytes = decode_hex(public_key, PUBLIC_KEY_LENGTH, "public key")?;

    let message = format!("{timestamp}{body}");

    match nacl::sign::verify(&signature_bytes, message.as_bytes(), &public_key_bytes) {
        Ok(true) => Ok(()),
        Ok(false) => Err(InteractionError::SignatureInvalid(
            "signature does not match".into(),
        )),
        Err(e) => Err(InteractionError::SignatureInvalid(format!(
            "failed to verify: {e:?}"
        ))),
    }
}

fn decode_hex(
    value: &str,
    expected_length: usize,
    what: &str,
) -> Result<Vec<u8>, InteractionError> {
    let bytes = hex::decode(value).map_err(|e| {
        InteractionError::SignatureInvalid(format!("failed to decode {what} from hex value: {e}"))
    })?;

    if bytes.len() != expected_length {
        return Err(InteractionError::SignatureInvalid(format!(
            "{what} has {} bytes, expected {expected_length}",
            bytes.len()
        )));
    }

    Ok(bytes)
}
