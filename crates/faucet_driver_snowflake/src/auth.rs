//! Key-pair JWT minting for Snowflake's `KEYPAIR_JWT` authenticator.
//!
//! The `iss`/`sub` claims embed a fingerprint of the public half of the
//! configured key pair, so the private key is parsed twice: once through
//! `rsa`/`pkcs8` to derive that fingerprint, once through `jsonwebtoken`'s
//! own PEM loader to actually sign the token.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use faucet_core::{FaucetError, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use pkcs8::EncodePublicKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Serialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

/// SHA-256 digest of the public key's DER-encoded `SubjectPublicKeyInfo`,
/// base64-standard-encoded, as Snowflake's `iss` claim expects it.
fn public_key_fingerprint(private_key_pem: &str) -> Result<String> {
    let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| FaucetError::connect_failure(format!("parsing snowflake private key: {e}")))?;
    let der = private_key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| FaucetError::connect_failure(format!("encoding snowflake public key: {e}")))?;
    Ok(STANDARD.encode(Sha256::digest(der.as_bytes())))
}

/// Mint a fresh RS256 JWT valid for roughly one hour, per Snowflake's
/// key-pair authentication scheme.
pub fn mint_jwt(account: &str, user: &str, private_key_pem: &str) -> Result<String> {
    let account = account.to_ascii_uppercase();
    let user = user.to_ascii_uppercase();
    let fingerprint = public_key_fingerprint(private_key_pem)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| FaucetError::connect_failure(e.to_string()))?
        .as_secs() as i64;

    let claims = Claims {
        iss: format!("{account}.{user}.SHA256:{fingerprint}"),
        sub: format!("{account}.{user}"),
        iat: now,
        exp: now + 3600,
    };

    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| FaucetError::connect_failure(format!("loading snowflake signing key: {e}")))?;

    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| FaucetError::connect_failure(format!("signing snowflake jwt: {e}")))
}
