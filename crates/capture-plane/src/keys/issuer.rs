//! Trust Token Issuer
//!
//! Signs trust tokens as ES256 JWTs with a service-held P-256 key. A trust
//! token states that `sub` redeemed the nonce of `capture_id` on behalf of
//! `publisher_id`. Tokens carry no `exp`: they vouch for a past event.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use p256::ecdsa::SigningKey;
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors from key handling and token signing
#[derive(Debug, Error)]
pub enum IssuerError {
    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),

    #[error("Signing key unavailable: {0}")]
    Unavailable(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by a trust token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustClaims {
    /// Issuing service
    pub iss: String,
    /// Device id that redeemed the nonce
    pub sub: String,
    /// Session the nonce belonged to
    pub capture_id: String,
    /// Publisher the device registered under
    pub publisher_id: String,
    /// Issue time, seconds since the epoch
    pub iat: i64,
}

/// Signs and checks trust tokens
pub trait TrustTokenSigner: Send + Sync {
    /// Key id placed in the JWT header
    fn kid(&self) -> &str;

    /// `iss` claim of issued tokens
    fn issuer(&self) -> &str;

    /// SPKI PEM of the verification key, for relying parties
    fn public_key_pem(&self) -> &str;

    /// Sign a trust token for `device_id`
    fn issue(
        &self,
        device_id: &str,
        capture_id: &str,
        publisher_id: &str,
        issued_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<String, IssuerError>;

    /// Verify a token signed by this signer and return its claims
    fn verify(&self, token: &str) -> Result<TrustClaims, IssuerError>;
}

/// ES256 signer for trust tokens
pub struct TokenIssuer {
    kid: String,
    issuer: String,
    public_key_pem: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    /// Wrap an existing P-256 signing key
    pub fn new(
        kid: impl Into<String>,
        issuer: impl Into<String>,
        signing_key: &SigningKey,
    ) -> Result<Self, IssuerError> {
        let private_pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| IssuerError::KeyEncoding(e.to_string()))?;
        let public_key_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| IssuerError::KeyEncoding(e.to_string()))?;

        let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())?;
        let decoding_key = DecodingKey::from_ec_pem(public_key_pem.as_bytes())?;

        let issuer = Self {
            kid: kid.into(),
            issuer: issuer.into(),
            public_key_pem,
            encoding_key,
            decoding_key,
        };
        info!(kid = %issuer.kid, iss = %issuer.issuer, "Trust token issuer initialized");
        Ok(issuer)
    }

    /// Generate an issuer with a fresh random key
    pub fn generate(kid: impl Into<String>, issuer: impl Into<String>) -> Result<Self, IssuerError> {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::new(kid, issuer, &signing_key)
    }
}

impl TrustTokenSigner for TokenIssuer {
    fn kid(&self) -> &str {
        &self.kid
    }

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    fn issue(
        &self,
        device_id: &str,
        capture_id: &str,
        publisher_id: &str,
        issued_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<String, IssuerError> {
        let claims = TrustClaims {
            iss: self.issuer.clone(),
            sub: device_id.to_string(),
            capture_id: capture_id.to_string(),
            publisher_id: publisher_id.to_string(),
            iat: issued_at.timestamp(),
        };

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.kid.clone());

        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    fn verify(&self, token: &str) -> Result<TrustClaims, IssuerError> {
        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_issuer(&[&self.issuer]);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Ok(decode::<TrustClaims>(token, &self.decoding_key, &validation)?.claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("kid", &self.kid)
            .field("issuer", &self.issuer)
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}
