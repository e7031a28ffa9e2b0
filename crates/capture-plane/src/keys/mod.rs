//! Trust token signing

pub mod issuer;

pub use issuer::{IssuerError, TokenIssuer, TrustClaims, TrustTokenSigner};
