//! # Credential and Trust Material
//!
//! Generated Secrets holding derived credentials and PKCS#12 trust stores.
//! Secret values never reach the logs.

mod secret;
mod truststore;

pub use secret::{
    load_or_create_credential_secret, load_or_create_secret, secret_string, Credentials,
};
pub use truststore::{derive_trust_store, TrustStoreError, CERTIFICATE_KEYS};
