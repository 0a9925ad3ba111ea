//! # Trust Store Derivation
//!
//! Builds a PKCS#12 (RFC 7292) trust store from the PEM certificates a backing
//! operator publishes for its TLS endpoint.
//!
//! The output is a PFX whose AuthenticatedSafe holds a single unencrypted
//! SafeContents of CertBags. Each bag carries a `friendlyName` and the
//! `trustedKeyUsage` attribute Java keystores require before they treat a
//! certificate as a trust anchor. Integrity is an HMAC-SHA256 MAC keyed with
//! the PKCS#12 KDF. The MAC salt is derived from the password and certificates,
//! so the same input always yields byte-identical output.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use k8s_openapi::ByteString;
use sha2::{Digest, Sha256};
use thiserror::Error;
use yasna::models::ObjectIdentifier;
use yasna::{DERWriter, Tag};

const OID_DATA: &[u64] = &[1, 2, 840, 113_549, 1, 7, 1];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113_549, 1, 12, 10, 1, 3];
const OID_X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113_549, 1, 9, 22, 1];
const OID_FRIENDLY_NAME: &[u64] = &[1, 2, 840, 113_549, 1, 9, 20];
const OID_JAVA_TRUSTED_KEY_USAGE: &[u64] = &[2, 16, 840, 1, 113_894, 746_875, 1, 1];
const OID_ANY_EXTENDED_KEY_USAGE: &[u64] = &[2, 5, 29, 37, 0];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];

/// PFX version mandated by RFC 7292
const PFX_VERSION: u32 = 3;
const MAC_ITERATIONS: u32 = 2048;
const MAC_SALT_LEN: usize = 16;
/// SHA-256 output and block sizes (u and v in RFC 7292 appendix B)
const HASH_LEN: usize = 32;
const HASH_BLOCK_LEN: usize = 64;
/// Diversifier selecting MAC key material in the PKCS#12 KDF
const KDF_ID_MAC: u8 = 3;

/// Keys checked for PEM certificates, in order
pub const CERTIFICATE_KEYS: [&str; 2] = ["tls.crt", "ca.crt"];

#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("no PEM certificate found under {}", CERTIFICATE_KEYS.join(" or "))]
    NoCertificate,

    #[error("malformed PEM data under {key}: {source}")]
    Pem {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MAC key rejected by HMAC-SHA256")]
    MacKey,
}

/// Derive a PKCS#12 trust store from the data of a TLS secret
///
/// Every certificate in `tls.crt` is trusted; `ca.crt` is used when `tls.crt`
/// is absent or holds no certificate.
///
/// # Errors
///
/// [`TrustStoreError`] when neither key holds a parsable certificate
pub fn derive_trust_store(
    tls_data: &BTreeMap<String, ByteString>,
    password: &str,
) -> Result<Vec<u8>, TrustStoreError> {
    let certificates = load_certificates(tls_data)?;

    let safe_contents = yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            for (index, certificate) in certificates.iter().enumerate() {
                write_cert_bag(writer.next(), &format!("trusted-cert-{index}"), certificate);
            }
        });
    });

    let auth_safe = yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            write_data_content_info(writer.next(), &safe_contents);
        });
    });

    let salt = mac_salt(password, &certificates);
    let bmp = bmp_password(password);
    let key = pkcs12_kdf(&bmp, &salt, MAC_ITERATIONS, KDF_ID_MAC, HASH_LEN);
    let digest = hmac_sha256(&key, &auth_safe)?;

    Ok(yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            writer.next().write_u32(PFX_VERSION);
            write_data_content_info(writer.next(), &auth_safe);
            writer.next().write_sequence(|writer| {
                writer.next().write_sequence(|writer| {
                    writer.next().write_sequence(|writer| {
                        writer
                            .next()
                            .write_oid(&ObjectIdentifier::from_slice(OID_SHA256));
                        writer.next().write_null();
                    });
                    writer.next().write_bytes(&digest);
                });
                writer.next().write_bytes(&salt);
                writer.next().write_u32(MAC_ITERATIONS);
            });
        });
    }))
}

fn load_certificates(
    tls_data: &BTreeMap<String, ByteString>,
) -> Result<Vec<Vec<u8>>, TrustStoreError> {
    for key in CERTIFICATE_KEYS {
        let Some(pem) = tls_data.get(key) else {
            continue;
        };
        let certificates = rustls_pemfile::certs(&mut pem.0.as_slice())
            .map(|cert| cert.map(|der| der.as_ref().to_vec()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| TrustStoreError::Pem {
                key: key.to_string(),
                source,
            })?;
        if !certificates.is_empty() {
            return Ok(certificates);
        }
    }
    Err(TrustStoreError::NoCertificate)
}

/// ContentInfo of type data wrapping `content` in an OCTET STRING
fn write_data_content_info(writer: DERWriter<'_>, content: &[u8]) {
    writer.write_sequence(|writer| {
        writer
            .next()
            .write_oid(&ObjectIdentifier::from_slice(OID_DATA));
        writer
            .next()
            .write_tagged(Tag::context(0), |writer| writer.write_bytes(content));
    });
}

fn write_cert_bag(writer: DERWriter<'_>, alias: &str, certificate: &[u8]) {
    writer.write_sequence(|writer| {
        writer
            .next()
            .write_oid(&ObjectIdentifier::from_slice(OID_CERT_BAG));
        writer.next().write_tagged(Tag::context(0), |writer| {
            writer.write_sequence(|writer| {
                writer
                    .next()
                    .write_oid(&ObjectIdentifier::from_slice(OID_X509_CERTIFICATE));
                writer
                    .next()
                    .write_tagged(Tag::context(0), |writer| writer.write_bytes(certificate));
            });
        });
        writer.next().write_set_of(|writer| {
            writer.next().write_sequence(|writer| {
                writer
                    .next()
                    .write_oid(&ObjectIdentifier::from_slice(OID_FRIENDLY_NAME));
                writer
                    .next()
                    .write_set_of(|writer| writer.next().write_bmp_string(alias));
            });
            writer.next().write_sequence(|writer| {
                writer
                    .next()
                    .write_oid(&ObjectIdentifier::from_slice(OID_JAVA_TRUSTED_KEY_USAGE));
                writer.next().write_set_of(|writer| {
                    writer
                        .next()
                        .write_oid(&ObjectIdentifier::from_slice(OID_ANY_EXTENDED_KEY_USAGE));
                });
            });
        });
    });
}

fn mac_salt(password: &str, certificates: &[Vec<u8>]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    for certificate in certificates {
        hasher.update(certificate);
    }
    hasher.finalize()[..MAC_SALT_LEN].to_vec()
}

/// Password as a null-terminated big-endian BMPString
fn bmp_password(password: &str) -> Vec<u8> {
    password
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_be_bytes)
        .collect()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, TrustStoreError> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).map_err(|_| TrustStoreError::MacKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Repeat `input` to fill a whole number of `HASH_BLOCK_LEN` blocks
fn fill_blocks(input: &[u8]) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }
    let len = input.len().div_ceil(HASH_BLOCK_LEN) * HASH_BLOCK_LEN;
    input.iter().copied().cycle().take(len).collect()
}

/// PKCS#12 key derivation (RFC 7292 appendix B.2) over SHA-256
fn pkcs12_kdf(password: &[u8], salt: &[u8], iterations: u32, id: u8, out_len: usize) -> Vec<u8> {
    let diversifier = [id; HASH_BLOCK_LEN];
    let mut input = fill_blocks(salt);
    input.extend(fill_blocks(password));

    let mut output = Vec::with_capacity(out_len);
    while output.len() < out_len {
        let mut block: Vec<u8> = Sha256::new()
            .chain_update(diversifier)
            .chain_update(&input)
            .finalize()
            .to_vec();
        for _ in 1..iterations {
            block = Sha256::digest(&block).to_vec();
        }

        let filler: Vec<u8> = block.iter().copied().cycle().take(HASH_BLOCK_LEN).collect();
        for chunk in input.chunks_mut(HASH_BLOCK_LEN) {
            // chunk = (chunk + filler + 1) mod 2^(8 * HASH_BLOCK_LEN)
            let mut carry: u16 = 1;
            for (byte, add) in chunk.iter_mut().rev().zip(filler.iter().rev()) {
                let sum = u16::from(*byte) + u16::from(*add) + carry;
                *byte = sum.to_le_bytes()[0];
                carry = sum >> 8;
            }
        }

        output.extend_from_slice(&block[..HASH_LEN.min(out_len - output.len())]);
    }
    output
}
