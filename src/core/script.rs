// Input authorization: signature sets keyed by signer public key

use crate::core::sha256_hash;
use crate::error::{LedgerError, Result};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Signature set attached to an input (scriptSig)
///
/// Maps the hex encoding of a signer's compressed public key to its hex DER
/// signature. A single entry is the normal case; the map form leaves room for
/// multi-signer inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSig(pub BTreeMap<String, String>);

impl ScriptSig {
    /// Create an empty (unsigned) script sig
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a script sig holding one signature
    pub fn single(pubkey_hex: String, signature_hex: String) -> Self {
        let mut map = BTreeMap::new();
        map.insert(pubkey_hex, signature_hex);
        Self(map)
    }

    /// Check whether no signature is recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (public key, signature) pairs
    pub fn entries(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// Sign a digest string with a secret key
///
/// The message is SHA256(digest); the result is the hex DER signature.
pub fn sign_digest(digest: &str, secret_key: &SecretKey) -> Result<String> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest(sha256_hash(digest.as_bytes()));
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(hex::encode(signature.serialize_der()))
}

/// Verify a hex DER signature over a digest string against a hex public key
///
/// Malformed key or signature encodings are errors; a well-formed signature
/// that does not match yields `Ok(false)`.
pub fn verify_digest(digest: &str, signature_hex: &str, pubkey_hex: &str) -> Result<bool> {
    let pubkey_bytes = hex::decode(pubkey_hex)
        .map_err(|e| LedgerError::Crypto(format!("Invalid public key encoding: {}", e)))?;
    let public_key = PublicKey::from_slice(&pubkey_bytes)
        .map_err(|e| LedgerError::Crypto(format!("Invalid public key: {}", e)))?;

    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| LedgerError::Crypto(format!("Invalid signature encoding: {}", e)))?;
    let signature = Signature::from_der(&sig_bytes)
        .map_err(|e| LedgerError::Crypto(format!("Invalid signature: {}", e)))?;

    let secp = Secp256k1::verification_only();
    let message = Message::from_digest(sha256_hash(digest.as_bytes()));
    Ok(secp.verify_ecdsa(&message, &signature, &public_key).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::KeyPair;

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let sig = sign_digest("digest", &kp.secret_key).unwrap();

        assert!(verify_digest("digest", &sig, &kp.pubkey_hex()).unwrap());
    }

    #[test]
    fn test_verify_wrong_key() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let sig = sign_digest("digest", &kp1.secret_key).unwrap();

        assert!(!verify_digest("digest", &sig, &kp2.pubkey_hex()).unwrap());
    }

    #[test]
    fn test_verify_tampered_digest() {
        let kp = KeyPair::generate();
        let sig = sign_digest("digest", &kp.secret_key).unwrap();

        assert!(!verify_digest("digest!", &sig, &kp.pubkey_hex()).unwrap());
    }

    #[test]
    fn test_verify_malformed_material() {
        let kp = KeyPair::generate();
        let sig = sign_digest("digest", &kp.secret_key).unwrap();

        assert!(matches!(
            verify_digest("digest", &sig, "not-hex"),
            Err(LedgerError::Crypto(_))
        ));
        assert!(matches!(
            verify_digest("digest", "00ff", &kp.pubkey_hex()),
            Err(LedgerError::Crypto(_))
        ));
    }

    #[test]
    fn test_script_sig_single() {
        let script = ScriptSig::single("pk".to_string(), "sig".to_string());
        assert!(!script.is_empty());
        assert_eq!(script.entries().count(), 1);
        assert!(ScriptSig::empty().is_empty());
    }
}
