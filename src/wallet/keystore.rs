// Key management

use crate::core::derive_address;
use crate::error::{LedgerError, Result};
use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// Key pair of a node, with its derived address
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    pub address: String,
}

impl KeyPair {
    /// Generate a new key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let mut rng = OsRng;

        let secret_key = SecretKey::new(&mut rng);
        Self::from_secret_key(&secp, secret_key)
    }

    /// Create from a hex-encoded secret key
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| LedgerError::Crypto(format!("Invalid secret key encoding: {}", e)))?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| LedgerError::Crypto(format!("Invalid secret key: {}", e)))?;

        let secp = Secp256k1::new();
        Ok(Self::from_secret_key(&secp, secret_key))
    }

    fn from_secret_key<C: secp256k1::Signing>(secp: &Secp256k1<C>, secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key(secp);
        let address = derive_address(&hex::encode(public_key.serialize()));

        Self {
            secret_key,
            public_key,
            address,
        }
    }

    /// Hex encoding of the compressed public key (scriptSig key)
    pub fn pubkey_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Hex encoding of the secret key
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.pubkey_hex())
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
