//! # Ed25519 Signatures
//!
//! Verifier adapter for the [`SignatureVerifier`] port, plus the key pair
//! wallets and tests sign transactions with.

use crate::ports::SignatureVerifier;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use shared_types::{ChainId, Digest, ProtocolError, PublicKey, Signature, SignedTransaction};

/// Stateless Ed25519 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, key: &PublicKey, digest: &Digest, signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(key.as_bytes()) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        verifying_key.verify(digest, &sig).is_ok()
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Deterministic signature over a digest.
    pub fn sign(&self, digest: &Digest) -> Signature {
        Signature(self.signing_key.sign(digest).to_bytes())
    }

    /// Appends this key's signature over the transaction's digest on
    /// `chain_id`.
    pub fn sign_transaction(
        &self,
        trx: &mut SignedTransaction,
        chain_id: &ChainId,
    ) -> Result<(), ProtocolError> {
        let digest = trx.transaction.digest(chain_id)?;
        trx.add_signature(self.public_key(), self.sign(&digest));
        Ok(())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
