//! # X25519 Key Agreement + HKDF-SHA256 Key Derivation
//!
//! Used by the handshake protocol to turn an ephemeral Diffie-Hellman
//! exchange into directional AEAD keys: a raw X25519 shared secret is
//! expanded with HKDF-SHA256 into a channel key, then further expanded
//! into independent send/recv keys per direction.

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// X25519 keypair used for one handshake's ephemeral key exchange.
pub struct X25519KeyPair {
    secret: StaticSecret,
}

impl X25519KeyPair {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        Self {
            secret: StaticSecret::random_from_rng(rand::thread_rng()),
        }
    }

    /// Public key to send to the remote peer.
    pub fn public_key(&self) -> [u8; 32] {
        PublicKey::from(&self.secret).to_bytes()
    }

    /// Compute the shared secret with a peer's public key.
    pub fn diffie_hellman(&self, remote_public: &[u8; 32]) -> [u8; 32] {
        self.secret
            .diffie_hellman(&PublicKey::from(*remote_public))
            .to_bytes()
    }
}

/// Expand a raw X25519 shared secret into a 32-byte channel key via
/// HKDF-SHA256, with `info` binding the derivation to this specific
/// handshake (e.g. the sorted pair of both sides' public keys).
pub fn derive_channel_key(shared_secret: &[u8; 32], info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut out = [0u8; 32];
    hk.expand(info, &mut out)
        .expect("32 is a valid HKDF-SHA256 output length");
    out
}

/// Expand a channel key into a single directional send/recv key, keyed by
/// a fixed context string (`"initiator->responder"` / `"responder->initiator"`).
pub fn derive_directional_key(channel_key: &[u8; 32], direction: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, channel_key);
    let mut out = [0u8; 32];
    hk.expand(direction, &mut out)
        .expect("32 is a valid HKDF-SHA256 output length");
    out
}

impl Drop for X25519KeyPair {
    fn drop(&mut self) {
        // `StaticSecret` zeroizes on drop internally; this just documents the intent.
        let mut scratch = self.secret.to_bytes();
        scratch.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_secret_matches_both_sides() {
        let alice = X25519KeyPair::generate();
        let bob = X25519KeyPair::generate();

        let alice_shared = alice.diffie_hellman(&bob.public_key());
        let bob_shared = bob.diffie_hellman(&alice.public_key());

        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn channel_key_is_deterministic_for_same_inputs() {
        let secret = [42u8; 32];
        let info = b"basalt-channel-v1";

        let k1 = derive_channel_key(&secret, info);
        let k2 = derive_channel_key(&secret, info);
        assert_eq!(k1, k2);
    }

    #[test]
    fn directional_keys_differ_by_direction() {
        let channel_key = [9u8; 32];
        let send = derive_directional_key(&channel_key, b"initiator->responder");
        let recv = derive_directional_key(&channel_key, b"responder->initiator");
        assert_ne!(send, recv);
    }

    #[test]
    fn both_sides_derive_matching_directional_keys() {
        let alice = X25519KeyPair::generate();
        let bob = X25519KeyPair::generate();

        let alice_shared = alice.diffie_hellman(&bob.public_key());
        let bob_shared = bob.diffie_hellman(&alice.public_key());

        let info = b"basalt-channel-v1";
        let alice_channel = derive_channel_key(&alice_shared, info);
        let bob_channel = derive_channel_key(&bob_shared, info);
        assert_eq!(alice_channel, bob_channel);

        let alice_send = derive_directional_key(&alice_channel, b"initiator->responder");
        let bob_recv = derive_directional_key(&bob_channel, b"initiator->responder");
        assert_eq!(alice_send, bob_recv);
    }
}
