//! # AES-256-GCM with Explicit Counter Nonces
//!
//! Unlike [`crate::symmetric`]'s XChaCha20-Poly1305 (random 192-bit nonces,
//! safe to pick independently per message), this module's nonces are
//! 96 bits and must never repeat under the same key. Callers supply an
//! explicit, monotonically increasing counter instead of letting the
//! cipher pick a nonce; the wire format is `0x00000000 || counter_be(u64)`.
//!
//! ## Security Properties
//!
//! - AES-256-GCM: requires a unique nonce per encryption under a given key.
//!   The counter-based nonce here is the caller's responsibility to never
//!   reuse; [`GcmCounterCipher`] tracks and increments it internally so a
//!   single instance can't reuse a send nonce by construction.

use crate::CryptoError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use zeroize::Zeroize;

/// 96-bit AES-GCM nonce, built from a 32-bit fixed prefix and a 64-bit counter.
pub fn counter_nonce(counter: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[4..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// One direction (send or recv) of an AES-256-GCM channel.
///
/// Holds its own monotonically increasing counter; `seal` pre-increments
/// before use (first nonce's counter is 1), `open` enforces that incoming
/// counters are strictly greater than the last one accepted.
pub struct GcmCounterCipher {
    key: [u8; 32],
    counter: u64,
}

impl GcmCounterCipher {
    /// Build a cipher direction from a 32-byte key. The key is copied in;
    /// zero it at the call site once this returns if it came from a buffer
    /// you own.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key, counter: 0 }
    }

    /// Encrypt `plaintext`, pre-incrementing the send counter and returning
    /// `nonce || ciphertext || tag` ready to write to the wire.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.counter += 1;
        let nonce_bytes = counter_nonce(self.counter);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let ciphertext = cipher
            .encrypt(AesNonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(12 + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext || tag` envelope, rejecting any
    /// counter that doesn't strictly exceed the last accepted one.
    pub fn open(&mut self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if envelope.len() < 12 {
            return Err(CryptoError::InvalidNonceLength {
                expected: 12,
                actual: envelope.len(),
            });
        }
        let (nonce_bytes, ciphertext) = envelope.split_at(12);
        let received_counter = u64::from_be_bytes(nonce_bytes[4..12].try_into().unwrap());
        if received_counter <= self.counter {
            return Err(CryptoError::DecryptionFailed(
                "replay detected: non-increasing receive counter".into(),
            ));
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(AesNonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        self.counter = received_counter;
        Ok(plaintext)
    }
}

impl Drop for GcmCounterCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = [7u8; 32];
        let mut sender = GcmCounterCipher::new(key);
        let mut receiver = GcmCounterCipher::new(key);

        let envelope = sender.seal(b"hello peer").unwrap();
        let plaintext = receiver.open(&envelope).unwrap();
        assert_eq!(plaintext, b"hello peer");
    }

    #[test]
    fn first_nonce_counter_is_one() {
        let mut sender = GcmCounterCipher::new([1u8; 32]);
        let envelope = sender.seal(b"x").unwrap();
        assert_eq!(&envelope[0..12], &counter_nonce(1));
    }

    #[test]
    fn replayed_counter_is_rejected() {
        let key = [3u8; 32];
        let mut sender = GcmCounterCipher::new(key);
        let mut receiver = GcmCounterCipher::new(key);

        let first = sender.seal(b"one").unwrap();
        let second = sender.seal(b"two").unwrap();

        receiver.open(&second).unwrap();
        let result = receiver.open(&first);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_order_counter_still_monotonic_check() {
        let key = [9u8; 32];
        let mut sender = GcmCounterCipher::new(key);
        let mut receiver = GcmCounterCipher::new(key);

        let envelopes: Vec<_> = (0..3).map(|_| sender.seal(b"msg").unwrap()).collect();
        receiver.open(&envelopes[0]).unwrap();
        receiver.open(&envelopes[1]).unwrap();
        // Replaying the second message again must fail even though it once succeeded.
        assert!(receiver.open(&envelopes[1]).is_err());
        receiver.open(&envelopes[2]).unwrap();
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = [5u8; 32];
        let mut sender = GcmCounterCipher::new(key);
        let mut receiver = GcmCounterCipher::new(key);

        let mut envelope = sender.seal(b"tamper me").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0xFF;

        assert!(receiver.open(&envelope).is_err());
    }
}
