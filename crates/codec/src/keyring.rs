// SPDX-License-Identifier: MIT

//! Encryption key material for the codec (§4.1: "prefixed with a cipher
//! header identifying key-version and cipher").
//!
//! A keyring holds one *active* key (used for encryption) plus, optionally,
//! retired key versions still needed to decode older payloads during key
//! rotation.

use rand::RngCore;
use std::collections::HashMap;

/// AES-256 key material, keyed by a small version byte so encrypted
/// payloads remain decodable across key rotation.
#[derive(Clone)]
pub struct CodecKeyring {
    active_version: u8,
    keys: HashMap<u8, [u8; 32]>,
}

impl CodecKeyring {
    /// A keyring with a single active key at version 1.
    pub fn single(key: [u8; 32]) -> Self {
        let mut keys = HashMap::new();
        keys.insert(1, key);
        Self { active_version: 1, keys }
    }

    /// A keyring seeded with random key material, for tests and for
    /// processes that only need a key for the lifetime of the run.
    pub fn random() -> Self {
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        Self::single(key)
    }

    /// Register or replace a key at `version`, and make it the active
    /// (encrypting) key.
    pub fn rotate_to(&mut self, version: u8, key: [u8; 32]) {
        self.keys.insert(version, key);
        self.active_version = version;
    }

    /// Keep a retired key available for decoding without making it active.
    pub fn retain(&mut self, version: u8, key: [u8; 32]) {
        self.keys.insert(version, key);
    }

    pub(crate) fn active_key(&self) -> (u8, [u8; 32]) {
        // Every keyring is constructed with at least one key at its active
        // version; `rotate_to` keeps that invariant.
        #[allow(clippy::expect_used)]
        let key = *self.keys.get(&self.active_version).expect("active key version must exist");
        (self.active_version, key)
    }

    pub(crate) fn key_for_version(&self, version: u8) -> Option<[u8; 32]> {
        self.keys.get(&version).copied()
    }

    pub(crate) fn random_nonce(&self) -> [u8; 12] {
        let mut nonce = [0u8; 12];
        rand::rng().fill_bytes(&mut nonce);
        nonce
    }
}

impl Default for CodecKeyring {
    fn default() -> Self {
        Self::random()
    }
}
