//! Argon2id password hashing with self-describing encoded hashes.
//!
//! Hashes are encoded in the PHC-style format
//! `$argon2id$v=19$m=<kib>,t=<iters>,p=<lanes>$<b64 salt>$<b64 key>` so that
//! verification re-derives the key with the parameters embedded in the hash,
//! not the currently configured ones.

use argon2::{Algorithm, Argon2, Params, Version};
use base64ct::{Base64Unpadded, Encoding};
use md5::{Digest, Md5};
use rand::{RngCore, rngs::OsRng};
use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

const ALGORITHM: &str = "argon2id";
const VERSION: u32 = Version::V0x13 as u32;

const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
const DEFAULT_ITERATIONS: u32 = 3;
const DEFAULT_PARALLELISM: u32 = 2;
const DEFAULT_SALT_LENGTH: usize = 16;
const DEFAULT_KEY_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("the encoded hash is not in the correct format")]
    InvalidHash,
    #[error("incompatible version of argon2")]
    IncompatibleVersion,
    #[error("invalid argon2 parameters")]
    Params,
    #[error("argon2 key derivation failed")]
    Kdf,
    #[error("failed to gather randomness for the salt")]
    Rng,
    #[error("failed to serialize value for digest")]
    Serialize(#[from] serde_json::Error),
}

/// Tunable KDF cost parameters, carried from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashParams {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
    salt_length: usize,
    key_length: usize,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
            salt_length: DEFAULT_SALT_LENGTH,
            key_length: DEFAULT_KEY_LENGTH,
        }
    }
}

impl HashParams {
    #[must_use]
    pub fn new(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
        salt_length: usize,
        key_length: usize,
    ) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
            salt_length,
            key_length,
        }
    }
}

/// Stateless password hasher. Pure computation plus OS randomness, no I/O.
#[derive(Clone, Copy, Debug)]
pub struct CredentialHasher {
    params: HashParams,
}

impl CredentialHasher {
    #[must_use]
    pub fn new(params: HashParams) -> Self {
        Self { params }
    }

    /// Derive a fresh salted hash for `plain`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Rng`] if the randomness source fails; no hash is
    /// produced in that case.
    pub fn hash(&self, plain: &str) -> Result<String, HashError> {
        let mut salt = vec![0u8; self.params.salt_length];
        OsRng.try_fill_bytes(&mut salt).map_err(|_| HashError::Rng)?;

        let key = derive_key(plain.as_bytes(), &salt, &self.params)?;

        Ok(format!(
            "${ALGORITHM}$v={VERSION}$m={},t={},p={}${}${}",
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Base64Unpadded::encode_string(&salt),
            Base64Unpadded::encode_string(&key),
        ))
    }

    /// Check `plain` against an encoded hash produced by [`Self::hash`].
    ///
    /// The comparison is constant time; a mismatch never reveals where the
    /// derived key diverged.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::InvalidHash`] on malformed input and
    /// [`HashError::IncompatibleVersion`] on an unknown argon2 version.
    pub fn verify(&self, plain: &str, encoded: &str) -> Result<bool, HashError> {
        let (params, salt, expected) = decode_hash(encoded)?;
        let derived = derive_key(plain.as_bytes(), &salt, &params)?;
        Ok(derived.ct_eq(&expected).into())
    }

    /// A stable hex fingerprint over the JSON encoding of `value`, for cache
    /// keys and etags of structured data. Not a credential hash.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Serialize`] when `value` cannot be encoded.
    pub fn digest<T: Serialize>(&self, value: &T) -> Result<String, HashError> {
        let encoded = serde_json::to_vec(value)?;
        Ok(base16ct::lower::encode_string(&Md5::digest(&encoded)))
    }
}

fn derive_key(plain: &[u8], salt: &[u8], params: &HashParams) -> Result<Vec<u8>, HashError> {
    let kdf_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(params.key_length),
    )
    .map_err(|_| HashError::Params)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, kdf_params);

    let mut key = vec![0u8; params.key_length];
    argon2
        .hash_password_into(plain, salt, &mut key)
        .map_err(|_| HashError::Kdf)?;
    Ok(key)
}

fn decode_hash(encoded: &str) -> Result<(HashParams, Vec<u8>, Vec<u8>), HashError> {
    let parts: Vec<&str> = encoded.split('$').collect();
    let [_, algorithm, version, costs, salt, key] = parts.as_slice() else {
        return Err(HashError::InvalidHash);
    };

    if *algorithm != ALGORITHM {
        return Err(HashError::InvalidHash);
    }

    let version: u32 = version
        .strip_prefix("v=")
        .and_then(|value| value.parse().ok())
        .ok_or(HashError::InvalidHash)?;
    if version != VERSION {
        return Err(HashError::IncompatibleVersion);
    }

    let mut memory_kib = None;
    let mut iterations = None;
    let mut parallelism = None;
    for cost in costs.split(',') {
        let (name, value) = cost.split_once('=').ok_or(HashError::InvalidHash)?;
        let value: u32 = value.parse().map_err(|_| HashError::InvalidHash)?;
        match name {
            "m" => memory_kib = Some(value),
            "t" => iterations = Some(value),
            "p" => parallelism = Some(value),
            _ => return Err(HashError::InvalidHash),
        }
    }
    let (Some(memory_kib), Some(iterations), Some(parallelism)) =
        (memory_kib, iterations, parallelism)
    else {
        return Err(HashError::InvalidHash);
    };

    let salt = Base64Unpadded::decode_vec(salt).map_err(|_| HashError::InvalidHash)?;
    let key = Base64Unpadded::decode_vec(key).map_err(|_| HashError::InvalidHash)?;

    let params = HashParams::new(memory_kib, iterations, parallelism, salt.len(), key.len());
    Ok((params, salt, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        // Minimal cost so the test suite stays quick.
        CredentialHasher::new(HashParams::new(8, 1, 1, 16, 32))
    }

    #[test]
    fn hash_then_verify_round_trip() -> Result<(), HashError> {
        let hasher = fast_hasher();
        let encoded = hasher.hash("correct horse battery staple")?;

        assert!(encoded.starts_with("$argon2id$v=19$m=8,t=1,p=1$"));
        assert!(hasher.verify("correct horse battery staple", &encoded)?);
        assert!(!hasher.verify("correct horse battery stable", &encoded)?);
        Ok(())
    }

    #[test]
    fn two_hashes_of_the_same_password_differ() -> Result<(), HashError> {
        let hasher = fast_hasher();
        let first = hasher.hash("hunter2")?;
        let second = hasher.hash("hunter2")?;
        // Fresh salt per hash.
        assert_ne!(first, second);
        assert!(hasher.verify("hunter2", &first)?);
        assert!(hasher.verify("hunter2", &second)?);
        Ok(())
    }

    #[test]
    fn verify_uses_embedded_parameters_not_configured_ones() -> Result<(), HashError> {
        let encoded = fast_hasher().hash("password")?;
        // A hasher configured with different costs still verifies.
        let other = CredentialHasher::new(HashParams::new(16, 2, 1, 8, 16));
        assert!(other.verify("password", &encoded)?);
        Ok(())
    }

    #[test]
    fn malformed_hash_is_rejected() {
        let hasher = fast_hasher();
        for encoded in [
            "",
            "not a hash",
            "$argon2id$v=19$m=8,t=1,p=1$onlyfour",
            "$argon2id$v=19$m=8,q=1,p=1$c2FsdA$a2V5",
            "$scrypt$v=19$m=8,t=1,p=1$c2FsdA$a2V5",
            "$argon2id$v=19$m=8,t=1,p=1$!!!$a2V5",
        ] {
            assert!(
                matches!(hasher.verify("x", encoded), Err(HashError::InvalidHash)),
                "expected InvalidHash for {encoded:?}"
            );
        }
    }

    #[test]
    fn unknown_version_is_rejected() {
        let hasher = fast_hasher();
        let encoded = "$argon2id$v=16$m=8,t=1,p=1$c2FsdHNhbHRzYWx0c2FsdA$a2V5a2V5a2V5a2V5";
        assert!(matches!(
            hasher.verify("x", encoded),
            Err(HashError::IncompatibleVersion)
        ));
    }

    #[test]
    fn digest_is_a_stable_hex_fingerprint() -> Result<(), HashError> {
        #[derive(serde::Serialize)]
        struct Tree {
            name: &'static str,
            count: u32,
        }

        let hasher = fast_hasher();
        let a = hasher.digest(&Tree {
            name: "drivers",
            count: 3,
        })?;
        let b = hasher.digest(&Tree {
            name: "drivers",
            count: 3,
        })?;
        let c = hasher.digest(&Tree {
            name: "drivers",
            count: 4,
        })?;

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
        assert!(a.bytes().all(|ch| ch.is_ascii_hexdigit()));
        Ok(())
    }
}
