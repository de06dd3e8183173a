use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

/// Salted SHA-256 digest of a secret.
///
/// This is a single round of a fast hash, not a slow password KDF. It is fit
/// for the one admin secret hashed at startup and must not be reused to store
/// user passwords; swap in bcrypt or argon2 behind this type for that.
///
/// Only the digest is kept after startup; the plaintext admin password is
/// dropped with the config it came from.
#[derive(Clone)]
pub struct PasswordDigest {
    salt: [u8; SALT_LEN],
    hash: [u8; 32],
}

impl PasswordDigest {
    pub fn hash(secret: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = digest(&salt, secret);
        Self { salt, hash }
    }

    pub fn verify(&self, secret: &str) -> bool {
        let candidate = digest(&self.salt, secret);
        // Constant time: no early exit on the first differing byte
        candidate
            .iter()
            .zip(self.hash.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordDigest").finish_non_exhaustive()
    }
}

fn digest(salt: &[u8], secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().into()
}

/// The single admin principal's credentials, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    digest: PasswordDigest,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            digest: PasswordDigest::hash(password),
        }
    }

    pub fn check(&self, username: &str, password: &str) -> bool {
        // Always run the digest so a wrong username costs the same as a wrong password
        let password_ok = self.digest.verify(password);
        username == self.username && password_ok
    }
}
