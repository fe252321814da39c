use std::{collections::HashMap, fmt, path::Path};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// SHA-256 digest of a secret. The secret itself is never kept.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretDigest([u8; 32]);

impl SecretDigest {
    pub fn of(secret: &str) -> Self {
        Self(Sha256::digest(secret.as_bytes()).into())
    }

    pub fn from_hex(encoded: &str) -> Option<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(encoded.trim(), &mut bytes).ok()?;
        Some(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Compares without short-circuiting on the first differing byte.
    pub fn matches(&self, secret: &str) -> bool {
        let candidate = Self::of(secret);
        self.0
            .iter()
            .zip(candidate.0.iter())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretDigest(..)")
    }
}

/// Outcome of checking an identifier and secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Accepted,
    UnknownIdentifier,
    WrongSecret,
}

/// Where credentials come from.
pub trait CredentialStore: Send + Sync + 'static {
    fn lookup(&self, identifier: &str) -> Option<SecretDigest>;

    fn verify(&self, identifier: &str, secret: &str) -> Verification {
        match self.lookup(identifier) {
            None => Verification::UnknownIdentifier,
            Some(digest) if digest.matches(secret) => Verification::Accepted,
            Some(_) => Verification::WrongSecret,
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read user file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse user file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("user '{email}' has a password digest that is not 64 hex characters")]
    InvalidDigest { email: String },
    #[error("user '{email}' is listed more than once")]
    DuplicateUser { email: String },
}

/// One entry of the user file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub password_sha256: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserFile {
    users: Vec<UserRecord>,
}

/// Credentials held in memory, keyed by email.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, SecretDigest>,
}

impl InMemoryCredentialStore {
    pub fn from_records(
        records: impl IntoIterator<Item = UserRecord>,
    ) -> Result<Self, CredentialError> {
        let mut users = HashMap::new();
        for UserRecord {
            email,
            password_sha256,
        } in records
        {
            let Some(digest) = SecretDigest::from_hex(&password_sha256) else {
                return Err(CredentialError::InvalidDigest { email });
            };
            if users.contains_key(&email) {
                return Err(CredentialError::DuplicateUser { email });
            }
            users.insert(email, digest);
        }
        Ok(Self { users })
    }

    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let file: UserFile = serde_json::from_str(json)?;
        Self::from_records(file.users)
    }

    pub async fn load(path: &Path) -> Result<Self, CredentialError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup(&self, identifier: &str) -> Option<SecretDigest> {
        self.users.get(identifier).copied()
    }
}
