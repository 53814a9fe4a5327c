use crate::session::AuthMethod;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use swarmflow_core::{SwarmError, SwarmResult};
use tracing::{debug, info, warn};
use uuid::Uuid;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// On-disk credential record. The secret material lives only inside
/// `encrypted_data`; everything else is non-sensitive bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialRecord {
    id: String,
    service: String,
    auth_method: AuthMethod,
    /// base64(nonce || ciphertext) of the serialized credential map.
    encrypted_data: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

/// Non-sensitive listing entry for a stored credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialInfo {
    /// Credential identifier.
    pub id: String,
    /// The service it authenticates against.
    pub service: String,
    /// How the service is authenticated.
    pub auth_method: AuthMethod,
    /// When the credential was stored.
    pub created_at: DateTime<Utc>,
    /// When it expires, if an expiry was set.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Encrypted at-rest credential storage.
///
/// Each credential map is serialized to JSON and sealed with
/// AES-256-GCM under a vault-wide key; a fresh random nonce is
/// prepended to every ciphertext. The key lives next to the records in
/// `vault.key`, mode 0600. Retrieval of an expired credential returns
/// `None` without attempting decryption.
pub struct CredentialVault {
    dir: PathBuf,
    key: [u8; KEY_LEN],
}

impl CredentialVault {
    /// Open the vault at `dir`, creating the directory and generating
    /// the encryption key on first use.
    pub async fn new(dir: impl Into<PathBuf>) -> SwarmResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let key_path = dir.join("vault.key");
        let key = if key_path.exists() {
            let encoded = tokio::fs::read_to_string(&key_path).await?;
            let bytes = hex::decode(encoded.trim())
                .map_err(|e| SwarmError::Credential(format!("Corrupt vault key: {e}")))?;
            bytes
                .try_into()
                .map_err(|_| SwarmError::Credential("Vault key has wrong length".to_string()))?
        } else {
            let mut key = [0u8; KEY_LEN];
            fill_random(&mut key)?;
            tokio::fs::write(&key_path, hex::encode(key)).await?;
            restrict_permissions(&key_path).await?;
            info!(path = %key_path.display(), "Generated new vault key");
            key
        };

        Ok(Self { dir, key })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.cred"))
    }

    /// Encrypt and store a credential map. Returns the credential id.
    pub async fn store(
        &self,
        service: &str,
        auth_method: AuthMethod,
        credentials: &HashMap<String, String>,
        metadata: Option<HashMap<String, serde_json::Value>>,
        expires_in_days: Option<i64>,
    ) -> SwarmResult<String> {
        let now = Utc::now();
        let id = derive_id(service);

        let plaintext = serde_json::to_vec(credentials)?;
        let encrypted_data = self.seal(&plaintext)?;

        let record = CredentialRecord {
            id: id.clone(),
            service: service.to_string(),
            auth_method,
            encrypted_data,
            metadata: metadata.unwrap_or_default(),
            created_at: now,
            expires_at: expires_in_days.map(|days| now + Duration::days(days)),
        };

        let json = serde_json::to_string(&record)?;
        tokio::fs::write(self.path_for(&id), json).await?;

        info!(credential = %id, service = %service, "Stored credential");
        Ok(id)
    }

    /// Decrypt a stored credential map. Returns `None` when the
    /// credential is missing or expired.
    pub async fn retrieve(&self, id: &str) -> SwarmResult<Option<HashMap<String, String>>> {
        let record = match self.read_record(id).await? {
            None => return Ok(None),
            Some(record) => record,
        };

        if let Some(expires_at) = record.expires_at {
            if Utc::now() >= expires_at {
                debug!(credential = %id, "Credential expired");
                return Ok(None);
            }
        }

        let plaintext = self.open(&record.encrypted_data)?;
        let credentials = serde_json::from_slice(&plaintext)?;
        Ok(Some(credentials))
    }

    /// Remove a credential. The record file is overwritten with random
    /// bytes before unlinking. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> SwarmResult<bool> {
        let path = self.path_for(id);
        let len = match tokio::fs::metadata(&path).await {
            Err(_) => return Ok(false),
            Ok(meta) => meta.len() as usize,
        };

        let mut noise = vec![0u8; len];
        fill_random(&mut noise)?;
        tokio::fs::write(&path, &noise).await?;
        tokio::fs::remove_file(&path).await?;

        info!(credential = %id, "Deleted credential");
        Ok(true)
    }

    /// List stored credentials without secret material, optionally
    /// filtered by service.
    pub async fn list_credentials(
        &self,
        service: Option<&str>,
    ) -> SwarmResult<Vec<CredentialInfo>> {
        let mut infos = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("cred") {
                continue;
            }

            let record: CredentialRecord = match tokio::fs::read_to_string(&path).await {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable credential");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable credential");
                    continue;
                }
            };

            if let Some(service) = service {
                if record.service != service {
                    continue;
                }
            }

            infos.push(CredentialInfo {
                id: record.id,
                service: record.service,
                auth_method: record.auth_method,
                created_at: record.created_at,
                expires_at: record.expires_at,
            });
        }

        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(infos)
    }

    async fn read_record(&self, id: &str) -> SwarmResult<Option<CredentialRecord>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&path).await?;
        let record = serde_json::from_str(&data)
            .map_err(|e| SwarmError::Credential(format!("Corrupt credential {id}: {e}")))?;
        Ok(Some(record))
    }

    fn seal(&self, plaintext: &[u8]) -> SwarmResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| SwarmError::Credential(format!("Bad vault key: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        fill_random(&mut nonce_bytes)?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| SwarmError::Credential(format!("Encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    fn open(&self, encoded: &str) -> SwarmResult<Vec<u8>> {
        let sealed = BASE64
            .decode(encoded)
            .map_err(|e| SwarmError::Credential(format!("Corrupt ciphertext: {e}")))?;
        if sealed.len() <= NONCE_LEN {
            return Err(SwarmError::Credential("Ciphertext too short".to_string()));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| SwarmError::Credential(format!("Bad vault key: {e}")))?;
        let nonce = Nonce::from_slice(&sealed[..NONCE_LEN]);

        cipher
            .decrypt(nonce, &sealed[NONCE_LEN..])
            .map_err(|e| SwarmError::Credential(format!("Decryption failed: {e}")))
    }
}

/// Credential id: service-scoped, unique per store call.
fn derive_id(service: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(service.as_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    let digest = hasher.finalize();
    format!("cred_{}", hex::encode(&digest[..6]))
}

fn fill_random(buf: &mut [u8]) -> SwarmResult<()> {
    getrandom::getrandom(buf)
        .map_err(|e| SwarmError::Credential(format!("RNG failure: {e}")))
}

#[cfg(unix)]
async fn restrict_permissions(path: &std::path::Path) -> SwarmResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &std::path::Path) -> SwarmResult<()> {
    Ok(())
}
