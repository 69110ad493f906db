use crate::errors::{InputError, InputResult};
use multisend_batch_tx::Credential;
use std::{fs, path::Path, sync::Arc};
use tracing::debug;

/// Parse one private key per line, bound to `chain_id`
///
/// Blank lines are ignored and surrounding whitespace is trimmed. Any malformed key fails
/// the whole file, since a silently dropped signer would leave funds behind.
pub fn parse_keys(contents: &str, chain_id: u64) -> InputResult<Vec<Arc<Credential>>> {
    let mut credentials = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let key = line.trim();
        if key.is_empty() {
            continue;
        }

        let credential = Credential::from_private_key(key, chain_id).map_err(|_| {
            InputError::InvalidKey {
                line: idx + 1,
                reason: "not a 32-byte hex secp256k1 key".to_string(),
            }
        })?;
        credentials.push(Arc::new(credential));
    }

    if credentials.is_empty() {
        return Err(InputError::Empty("private key list".to_string()));
    }
    debug!("Loaded {} signing keys", credentials.len());
    Ok(credentials)
}

/// Read signing keys from a `pk.txt` file
pub fn read_keys<P: AsRef<Path>>(path: P, chain_id: u64) -> InputResult<Vec<Arc<Credential>>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_keys(&contents, chain_id).map_err(|e| match e {
        InputError::Empty(_) => InputError::Empty(path.display().to_string()),
        other => other,
    })
}
