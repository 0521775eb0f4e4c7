use super::PersistenceError;

/// Logical key of the serialized model artifact.
pub const ARTIFACT_KEY: &str = "model/artifact.json";
/// Logical key of the last training metrics.
pub const METRICS_KEY: &str = "model/metrics.json";
/// Logical key of the last schema passed to training.
pub const SCHEMA_KEY: &str = "model/schema.json";
/// Logical key of the feedback log.
pub const FEEDBACK_KEY: &str = "feedback/log.json";

/// Byte-oriented storage keyed by logical `/`-separated paths.
///
/// `put` must replace the value atomically: a reader sees either the old
/// bytes or the new bytes, never a mix.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Reject keys that could escape a store root.
pub(super) fn check_key(key: &str) -> Result<(), PersistenceError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key.split('/').all(|part| {
            !part.is_empty()
                && part != "."
                && part != ".."
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        });
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_keys_are_valid() {
        for key in [ARTIFACT_KEY, METRICS_KEY, SCHEMA_KEY, FEEDBACK_KEY] {
            check_key(key).unwrap();
        }
    }

    #[test]
    fn traversal_and_odd_keys_are_rejected() {
        for key in ["", "/abs", "a/../b", "a//b", "a/./b", "a\\b", "sp ace"] {
            assert!(check_key(key).is_err(), "{key}");
        }
    }
}
