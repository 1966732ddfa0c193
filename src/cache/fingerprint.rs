// Fingerprint derivation - builds cache keys from a prefix of the feature matrix

use crate::config::FingerprintScope;
use crate::error::{Result, ServiceError};
use sha2::{Digest, Sha256};

/// Derives cache fingerprints from the leading part of a feature matrix.
///
/// Only the prefix participates in the hash, so inputs that differ past it
/// share a fingerprint and therefore a cache entry. That approximation is
/// what the risk monitor and policy agent keep in check.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    prefix_len: usize,
    scope: FingerprintScope,
}

impl KeyDeriver {
    /// Create a deriver hashing the first `prefix_len` rows (or columns, see [`FingerprintScope`]).
    pub fn new(prefix_len: usize, scope: FingerprintScope) -> Result<Self> {
        if prefix_len == 0 {
            return Err(ServiceError::Config("prefix_len must be at least 1".to_string()));
        }
        Ok(Self { prefix_len, scope })
    }

    /// Hash the prefix of `features` into a lower-case hex SHA-256 digest.
    ///
    /// A matrix shorter than the prefix contributes all of its rows; an empty
    /// matrix yields the digest of an empty prefix rather than an error.
    pub fn derive<R: AsRef<[f32]>>(&self, features: &[R]) -> String {
        let mut hasher = Sha256::new();

        match self.scope {
            FingerprintScope::Rows => {
                let rows = &features[..features.len().min(self.prefix_len)];
                hasher.update((rows.len() as u64).to_le_bytes());
                for row in rows {
                    Self::hash_row(&mut hasher, row.as_ref());
                }
            }
            FingerprintScope::Columns => {
                hasher.update((features.len() as u64).to_le_bytes());
                for row in features {
                    let row = row.as_ref();
                    Self::hash_row(&mut hasher, &row[..row.len().min(self.prefix_len)]);
                }
            }
        }

        hex::encode(hasher.finalize())
    }

    // Length-prefixed so [[1, 2], [3]] and [[1], [2, 3]] never collide
    fn hash_row(hasher: &mut Sha256, row: &[f32]) {
        hasher.update((row.len() as u64).to_le_bytes());
        for value in row {
            hasher.update(value.to_bits().to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(k: usize) -> KeyDeriver {
        KeyDeriver::new(k, FingerprintScope::Rows).unwrap()
    }

    #[test]
    fn test_zero_prefix_rejected() {
        assert!(KeyDeriver::new(0, FingerprintScope::Rows).is_err());
        assert!(KeyDeriver::new(0, FingerprintScope::Columns).is_err());
    }

    #[test]
    fn test_same_input_same_key() {
        let deriver = rows(2);
        let m = vec![vec![0.1f32, 0.2], vec![0.3, 0.4], vec![0.5, 0.6]];

        let key1 = deriver.derive(&m);
        let key2 = deriver.derive(&m);

        assert_eq!(key1, key2);
        assert_eq!(key1.len(), 64);
        assert!(key1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_suffix_rows_ignored() {
        let deriver = rows(2);
        let a = vec![vec![1.0f32, 1.0], vec![2.0, 2.0], vec![0.0, 0.0]];
        let b = vec![vec![1.0f32, 1.0], vec![2.0, 2.0], vec![9.0, 9.0], vec![7.0, 7.0]];

        assert_eq!(deriver.derive(&a), deriver.derive(&b));
    }

    #[test]
    fn test_prefix_difference_changes_key() {
        let deriver = rows(2);
        let a = vec![vec![1.0f32, 1.0], vec![2.0, 2.0]];
        let b = vec![vec![1.0f32, 1.0], vec![2.0, 2.5]];

        assert_ne!(deriver.derive(&a), deriver.derive(&b));
    }

    #[test]
    fn test_short_matrix_uses_all_rows() {
        let deriver = rows(8);
        let short = vec![vec![1.0f32, 2.0]];

        assert_eq!(deriver.derive(&short), rows(1).derive(&short));
        // Degenerate but well-defined
        let empty: Vec<Vec<f32>> = Vec::new();
        assert_eq!(deriver.derive(&empty), rows(3).derive(&empty));
    }

    #[test]
    fn test_row_boundaries_matter() {
        let deriver = rows(4);
        let a = vec![vec![1.0f32, 2.0], vec![3.0]];
        let b = vec![vec![1.0f32], vec![2.0, 3.0]];

        assert_ne!(deriver.derive(&a), deriver.derive(&b));
    }

    #[test]
    fn test_column_scope_ignores_row_suffix() {
        let deriver = KeyDeriver::new(4, FingerprintScope::Columns).unwrap();
        let mut a = vec![1.0f32, 1.0, 1.0, 1.0];
        a.extend(std::iter::repeat(0.0).take(28));
        let mut b = vec![1.0f32, 1.0, 1.0, 1.0];
        b.extend(std::iter::repeat(9.0).take(28));

        assert_eq!(deriver.derive(&[a.clone()]), deriver.derive(&[b]));
        // Every row contributes in column scope
        assert_ne!(deriver.derive(&[a.clone()]), deriver.derive(&[a.clone(), a]));
    }
}
