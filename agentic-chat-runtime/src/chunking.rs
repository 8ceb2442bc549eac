//! Splitting of long streamed content into bounded fragments.

use crate::interfaces::RuntimeError;

pub const DEFAULT_CHUNK_THRESHOLD: usize = 100;
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Bounds per-emission payload size for streaming transports.
///
/// Lengths are counted in chars so fragments never split a code point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    threshold: usize,
    size: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CHUNK_THRESHOLD,
            size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkPolicy {
    /// Content longer than `threshold` chars is cut into `size`-char pieces.
    pub fn new(threshold: usize, size: usize) -> Result<Self, RuntimeError> {
        if size == 0 {
            return Err(RuntimeError::ConfigError(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { threshold, size })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Split content into fragments. Empty content yields no fragments.
    pub fn split(&self, content: &str) -> Vec<String> {
        if content.is_empty() {
            return Vec::new();
        }
        if content.chars().count() <= self.threshold {
            return vec![content.to_string()];
        }

        let mut fragments = Vec::new();
        let mut current = String::new();
        let mut count = 0;
        for ch in content.chars() {
            current.push(ch);
            count += 1;
            if count == self.size {
                fragments.push(std::mem::take(&mut current));
                count = 0;
            }
        }
        if !current.is_empty() {
            fragments.push(current);
        }
        fragments
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_long_content_split() {
        let content = "a".repeat(120);
        let fragments = ChunkPolicy::default().split(&content);
        let lengths: Vec<usize> = fragments.iter().map(|f| f.len()).collect();
        assert_eq!(lengths, vec![50, 50, 20]);
        assert_eq!(fragments.concat(), content);
    }

    #[test]
    fn test_short_content_single_fragment() {
        let content = "b".repeat(40);
        assert_eq!(ChunkPolicy::default().split(&content), vec![content]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let content = "c".repeat(100);
        assert_eq!(ChunkPolicy::default().split(&content).len(), 1);
        let content = "c".repeat(101);
        assert_eq!(ChunkPolicy::default().split(&content).len(), 3);
    }

    #[test]
    fn test_empty_content_yields_nothing() {
        assert!(ChunkPolicy::default().split("").is_empty());
    }

    #[test]
    fn test_multibyte_not_split() {
        let content = "é".repeat(120);
        let fragments = ChunkPolicy::default().split(&content);
        let lengths: Vec<usize> = fragments.iter().map(|f| f.chars().count()).collect();
        assert_eq!(lengths, vec![50, 50, 20]);
        assert_eq!(fragments.concat(), content);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(ChunkPolicy::new(10, 0).is_err());
        let policy = ChunkPolicy::new(4, 2).unwrap();
        assert_eq!(policy.split("abcde"), vec!["ab", "cd", "e"]);
    }
}
