use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Generate a document seed from the document name using CRC32
pub fn get_document_id(name: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"grid://");
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for nodes within a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(document_name: &str) -> Self {
        Self {
            seed: get_document_id(document_name),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Number of ids handed out so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Never hand out an id at or below `count` again
    pub fn advance_to(&mut self, count: u64) {
        self.count = self.count.max(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_generation() {
        assert_eq!(get_document_id("main"), get_document_id("main"));
        assert_ne!(get_document_id("main"), get_document_id("sidebar"));
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = IdGenerator::new("main");

        let id1 = ids.new_id();
        let id2 = ids.new_id();

        assert!(id1.ends_with("-1"));
        assert!(id2.ends_with("-2"));
        assert!(id1.starts_with(ids.seed()));
        assert_eq!(ids.count(), 2);
    }

    #[test]
    fn test_advance_never_goes_back() {
        let mut ids = IdGenerator::new("main");
        ids.advance_to(10);
        ids.advance_to(3);
        assert!(ids.new_id().ends_with("-11"));
    }
}
