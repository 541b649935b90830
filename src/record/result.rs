use crate::record::Transcript;
use serde::{Deserialize, Serialize};

/// Both legs of one domain's test
///
/// Persisted as one value so a record is either absent or complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub insecure: Transcript,
    pub secure: Transcript,
}

impl ResultRecord {
    pub fn new(insecure: Transcript, secure: Transcript) -> Self {
        Self { insecure, secure }
    }
}
