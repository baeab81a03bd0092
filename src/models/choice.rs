use anyhow::Result;
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use crate::db::Store;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Choice {
    pub id: String,
    pub poll_id: String,
    pub text: String,
}

impl Choice {
    pub fn new(poll_id: &str, text: String) -> Self {
        Self {
            id: nanoid!(),
            poll_id: poll_id.to_string(),
            text,
        }
    }

    /// Counted from the vote table on every call; nothing is cached.
    pub async fn vote_count(&self, store: &dyn Store) -> Result<u64> {
        store.count_votes(&self.id).await
    }
}
