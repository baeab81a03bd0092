use serde::{Deserialize, Serialize};

/// A user's current selection in one poll. At most one exists per `(user_id, poll_id)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Vote {
    pub id: String,
    pub user_id: String,
    pub choice_id: String,
    // copied from the choice on write so the store can key uniqueness on it
    pub poll_id: String,
}

/// Result of the atomic lookup-then-write on a vote.
#[derive(Debug, Clone)]
pub struct VoteUpsert {
    pub vote: Vote,
    /// Choice the user had before this write, `None` if the vote was just created.
    pub previous_choice_id: Option<String>,
}
