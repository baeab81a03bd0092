use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    db::Store,
    error::{PollError, PollResult},
    models::vote::Vote,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Created,
    Changed,
    Unchanged,
}

/// Confirmation of a recorded vote.
#[derive(Serialize, Deserialize, Debug)]
pub struct VoteReceipt {
    pub vote: Vote,
    /// Votes on the chosen choice, read after the write.
    pub vote_count: u64,
    pub outcome: VoteOutcome,
}

/// Casts or changes a user's vote, enforcing the voting window and one vote per user and poll.
pub struct VotingService {
    store: Arc<dyn Store>,
}

impl VotingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Every check runs before the single write, so a failure leaves the store untouched.
    pub async fn cast_vote(
        &self,
        poll_id: &str,
        user_id: &str,
        choice_id: &str,
        now: DateTime<Utc>,
    ) -> PollResult<VoteReceipt> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await?
            .ok_or(PollError::NotFound)?;
        if !poll.can_vote(now) {
            debug!("rejected vote of {} on closed poll {}", user_id, poll_id);
            return Err(PollError::VotingClosed);
        }

        let choice = match self.store.get_choice(choice_id).await? {
            Some(choice) if choice.poll_id == poll.id => choice,
            _ => return Err(PollError::InvalidChoice),
        };

        let upsert = self
            .store
            .upsert_vote(user_id, &choice)
            .await?
            .ok_or(PollError::InvalidChoice)?;
        let outcome = match upsert.previous_choice_id.as_deref() {
            None => VoteOutcome::Created,
            Some(previous) if previous == choice.id => VoteOutcome::Unchanged,
            Some(_) => VoteOutcome::Changed,
        };
        let vote_count = choice.vote_count(self.store.as_ref()).await?;
        info!(
            "{} voted for {} in poll {} ({:?})",
            user_id, choice.id, poll.id, outcome
        );

        Ok(VoteReceipt {
            vote: upsert.vote,
            vote_count,
            outcome,
        })
    }
}
