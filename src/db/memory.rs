use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use nanoid::nanoid;

use super::{PollFilter, Store};
use crate::models::{
    choice::Choice,
    poll::Poll,
    vote::{Vote, VoteUpsert},
};

#[derive(Default)]
struct Tables {
    polls: Vec<Poll>,
    choices: Vec<Choice>,
    votes: Vec<Vote>,
}

/// Process-local store behind a single lock. Used for `STORAGE=memory` and in tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

fn matches(poll: &Poll, filter: &PollFilter) -> bool {
    let published = filter
        .published_by
        .map_or(true, |published_by| poll.publish_at <= published_by);
    let searched = match filter.search.as_deref() {
        Some(search) if !search.is_empty() => poll
            .text
            .to_lowercase()
            .contains(&search.to_lowercase()),
        _ => true,
    };
    published && searched
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_poll(&self, poll: &Poll) -> Result<()> {
        let mut tables = self.tables()?;
        if tables.polls.iter().any(|p| p.id == poll.id) {
            return Err(anyhow!("duplicate poll id {}", poll.id));
        }
        tables.polls.push(poll.clone());
        Ok(())
    }

    async fn get_poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        Ok(self.tables()?.polls.iter().find(|p| p.id == poll_id).cloned())
    }

    async fn update_poll(&self, poll: &Poll) -> Result<bool> {
        let mut tables = self.tables()?;
        match tables.polls.iter_mut().find(|p| p.id == poll.id) {
            Some(stored) => {
                *stored = poll.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_poll(&self, poll_id: &str) -> Result<bool> {
        let mut tables = self.tables()?;
        let before = tables.polls.len();
        tables.polls.retain(|p| p.id != poll_id);
        tables.choices.retain(|c| c.poll_id != poll_id);
        tables.votes.retain(|v| v.poll_id != poll_id);
        Ok(tables.polls.len() < before)
    }

    async fn list_polls(&self, filter: &PollFilter) -> Result<Vec<Poll>> {
        let tables = self.tables()?;
        let mut polls: Vec<Poll> = tables
            .polls
            .iter()
            .filter(|p| matches(p, filter))
            .cloned()
            .collect();
        polls.sort_by(|a, b| b.publish_at.cmp(&a.publish_at));
        let skip = usize::try_from(filter.skip).unwrap_or(usize::MAX);
        let limit = filter
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(polls
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn count_polls(&self, filter: &PollFilter) -> Result<u64> {
        let tables = self.tables()?;
        Ok(tables.polls.iter().filter(|p| matches(p, filter)).count() as u64)
    }

    async fn insert_choice(&self, choice: &Choice) -> Result<()> {
        let mut tables = self.tables()?;
        if tables.choices.iter().any(|c| c.id == choice.id) {
            return Err(anyhow!("duplicate choice id {}", choice.id));
        }
        tables.choices.push(choice.clone());
        Ok(())
    }

    async fn get_choice(&self, choice_id: &str) -> Result<Option<Choice>> {
        Ok(self
            .tables()?
            .choices
            .iter()
            .find(|c| c.id == choice_id)
            .cloned())
    }

    async fn choices_for_poll(&self, poll_id: &str) -> Result<Vec<Choice>> {
        Ok(self
            .tables()?
            .choices
            .iter()
            .filter(|c| c.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn delete_choice(&self, choice_id: &str) -> Result<bool> {
        let mut tables = self.tables()?;
        let before = tables.choices.len();
        tables.choices.retain(|c| c.id != choice_id);
        tables.votes.retain(|v| v.choice_id != choice_id);
        Ok(tables.choices.len() < before)
    }

    async fn upsert_vote(&self, user_id: &str, choice: &Choice) -> Result<Option<VoteUpsert>> {
        let mut tables = self.tables()?;
        if !tables
            .choices
            .iter()
            .any(|c| c.id == choice.id && c.poll_id == choice.poll_id)
        {
            return Ok(None);
        }
        let existing = tables
            .votes
            .iter_mut()
            .find(|v| v.user_id == user_id && v.poll_id == choice.poll_id);
        match existing {
            Some(vote) => {
                let previous = std::mem::replace(&mut vote.choice_id, choice.id.clone());
                Ok(Some(VoteUpsert {
                    vote: vote.clone(),
                    previous_choice_id: Some(previous),
                }))
            }
            None => {
                let vote = Vote {
                    id: nanoid!(),
                    user_id: user_id.to_string(),
                    choice_id: choice.id.clone(),
                    poll_id: choice.poll_id.clone(),
                };
                tables.votes.push(vote.clone());
                Ok(Some(VoteUpsert {
                    vote,
                    previous_choice_id: None,
                }))
            }
        }
    }

    async fn count_votes(&self, choice_id: &str) -> Result<u64> {
        let tables = self.tables()?;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.choice_id == choice_id)
            .count() as u64)
    }
}
