use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use choices_repo::ChoiceRepo;
use log::{info, warn};
use mongodb::Client;
use polls_repo::PollRepo;
use tokio::try_join;
use votes_repo::VoteRepo;

use crate::{
    config::app_config::AppConfig,
    models::{choice::Choice, poll::Poll, vote::VoteUpsert},
};
pub mod choices_repo;
pub mod memory;
pub mod polls_repo;
pub mod votes_repo;

/// Which polls a listing should return. Results are always newest `publish_at` first.
#[derive(Debug, Clone, Default)]
pub struct PollFilter {
    /// Only polls with `publish_at <= published_by`.
    pub published_by: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the poll text.
    pub search: Option<String>,
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Everything the lifecycle logic and the HTTP layer need from persistence.
///
/// Deletes cascade: poll -> choices -> votes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_poll(&self, poll: &Poll) -> Result<()>;
    async fn get_poll(&self, poll_id: &str) -> Result<Option<Poll>>;
    /// Returns `false` if no poll with that id exists.
    async fn update_poll(&self, poll: &Poll) -> Result<bool>;
    async fn delete_poll(&self, poll_id: &str) -> Result<bool>;
    async fn list_polls(&self, filter: &PollFilter) -> Result<Vec<Poll>>;
    /// Ignores `skip` and `limit`.
    async fn count_polls(&self, filter: &PollFilter) -> Result<u64>;

    async fn insert_choice(&self, choice: &Choice) -> Result<()>;
    async fn get_choice(&self, choice_id: &str) -> Result<Option<Choice>>;
    async fn choices_for_poll(&self, poll_id: &str) -> Result<Vec<Choice>>;
    async fn delete_choice(&self, choice_id: &str) -> Result<bool>;

    /// Sets the user's vote in the choice's poll to `choice`, creating it if absent.
    /// Lookup and write happen as one atomic step.
    ///
    /// Returns `None` and stores nothing if `choice` no longer exists, for example
    /// when its poll was deleted after the caller looked it up.
    async fn upsert_vote(&self, user_id: &str, choice: &Choice) -> Result<Option<VoteUpsert>>;
    async fn count_votes(&self, choice_id: &str) -> Result<u64>;
}

pub struct DB {
    pub client: Client,
    pub polls: PollRepo,
    pub choices: ChoiceRepo,
    pub votes: VoteRepo,
}

impl DB {
    pub async fn init(app_config: &AppConfig) -> Result<Self> {
        let mongo_uri = app_config
            .db_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DB_URL is required for mongo storage"))?;
        let client = Client::with_uri_str(mongo_uri).await?;
        let database = client.database(&app_config.db_name);
        let (polls, choices, votes) = try_join!(
            PollRepo::init(&database),
            ChoiceRepo::init(&database),
            VoteRepo::init(&database)
        )?;
        info!("Connected to database {}", app_config.db_name);
        Ok(DB {
            client,
            polls,
            choices,
            votes,
        })
    }
}

#[async_trait]
impl Store for DB {
    async fn insert_poll(&self, poll: &Poll) -> Result<()> {
        self.polls.insert(poll).await
    }

    async fn get_poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        self.polls.get(poll_id).await
    }

    async fn update_poll(&self, poll: &Poll) -> Result<bool> {
        self.polls.update(poll).await
    }

    async fn delete_poll(&self, poll_id: &str) -> Result<bool> {
        // choices before votes, upsert_vote re-checks the choice after its write
        self.choices.delete_by_poll(poll_id).await?;
        self.votes.delete_by_poll(poll_id).await?;
        self.polls.delete(poll_id).await
    }

    async fn list_polls(&self, filter: &PollFilter) -> Result<Vec<Poll>> {
        self.polls.list(filter).await
    }

    async fn count_polls(&self, filter: &PollFilter) -> Result<u64> {
        self.polls.count(filter).await
    }

    async fn insert_choice(&self, choice: &Choice) -> Result<()> {
        self.choices.insert(choice).await
    }

    async fn get_choice(&self, choice_id: &str) -> Result<Option<Choice>> {
        self.choices.get(choice_id).await
    }

    async fn choices_for_poll(&self, poll_id: &str) -> Result<Vec<Choice>> {
        self.choices.find_by_poll(poll_id).await
    }

    async fn delete_choice(&self, choice_id: &str) -> Result<bool> {
        let deleted = self.choices.delete(choice_id).await?;
        self.votes.delete_by_choice(choice_id).await?;
        Ok(deleted)
    }

    async fn upsert_vote(&self, user_id: &str, choice: &Choice) -> Result<Option<VoteUpsert>> {
        let upsert = self.votes.upsert(user_id, choice).await?;
        if self.choices.get(&choice.id).await?.is_none() {
            warn!("Choice {} vanished while {} voted, dropping the vote", choice.id, user_id);
            self.votes.delete_by_choice(&choice.id).await?;
            return Ok(None);
        }
        Ok(Some(upsert))
    }

    async fn count_votes(&self, choice_id: &str) -> Result<u64> {
        self.votes.count_by_choice(choice_id).await
    }
}
