use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{choice::Choice, poll::Poll};

#[derive(Deserialize, Serialize, Debug)]
pub struct NewPollRequest {
    pub text: String,
    pub publish_at: Option<DateTime<Utc>>,
    pub close_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub choices: Vec<ChoiceRequest>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ChoiceRequest {
    pub text: String,
}

/// Partial update; absent fields are left as they are. `close_at: null` reopens indefinitely.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct UpdatePollRequest {
    pub text: Option<String>,
    pub publish_at: Option<DateTime<Utc>>,
    #[serde(default, with = "double_option")]
    pub close_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct VoteRequest {
    #[serde(default)]
    pub choice_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PollSummary {
    pub id: String,
    pub text: String,
    pub publish_at: DateTime<Utc>,
    pub close_at: Option<DateTime<Utc>>,
    pub can_vote: bool,
    pub was_published_recently: bool,
}

impl PollSummary {
    pub fn from_poll(poll: &Poll, now: DateTime<Utc>) -> Self {
        Self {
            id: poll.id.clone(),
            text: poll.text.clone(),
            publish_at: poll.publish_at,
            close_at: poll.close_at,
            can_vote: poll.can_vote(now),
            was_published_recently: poll.was_published_recently(now),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PollDetail {
    #[serde(flatten)]
    pub poll: PollSummary,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChoiceResult {
    pub id: String,
    pub text: String,
    pub votes_count: u64,
    pub votes_percentage: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PollResults {
    pub id: String,
    pub text: String,
    pub total_votes: u64,
    pub choices: Vec<ChoiceResult>,
}

impl PollResults {
    pub fn tally(poll: &Poll, counted: Vec<(Choice, u64)>) -> Self {
        let total_votes: u64 = counted.iter().map(|(_, count)| count).sum();
        let choices = counted
            .into_iter()
            .map(|(choice, votes_count)| ChoiceResult {
                id: choice.id,
                text: choice.text,
                votes_count,
                votes_percentage: if total_votes == 0 {
                    0.0
                } else {
                    votes_count as f64 * 100.0 / total_votes as f64
                },
            })
            .collect();
        Self {
            id: poll.id.clone(),
            text: poll.text.clone(),
            total_votes,
            choices,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PollPage {
    pub polls: Vec<Poll>,
    pub page: u64,
    pub per_page: u64,
    pub total_polls: u64,
    pub total_pages: u64,
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}
