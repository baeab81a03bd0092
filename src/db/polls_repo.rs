use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use log::{debug, error};
use mongodb::{
    bson::{self, doc, Document},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use super::PollFilter;
use crate::models::poll::Poll;

/// Stored shape of a poll; timestamps are native BSON dates so range filters and sorting work.
#[derive(Deserialize, Serialize, Debug)]
pub struct PollDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub publish_at: bson::DateTime,
    pub close_at: Option<bson::DateTime>,
}

pub(crate) fn to_bson_date(instant: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(instant.timestamp_millis())
}

fn from_bson_date(instant: bson::DateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(instant.timestamp_millis())
        .ok_or_else(|| anyhow!("stored date {} is out of range", instant))
}

impl From<&Poll> for PollDocument {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id.clone(),
            text: poll.text.clone(),
            publish_at: to_bson_date(poll.publish_at),
            close_at: poll.close_at.map(to_bson_date),
        }
    }
}

impl TryFrom<PollDocument> for Poll {
    type Error = anyhow::Error;

    fn try_from(document: PollDocument) -> Result<Self> {
        Ok(Poll {
            id: document.id,
            text: document.text,
            publish_at: from_bson_date(document.publish_at)?,
            close_at: document.close_at.map(from_bson_date).transpose()?,
        })
    }
}

fn filter_document(filter: &PollFilter) -> Document {
    let mut query = doc! {};
    if let Some(published_by) = filter.published_by {
        query.insert("publish_at", doc! {"$lte": to_bson_date(published_by)});
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query.insert(
            "text",
            doc! {"$regex": regex::escape(search), "$options": "i"},
        );
    }
    query
}

pub struct PollRepo {
    pub collection: Collection<PollDocument>,
}

impl PollRepo {
    pub async fn init(db: &Database) -> Result<Self> {
        let polls_collection: Collection<PollDocument> = db.collection("polls");

        let index = IndexModel::builder().keys(doc! {"publish_at": -1}).build();
        if let Err(e) = polls_collection.create_index(index).await {
            error!("Failed to create index on `publish_at`: {:?}", e);
        }

        Ok(Self {
            collection: polls_collection,
        })
    }

    pub async fn insert(&self, poll: &Poll) -> Result<()> {
        self.collection
            .insert_one(PollDocument::from(poll))
            .await
            .map_err(|e| {
                error!("Error inserting poll {}: {}", poll.id, e);
                anyhow::Error::new(e)
            })?;
        Ok(())
    }

    pub async fn get(&self, poll_id: &str) -> Result<Option<Poll>> {
        let found = self.collection.find_one(doc! {"_id": poll_id}).await?;
        debug!("poll {} found: {}", poll_id, found.is_some());
        found.map(Poll::try_from).transpose()
    }

    pub async fn update(&self, poll: &Poll) -> Result<bool> {
        let result = self
            .collection
            .replace_one(doc! {"_id": poll.id.as_str()}, PollDocument::from(poll))
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete(&self, poll_id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! {"_id": poll_id}).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn list(&self, filter: &PollFilter) -> Result<Vec<Poll>> {
        let mut find = self
            .collection
            .find(filter_document(filter))
            .sort(doc! {"publish_at": -1})
            .skip(filter.skip.min(i64::MAX as u64));
        if let Some(limit) = filter.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let documents: Vec<PollDocument> = find.await?.try_collect().await?;
        documents.into_iter().map(Poll::try_from).collect()
    }

    pub async fn count(&self, filter: &PollFilter) -> Result<u64> {
        let count = self
            .collection
            .count_documents(filter_document(filter))
            .await?;
        Ok(count)
    }
}
