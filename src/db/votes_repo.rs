use anyhow::Result;
use log::{debug, error};
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use crate::models::{
    choice::Choice,
    vote::{Vote, VoteUpsert},
};

#[derive(Deserialize, Serialize, Debug)]
pub struct VoteDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub poll_id: String,
    pub choice_id: String,
}

pub struct VoteRepo {
    pub collection: Collection<VoteDocument>,
}

impl VoteRepo {
    pub async fn init(db: &Database) -> Result<Self> {
        let votes_collection: Collection<VoteDocument> = db.collection("votes");

        let unique_vote = IndexModel::builder()
            .keys(doc! {"user_id": 1, "poll_id": 1})
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(Some("unique_user_poll".to_string()))
                    .build(),
            )
            .build();
        // upsert() relies on this index for one vote per user and poll
        votes_collection.create_index(unique_vote).await.map_err(|e| {
            error!("Failed to create unique index on `user_id, poll_id`: {:?}", e);
            anyhow::Error::new(e)
        })?;

        let by_choice = IndexModel::builder().keys(doc! {"choice_id": 1}).build();
        if let Err(e) = votes_collection.create_index(by_choice).await {
            error!("Failed to create index on `choice_id`: {:?}", e);
        }

        Ok(Self {
            collection: votes_collection,
        })
    }

    pub async fn upsert(&self, user_id: &str, choice: &Choice) -> Result<VoteUpsert> {
        let new_id = nanoid!();
        let filter = doc! {"user_id": user_id, "poll_id": choice.poll_id.as_str()};
        let update = doc! {
            "$set": {"choice_id": choice.id.as_str()},
            "$setOnInsert": {"_id": new_id.as_str()},
        };
        let previous = self
            .collection
            .find_one_and_update(filter, update)
            .upsert(true)
            .return_document(ReturnDocument::Before)
            .await
            .map_err(|e| {
                error!("Error upserting vote of {} in {}: {}", user_id, choice.poll_id, e);
                anyhow::Error::new(e)
            })?;
        debug!("vote of {} existed before: {}", user_id, previous.is_some());

        let (id, previous_choice_id) = match previous {
            Some(document) => (document.id, Some(document.choice_id)),
            None => (new_id, None),
        };
        Ok(VoteUpsert {
            vote: Vote {
                id,
                user_id: user_id.to_string(),
                choice_id: choice.id.clone(),
                poll_id: choice.poll_id.clone(),
            },
            previous_choice_id,
        })
    }

    pub async fn count_by_choice(&self, choice_id: &str) -> Result<u64> {
        let count = self
            .collection
            .count_documents(doc! {"choice_id": choice_id})
            .await?;
        Ok(count)
    }

    pub async fn delete_by_choice(&self, choice_id: &str) -> Result<u64> {
        let result = self
            .collection
            .delete_many(doc! {"choice_id": choice_id})
            .await?;
        Ok(result.deleted_count)
    }

    pub async fn delete_by_poll(&self, poll_id: &str) -> Result<u64> {
        let result = self.collection.delete_many(doc! {"poll_id": poll_id}).await?;
        Ok(result.deleted_count)
    }
}
