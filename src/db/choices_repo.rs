use anyhow::Result;
use futures::TryStreamExt;
use log::error;
use mongodb::{bson::doc, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use crate::models::choice::Choice;

#[derive(Deserialize, Serialize, Debug)]
pub struct ChoiceDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub poll_id: String,
    pub text: String,
}

impl From<&Choice> for ChoiceDocument {
    fn from(choice: &Choice) -> Self {
        Self {
            id: choice.id.clone(),
            poll_id: choice.poll_id.clone(),
            text: choice.text.clone(),
        }
    }
}

impl From<ChoiceDocument> for Choice {
    fn from(document: ChoiceDocument) -> Self {
        Choice {
            id: document.id,
            poll_id: document.poll_id,
            text: document.text,
        }
    }
}

pub struct ChoiceRepo {
    pub collection: Collection<ChoiceDocument>,
}

impl ChoiceRepo {
    pub async fn init(db: &Database) -> Result<Self> {
        let choices_collection: Collection<ChoiceDocument> = db.collection("choices");

        let index = IndexModel::builder().keys(doc! {"poll_id": 1}).build();
        if let Err(e) = choices_collection.create_index(index).await {
            error!("Failed to create index on `poll_id`: {:?}", e);
        }

        Ok(Self {
            collection: choices_collection,
        })
    }

    pub async fn insert(&self, choice: &Choice) -> Result<()> {
        self.collection.insert_one(ChoiceDocument::from(choice)).await?;
        Ok(())
    }

    pub async fn get(&self, choice_id: &str) -> Result<Option<Choice>> {
        let found = self.collection.find_one(doc! {"_id": choice_id}).await?;
        Ok(found.map(Choice::from))
    }

    pub async fn find_by_poll(&self, poll_id: &str) -> Result<Vec<Choice>> {
        let documents: Vec<ChoiceDocument> = self
            .collection
            .find(doc! {"poll_id": poll_id})
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(Choice::from).collect())
    }

    pub async fn delete(&self, choice_id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! {"_id": choice_id}).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn delete_by_poll(&self, poll_id: &str) -> Result<u64> {
        let result = self.collection.delete_many(doc! {"poll_id": poll_id}).await?;
        Ok(result.deleted_count)
    }
}
