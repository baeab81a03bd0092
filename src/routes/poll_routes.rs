use actix_web::{
    http::StatusCode,
    web::{Data, Json, Path, ServiceConfig},
    HttpResponse,
};
use chrono::{DateTime, Utc};

use crate::{
    clock::Clock,
    db::{PollFilter, Store},
    error::{PollError, PollResult},
    middlewares::authenticate::Identity,
    models::{
        poll::Poll,
        poll_api_model::{PollDetail, PollResults, PollSummary, VoteRequest},
    },
    services::voting::VotingService,
    utils::json_responder::Response,
};

/// How many polls the index shows.
const LATEST_POLLS: u64 = 5;

/// Polls that are not yet published are reported as missing.
async fn published_poll(store: &dyn Store, poll_id: &str, now: DateTime<Utc>) -> PollResult<Poll> {
    match store.get_poll(poll_id).await? {
        Some(poll) if poll.is_published(now) => Ok(poll),
        _ => Err(PollError::NotFound),
    }
}

#[actix_web::get("")]
pub async fn latest_polls(store: Data<dyn Store>, clock: Data<dyn Clock>) -> PollResult<HttpResponse> {
    let now = clock.now();
    let filter = PollFilter {
        published_by: Some(now),
        limit: Some(LATEST_POLLS),
        ..Default::default()
    };
    let polls: Vec<PollSummary> = store
        .list_polls(&filter)
        .await?
        .iter()
        .map(|poll| PollSummary::from_poll(poll, now))
        .collect();
    Ok(Response::ok(polls, StatusCode::OK))
}

#[actix_web::get("/{id}")]
pub async fn get_poll(
    id: Path<String>,
    store: Data<dyn Store>,
    clock: Data<dyn Clock>,
) -> PollResult<HttpResponse> {
    let now = clock.now();
    let poll = published_poll(store.get_ref(), &id, now).await?;
    if !poll.can_vote(now) {
        return Err(PollError::VotingClosed);
    }
    let choices = store.choices_for_poll(&poll.id).await?;
    Ok(Response::ok(
        PollDetail {
            poll: PollSummary::from_poll(&poll, now),
            choices,
        },
        StatusCode::OK,
    ))
}

#[actix_web::get("/{id}/results")]
pub async fn get_results(
    id: Path<String>,
    store: Data<dyn Store>,
    clock: Data<dyn Clock>,
) -> PollResult<HttpResponse> {
    let poll = published_poll(store.get_ref(), &id, clock.now()).await?;
    let mut counted = Vec::new();
    for choice in store.choices_for_poll(&poll.id).await? {
        let votes = choice.vote_count(store.get_ref()).await?;
        counted.push((choice, votes));
    }
    Ok(Response::ok(PollResults::tally(&poll, counted), StatusCode::OK))
}

#[actix_web::post(
    "/{id}/vote",
    wrap = "actix_web::middleware::from_fn(crate::middlewares::authenticate::authenticate_user)"
)]
pub async fn cast_vote(
    id: Path<String>,
    identity: Identity,
    voting: Data<VotingService>,
    clock: Data<dyn Clock>,
    Json(req): Json<VoteRequest>,
) -> PollResult<HttpResponse> {
    let choice_id = req.choice_id.unwrap_or_default();
    let receipt = voting
        .cast_vote(&id, &identity.user_id, &choice_id, clock.now())
        .await?;
    Ok(Response::ok(receipt, StatusCode::OK))
}

pub fn init(cnf: &mut ServiceConfig) {
    cnf.service(latest_polls)
        .service(get_poll)
        .service(get_results)
        .service(cast_vote);
}
