use actix_web::{
    http::StatusCode,
    web::{self, Data, Json, Path, ServiceConfig},
    HttpResponse,
};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Deserialize;

use crate::{
    clock::Clock,
    db::{PollFilter, Store},
    error::{PollError, PollResult},
    middlewares::authenticate::Identity,
    models::{
        choice::Choice,
        poll::Poll,
        poll_api_model::{
            ChoiceRequest, NewPollRequest, PollDetail, PollPage, PollSummary, UpdatePollRequest,
        },
    },
    utils::json_responder::Response,
};

const MAX_PER_PAGE: u64 = 100;

#[derive(Deserialize)]
struct ListParams {
    search: Option<String>,
    /// Only polls published at or before this instant.
    published_before: Option<DateTime<Utc>>,
    page: Option<u64>,
    per_page: Option<u64>,
}

#[actix_web::get("/polls")]
pub async fn list_polls(
    store: Data<dyn Store>,
    web::Query(params): web::Query<ListParams>,
) -> PollResult<HttpResponse> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).clamp(1, MAX_PER_PAGE);
    let filter = PollFilter {
        published_by: params.published_before,
        search: params.search,
        skip: (page - 1).saturating_mul(per_page),
        limit: Some(per_page),
    };
    let polls = store.list_polls(&filter).await?;
    let total_polls = store.count_polls(&filter).await?;

    Ok(Response::ok(
        PollPage {
            polls,
            page,
            per_page,
            total_polls,
            total_pages: total_polls.div_ceil(per_page),
        },
        StatusCode::OK,
    ))
}

#[actix_web::post("/polls")]
pub async fn create_poll(
    identity: Identity,
    store: Data<dyn Store>,
    clock: Data<dyn Clock>,
    Json(req): Json<NewPollRequest>,
) -> PollResult<HttpResponse> {
    let now = clock.now();
    let poll = Poll::new(req.text, req.publish_at.unwrap_or(now), req.close_at);
    store.insert_poll(&poll).await?;

    let mut choices = Vec::with_capacity(req.choices.len());
    for ChoiceRequest { text } in req.choices {
        let choice = Choice::new(&poll.id, text);
        if let Err(e) = store.insert_choice(&choice).await {
            // drop the half-created poll and whatever choices made it in
            if let Err(cleanup) = store.delete_poll(&poll.id).await {
                error!("Error cleaning up poll {}: {:?}", poll.id, cleanup);
            }
            return Err(PollError::Storage(e));
        }
        choices.push(choice);
    }
    info!("{} created poll {}", identity.user_id, poll.id);

    Ok(Response::ok(
        PollDetail {
            poll: PollSummary::from_poll(&poll, now),
            choices,
        },
        StatusCode::CREATED,
    ))
}

#[actix_web::put("/polls/{id}")]
pub async fn update_poll(
    id: Path<String>,
    store: Data<dyn Store>,
    clock: Data<dyn Clock>,
    Json(req): Json<UpdatePollRequest>,
) -> PollResult<HttpResponse> {
    let mut poll = store.get_poll(&id).await?.ok_or(PollError::NotFound)?;
    if let Some(text) = req.text {
        poll.text = text;
    }
    if let Some(publish_at) = req.publish_at {
        poll.publish_at = publish_at;
    }
    if let Some(close_at) = req.close_at {
        poll.close_at = close_at;
    }
    if !store.update_poll(&poll).await? {
        return Err(PollError::NotFound);
    }
    Ok(Response::ok(
        PollSummary::from_poll(&poll, clock.now()),
        StatusCode::OK,
    ))
}

#[actix_web::delete("/polls/{id}")]
pub async fn delete_poll(
    id: Path<String>,
    identity: Identity,
    store: Data<dyn Store>,
) -> PollResult<HttpResponse> {
    if !store.delete_poll(&id).await? {
        return Err(PollError::NotFound);
    }
    info!("{} deleted poll {}", identity.user_id, id);
    Ok(Response::ok("Poll deleted!", StatusCode::OK))
}

#[actix_web::post("/polls/{id}/choices")]
pub async fn add_choice(
    id: Path<String>,
    store: Data<dyn Store>,
    Json(req): Json<ChoiceRequest>,
) -> PollResult<HttpResponse> {
    let poll = store.get_poll(&id).await?.ok_or(PollError::NotFound)?;
    let choice = Choice::new(&poll.id, req.text);
    store.insert_choice(&choice).await?;
    Ok(Response::ok(choice, StatusCode::CREATED))
}

#[actix_web::delete("/choices/{id}")]
pub async fn delete_choice(id: Path<String>, store: Data<dyn Store>) -> PollResult<HttpResponse> {
    if !store.delete_choice(&id).await? {
        return Err(PollError::NotFound);
    }
    Ok(Response::ok("Choice deleted!", StatusCode::OK))
}

pub fn init(cnf: &mut ServiceConfig) {
    cnf.service(list_polls)
        .service(create_poll)
        .service(update_poll)
        .service(delete_poll)
        .service(add_choice)
        .service(delete_choice);
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use chrono::{Duration, SecondsFormat};
    use serde_json::{json, Value};

    use crate::{
        db::Store,
        routes::{self, testing::TestState},
    };

    #[actix_web::test]
    async fn test_admin_routes_require_admin() {
        let state = TestState::new();
        let app = test::init_service(
            App::new()
                .configure(|cfg| state.register(cfg))
                .configure(routes::init),
        )
        .await;

        let req = test::TestRequest::get().uri("/admin/polls").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/admin/polls")
            .cookie(state.session("alice", false))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        let req = test::TestRequest::get()
            .uri("/admin/polls")
            .cookie(state.session("root", true))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    #[actix_web::test]
    async fn test_create_poll_with_choices() {
        let state = TestState::new();
        let app = test::init_service(
            App::new()
                .configure(|cfg| state.register(cfg))
                .configure(routes::init),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/admin/polls")
            .cookie(state.session("root", true))
            .set_json(json!({
                "text": "Best editor?",
                "choices": [{ "text": "vim" }, { "text": "emacs" }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: Value = test::read_body_json(resp).await;
        let poll_id = body["result"]["id"].as_str().unwrap();
        assert_eq!(body["result"]["can_vote"], true);

        let poll = state.store.get_poll(poll_id).await.unwrap().unwrap();
        assert_eq!(poll.publish_at, state.now());
        assert_eq!(poll.close_at, None);
        let choices = state.store.choices_for_poll(poll_id).await.unwrap();
        let texts: Vec<&str> = choices.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["vim", "emacs"]);
    }

    #[actix_web::test]
    async fn test_update_poll_window() {
        let state = TestState::new();
        let (poll, _) = state.seed_poll("Open", -Duration::days(1), None).await;
        let app = test::init_service(
            App::new()
                .configure(|cfg| state.register(cfg))
                .configure(routes::init),
        )
        .await;

        let close_at = state.now() - Duration::hours(1);
        let req = test::TestRequest::put()
            .uri(&format!("/admin/polls/{}", poll.id))
            .cookie(state.session("root", true))
            .set_json(json!({ "text": "Closed now", "close_at": close_at }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"]["text"], "Closed now");
        assert_eq!(body["result"]["can_vote"], false);

        let req = test::TestRequest::put()
            .uri(&format!("/admin/polls/{}", poll.id))
            .cookie(state.session("root", true))
            .set_json(json!({ "close_at": null }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"]["can_vote"], true);
        assert_eq!(body["result"]["text"], "Closed now");

        let req = test::TestRequest::put()
            .uri("/admin/polls/missing")
            .cookie(state.session("root", true))
            .set_json(json!({ "text": "Nope" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn test_delete_poll_cascades_to_votes() {
        let state = TestState::new();
        let (poll, choices) = state.seed_poll("Open", -Duration::days(1), None).await;
        state.store.upsert_vote("alice", &choices[0]).await.unwrap().unwrap();
        let app = test::init_service(
            App::new()
                .configure(|cfg| state.register(cfg))
                .configure(routes::init),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/polls/{}", poll.id))
            .cookie(state.session("root", true))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
        assert!(state.store.get_poll(&poll.id).await.unwrap().is_none());
        assert_eq!(state.store.count_votes(&choices[0].id).await.unwrap(), 0);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/polls/{}", poll.id))
            .cookie(state.session("root", true))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn test_manage_choices() {
        let state = TestState::new();
        let (poll, choices) = state.seed_poll("Open", -Duration::days(1), None).await;
        state.store.upsert_vote("alice", &choices[0]).await.unwrap().unwrap();
        let app = test::init_service(
            App::new()
                .configure(|cfg| state.register(cfg))
                .configure(routes::init),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/admin/polls/{}/choices", poll.id))
            .cookie(state.session("root", true))
            .set_json(json!({ "text": "Choice 4" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        assert_eq!(state.store.choices_for_poll(&poll.id).await.unwrap().len(), 4);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/choices/{}", choices[0].id))
            .cookie(state.session("root", true))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
        assert_eq!(state.store.count_votes(&choices[0].id).await.unwrap(), 0);
        assert_eq!(state.store.choices_for_poll(&poll.id).await.unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn test_list_polls_searches_and_paginates() {
        let state = TestState::new();
        for n in 1..=3 {
            state
                .seed_poll(&format!("Lunch option {}", n), -Duration::hours(n), None)
                .await;
        }
        state.seed_poll("Dinner", Duration::days(1), None).await;
        let app = test::init_service(
            App::new()
                .configure(|cfg| state.register(cfg))
                .configure(routes::init),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/polls?search=LUNCH&page=2&per_page=2")
            .cookie(state.session("root", true))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"]["total_polls"], 3);
        assert_eq!(body["result"]["total_pages"], 2);
        assert_eq!(body["result"]["polls"][0]["text"], "Lunch option 3");

        let req = test::TestRequest::get()
            .uri("/admin/polls")
            .cookie(state.session("root", true))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"]["total_polls"], 4);
        assert_eq!(body["result"]["polls"][0]["text"], "Dinner");

        let cutoff = state.now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let req = test::TestRequest::get()
            .uri(&format!("/admin/polls?published_before={}", cutoff))
            .cookie(state.session("root", true))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["result"]["total_polls"], 3);
        assert_eq!(body["result"]["polls"][0]["text"], "Lunch option 1");
    }

    #[actix_web::test]
    async fn test_list_polls_with_huge_paging_values() {
        let state = TestState::new();
        state.seed_poll("Open", -Duration::days(1), None).await;
        let app = test::init_service(
            App::new()
                .configure(|cfg| state.register(cfg))
                .configure(routes::init),
        )
        .await;

        for query in [
            "page=3&per_page=9223372036854775808",
            "page=18446744073709551615&per_page=18446744073709551615",
        ] {
            let req = test::TestRequest::get()
                .uri(&format!("/admin/polls?{}", query))
                .cookie(state.session("root", true))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 200, "{}", query);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["result"]["per_page"], 100);
            assert_eq!(body["result"]["total_polls"], 1);
            assert_eq!(body["result"]["total_pages"], 1);
            assert!(body["result"]["polls"].as_array().unwrap().is_empty());
        }
    }
}
