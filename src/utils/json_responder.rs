use actix_web::{http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub enum Status {
    Ok,
    Error,
}

/// Envelope for every JSON body the service returns.
#[derive(Serialize, Deserialize, Debug)]
pub struct Response<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> Response<T> {
    pub fn ok(result: T, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(Response {
            status: Status::Ok,
            result: Some(result),
            error: None,
        })
    }

    pub fn error(error: &str, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(Response::<T> {
            status: Status::Error,
            error: Some(error.to_string()),
            result: None,
        })
    }
}
