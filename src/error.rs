use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::utils::json_responder::Response;

pub type PollResult<T> = Result<T, PollError>;

/// Failures of the poll lifecycle. All but `Storage` are meant to be shown to the user.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Not found")]
    NotFound,

    #[error("Voting is not allowed for this question.")]
    VotingClosed,

    #[error("You didn't select a choice.")]
    InvalidChoice,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ResponseError for PollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PollError::NotFound => StatusCode::NOT_FOUND,
            PollError::VotingClosed => StatusCode::FORBIDDEN,
            PollError::InvalidChoice => StatusCode::BAD_REQUEST,
            PollError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            PollError::Storage(e) => {
                error!("Storage failure: {:?}", e);
                Response::<()>::error("Something went wrong!", self.status_code())
            }
            _ => Response::<()>::error(&self.to_string(), self.status_code()),
        }
    }
}
