pub mod choice;
pub mod poll;
pub mod poll_api_model;
pub mod vote;
