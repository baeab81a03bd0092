pub mod json_responder;
pub mod jwt;
