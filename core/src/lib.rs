// Core of the Ask Anything front-end:
// - Answer payload shapes
// - Answer Service HTTP client
// - Query form state and the event loop driving it
// - Configuration loading
// - Shared error types

pub mod answer;
pub use answer::*;

pub mod client;
pub use client::{AnswerService, AskRequest, HttpAnswerClient};

pub mod config;
pub use config::AskConfig;

pub mod driver;
pub use driver::{FormClosed, FormDriver, FormHandle};

pub mod errors;
pub use errors::*;

pub mod form;
pub use form::{Effect, FormEvent, FormSnapshot, Phase, QueryForm, SubmitOutcome, Ticket};
