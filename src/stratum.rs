use super::*;

mod authorize;
pub mod client;
mod error;
mod event;
mod message;
mod notify;
mod set_difficulty;
mod submit;

pub use {
    authorize::Authorize,
    client::Client,
    error::JsonRpcError,
    event::Event,
    message::{Id, Message},
    notify::Notify,
    set_difficulty::SetDifficulty,
    submit::Submit,
};
