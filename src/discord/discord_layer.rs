// Discord layer - event handlers and the serenity adapter.

#[path = "polls/mod.rs"]
pub mod polls;

use crate::core::polls::PollRouter;
use std::sync::Arc;

/// Shared state handed to every event handler.
pub struct Data {
    pub polls: Arc<PollRouter<polls::SerenityPlatform>>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
