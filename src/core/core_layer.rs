// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "polls/mod.rs"]
pub mod polls;
