//! Stimulus/response game core shared by every reaction-style variant.
//!
//! The pure [`state_machine::ReactionMachine`] decides transitions and emits
//! effects; [`game::ReactionGame`] owns one machine on a tokio task and
//! performs those effects (timer, submission, view updates).

pub mod game;
pub mod labels;
pub mod prefs;
pub mod session;
pub mod state_machine;
pub mod submit;
pub mod timer;
pub mod variant;
