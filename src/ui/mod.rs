//! Rendering of replies and channel notices.

pub mod embeds;
pub mod notifier;
