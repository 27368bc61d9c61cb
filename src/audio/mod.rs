//! # Audio Module
//!
//! Per-guild playback for the bot.
//!
//! ## Architecture
//!
//! ### [`queue`] - Guild Queue
//! - FIFO of pending songs plus the one currently playing
//!
//! ### [`registry`] - Queue Registry
//! - Lazily created per-guild state, one lock per guild
//!
//! ### [`driver`] - Playback Driver
//! - `Idle` / `Playing` / `Paused` state machine
//! - Refreshes the stream URL right before every song
//! - Turns transport completion signals into queue advances
//!
//! ### [`transport`] - Audio Transport
//! - Songbird-backed streaming and the fire-once completion signal
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # async fn example(driver: std::sync::Arc<PlaybackDriver>, guild_id: GuildId, channel_id: ChannelId, requester: Requester) -> Result<(), MusicError> {
//! let (song, outcome) = driver.play(guild_id, channel_id, "never gonna give you up", requester).await?;
//!
//! driver.pause(guild_id, channel_id).await?;
//! driver.resume(guild_id, channel_id).await?;
//! driver.skip(guild_id, channel_id).await?;
//! driver.stop(guild_id).await;
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod queue;
pub mod registry;
pub mod transport;
