//! # Bot Module
//!
//! Discord side of the bot: prefix text commands, voice connections and
//! gateway events.
//!
//! ## Architecture
//!
//! [`MusicBot`] implements Serenity's [`EventHandler`]. It owns:
//!
//! - The [`PlaybackDriver`] that keeps every guild's queue and playback state
//! - The [`Songbird`] manager used to join and leave voice channels
//!
//! Message parsing lives in [`commands`]; one handler per command lives in
//! [`handlers`].

use anyhow::Result;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Message, Ready, VoiceState},
    async_trait,
};
use songbird::Songbird;
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::driver::PlaybackDriver,
    config::Config,
    error::{MusicError, StateError},
};

/// Main Discord bot handler.
pub struct MusicBot {
    /// Bot configuration loaded from environment variables
    pub config: Arc<Config>,
    /// Per-guild queues and playback
    pub driver: Arc<PlaybackDriver>,
    /// Voice connection manager
    songbird: Arc<Songbird>,
}

impl MusicBot {
    pub fn new(config: Config, driver: Arc<PlaybackDriver>, songbird: Arc<Songbird>) -> Self {
        Self {
            config: Arc::new(config),
            driver,
            songbird,
        }
    }

    /// Connects the bot to a voice channel, moving it if it is already
    /// connected elsewhere in the guild.
    ///
    /// # Required Permissions
    ///
    /// - `Connect` - To join the voice channel
    /// - `Speak` - To play audio in the channel
    pub async fn join_voice_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        match self.songbird.join(guild_id, channel_id).await {
            Ok(_call) => {
                info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
                Ok(())
            }
            Err(e) => {
                error!("Error al conectar al canal de voz: {:?}", e);
                Err(join_failure(e).into())
            }
        }
    }

    /// Disconnects the bot from the guild's voice channel.
    pub async fn leave_voice_channel(&self, guild_id: GuildId) -> Result<()> {
        self.songbird.remove(guild_id).await?;
        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }

    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.songbird.get(guild_id).is_some()
    }

    /// Falla con `NotConnected` si el bot no tiene llamada de voz en la guild.
    pub fn ensure_connected(&self, guild_id: GuildId) -> Result<(), StateError> {
        if self.is_connected(guild_id) {
            Ok(())
        } else {
            Err(StateError::NotConnected)
        }
    }
}

#[async_trait]
impl EventHandler for MusicBot {
    /// Called when the bot is connected to Discord.
    ///
    /// Logs connection info and checks the external media tools. A missing
    /// tool only produces a warning.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        let config = self.config.clone();
        tokio::spawn(async move {
            check_dependencies(&config).await;
        });
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = handlers::handle_message(&ctx, &msg, self).await {
            error!("Error manejando comando: {:?}", e);
        }
    }

    /// Clears the guild when the bot is disconnected from voice externally.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.driver.stop(guild_id).await;
        }
    }
}

/// Error de conexión a voz tal como se le muestra al usuario.
fn join_failure(cause: impl std::fmt::Display) -> MusicError {
    MusicError::Transport(format!("no se pudo conectar al canal de voz ({})", cause))
}

/// Verifica que ffmpeg y yt-dlp respondan; solo advierte si faltan.
async fn check_dependencies(config: &Config) {
    info!("🔧 Verificando herramientas externas...");

    for (tool, flag) in [
        (config.ffmpeg_path.as_str(), "-version"),
        (config.ytdlp_path.as_str(), "--version"),
    ] {
        match async_process::Command::new(tool).arg(flag).output().await {
            Ok(output) if output.status.success() => info!("✅ {} encontrado", tool),
            Ok(output) => warn!(
                "⚠️ {} respondió con error: {}",
                tool,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("⚠️ {} no encontrado ({}). Instálalo para reproducir audio.", tool, e),
        }
    }
}
