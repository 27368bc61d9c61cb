use anyhow::Result;
use serenity::{
    builder::{CreateEmbed, CreateMessage},
    model::{
        channel::Message,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::{Context, Mentionable},
};
use tracing::{debug, info};

use crate::{
    audio::{driver::EnqueueOutcome, queue::Requester},
    bot::{
        commands::{Command, ParseError},
        MusicBot,
    },
    error::{MusicError, StateError},
    ui::embeds,
};

/// Interpreta y ejecuta un comando de texto.
///
/// Los [`MusicError`] se responden al usuario como un único mensaje; el resto
/// de errores se propaga para que se registre.
pub async fn handle_message(ctx: &Context, msg: &Message, bot: &MusicBot) -> Result<()> {
    let prefix = bot.config.command_prefix.as_str();
    let Some(parsed) = Command::parse(&msg.content, prefix) else {
        return Ok(());
    };
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let command = match parsed {
        Ok(command) => command,
        Err(ParseError::Unknown(name)) => {
            debug!("Comando desconocido {}{} en guild {}", prefix, name, guild_id);
            return Ok(());
        }
        Err(ParseError::MissingQuery) => {
            reply(ctx, msg, format!("❌ Uso: `{}play <canción o URL>`", prefix)).await?;
            return Ok(());
        }
    };

    let name = command.name();
    info!(
        "📝 Comando {}{} usado por {} en guild {}",
        prefix, name, msg.author.name, guild_id
    );

    let result = match command {
        Command::Join => handle_join(ctx, msg, bot, guild_id).await,
        Command::Leave => handle_leave(ctx, msg, bot, guild_id).await,
        Command::Play(query) => handle_play(ctx, msg, bot, guild_id, &query).await,
        Command::Pause => handle_pause(ctx, msg, bot, guild_id).await,
        Command::Resume => handle_resume(ctx, msg, bot, guild_id).await,
        Command::Skip => handle_skip(ctx, msg, bot, guild_id).await,
        Command::Stop => handle_stop(ctx, msg, bot, guild_id).await,
        Command::Queue => handle_queue(ctx, msg, bot, guild_id).await,
        Command::NowPlaying => handle_nowplaying(ctx, msg, bot, guild_id).await,
        Command::Help => send_embed(ctx, msg, embeds::create_help_embed(prefix)).await,
    };

    match result {
        Err(e) => match rejection_message(&e) {
            Some(message) => {
                info!("🚫 {}{} rechazado en guild {}: {}", prefix, name, guild_id, e);
                reply(ctx, msg, message).await
            }
            None => Err(e),
        },
        ok => ok,
    }
}

/// Respuesta para el usuario si el error es de dominio; `None` si solo se registra.
fn rejection_message(error: &anyhow::Error) -> Option<String> {
    error
        .downcast_ref::<MusicError>()
        .map(|music_error| format!("❌ {}", music_error))
}

// Handlers específicos para cada comando

async fn handle_join(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    let voice_channel_id = get_user_voice_channel(ctx, guild_id, msg.author.id)?;
    let was_connected = bot.is_connected(guild_id);

    bot.join_voice_channel(guild_id, voice_channel_id).await?;

    let verb = if was_connected { "Movido a" } else { "Conectado a" };
    reply(ctx, msg, format!("✅ {} {}", verb, voice_channel_id.mention())).await
}

async fn handle_leave(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    bot.ensure_connected(guild_id).map_err(MusicError::from)?;

    bot.driver.stop(guild_id).await;
    bot.leave_voice_channel(guild_id).await?;

    reply(ctx, msg, "👋 Desconectado del canal de voz").await
}

async fn handle_play(
    ctx: &Context,
    msg: &Message,
    bot: &MusicBot,
    guild_id: GuildId,
    query: &str,
) -> Result<()> {
    // Se valida antes de tocar la cola
    let voice_channel_id = get_user_voice_channel(ctx, guild_id, msg.author.id)?;

    if !bot.is_connected(guild_id) {
        bot.join_voice_channel(guild_id, voice_channel_id).await?;
    }

    let searching = msg
        .channel_id
        .say(&ctx.http, format!("🔍 Buscando: **{}**...", query))
        .await?;
    if let Err(e) = searching.react(&ctx.http, '⏳').await {
        debug!("No se pudo reaccionar al mensaje de búsqueda: {:?}", e);
    }

    let requester = Requester::new(msg.author.id, msg.author.name.clone());
    let result = bot.driver.play(guild_id, msg.channel_id, query, requester).await;

    if let Err(e) = searching.delete(&ctx.http).await {
        debug!("No se pudo borrar el mensaje de búsqueda: {:?}", e);
    }

    let (song, outcome) = result?;
    match outcome {
        // El driver ya anunció la canción en este canal
        EnqueueOutcome::Started => Ok(()),
        EnqueueOutcome::Queued { position } => {
            send_embed(ctx, msg, embeds::create_track_added_embed(&song, position)).await
        }
    }
}

async fn handle_pause(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    bot.ensure_connected(guild_id).map_err(MusicError::from)?;
    bot.driver.pause(guild_id, msg.channel_id).await?;
    reply(ctx, msg, "⏸️ Música pausada").await
}

async fn handle_resume(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    bot.ensure_connected(guild_id).map_err(MusicError::from)?;
    bot.driver.resume(guild_id, msg.channel_id).await?;
    reply(ctx, msg, "▶️ Música reanudada").await
}

async fn handle_skip(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    bot.ensure_connected(guild_id).map_err(MusicError::from)?;
    bot.driver.skip(guild_id, msg.channel_id).await?;
    reply(ctx, msg, "⏭️ Saltando canción...").await
}

async fn handle_stop(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    bot.ensure_connected(guild_id).map_err(MusicError::from)?;
    bot.driver.stop(guild_id).await;
    reply(ctx, msg, "⏹️ Música detenida y cola limpiada").await
}

async fn handle_queue(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    let snapshot = bot.driver.snapshot(guild_id).await;

    match embeds::create_queue_embed(&snapshot) {
        Some(embed) => send_embed(ctx, msg, embed).await,
        None => reply(ctx, msg, "📭 ¡La cola está vacía!").await,
    }
}

async fn handle_nowplaying(ctx: &Context, msg: &Message, bot: &MusicBot, guild_id: GuildId) -> Result<()> {
    let snapshot = bot.driver.snapshot(guild_id).await;
    let current = snapshot
        .current
        .ok_or(MusicError::State(StateError::NotPlaying))?;

    send_embed(
        ctx,
        msg,
        embeds::create_current_track_embed(&current, snapshot.pending.len()),
    )
    .await
}

// Funciones auxiliares

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Result<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| anyhow::anyhow!("Guild no encontrada en caché"))?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or(MusicError::Permission)?;

    Ok(channel_id)
}

async fn reply(ctx: &Context, msg: &Message, content: impl Into<String>) -> Result<()> {
    msg.channel_id.say(&ctx.http, content).await?;
    Ok(())
}

async fn send_embed(ctx: &Context, msg: &Message, embed: CreateEmbed) -> Result<()> {
    msg.channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_become_a_single_reply() {
        let err = anyhow::Error::from(MusicError::Transport("no se pudo conectar al canal de voz".into()));
        assert_eq!(
            rejection_message(&err).as_deref(),
            Some("❌ Error de reproducción: no se pudo conectar al canal de voz")
        );

        let err = anyhow::Error::from(MusicError::from(StateError::NotConnected));
        assert_eq!(
            rejection_message(&err).as_deref(),
            Some("❌ ¡El bot no está en un canal de voz!")
        );
    }

    #[test]
    fn other_errors_are_only_logged() {
        let err = anyhow::anyhow!("Guild no encontrada en caché");
        assert!(rejection_message(&err).is_none());
    }
}
