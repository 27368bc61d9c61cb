use anyhow::Result;
use serenity::{http::Http, model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::{driver::PlaybackDriver, transport::SongbirdTransport};
use crate::bot::MusicBot;
use crate::config::Config;
use crate::sources::YtDlpResolver;
use crate::ui::notifier::ChannelNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_music_queue=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Open Music Queue v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración (falla si no hay token)
    let config = Config::load()?;
    info!("{}", config.summary());

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // Componentes de reproducción
    let songbird = Songbird::serenity();
    let http = Arc::new(Http::new(&config.discord_token));

    let resolver = Arc::new(YtDlpResolver::new(&config));
    let transport = Arc::new(SongbirdTransport::new(songbird.clone(), config.default_volume));
    let notifier = Arc::new(ChannelNotifier::new(http));

    let (driver, events) = PlaybackDriver::new(resolver, transport, notifier);
    events.spawn(driver.clone());
    info!("🎶 Driver de reproducción listo");

    // Crear handler del bot
    let handler = MusicBot::new(config.clone(), driver, songbird.clone());

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️ Señal de shutdown recibida, cerrando...");
                shard_manager.shutdown_all().await;
            }
            Err(e) => error!("Error al registrar Ctrl+C: {:?}", e),
        }
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
