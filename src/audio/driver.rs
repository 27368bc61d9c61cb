//! Orquestación de la reproducción por servidor.
//!
//! Cada guild pasa por `Idle -> Playing <-> Paused -> Idle`. Todas las
//! transiciones de una guild ocurren con su candado del [`QueueRegistry`]
//! tomado, así que `enqueue`, `advance` y `clear` nunca compiten entre sí.
//!
//! El fin de pista llega desde el hilo del transporte como un [`TrackEnded`]
//! por canal; [`DriverEvents::spawn`] lo procesa en una tarea supervisada que
//! registra y reporta cualquier fallo en lugar de propagarlo.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    audio::{
        queue::{GuildQueue, PlayableItem, Requester},
        registry::QueueRegistry,
        transport::{AudioTransport, CompletionSignal, TrackControl, TrackEnded},
    },
    error::{MusicError, StateError},
    sources::SongResolver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Avisos que el driver emite hacia el canal de texto de la guild.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NowPlaying { item: PlayableItem, remaining: usize },
    QueueFinished,
    PlaybackFailed { title: Option<String>, reason: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel_id: ChannelId, notice: Notice);
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// La guild estaba inactiva y empezó a sonar.
    Started,
    /// Quedó en espera en esta posición (desde 1).
    Queued { position: usize },
}

/// Vista de solo lectura de una guild para `queue` y `np`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub state: PlaybackState,
    pub current: Option<PlayableItem>,
    pub pending: Vec<PlayableItem>,
}

/// Estado de reproducción de una guild.
#[derive(Default)]
pub struct GuildPlayer {
    queue: GuildQueue,
    state: PlaybackState,
    track: Option<Box<dyn TrackControl>>,
    attempt: u64,
    channel_id: Option<ChannelId>,
}

impl GuildPlayer {
    /// Vuelve a `Idle` descartando la canción actual; los pendientes se conservan.
    fn halt(&mut self) -> Option<PlayableItem> {
        self.state = PlaybackState::Idle;
        self.track = None;
        self.queue.take_current()
    }
}

enum Advance {
    Started { item: PlayableItem, remaining: usize },
    Finished,
    Failed { title: Option<String>, reason: String },
}

pub struct PlaybackDriver {
    players: QueueRegistry<GuildPlayer>,
    resolver: Arc<dyn SongResolver>,
    transport: Arc<dyn AudioTransport>,
    notifier: Arc<dyn Notifier>,
    events: UnboundedSender<TrackEnded>,
}

/// Receptor de fines de pista; se consume con [`DriverEvents::spawn`].
pub struct DriverEvents {
    rx: UnboundedReceiver<TrackEnded>,
}

impl PlaybackDriver {
    pub fn new(
        resolver: Arc<dyn SongResolver>,
        transport: Arc<dyn AudioTransport>,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<Self>, DriverEvents) {
        let (events, rx) = mpsc::unbounded_channel();
        let driver = Arc::new(Self {
            players: QueueRegistry::new(),
            resolver,
            transport,
            notifier,
            events,
        });
        (driver, DriverEvents { rx })
    }

    /// Resuelve la consulta y la agrega a la cola.
    ///
    /// La resolución se hace sin tomar el candado de la guild; si falla, la
    /// cola no cambia.
    pub async fn play(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        query: &str,
        requester: Requester,
    ) -> Result<(PlayableItem, EnqueueOutcome), MusicError> {
        let item = self.resolver.resolve(query, requester).await?;
        let outcome = self.enqueue(guild_id, channel_id, item.clone()).await?;
        Ok((item, outcome))
    }

    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        item: PlayableItem,
    ) -> Result<EnqueueOutcome, MusicError> {
        let player = self.players.get_or_create(guild_id);
        let advance = {
            let mut player = player.lock().await;
            player.channel_id = Some(channel_id);
            player.queue.enqueue(item);

            if player.state != PlaybackState::Idle {
                return Ok(EnqueueOutcome::Queued {
                    position: player.queue.len(),
                });
            }

            self.start_next(guild_id, &mut player).await?
        };

        self.announce(channel_id, advance).await;
        Ok(EnqueueOutcome::Started)
    }

    pub async fn pause(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        let player = self.players.get_or_create(guild_id);
        let mut player = player.lock().await;
        player.channel_id = Some(channel_id);

        if player.state != PlaybackState::Playing {
            return Err(StateError::NotPlaying.into());
        }
        if let Some(track) = &player.track {
            track.pause()?;
        }
        player.state = PlaybackState::Paused;
        info!("⏸️ Reproducción pausada en guild {}", guild_id);
        Ok(())
    }

    pub async fn resume(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        let player = self.players.get_or_create(guild_id);
        let mut player = player.lock().await;
        player.channel_id = Some(channel_id);

        if player.state != PlaybackState::Paused {
            return Err(StateError::NotPaused.into());
        }
        if let Some(track) = &player.track {
            track.resume()?;
        }
        player.state = PlaybackState::Playing;
        info!("▶️ Reproducción reanudada en guild {}", guild_id);
        Ok(())
    }

    /// Detiene la pista actual; el avance ocurre al procesar su fin.
    pub async fn skip(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), MusicError> {
        let player = self.players.get_or_create(guild_id);
        let mut player = player.lock().await;
        player.channel_id = Some(channel_id);

        if player.state != PlaybackState::Playing {
            return Err(StateError::NotPlaying.into());
        }
        if let Some(track) = &player.track {
            track.stop()?;
        }
        info!("⏭️ Saltando canción en guild {}", guild_id);
        Ok(())
    }

    /// Limpia la cola y detiene el transporte. Devuelve si algo estaba sonando.
    pub async fn stop(&self, guild_id: GuildId) -> bool {
        let Some(player) = self.players.get(guild_id) else {
            return false;
        };
        let mut player = player.lock().await;

        let was_active = player.state != PlaybackState::Idle;
        player.queue.clear();
        player.state = PlaybackState::Idle;

        if let Some(track) = player.track.take() {
            // Best effort: el aviso de fin que genere queda obsoleto
            if let Err(e) = track.stop() {
                warn!("⚠️ Error al detener la pista en guild {}: {}", guild_id, e);
            }
        }

        info!("⏹️ Reproducción detenida en guild {}", guild_id);
        was_active
    }

    /// Deja la guild en `Idle` conservando los pendientes.
    pub async fn halt(&self, guild_id: GuildId) {
        if let Some(player) = self.players.get(guild_id) {
            if let Some(item) = player.lock().await.halt() {
                warn!("🛑 Reproducción detenida en guild {} tras fallo con: {}", guild_id, item.title);
            }
        }
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        match self.players.get(guild_id) {
            Some(player) => {
                let player = player.lock().await;
                QueueSnapshot {
                    state: player.state,
                    current: player.queue.current().cloned(),
                    pending: player.queue.pending().cloned().collect(),
                }
            }
            None => QueueSnapshot {
                state: PlaybackState::Idle,
                current: None,
                pending: Vec::new(),
            },
        }
    }

    /// Procesa el fin de un intento: avanza la cola y reproduce la siguiente.
    ///
    /// Si la pista terminó con error, la guild queda en `Idle` conservando los
    /// pendientes y se avisa del fallo. Los avisos de intentos viejos (o
    /// posteriores a `stop`) se ignoran.
    pub async fn handle_event(&self, event: TrackEnded) -> Result<(), MusicError> {
        let Some(player) = self.players.get(event.guild_id) else {
            return Ok(());
        };

        let (channel_id, advance) = {
            let mut player = player.lock().await;

            if player.state == PlaybackState::Idle || player.attempt != event.attempt {
                debug!(
                    "Fin de pista obsoleto en guild {} (intento {}, actual {})",
                    event.guild_id, event.attempt, player.attempt
                );
                return Ok(());
            }

            let advance = match event.error {
                // El stream falló a mitad de la pista: se detiene la guild sin avanzar
                Some(reason) => {
                    let title = player.halt().map(|item| item.title);
                    error!(
                        "❌ Error de reproducción en guild {} ({}): {}",
                        event.guild_id,
                        title.as_deref().unwrap_or("?"),
                        reason
                    );
                    Advance::Failed { title, reason }
                }
                None => {
                    info!(
                        "✅ Terminó: {}",
                        player.queue.current().map(|c| c.title.as_str()).unwrap_or("?")
                    );
                    player.track = None;
                    self.start_next(event.guild_id, &mut player).await?
                }
            };
            (player.channel_id, advance)
        };

        if let Some(channel_id) = channel_id {
            self.announce(channel_id, advance).await;
        }
        Ok(())
    }

    /// Reporta un fallo al último canal de texto usado en la guild.
    pub async fn report_failure(&self, guild_id: GuildId, title: Option<String>, err: &MusicError) {
        let channel_id = match self.players.get(guild_id) {
            Some(player) => player.lock().await.channel_id,
            None => None,
        };

        if let Some(channel_id) = channel_id {
            self.notifier
                .notify(
                    channel_id,
                    Notice::PlaybackFailed {
                        title,
                        reason: err.to_string(),
                    },
                )
                .await;
        }
    }

    /// Avanza la cola y arranca el transporte con una URL de stream recién obtenida.
    ///
    /// Si la renovación o el transporte fallan, la guild queda en `Idle` sin
    /// canción actual y sin reintentos.
    async fn start_next(&self, guild_id: GuildId, player: &mut GuildPlayer) -> Result<Advance, MusicError> {
        let Some(item) = player.queue.advance() else {
            player.state = PlaybackState::Idle;
            player.track = None;
            info!("📭 Cola terminada en guild {}", guild_id);
            return Ok(Advance::Finished);
        };

        player.attempt += 1;
        let signal = CompletionSignal::new(guild_id, player.attempt, self.events.clone());

        debug!("🔄 Renovando URL de stream para: {}", item.title);
        let started = match self.resolver.refresh_locator(&item.url).await {
            Ok(stream_url) => self.transport.play(guild_id, &stream_url, signal).await,
            Err(e) => Err(e),
        };

        match started {
            Ok(track) => {
                player.track = Some(track);
                player.state = PlaybackState::Playing;
                info!("🎵 Reproduciendo: {} en guild {}", item.title, guild_id);
                Ok(Advance::Started {
                    remaining: player.queue.len(),
                    item,
                })
            }
            Err(e) => {
                player.halt();
                error!("❌ No se pudo reproducir {}: {}", item.title, e);
                Err(e)
            }
        }
    }

    async fn announce(&self, channel_id: ChannelId, advance: Advance) {
        let notice = match advance {
            Advance::Started { item, remaining } => Notice::NowPlaying { item, remaining },
            Advance::Finished => Notice::QueueFinished,
            Advance::Failed { title, reason } => Notice::PlaybackFailed {
                title,
                reason: MusicError::Transport(reason).to_string(),
            },
        };
        self.notifier.notify(channel_id, notice).await;
    }
}

impl DriverEvents {
    pub async fn next(&mut self) -> Option<TrackEnded> {
        self.rx.recv().await
    }

    /// Bucle de eventos: cada fin de pista se procesa en su propia tarea para
    /// que una guild lenta no retrase a las demás.
    pub fn spawn(mut self, driver: Arc<PlaybackDriver>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = self.next().await {
                let driver = driver.clone();
                tokio::spawn(async move {
                    let guild_id = event.guild_id;
                    let worker = driver.clone();
                    let result = tokio::spawn(async move { worker.handle_event(event).await }).await;

                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            error!("❌ Error al reproducir siguiente canción en guild {}: {}", guild_id, e);
                            driver.report_failure(guild_id, None, &e).await;
                        }
                        Err(join_error) => {
                            error!("💥 Fallo inesperado procesando fin de pista en guild {}: {}", guild_id, join_error);
                            driver.halt(guild_id).await;
                        }
                    }
                });
            }
            info!("🔚 Bucle de eventos de reproducción finalizado");
        })
    }
}
