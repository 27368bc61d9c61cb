//! Puente con el transporte de audio externo (songbird).
//!
//! El transporte avisa el fin de cada pista desde su propio hilo de eventos.
//! Ese aviso solo se entrega como mensaje al bucle del driver mediante
//! [`CompletionSignal`]; nunca toca la cola directamente.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::error::MusicError;

/// Fin de un intento de reproducción, tal como llega al bucle del driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEnded {
    pub guild_id: GuildId,
    pub attempt: u64,
    pub error: Option<String>,
}

/// Aviso de fin de pista que se dispara como mucho una vez por intento.
///
/// `fire` solo encola el mensaje (no espera a que se procese), así que es
/// seguro llamarlo desde el contexto del transporte.
#[derive(Clone)]
pub struct CompletionSignal {
    guild_id: GuildId,
    attempt: u64,
    tx: Arc<Mutex<Option<UnboundedSender<TrackEnded>>>>,
}

impl CompletionSignal {
    pub fn new(guild_id: GuildId, attempt: u64, tx: UnboundedSender<TrackEnded>) -> Self {
        Self {
            guild_id,
            attempt,
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Devuelve `true` si este fue el aviso aceptado.
    pub fn fire(&self, error: Option<String>) -> bool {
        let Some(tx) = self.tx.lock().take() else {
            return false;
        };

        let event = TrackEnded {
            guild_id: self.guild_id,
            attempt: self.attempt,
            error,
        };

        if tx.send(event).is_err() {
            warn!(
                "⚠️ Bucle del driver cerrado, se pierde el fin de pista en guild {}",
                self.guild_id
            );
            return false;
        }

        true
    }

    pub fn is_fired(&self) -> bool {
        self.tx.lock().is_none()
    }
}

/// Control de una pista en curso.
pub trait TrackControl: Send + Sync {
    fn pause(&self) -> Result<(), MusicError>;
    fn resume(&self) -> Result<(), MusicError>;
    /// Detener también produce el aviso de fin de la pista.
    fn stop(&self) -> Result<(), MusicError>;
}

#[async_trait]
pub trait AudioTransport: Send + Sync {
    /// Empieza a transmitir `stream_url` en la llamada de voz de la guild.
    async fn play(
        &self,
        guild_id: GuildId,
        stream_url: &str,
        on_end: CompletionSignal,
    ) -> Result<Box<dyn TrackControl>, MusicError>;
}

impl TrackControl for TrackHandle {
    fn pause(&self) -> Result<(), MusicError> {
        TrackHandle::pause(self).map_err(|e| MusicError::Transport(e.to_string()))
    }

    fn resume(&self) -> Result<(), MusicError> {
        TrackHandle::play(self).map_err(|e| MusicError::Transport(e.to_string()))
    }

    fn stop(&self) -> Result<(), MusicError> {
        TrackHandle::stop(self).map_err(|e| MusicError::Transport(e.to_string()))
    }
}

/// Transporte sobre las llamadas de voz de songbird.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    volume: f32,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, volume: f32) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            volume,
        }
    }
}

#[async_trait]
impl AudioTransport for SongbirdTransport {
    async fn play(
        &self,
        guild_id: GuildId,
        stream_url: &str,
        on_end: CompletionSignal,
    ) -> Result<Box<dyn TrackControl>, MusicError> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or_else(|| MusicError::Transport("el bot no está conectado a voz".to_string()))?;

        let input = Input::from(HttpRequest::new(self.http.clone(), stream_url.to_string()));

        let handle = {
            let mut call = call.lock().await;
            call.play_input(input)
        };

        if let Err(e) = handle.set_volume(self.volume) {
            warn!("⚠️ No se pudo ajustar el volumen: {}", e);
        }

        watch_completion(&handle, |event| {
            handle
                .add_event(
                    Event::Track(event),
                    CompletionForwarder {
                        signal: on_end.clone(),
                    },
                )
                .map_err(|e| MusicError::Transport(format!("no se pudo registrar el evento: {}", e)))
        })?;

        info!(
            "🔊 Stream iniciado en guild {} (intento {})",
            guild_id,
            on_end.attempt()
        );
        Ok(Box::new(handle))
    }
}

/// Registra los avisos de fin y de error de la pista.
///
/// Si alguno no se puede registrar, la pista se detiene antes de devolver el
/// error: sin aviso de fin nadie más la detendría.
fn watch_completion<T: TrackControl + ?Sized>(
    track: &T,
    mut register: impl FnMut(TrackEvent) -> Result<(), MusicError>,
) -> Result<(), MusicError> {
    for event in [TrackEvent::End, TrackEvent::Error] {
        if let Err(e) = register(event) {
            if let Err(stop_err) = track.stop() {
                warn!("⚠️ No se pudo detener la pista sin avisos: {}", stop_err);
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Reenvía el fin (o error) de la pista al bucle del driver.
struct CompletionForwarder {
    signal: CompletionSignal,
}

#[async_trait]
impl VoiceEventHandler for CompletionForwarder {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(e.to_string()),
                _ => None,
            }),
            _ => None,
        };

        if let Some(e) = &error {
            error!("❌ Error en la pista: {}", e);
        }

        if self.signal.fire(error) {
            debug!("📨 Fin de pista entregado (intento {})", self.signal.attempt());
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn signal_fires_exactly_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let signal = CompletionSignal::new(GuildId::new(1), 3, tx);
        let copy = signal.clone();

        assert!(signal.fire(None));
        assert!(!copy.fire(Some("late".to_string())));
        assert!(copy.is_fired());

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            TrackEnded {
                guild_id: GuildId::new(1),
                attempt: 3,
                error: None,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[derive(Default)]
    struct CountingTrack {
        stops: std::sync::atomic::AtomicUsize,
    }

    impl TrackControl for CountingTrack {
        fn pause(&self) -> Result<(), MusicError> {
            Ok(())
        }

        fn resume(&self) -> Result<(), MusicError> {
            Ok(())
        }

        fn stop(&self) -> Result<(), MusicError> {
            self.stops.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn failed_registration_stops_the_track() {
        let track = CountingTrack::default();
        let mut calls = 0;

        let result = watch_completion(&track, |_| {
            calls += 1;
            if calls == 2 {
                Err(MusicError::Transport("driver cerrado".to_string()))
            } else {
                Ok(())
            }
        });

        assert!(matches!(result, Err(MusicError::Transport(_))));
        assert_eq!(track.stops.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn successful_registration_keeps_playing() {
        let track = CountingTrack::default();
        let mut registered = 0;

        watch_completion(&track, |_| {
            registered += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(registered, 2);
        assert_eq!(track.stops.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn signal_reports_closed_loop() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let signal = CompletionSignal::new(GuildId::new(1), 1, tx);

        assert!(!signal.fire(None));
    }
}
