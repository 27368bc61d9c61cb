//! # Errores de dominio
//!
//! Taxonomía de fallos del bot. Cada variante termina la operación que la
//! provocó y se muestra al usuario como un único mensaje; no hay reintentos.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusicError {
    /// Búsqueda o extracción fallida; la canción no se agrega a la cola.
    #[error("No se pudo resolver `{target}`: {cause}")]
    Resolution { target: String, cause: String },

    /// Fallo del stream de audio; la reproducción del servidor se detiene.
    #[error("Error de reproducción: {0}")]
    Transport(String),

    /// El usuario no está en un canal de voz.
    #[error("¡Debes estar en un canal de voz!")]
    Permission,

    /// Comando inválido para el estado actual.
    #[error(transparent)]
    State(#[from] StateError),
}

impl MusicError {
    pub fn resolution(target: impl Into<String>, cause: impl ToString) -> Self {
        Self::Resolution {
            target: target.into(),
            cause: cause.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("¡No hay música reproduciéndose!")]
    NotPlaying,
    #[error("¡La música no está pausada!")]
    NotPaused,
    #[error("¡El bot no está en un canal de voz!")]
    NotConnected,
}
