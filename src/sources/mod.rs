pub mod youtube;

use async_trait::async_trait;
use std::time::Duration;

use crate::{
    audio::queue::{PlayableItem, Requester},
    error::MusicError,
};

pub use youtube::YtDlpResolver;

/// Resolución de consultas a canciones reproducibles.
///
/// Ambas operaciones hacen E/S de red y pueden tardar; se ejecutan con un
/// límite de concurrencia propio de cada implementación.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SongResolver: Send + Sync {
    /// Texto libre (primer resultado de búsqueda) o URL directa.
    async fn resolve(&self, query: &str, requester: Requester) -> Result<PlayableItem, MusicError>;

    /// Obtiene una URL de stream nueva a partir de la URL estable de la canción.
    async fn refresh_locator(&self, url: &str) -> Result<String, MusicError>;
}

/// `m:ss` sin horas; sin duración conocida devuelve `Unknown`.
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration.map(|d| d.as_secs()) {
        Some(secs) if secs > 0 => format!("{}:{:02}", secs / 60, secs % 60),
        _ => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_minutes_and_padded_seconds() {
        assert_eq!(format_duration(Some(Duration::from_secs(5))), "0:05");
        assert_eq!(format_duration(Some(Duration::from_secs(61))), "1:01");
        assert_eq!(format_duration(Some(Duration::from_secs(3725))), "62:05");
    }

    #[test]
    fn missing_duration_is_unknown() {
        assert_eq!(format_duration(None), "Unknown");
        assert_eq!(format_duration(Some(Duration::ZERO)), "Unknown");
    }
}
