use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

/// Usuario que pidió la canción.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
}

impl Requester {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Canción resuelta lista para la cola.
///
/// `stream_url` solo es válida en el momento de la resolución; antes de
/// reproducir se vuelve a resolver a partir de `url`, que es estable.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayableItem {
    pub stream_url: String,
    pub url: String,
    pub title: String,
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub requested_by: Requester,
    pub added_at: DateTime<Utc>,
}

impl PlayableItem {
    pub fn new(
        stream_url: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        requested_by: Requester,
    ) -> Self {
        Self {
            stream_url: stream_url.into(),
            url: url.into(),
            title: title.into(),
            duration: None,
            thumbnail: None,
            requested_by,
            added_at: Utc::now(),
        }
    }

    /// Normaliza a segundos enteros; una duración de cero se trata como desconocida.
    pub fn with_duration_secs(mut self, seconds: f64) -> Self {
        let whole = seconds.max(0.0) as u64;
        self.duration = (whole > 0).then(|| Duration::from_secs(whole));
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail).filter(|t| !t.is_empty());
        self
    }

    pub fn duration_label(&self) -> String {
        crate::sources::format_duration(self.duration)
    }
}

/// Cola FIFO de un servidor más la canción actual.
///
/// La canción actual nunca está a la vez en `pending`.
#[derive(Debug, Default)]
pub struct GuildQueue {
    pending: VecDeque<PlayableItem>,
    current: Option<PlayableItem>,
}

impl GuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega al final de la cola
    pub fn enqueue(&mut self, item: PlayableItem) {
        info!("➕ Agregado a la cola: {}", item.title);
        self.pending.push_back(item);
    }

    /// Pasa el primer pendiente a actual. Con la cola vacía, limpia la actual.
    pub fn advance(&mut self) -> Option<PlayableItem> {
        self.current = self.pending.pop_front();
        match &self.current {
            Some(item) => debug!("➡️ Siguiente en cola: {}", item.title),
            None => debug!("📭 Cola vacía, no hay siguiente canción"),
        }
        self.current.clone()
    }

    /// Vacía la cola y olvida la actual. No detiene el audio en curso.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
        info!("🗑️ Cola limpiada");
    }

    /// Descarta la canción actual sin tocar los pendientes.
    pub fn take_current(&mut self) -> Option<PlayableItem> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&PlayableItem> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> impl ExactSizeIterator<Item = &PlayableItem> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.current.is_none()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn item(title: &str) -> PlayableItem {
        PlayableItem::new(
            format!("https://stream.example/{title}"),
            format!("https://youtube.com/watch?v={title}"),
            title,
            Requester::new(UserId::new(42), "tester"),
        )
    }

    fn titles<'a>(items: impl Iterator<Item = &'a PlayableItem>) -> Vec<&'a str> {
        items.map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn advance_is_fifo_and_exhausts_once() {
        let mut queue = GuildQueue::new();
        for title in ["a", "b", "c"] {
            queue.enqueue(item(title));
        }

        let mut played = Vec::new();
        while let Some(next) = queue.advance() {
            assert_eq!(queue.current().map(|c| c.title.as_str()), Some(next.title.as_str()));
            played.push(next.title);
        }

        assert_eq!(played, vec!["a", "b", "c"]);
        assert!(queue.current().is_none());
        assert!(queue.advance().is_none());
        assert!(queue.advance().is_none());

        queue.enqueue(item("d"));
        assert_eq!(queue.advance().map(|i| i.title), Some("d".to_string()));
    }

    #[test]
    fn current_is_never_pending() {
        let mut queue = GuildQueue::new();
        queue.enqueue(item("a"));
        queue.enqueue(item("b"));
        queue.advance();

        assert_eq!(queue.current().map(|c| c.title.as_str()), Some("a"));
        assert_eq!(titles(queue.pending()), vec!["b"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn clear_then_advance_returns_none() {
        let mut queue = GuildQueue::new();
        queue.enqueue(item("a"));
        queue.enqueue(item("b"));
        queue.advance();
        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.advance().is_none());
    }

    #[test]
    fn take_current_keeps_pending() {
        let mut queue = GuildQueue::new();
        queue.enqueue(item("a"));
        queue.enqueue(item("b"));
        queue.advance();

        assert_eq!(queue.take_current().map(|i| i.title), Some("a".to_string()));
        assert!(queue.current().is_none());
        assert_eq!(titles(queue.pending()), vec!["b"]);
    }

    #[test]
    fn duration_is_truncated_to_whole_seconds() {
        let song = item("a").with_duration_secs(212.9);
        assert_eq!(song.duration, Some(Duration::from_secs(212)));
        assert_eq!(song.duration_label(), "3:32");

        let unknown = item("b").with_duration_secs(0.4);
        assert_eq!(unknown.duration, None);
        assert_eq!(unknown.duration_label(), "Unknown");
    }
}
