use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::audio::queue::GuildQueue;

/// Estado por servidor, creado en el primer acceso y vivo mientras dure el
/// proceso (no hay expulsión).
///
/// La creación usa la entrada de [`DashMap`], que inserta de forma atómica:
/// dos primeros accesos simultáneos a la misma guild obtienen la misma
/// instancia. El [`Mutex`] de cada entrada serializa las mutaciones de esa
/// guild; guilds distintas nunca comparten candado.
pub struct QueueRegistry<T = GuildQueue> {
    entries: DashMap<GuildId, Arc<Mutex<T>>>,
}

impl<T: Default> QueueRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Mutex<T>> {
        self.entries
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(T::default())))
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Mutex<T>>> {
        self.entries.get(&guild_id).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T: Default> Default for QueueRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
