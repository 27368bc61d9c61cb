use async_trait::async_trait;
use serenity::{builder::CreateMessage, http::Http, model::id::ChannelId};
use std::sync::Arc;
use tracing::error;

use crate::{
    audio::driver::{Notice, Notifier},
    ui::embeds,
};

/// Publica los avisos del driver en el canal de texto de la guild.
pub struct ChannelNotifier {
    http: Arc<Http>,
}

impl ChannelNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, channel_id: ChannelId, notice: Notice) {
        let embed = match &notice {
            Notice::NowPlaying { item, remaining } => embeds::create_now_playing_embed(item, *remaining),
            Notice::QueueFinished => embeds::create_queue_finished_embed(),
            Notice::PlaybackFailed { title, reason } => {
                embeds::create_playback_error_embed(title.as_deref(), reason)
            }
        };

        if let Err(e) = channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await
        {
            error!("Error al enviar aviso al canal {}: {:?}", channel_id, e);
        }
    }
}
