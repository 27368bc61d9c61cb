use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::audio::{driver::QueueSnapshot, queue::PlayableItem};

/// Canciones pendientes que se listan en `queue`
pub const QUEUE_PREVIEW_LIMIT: usize = 10;

/// Límite de Discord para el valor de un campo de embed
pub const FIELD_VALUE_LIMIT: usize = 1024;

const TITLE_LIMIT: usize = 60;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Open Music Bot";

/// Crea un embed para mostrar la canción que empieza a sonar
pub fn create_now_playing_embed(track: &PlayableItem, remaining: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", track.title))
        .url(&track.url)
        .color(colors::INFO_BLUE)
        .field("⏱️ Duración", track.duration_label(), true)
        .field("📝 En cola", format!("{} canciones", remaining), true)
        .field("👤 Solicitado por", track.requested_by.mention(), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Detalle de la canción actual para `np`
pub fn create_current_track_embed(track: &PlayableItem, remaining: usize) -> CreateEmbed {
    create_now_playing_embed(track, remaining)
        .title("🎵 Sonando")
        .field(
            "🕒 Agregada",
            track.added_at.format("%H:%M UTC").to_string(),
            true,
        )
}

/// Crea un embed para mostrar que se agregó una canción
pub fn create_track_added_embed(track: &PlayableItem, position: usize) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("➕ Agregada a la Cola")
        .description(format!("**{}**", track.title))
        .url(&track.url)
        .color(colors::SUCCESS_GREEN)
        .field("⏱️ Duración", track.duration_label(), true)
        .field("📍 Posición", format!("#{}", position), true)
        .field("👤 Solicitado por", track.requested_by.mention(), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed.footer(CreateEmbedFooter::new(
        "🎵 Se reproducirá automáticamente cuando llegue su turno",
    ))
}

/// Crea un embed para mostrar la cola de reproducción.
///
/// Devuelve `None` si no hay nada sonando ni pendiente.
pub fn create_queue_embed(snapshot: &QueueSnapshot) -> Option<CreateEmbed> {
    if snapshot.current.is_none() && snapshot.pending.is_empty() {
        return None;
    }

    let mut embed = CreateEmbed::default()
        .title("📜 Cola de Reproducción")
        .color(colors::MUSIC_PURPLE);

    if let Some(current) = &snapshot.current {
        embed = embed.field(
            "🎵 Reproduciendo",
            format!(
                "**{}**\n⏱️ Duración: {}\n👤 Por: {}",
                current.title,
                current.duration_label(),
                current.requested_by.mention()
            ),
            false,
        );
    }

    if let Some(listing) = queue_listing(&snapshot.pending) {
        embed = embed.field("📝 Próximas canciones", listing, false);
    }

    Some(embed.footer(CreateEmbedFooter::new(format!(
        "Total: {} canciones en cola",
        snapshot.pending.len()
    ))))
}

/// Lista numerada de los primeros pendientes con aviso de truncado.
///
/// El resultado nunca supera [`FIELD_VALUE_LIMIT`]; si las entradas no caben,
/// las que sobran se cuentan en el aviso.
pub fn queue_listing(pending: &[PlayableItem]) -> Option<String> {
    if pending.is_empty() {
        return None;
    }

    // Espacio reservado para el aviso de canciones restantes
    let budget = FIELD_VALUE_LIMIT - 40;

    let mut listing = String::new();
    let mut shown = 0;
    for (i, item) in pending.iter().take(QUEUE_PREVIEW_LIMIT).enumerate() {
        let entry = format!(
            "`{}.` **{}** - `{}`\n👤 {}\n",
            i + 1,
            shorten(&item.title, TITLE_LIMIT),
            item.duration_label(),
            item.requested_by.mention()
        );
        if listing.chars().count() + entry.chars().count() > budget {
            break;
        }
        listing.push_str(&entry);
        shown += 1;
    }

    if pending.len() > shown {
        listing.push_str(&format!("\n_...y {} canciones más_", pending.len() - shown));
    }

    Some(listing)
}

/// Recorta a `max` caracteres terminando en `…`.
fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}

pub fn create_queue_finished_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("✅ ¡Cola terminada!")
        .description("No quedan canciones pendientes")
        .color(colors::SUCCESS_GREEN)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

pub fn create_playback_error_embed(title: Option<&str>, reason: &str) -> CreateEmbed {
    let description = match title {
        Some(title) => format!("No se pudo reproducir **{}**\n{}", title, reason),
        None => reason.to_string(),
    };

    CreateEmbed::default()
        .title("❌ Error al reproducir")
        .description(description)
        .color(colors::ERROR_RED)
        .footer(CreateEmbedFooter::new(
            "La reproducción se detuvo; usa play para continuar",
        ))
}

/// Crea un embed de ayuda general
pub fn create_help_embed(prefix: &str) -> CreateEmbed {
    let line = |cmd: &str, help: &str| format!("• `{}{}` - {}\n", prefix, cmd, help);

    let playback = [
        line("play <canción>", "Busca y reproduce (o agrega a la cola)"),
        line("pause", "Pausa la reproducción"),
        line("resume", "Reanuda la reproducción"),
        line("skip", "Salta a la siguiente canción"),
        line("stop", "Detiene y limpia la cola"),
    ]
    .concat();

    let queue = [
        line("queue", "Muestra la cola"),
        line("np", "Muestra la canción actual"),
    ]
    .concat();

    let connection = [
        line("join", "Conecta a tu canal de voz"),
        line("leave", "Limpia la cola y desconecta"),
    ]
    .concat();

    CreateEmbed::default()
        .title("🎵 Open Music Bot - Comandos")
        .color(colors::INFO_BLUE)
        .field("🎵 Reproducción", playback, false)
        .field("📜 Cola", queue, false)
        .field("🔊 Conexión", connection, false)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{driver::PlaybackState, queue::tests::item};

    #[test]
    fn listing_is_numbered_with_duration_and_requester() {
        let pending = vec![item("a").with_duration_secs(75.0), item("b")];
        let listing = queue_listing(&pending).unwrap();

        assert!(listing.starts_with("`1.` **a** - `1:15`\n👤 <@42>\n"));
        assert!(listing.contains("`2.` **b** - `Unknown`"));
        assert!(!listing.contains("más"));
    }

    #[test]
    fn listing_truncates_after_ten() {
        let pending: Vec<_> = (0..13).map(|i| item(&format!("song{i}"))).collect();
        let listing = queue_listing(&pending).unwrap();

        assert!(listing.contains("`10.` **song9**"));
        assert!(!listing.contains("song10"));
        assert!(listing.ends_with("_...y 3 canciones más_"));
    }

    #[test]
    fn long_titles_fit_in_one_field() {
        let long = "x".repeat(300);
        let pending: Vec<_> = (0..12).map(|_| item(&long)).collect();
        let listing = queue_listing(&pending).unwrap();

        assert!(listing.chars().count() <= FIELD_VALUE_LIMIT);
        assert!(!listing.contains(&long));
        assert!(listing.contains(&format!("**{}…**", "x".repeat(TITLE_LIMIT - 1))));
        assert!(listing.ends_with("canciones más_"));
    }

    #[test]
    fn shorten_keeps_short_text() {
        assert_eq!(shorten("corta", 10), "corta");
        assert_eq!(shorten("ñandú veloz", 6), "ñandú…");
    }

    #[test]
    fn empty_queue_has_no_embed() {
        let snapshot = QueueSnapshot {
            state: PlaybackState::Idle,
            current: None,
            pending: Vec::new(),
        };
        assert!(create_queue_embed(&snapshot).is_none());
        assert!(queue_listing(&[]).is_none());
    }

    #[test]
    fn now_playing_embed_links_the_song() {
        let song = item("a").with_thumbnail("https://i.ytimg.com/a.jpg".to_string());
        let value = serde_json::to_value(create_now_playing_embed(&song, 2)).unwrap();

        assert_eq!(value["url"], "https://youtube.com/watch?v=a");
        assert_eq!(value["description"], "**a**");
        assert_eq!(value["fields"][1]["value"], "2 canciones");
        assert_eq!(value["thumbnail"]["url"], "https://i.ytimg.com/a.jpg");
    }
}
