use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::SongResolver;
use crate::{
    audio::queue::{PlayableItem, Requester},
    config::Config,
    error::MusicError,
};

const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";

/// Resolutor basado en yt-dlp.
pub struct YtDlpResolver {
    binary: String,
    // Limita las extracciones concurrentes
    workers: Semaphore,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

impl YtDlpResolver {
    pub fn new(config: &Config) -> Self {
        Self::with_binary(config.ytdlp_path.clone(), config.worker_threads)
    }

    pub fn with_binary(binary: impl Into<String>, workers: usize) -> Self {
        Self {
            binary: binary.into(),
            workers: Semaphore::new(workers.max(1)),
        }
    }

    /// Verifica si la consulta es una URL directa
    pub fn is_direct_reference(query: &str) -> bool {
        url::Url::parse(query)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    fn search_target(query: &str) -> String {
        if Self::is_direct_reference(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }

    async fn run(&self, target: &str, args: &[&str]) -> Result<String, MusicError> {
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|e| MusicError::resolution(target, e))?;

        let output = Command::new(&self.binary)
            .args(args)
            .args(["--no-playlist", "--no-warnings", "--geo-bypass", "-f", AUDIO_FORMAT])
            .arg(target)
            .output()
            .await
            .map_err(|e| MusicError::resolution(target, format!("no se pudo ejecutar yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MusicError::resolution(target, describe_failure(&stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl SongResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requester: Requester) -> Result<PlayableItem, MusicError> {
        info!("🔍 Buscando: {}", query);

        let target = Self::search_target(query);
        let stdout = self.run(&target, &["--dump-json"]).await?;

        let line = stdout
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| MusicError::resolution(query, "no se encontraron resultados"))?;

        let info: YtDlpInfo = serde_json::from_str(line)
            .map_err(|e| MusicError::resolution(query, format!("respuesta inválida de yt-dlp: {}", e)))?;

        let item = item_from_info(info, requester).map_err(|cause| MusicError::resolution(query, cause))?;
        debug!("🎯 Resuelto: {} -> {}", query, item.url);
        Ok(item)
    }

    async fn refresh_locator(&self, url: &str) -> Result<String, MusicError> {
        debug!("🔄 Renovando URL de stream para: {}", url);

        let stdout = self.run(url, &["--get-url"]).await?;

        stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| MusicError::resolution(url, "yt-dlp no devolvió URL de stream"))
    }
}

/// Convierte la salida de yt-dlp en una canción de la cola.
fn item_from_info(info: YtDlpInfo, requester: Requester) -> Result<PlayableItem, String> {
    let stream_url = info
        .url
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| "el resultado no tiene stream de audio".to_string())?;

    let url = info
        .webpage_url
        .or(info.url)
        .or_else(|| info.id.map(|id| format!("https://youtube.com/watch?v={}", id)))
        .unwrap_or_else(|| stream_url.clone());

    let title = info.title.unwrap_or_else(|| "Unknown Title".to_string());

    let mut item = PlayableItem::new(stream_url, url, title, requester);
    if let Some(duration) = info.duration {
        item = item.with_duration_secs(duration);
    }
    if let Some(thumbnail) = info.thumbnail {
        item = item.with_thumbnail(thumbnail);
    }

    Ok(item)
}

/// Extrae la causa legible de la salida de error de yt-dlp.
fn describe_failure(stderr: &str) -> String {
    static ERROR_LINE: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = ERROR_LINE.get_or_init(|| Regex::new(r"(?m)^ERROR:\s*(?:\[[^\]]+\]\s*)?(?:[\w-]+:\s*)?(.+)$").ok());

    let message = pattern
        .as_ref()
        .and_then(|re| re.captures(stderr))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| stderr.trim().lines().last().unwrap_or("yt-dlp falló").to_string());

    let lower = message.to_lowercase();
    if lower.contains("in your country") || lower.contains("geo-restrict") || lower.contains("geo restrict") {
        warn!("🌍 Contenido restringido por región: {}", message);
        format!("no disponible en esta región ({})", message)
    } else {
        message
    }
}
