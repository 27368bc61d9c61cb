use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub command_prefix: String,

    // Herramientas externas
    pub ytdlp_path: String,
    pub ffmpeg_path: String,

    // Rendimiento
    pub worker_threads: usize,

    // Audio
    pub default_volume: f32,
}

impl Config {
    /// Carga la configuración desde el entorno (y `.env` si existe).
    ///
    /// El token nunca tiene valor por defecto: si falta, falla de inmediato.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")
                .context("DISCORD_TOKEN no está configurado")?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string()),

            // Herramientas externas
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),

            // Rendimiento
            worker_threads: match std::env::var("WORKER_THREADS") {
                Ok(val) if !val.trim().is_empty() => val.parse().context("WORKER_THREADS inválido")?,
                _ => num_cpus::get(),
            },

            // Audio
            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.8".to_string())
                .parse()
                .context("DEFAULT_VOLUME inválido")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Token and prefix must not be empty
    /// - At least one resolver worker
    /// - Volume must be between 0.0 and 2.0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN está vacío");
        }

        if self.command_prefix.trim().is_empty() {
            anyhow::bail!("El prefijo de comandos no puede estar vacío");
        }

        if self.worker_threads == 0 {
            anyhow::bail!("Worker threads must be greater than 0");
        }

        if !(0.0..=2.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 2.0, got: {}",
                self.default_volume
            );
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Prefix: {}\n  \
            Tools: yt-dlp={}, ffmpeg={}\n  \
            Workers: {}\n  \
            Audio: {}% vol",
            self.command_prefix,
            self.ytdlp_path,
            self.ffmpeg_path,
            self.worker_threads,
            (self.default_volume * 100.0).round() as u32,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults for the token - must be provided)
            discord_token: String::new(),
            command_prefix: "!".to_string(),

            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),

            worker_threads: num_cpus::get(),

            default_volume: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            discord_token: "token".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_are_valid_once_token_is_set() {
        assert!(valid().validate().is_ok());
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = valid();
        config.default_volume = 2.5;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.worker_threads = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.command_prefix = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn summary_hides_the_token() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            ..valid()
        };
        let summary = config.summary();

        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("80% vol"));
    }
}
