/// Comandos de texto reconocidos (tras el prefijo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join,
    Leave,
    Play(String),
    Pause,
    Resume,
    Skip,
    Stop,
    Queue,
    NowPlaying,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Unknown(String),
    MissingQuery,
}

impl Command {
    /// Interpreta un mensaje. `None` si no empieza con el prefijo.
    pub fn parse(content: &str, prefix: &str) -> Option<Result<Self, ParseError>> {
        let rest = content.trim_start().strip_prefix(prefix)?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest.trim_end(), ""),
        };

        if name.is_empty() {
            return None;
        }

        let command = match name.to_lowercase().as_str() {
            "join" => Self::Join,
            "leave" => Self::Leave,
            "play" if args.is_empty() => return Some(Err(ParseError::MissingQuery)),
            "play" => Self::Play(args.to_string()),
            "pause" => Self::Pause,
            "resume" => Self::Resume,
            "skip" => Self::Skip,
            "stop" => Self::Stop,
            "queue" => Self::Queue,
            "np" | "nowplaying" => Self::NowPlaying,
            "help" => Self::Help,
            other => return Some(Err(ParseError::Unknown(other.to_string()))),
        };

        Some(Ok(command))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Play(_) => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Queue => "queue",
            Self::NowPlaying => "np",
            Self::Help => "help",
        }
    }
}
