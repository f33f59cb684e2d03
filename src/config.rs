use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "CareRoute";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Gemini model used for routing and agent replies.
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Bounds for the number of recent turns handed to the router and agents.
pub const MIN_CONTEXT_TURNS: usize = 5;
pub const MAX_CONTEXT_TURNS: usize = 10;

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "careroute_lib=info,careroute=info,tower_http=warn".to_string()
}

/// Default data directory: `~/CareRoute/`, or `./CareRoute` when no home
/// directory can be determined.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Runtime configuration, resolved from the process environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub llm_timeout: Duration,
    pub context_turns: usize,
}

impl AppConfig {
    /// Read configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let model = lookup("CAREROUTE_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let data_dir = lookup("CAREROUTE_DATA_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let bind_addr = parse_or_default(
            "CAREROUTE_BIND",
            lookup("CAREROUTE_BIND"),
            default_bind_addr(),
        );

        let timeout_secs = parse_or_default(
            "CAREROUTE_LLM_TIMEOUT_SECS",
            lookup("CAREROUTE_LLM_TIMEOUT_SECS"),
            DEFAULT_LLM_TIMEOUT_SECS,
        )
        .max(1);

        let context_turns = parse_or_default(
            "CAREROUTE_CONTEXT_TURNS",
            lookup("CAREROUTE_CONTEXT_TURNS"),
            MIN_CONTEXT_TURNS,
        )
        .clamp(MIN_CONTEXT_TURNS, MAX_CONTEXT_TURNS);

        Self {
            gemini_api_key,
            model,
            data_dir,
            bind_addr,
            llm_timeout: Duration::from_secs(timeout_secs),
            context_turns,
        }
    }

    /// Directory holding one JSON file per chat session.
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    /// Flat JSON file holding every booked appointment.
    pub fn appointments_path(&self) -> PathBuf {
        self.data_dir.join("appointments.json")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn parse_or_default<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value = %value, "Invalid config value, using default");
                default
            }
        },
    }
}
