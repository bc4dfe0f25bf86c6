use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const DEFAULT_PROMPTS_PATH: &str = "config/prompts.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime settings plus prompt texts, loaded once at start-up and handed to
/// every component that needs them.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
    /// Config files that were absent and replaced by defaults.
    pub missing_files: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub chat: ChatConfig,
    pub evaluation: EvaluationConfig,
    pub worker: WorkerConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub database_url: String,
    pub redis_url: String,
    pub qdrant_url: String,
    pub admin_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            rag: RagConfig::default(),
            chat: ChatConfig::default(),
            evaluation: EvaluationConfig::default(),
            worker: WorkerConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
            database_url: "sqlite:data/portfolio.db".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            admin_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
    pub collection: String,
    pub chunk_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            collection: "portfolio_knowledge".to_string(),
            chunk_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub history_turns: usize,
    pub max_message_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_turns: 6,
            max_message_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Detached tokio task inside the API process.
    Inline,
    /// Redis job consumed by the worker binary.
    Queue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub enabled: bool,
    pub mode: EvaluationMode,
    /// Judge model; falls back to `llm.model`.
    pub model: Option<String>,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: EvaluationMode::Inline,
            model: None,
            timeout_seconds: 60,
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub result_ttl_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            result_ttl_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub chat: ChatPrompts,
    pub evaluation: EvaluationPrompts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    pub system: String,
    pub no_documents: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: "You are the assistant on a personal portfolio website. Answer visitors' \
                     questions about the site owner's education, experience, skills and \
                     projects. Use only the context documents below; if they do not contain \
                     the answer, say so plainly. Keep answers short and friendly."
                .to_string(),
            no_documents: "No relevant documents were found.".to_string(),
        }
    }
}

/// Judge prompt. `template` is filled via the `{question}`, `{answer}` and
/// `{documents}` placeholders.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationPrompts {
    pub system: String,
    pub template: String,
}

impl Default for EvaluationPrompts {
    fn default() -> Self {
        Self {
            system: "You grade answers produced by a portfolio chatbot. Reply with a single \
                     JSON object and nothing else."
                .to_string(),
            template: "Question:\n{question}\n\nAnswer:\n{answer}\n\nDocuments:\n{documents}\n\n\
                       Score the answer from 0 to 10 on correctness (is it supported by the \
                       documents), comprehensiveness and coherence. Respond as \
                       {\"scores\": {\"correctness\": n, \"comprehensiveness\": n, \
                       \"coherence\": n}, \"feedback\": \"...\"}"
                .to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the YAML files named by `CONFIG_PATH` / `PROMPTS_PATH` (falling
    /// back to built-in defaults when a file is absent), then applies
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let prompts_path =
            std::env::var("PROMPTS_PATH").unwrap_or_else(|_| DEFAULT_PROMPTS_PATH.into());

        Self::from_files(&config_path, &prompts_path, |key| std::env::var(key).ok())
    }

    pub fn from_files(
        config_path: &str,
        prompts_path: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut missing_files = Vec::new();
        let config = read_yaml(config_path)?.unwrap_or_else(|| {
            missing_files.push(config_path.to_string());
            Config::default()
        });
        let prompts = read_yaml(prompts_path)?.unwrap_or_else(|| {
            missing_files.push(prompts_path.to_string());
            PromptsConfig::default()
        });

        let mut app = Self {
            config,
            prompts,
            missing_files,
        };
        app.apply_overrides(lookup)?;
        app.validate()?;
        Ok(app)
    }

    /// Logs where the configuration came from. Called once tracing is up.
    pub fn log_summary(&self) {
        for path in &self.missing_files {
            tracing::info!(path = %path, "config file not found, using defaults");
        }
        tracing::info!(
            provider = %self.config.llm.provider,
            model = %self.config.llm.model,
            evaluation = self.config.evaluation.enabled,
            mode = ?self.config.evaluation.mode,
            "configuration loaded"
        );
    }

    pub fn from_yaml(config_yaml: &str, prompts_yaml: &str) -> Result<Self, ConfigError> {
        let app = Self {
            config: parse_yaml("config", config_yaml)?,
            prompts: parse_yaml("prompts", prompts_yaml)?,
            missing_files: Vec::new(),
        };
        app.validate()?;
        Ok(app)
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let cfg = &mut self.config;
        if let Some(v) = lookup("DATABASE_URL") {
            cfg.database_url = v;
        }
        if let Some(v) = lookup("REDIS_URL") {
            cfg.redis_url = v;
        }
        if let Some(v) = lookup("QDRANT_URL") {
            cfg.qdrant_url = v;
        }
        if let Some(v) = lookup("SERVER_HOST") {
            cfg.server.host = v;
        }
        if let Some(v) = lookup("SERVER_PORT") {
            cfg.server.port = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SERVER_PORT '{v}' is not a port")))?;
        }
        if let Some(v) = lookup("WORKER_CONCURRENCY") {
            cfg.worker.concurrency = v.parse().map_err(|_| {
                ConfigError::Invalid(format!("WORKER_CONCURRENCY '{v}' is not a number"))
            })?;
        }
        if let Some(v) = lookup("ADMIN_API_KEY").filter(|v| !v.is_empty()) {
            cfg.admin_api_key = Some(v);
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            cfg.logging.format = match v.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "LOG_FORMAT '{v}' must be 'pretty' or 'json'"
                    )))
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cfg = &self.config;
        if cfg.rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag.top_k must be at least 1".into()));
        }
        if cfg.rag.chunk_size == 0 {
            return Err(ConfigError::Invalid("rag.chunk_size must be at least 1".into()));
        }
        if cfg.llm.timeout_seconds == 0 || cfg.evaluation.timeout_seconds == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".into()));
        }
        if cfg.worker.concurrency == 0 {
            return Err(ConfigError::Invalid("worker.concurrency must be at least 1".into()));
        }
        if !self.prompts.evaluation.template.contains("{answer}") {
            return Err(ConfigError::Invalid(
                "evaluation template must contain the {answer} placeholder".into(),
            ));
        }
        Ok(())
    }

    pub fn judge_model(&self) -> &str {
        self.config
            .evaluation
            .model
            .as_deref()
            .unwrap_or(&self.config.llm.model)
    }
}

/// `None` when the file does not exist.
fn read_yaml<T>(path: &str) -> Result<Option<T>, ConfigError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    parse_yaml(path, &raw).map(Some)
}

fn parse_yaml<T>(path: &str, raw: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let app = AppConfig::from_yaml(
            "rag:\n  top_k: 3\nevaluation:\n  mode: queue\n",
            "chat:\n  system: Be brief.\n",
        )
        .unwrap();

        assert_eq!(app.config.rag.top_k, 3);
        assert_eq!(app.config.rag.chunk_size, 1000);
        assert_eq!(app.config.evaluation.mode, EvaluationMode::Queue);
        assert_eq!(app.prompts.chat.system, "Be brief.");
        assert_eq!(
            app.prompts.chat.no_documents,
            "No relevant documents were found."
        );
    }

    #[test]
    fn test_empty_documents_use_defaults() {
        let app = AppConfig::from_yaml("", "").unwrap();
        assert_eq!(app.config.chat.history_turns, 6);
        assert_eq!(app.judge_model(), app.config.llm.model);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_yaml("rag:\n  top_k: 0\n", "").is_err());
        assert!(AppConfig::from_yaml("", "evaluation:\n  template: no placeholder\n").is_err());
        assert!(matches!(
            AppConfig::from_yaml("rag: [", ""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "sqlite::memory:"),
            ("SERVER_PORT", "9000"),
            ("ADMIN_API_KEY", "secret"),
            ("LOG_FORMAT", "json"),
        ]);
        let mut app = AppConfig::default();
        app.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(app.config.database_url, "sqlite::memory:");
        assert_eq!(app.config.server.port, 9000);
        assert_eq!(app.config.admin_api_key.as_deref(), Some("secret"));
        assert_eq!(app.config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_port_override_fails() {
        let mut app = AppConfig::default();
        let result = app.apply_overrides(|k| (k == "SERVER_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let mut app = AppConfig::default();
        let result = app.apply_overrides(|k| (k == "LOG_FORMAT").then(|| "yaml".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        app.apply_overrides(|k| (k == "LOG_FORMAT").then(|| "Pretty".to_string()))
            .unwrap();
        assert_eq!(app.config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_files_are_recorded_for_later_logging() {
        let app = AppConfig::from_files(
            "does/not/exist/config.yaml",
            "does/not/exist/prompts.yaml",
            |_| None,
        )
        .unwrap();

        assert_eq!(
            app.missing_files,
            vec!["does/not/exist/config.yaml", "does/not/exist/prompts.yaml"]
        );
        assert_eq!(app.config.rag.top_k, 5);
    }

    #[test]
    fn test_judge_model_override() {
        let app = AppConfig::from_yaml("evaluation:\n  model: judge-large\n", "").unwrap();
        assert_eq!(app.judge_model(), "judge-large");
    }
}
