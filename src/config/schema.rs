use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ConfigError;
use crate::policy::Thresholds;
use crate::style::StyleGuide;

pub const MAX_REWRITE_ATTEMPTS: u32 = 10;

// ── Top-level config ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was loaded from or will be saved to. Computed, never persisted.
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub rewrite: RewriteConfig,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub style: StyleConfig,
}

// ── Completion ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Ollama server root, without the `/api/chat` suffix.
    pub base_url: String,
    pub model: String,
    /// Upper bound for a single completion call.
    pub timeout_secs: u64,
    pub top_p: f64,
    pub repeat_penalty: f64,
    pub num_predict: u32,
    pub draft_temperature: f64,
    pub edit_temperature: f64,
    pub repair_temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.1:8b-instruct".into(),
            timeout_secs: 180,
            top_p: 0.9,
            repeat_penalty: 1.05,
            num_predict: 2048,
            draft_temperature: 0.8,
            edit_temperature: 0.6,
            repair_temperature: 0.5,
        }
    }
}

// ── Rewrite loop ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Corrective rewrites allowed after the first style edit.
    pub max_attempts: u32,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

// ── Style ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// TOML style guide replacing the built-in one. `~` is expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        Self {
            config_path: home.join(".humanizer").join("config.toml"),
            completion: CompletionConfig::default(),
            rewrite: RewriteConfig::default(),
            thresholds: Thresholds::default(),
            style: StyleConfig::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    if raw.is_empty() {
        return None;
    }
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

impl Config {
    /// Load `~/.humanizer/config.toml`, writing the defaults on first run.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .ok_or_else(|| ConfigError::Load("could not find home directory".into()))?;
        let humanizer_dir = home.join(".humanizer");
        let config_path = humanizer_dir.join("config.toml");

        if !humanizer_dir.exists() {
            fs::create_dir_all(&humanizer_dir)?;
        }

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.validate()?;
            config.save()?;
            Ok(config)
        }
    }

    /// Load an explicit config file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::Load(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Load(format!("failed to parse {}: {e}", path.display())))?;
        config.config_path = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("HUMANIZER_OLLAMA_URL")
            && !url.is_empty()
        {
            self.completion.base_url = url;
        }

        if let Ok(model) = std::env::var("HUMANIZER_MODEL")
            && !model.is_empty()
        {
            self.completion.model = model;
        }

        if let Some(secs) = parse_env("HUMANIZER_TIMEOUT_SECS") {
            self.completion.timeout_secs = secs;
        }

        if let Some(attempts) = parse_env("HUMANIZER_MAX_ATTEMPTS") {
            self.rewrite.max_attempts = attempts;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;

        if self.rewrite.max_attempts > MAX_REWRITE_ATTEMPTS {
            return Err(ConfigError::Validation(format!(
                "rewrite.max_attempts must be at most {MAX_REWRITE_ATTEMPTS}, got {}",
                self.rewrite.max_attempts
            )));
        }

        let completion = &self.completion;
        if completion.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "completion.timeout_secs must be at least 1".into(),
            ));
        }
        if completion.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "completion.base_url must not be empty".into(),
            ));
        }
        if completion.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "completion.model must not be empty".into(),
            ));
        }
        for (name, value) in [
            ("draft_temperature", completion.draft_temperature),
            ("edit_temperature", completion.edit_temperature),
            ("repair_temperature", completion.repair_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "completion.{name} must be within 0.0..=2.0, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&completion.top_p) {
            return Err(ConfigError::Validation(format!(
                "completion.top_p must be within 0.0..=1.0, got {}",
                completion.top_p
            )));
        }
        if !completion.repeat_penalty.is_finite() || completion.repeat_penalty <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "completion.repeat_penalty must be a positive number, got {}",
                completion.repeat_penalty
            )));
        }
        if completion.num_predict == 0 {
            return Err(ConfigError::Validation(
                "completion.num_predict must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Built-in guide, or the one named by `style.guide_path`.
    pub fn load_style_guide(&self) -> anyhow::Result<StyleGuide> {
        match self.style.guide_path.as_deref() {
            Some(raw) => {
                let expanded = shellexpand::tilde(raw);
                StyleGuide::load(Path::new(expanded.as_ref()))
            }
            None => Ok(StyleGuide::default()),
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Load(format!("failed to serialize config: {e}")))?;
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    const ENV_VARS: [&str; 4] = [
        "HUMANIZER_OLLAMA_URL",
        "HUMANIZER_MODEL",
        "HUMANIZER_TIMEOUT_SECS",
        "HUMANIZER_MAX_ATTEMPTS",
    ];

    fn clear_env() {
        for name in ENV_VARS {
            // SAFETY: tests touching the environment hold ENV_LOCK.
            unsafe { std::env::remove_var(name) };
        }
    }

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests touching the environment hold ENV_LOCK.
        unsafe { std::env::set_var(name, value) };
    }

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    fn config_default_has_sane_values() {
        let c = Config::default();
        assert_eq!(c.completion.base_url, "http://localhost:11434");
        assert_eq!(c.completion.model, "llama3.1:8b-instruct");
        assert_eq!(c.completion.timeout_secs, 180);
        assert_eq!(c.rewrite.max_attempts, 3);
        assert!((c.thresholds.min_ttr - 0.45).abs() < f64::EPSILON);
        assert!(c.style.guide_path.is_none());
        assert!(c.config_path.ends_with(".humanizer/config.toml"));
        c.validate().unwrap();
    }

    // ── Serialization ────────────────────────────────────────

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "[completion]\nmodel = \"mistral\"\n\n[thresholds]\nmin_words = 700\n",
        )
        .unwrap();

        let c = Config::load_from(&path).unwrap();
        assert_eq!(c.completion.model, "mistral");
        assert_eq!(c.completion.timeout_secs, 180);
        assert_eq!(c.thresholds.min_words, Some(700));
        assert_eq!(c.thresholds.min_numbers, 3);
        assert_eq!(c.config_path, path);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let tmp = TempDir::new().unwrap();
        let mut c = Config {
            config_path: tmp.path().join("nested").join("config.toml"),
            ..Config::default()
        };
        c.rewrite.max_attempts = 5;
        c.thresholds.max_words = Some(1000);
        c.style.guide_path = Some("~/guide.toml".into());
        c.save().unwrap();

        let loaded = Config::load_from(&c.config_path).unwrap();
        assert_eq!(loaded.rewrite, c.rewrite);
        assert_eq!(loaded.thresholds, c.thresholds);
        assert_eq!(loaded.style, c.style);
        assert_eq!(loaded.completion, c.completion);
    }

    #[test]
    fn missing_explicit_file_is_load_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn malformed_toml_is_load_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[completion\nmodel = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    // ── Validation ───────────────────────────────────────────

    #[test]
    fn rejects_excessive_attempts() {
        let mut c = Config::default();
        c.rewrite.max_attempts = 11;
        assert!(matches!(c.validate(), Err(ConfigError::Validation(_))));
        c.rewrite.max_attempts = 0;
        c.validate().unwrap();
    }

    #[test]
    fn rejects_zero_timeout_and_bad_temperature() {
        let mut c = Config::default();
        c.completion.timeout_secs = 0;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.completion.repair_temperature = 2.5;
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("repair_temperature"));
    }

    #[test]
    fn rejects_bad_sampling_limits() {
        for penalty in [-0.5, 0.0, f64::NAN, f64::INFINITY] {
            let mut c = Config::default();
            c.completion.repeat_penalty = penalty;
            let err = c.validate().unwrap_err();
            assert!(err.to_string().contains("repeat_penalty"), "{penalty}");
        }

        let mut c = Config::default();
        c.completion.num_predict = 0;
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("num_predict"));

        c.completion.num_predict = 1;
        c.completion.repeat_penalty = 1.0;
        c.validate().unwrap();
    }

        #[test]
    fn rejects_inverted_word_bounds() {
        let mut c = Config::default();
        c.thresholds.min_words = Some(1000);
        c.thresholds.max_words = Some(700);
        assert!(c.validate().is_err());
    }

    #[test]
    fn invalid_file_is_rejected_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[thresholds]\nmin_ttr = -0.1\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    // ── Env overrides ────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let _guard = env_lock();
        clear_env();
        set_env("HUMANIZER_OLLAMA_URL", "http://gpu-box:11434");
        set_env("HUMANIZER_MODEL", "qwen2.5:7b");
        set_env("HUMANIZER_TIMEOUT_SECS", "60");
        set_env("HUMANIZER_MAX_ATTEMPTS", "5");

        let mut c = Config::default();
        c.apply_env_overrides();
        clear_env();

        assert_eq!(c.completion.base_url, "http://gpu-box:11434");
        assert_eq!(c.completion.model, "qwen2.5:7b");
        assert_eq!(c.completion.timeout_secs, 60);
        assert_eq!(c.rewrite.max_attempts, 5);
    }

    #[test]
    fn unparsable_or_empty_env_is_ignored() {
        let _guard = env_lock();
        clear_env();
        set_env("HUMANIZER_MODEL", "");
        set_env("HUMANIZER_TIMEOUT_SECS", "soon");

        let mut c = Config::default();
        c.apply_env_overrides();
        clear_env();

        assert_eq!(c.completion.model, "llama3.1:8b-instruct");
        assert_eq!(c.completion.timeout_secs, 180);
    }

    // ── Style guide ──────────────────────────────────────────

    #[test]
    fn style_guide_defaults_to_builtin() {
        let guide = Config::default().load_style_guide().unwrap();
        assert_eq!(guide.blocklist.phrases().len(), 11);
    }

    #[test]
    fn style_guide_loads_from_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guide.toml");
        let custom = StyleGuide {
            blocklist: crate::style::Blocklist::new(["Fazit"]),
            ..StyleGuide::default()
        };
        fs::write(&path, toml::to_string_pretty(&custom).unwrap()).unwrap();

        let mut c = Config::default();
        c.style.guide_path = Some(path.display().to_string());
        let guide = c.load_style_guide().unwrap();
        assert_eq!(guide.blocklist.phrases(), ["Fazit"]);
    }

    #[test]
    fn missing_style_guide_is_an_error() {
        let mut c = Config::default();
        c.style.guide_path = Some("/nonexistent/guide.toml".into());
        assert!(c.load_style_guide().is_err());
    }
}
