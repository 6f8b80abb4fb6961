use serde::Deserialize;
use std::path::PathBuf;

/// High-level vault configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct VaultConfig {
    #[serde(default = "crate::config::defaults::default_data_dir")]
    pub data_dir: String,
    #[serde(default = "crate::config::defaults::default_content_dir_name")]
    pub content_dir_name: String,
    #[serde(default = "crate::config::defaults::default_audio_folder_name")]
    pub audio_folder_name: String,
    #[serde(default = "crate::config::defaults::default_preferences_file")]
    pub preferences_file: String,
    #[serde(default = "crate::config::defaults::default_app_title")]
    pub app_title: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_speech_command")]
    pub speech_command: String,
    #[serde(default = "crate::config::defaults::default_speech_voice")]
    pub speech_voice: String,
    #[serde(default = "crate::config::defaults::default_speech_rate_wpm")]
    pub speech_rate_wpm: u32,
    #[serde(default = "crate::config::defaults::default_speech_max_input_chars")]
    pub speech_max_input_chars: usize,
    #[serde(default = "crate::config::defaults::default_speech_safety_margin")]
    pub speech_safety_margin: usize,
    #[serde(default = "crate::config::defaults::default_synthesis_chunk_chars")]
    pub synthesis_chunk_chars: usize,
    #[serde(default = "crate::config::defaults::default_speech_init_timeout_secs")]
    pub speech_init_timeout_secs: f32,
    #[serde(default = "crate::config::defaults::default_ocr_command")]
    pub ocr_command: String,
    #[serde(default = "crate::config::defaults::default_ocr_language")]
    pub ocr_language: String,
    #[serde(default = "crate::config::defaults::default_opener_command")]
    pub opener_command: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        VaultConfig {
            data_dir: crate::config::defaults::default_data_dir(),
            content_dir_name: crate::config::defaults::default_content_dir_name(),
            audio_folder_name: crate::config::defaults::default_audio_folder_name(),
            preferences_file: crate::config::defaults::default_preferences_file(),
            app_title: crate::config::defaults::default_app_title(),
            log_level: crate::config::defaults::default_log_level(),
            speech_command: crate::config::defaults::default_speech_command(),
            speech_voice: crate::config::defaults::default_speech_voice(),
            speech_rate_wpm: crate::config::defaults::default_speech_rate_wpm(),
            speech_max_input_chars: crate::config::defaults::default_speech_max_input_chars(),
            speech_safety_margin: crate::config::defaults::default_speech_safety_margin(),
            synthesis_chunk_chars: crate::config::defaults::default_synthesis_chunk_chars(),
            speech_init_timeout_secs: crate::config::defaults::default_speech_init_timeout_secs(),
            ocr_command: crate::config::defaults::default_ocr_command(),
            ocr_language: crate::config::defaults::default_ocr_language(),
            opener_command: crate::config::defaults::default_opener_command(),
        }
    }
}

impl VaultConfig {
    /// Directory holding every piece of user content.
    pub fn content_root(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.content_dir_name)
    }

    pub fn preferences_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.preferences_file)
    }

    /// Scratch space for intermediate files (OCR input, etc.), kept outside
    /// the content root so it never shows up in listings.
    pub fn scratch_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(".scratch")
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
