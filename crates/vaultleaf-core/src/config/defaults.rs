pub(crate) fn default_data_dir() -> String {
    ".vaultleaf".to_string()
}

pub(crate) fn default_content_dir_name() -> String {
    "UserContent".to_string()
}

pub(crate) fn default_audio_folder_name() -> String {
    "Saved Audios".to_string()
}

pub(crate) fn default_preferences_file() -> String {
    "prefs.toml".to_string()
}

pub(crate) fn default_app_title() -> String {
    "Vault".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_speech_command() -> String {
    "espeak-ng".to_string()
}

pub(crate) fn default_speech_voice() -> String {
    "en".to_string()
}

pub(crate) fn default_speech_rate_wpm() -> u32 {
    175
}

// Matches the platform limit the vault was first built against.
pub(crate) fn default_speech_max_input_chars() -> usize {
    4000
}

pub(crate) fn default_speech_safety_margin() -> usize {
    100
}

pub(crate) fn default_synthesis_chunk_chars() -> usize {
    3900
}

pub(crate) fn default_speech_init_timeout_secs() -> f32 {
    5.0
}

pub(crate) fn default_ocr_command() -> String {
    "tesseract".to_string()
}

pub(crate) fn default_ocr_language() -> String {
    "eng".to_string()
}

pub(crate) fn default_opener_command() -> String {
    "xdg-open".to_string()
}
