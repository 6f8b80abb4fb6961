//! Entry point for the vault.
//!
//! Parses arguments, loads `conf/config.toml`, asks for the password (or sets
//! one up on first launch) and then hands the terminal to the browser shell.

mod auth;
mod shell;

use crate::shell::Shell;
use anyhow::{Context, Result, anyhow};
use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};
use vaultleaf_core::browser::{Browser, BrowserSettings};
use vaultleaf_core::config::load_config;
use vaultleaf_core::credentials::CredentialGate;
use vaultleaf_core::extract::ExtractorRegistry;
use vaultleaf_core::ocr::TesseractRecognizer;
use vaultleaf_core::playback::RodioOutput;
use vaultleaf_core::prefs::PreferenceStore;
use vaultleaf_core::speech::{CommandSpeechBackend, EngineState, SpeechEngine, SpeechSettings};
use vaultleaf_core::store::ContentStore;

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: vaultleaf [--config <path>] [--data-dir <path>]";

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    config: PathBuf,
    data_dir: Option<String>,
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let mut config = load_config(&args.config);
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        data_dir = %config.data_dir,
        level = %config.log_level,
        "Starting vault"
    );

    let prefs = PreferenceStore::open(config.preferences_path()).context("Loading preferences")?;
    let mut gate = CredentialGate::new(prefs);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    if !auth::authenticate(&mut gate, &mut input, &mut out)? {
        info!("Input closed before login; leaving the vault locked");
        return Ok(());
    }

    let store = ContentStore::open(config.content_root()).context("Opening content store")?;
    info!(
        command = %config.speech_command,
        voice = %config.speech_voice,
        max_input_chars = config.speech_max_input_chars,
        "Active speech configuration"
    );
    let speech = SpeechEngine::start(
        CommandSpeechBackend::from_config(&config),
        SpeechSettings::from_config(&config),
    )
    .context("Starting speech engine")?;
    let init_wait =
        Duration::try_from_secs_f32(config.speech_init_timeout_secs).unwrap_or(Duration::from_secs(5));
    match speech.wait_until_settled(init_wait) {
        EngineState::Ready => {}
        EngineState::Failed(message) => warn!("Speech is unavailable: {message}"),
        other => warn!(state = ?other, "Speech engine is still starting"),
    }
    let recognizer = Arc::new(TesseractRecognizer::new(
        config.ocr_command.clone(),
        config.ocr_language.clone(),
        config.scratch_dir(),
    ));

    let browser = Browser::new(
        store,
        ExtractorRegistry::default(),
        recognizer,
        speech,
        RodioOutput,
        BrowserSettings::from_config(&config),
    )
    .context("Opening the vault browser")?;
    let mut shell = Shell::new(browser);
    let outcome = shell.run(&mut input, &mut out);
    shell.shutdown();
    info!("Vault closed");
    outcome
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args {
        config: PathBuf::from("conf/config.toml"),
        data_dir: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                parsed.config = PathBuf::from(path);
            }
            "--data-dir" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--data-dir needs a path\n{USAGE}"))?;
                parsed.data_dir = Some(path);
            }
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            other => return Err(anyhow!("Unexpected argument {other}\n{USAGE}")),
        }
    }
    Ok(parsed)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_and_overrides() {
        assert_eq!(
            args(&[]).expect("defaults"),
            Args {
                config: PathBuf::from("conf/config.toml"),
                data_dir: None,
            }
        );
        assert_eq!(
            args(&["--data-dir", "/srv/vault", "--config", "alt.toml"]).expect("overrides"),
            Args {
                config: PathBuf::from("alt.toml"),
                data_dir: Some("/srv/vault".to_string()),
            }
        );
    }

    #[test]
    fn missing_values_are_errors() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["book.epub"]).is_err());
    }
}
