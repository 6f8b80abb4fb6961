//! Line-oriented browser over the vault.

use crate::auth::prompt;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::debug;
use vaultleaf_core::browser::{Browser, BrowserEvent, Notice, NoticeLevel};
use vaultleaf_core::extract::ExtractedText;
use vaultleaf_core::navigation::UpOutcome;
use vaultleaf_core::playback::{AudioOutput, PlayOutcome};

const HELP: &str = "\
Commands:
  ls [--json]      list the current folder
  pwd              show the current folder
  cd <folder>      open a folder (cd .. goes up)
  up               go to the parent folder
  mkdir <name>     create a folder here
  import <path>    copy a file into this folder
  rm <name>        delete a file or folder
  read <name>      extract or recognise the text of a file
  view <name>      show a .txt file
  say [text]       speak text, or the last text read
  save-audio       save the last text read as audio files
  hush             stop speaking
  play <name>      play an audio file (resumes paused playback)
  pause            pause playback
  stop             stop playback
  open <name>      open a file with another application
  quit             leave the vault";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Help,
    List { json: bool },
    Pwd,
    Cd(String),
    Up,
    Mkdir(String),
    Import(PathBuf),
    Remove(String),
    Read(String),
    View(String),
    Say(Option<String>),
    SaveAudio,
    Hush,
    Play(String),
    Pause,
    Stop,
    Open(String),
    Quit,
}

/// Parse one input line. Everything after the command word is a single
/// argument, so names with spaces need no quoting.
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ShellCommand::Empty);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let needs_arg = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("{word} needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };
    let command = match word {
        "help" | "?" => ShellCommand::Help,
        "ls" => match rest {
            "" => ShellCommand::List { json: false },
            "--json" => ShellCommand::List { json: true },
            other => return Err(format!("unknown ls option {other}")),
        },
        "pwd" => ShellCommand::Pwd,
        "cd" if rest == ".." => ShellCommand::Up,
        "cd" => ShellCommand::Cd(needs_arg("a folder name")?),
        "up" | ".." => ShellCommand::Up,
        "mkdir" => ShellCommand::Mkdir(needs_arg("a folder name")?),
        "import" => ShellCommand::Import(PathBuf::from(needs_arg("a file path")?)),
        "rm" => ShellCommand::Remove(needs_arg("a name")?),
        "read" => ShellCommand::Read(needs_arg("a file name")?),
        "view" => ShellCommand::View(needs_arg("a file name")?),
        "say" if rest.is_empty() => ShellCommand::Say(None),
        "say" => ShellCommand::Say(Some(rest.to_string())),
        "save-audio" => ShellCommand::SaveAudio,
        "hush" => ShellCommand::Hush,
        "play" => ShellCommand::Play(needs_arg("a file name")?),
        "pause" => ShellCommand::Pause,
        "stop" => ShellCommand::Stop,
        "open" => ShellCommand::Open(needs_arg("a file name")?),
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try help)")),
    };
    Ok(command)
}

pub struct Shell<O: AudioOutput> {
    browser: Browser<O>,
    last_text: Option<ExtractedText>,
}

impl<O: AudioOutput> Shell<O> {
    pub fn new(browser: Browser<O>) -> Self {
        Self {
            browser,
            last_text: None,
        }
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> Result<()> {
        writeln!(out, "Type 'help' for a list of commands.")?;
        loop {
            let events = self.browser.pump();
            self.show_events(out, events)?;

            let label = format!("{}> ", self.browser.title());
            let Some(line) = prompt(input, out, &label)? else {
                writeln!(out)?;
                break;
            };
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(message) => {
                    writeln!(out, "{message}")?;
                    continue;
                }
            };
            debug!(?command, "Shell command");
            if command == ShellCommand::Quit {
                break;
            }
            self.dispatch(command, input, out)?;
        }
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.browser.shutdown();
    }

    fn dispatch<R: BufRead, W: Write>(&mut self, command: ShellCommand, input: &mut R, out: &mut W) -> Result<()> {
        match command {
            ShellCommand::Empty | ShellCommand::Quit => {}
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::List { json } => {
                if let Err(err) = self.browser.reload() {
                    show_notice(out, &Notice::failure(format!("Could not list folder contents: {err}")))?;
                    return Ok(());
                }
                if json {
                    let rendered =
                        serde_json::to_string_pretty(self.browser.listing()).context("Rendering listing")?;
                    writeln!(out, "{rendered}")?;
                } else {
                    self.print_listing(out)?;
                }
            }
            ShellCommand::Pwd => writeln!(out, "/{}", self.browser.current_path())?,
            ShellCommand::Cd(name) => {
                if let Err(notice) = self.browser.enter(&name) {
                    show_notice(out, &notice)?;
                }
            }
            ShellCommand::Up => match self.browser.up() {
                Ok(UpOutcome::Moved) => {}
                Ok(UpOutcome::AtRoot) => writeln!(out, "Already at the top folder")?,
                Err(notice) => show_notice(out, &notice)?,
            },
            ShellCommand::Mkdir(name) => show_notice(out, &self.browser.create_folder(&name))?,
            ShellCommand::Import(path) => show_notice(out, &self.browser.import_file(&path))?,
            ShellCommand::Remove(name) => {
                let question = format!("Delete '{name}'? This cannot be undone. [y/N] ");
                let answer = prompt(input, out, &question)?.unwrap_or_default();
                if matches!(answer.trim(), "y" | "Y" | "yes") {
                    show_notice(out, &self.browser.delete(&name))?;
                } else {
                    writeln!(out, "Kept '{name}'")?;
                }
            }
            ShellCommand::Read(name) => {
                if let Some(notice) = self.browser.open_text(&name) {
                    show_notice(out, &notice)?;
                    return Ok(());
                }
                writeln!(out, "Reading '{name}'...")?;
                let events = self.browser.wait_idle();
                self.show_events(out, events)?;
            }
            ShellCommand::View(name) => match self.browser.view_text(&name) {
                Ok(text) => writeln!(out, "{text}")?,
                Err(notice) => show_notice(out, &notice)?,
            },
            ShellCommand::Say(Some(text)) => {
                if let Some(notice) = self.browser.read_aloud(&text) {
                    show_notice(out, &notice)?;
                }
            }
            ShellCommand::Say(None) => match &self.last_text {
                Some(last) => {
                    if let Some(notice) = self.browser.read_aloud(&last.text) {
                        show_notice(out, &notice)?;
                    }
                }
                None => writeln!(out, "Nothing has been read yet; use read <name> first")?,
            },
            ShellCommand::SaveAudio => match self.last_text.clone() {
                Some(last) => match self.browser.save_as_audio(&last) {
                    Some(notice) => show_notice(out, &notice)?,
                    None => writeln!(out, "Saving audio for '{}'...", last.source_name)?,
                },
                None => writeln!(out, "Nothing has been read yet; use read <name> first")?,
            },
            ShellCommand::Hush => self.browser.stop_speech(),
            ShellCommand::Play(name) => match self.browser.play_audio(&name) {
                Ok(PlayOutcome::Started) => writeln!(out, "Playing '{name}'")?,
                Ok(PlayOutcome::Resumed) => writeln!(out, "Resumed paused playback")?,
                Err(notice) => show_notice(out, &notice)?,
            },
            ShellCommand::Pause => {
                if !self.browser.pause_audio() {
                    writeln!(out, "Nothing is playing")?;
                }
            }
            ShellCommand::Stop => self.browser.stop_audio(),
            ShellCommand::Open(name) => {
                if let Err(notice) = self.browser.open_external(&name) {
                    show_notice(out, &notice)?;
                }
            }
        }
        Ok(())
    }

    fn print_listing<W: Write>(&self, out: &mut W) -> Result<()> {
        let listing = self.browser.listing();
        if listing.is_empty() {
            writeln!(out, "(empty)")?;
        }
        for node in listing {
            if node.is_dir() {
                writeln!(out, "  {}/", node.name)?;
            } else {
                writeln!(out, "  {}  ({} bytes)", node.name, node.size)?;
            }
        }
        Ok(())
    }

    fn show_events<W: Write>(&mut self, out: &mut W, events: Vec<BrowserEvent>) -> Result<()> {
        for event in events {
            match event {
                BrowserEvent::Notice(notice) => show_notice(out, &notice)?,
                BrowserEvent::TextReady(text) => {
                    writeln!(out, "--- {} ---", text.source_name)?;
                    writeln!(out, "{}", text.text)?;
                    writeln!(out, "--- end (say / save-audio to listen) ---")?;
                    self.last_text = Some(text);
                }
            }
        }
        Ok(())
    }
}

fn show_notice<W: Write>(out: &mut W, notice: &Notice) -> Result<()> {
    match notice.level {
        NoticeLevel::Info => writeln!(out, "{}", notice.message)?,
        NoticeLevel::Warning => writeln!(out, "warning: {}", notice.message)?,
        NoticeLevel::Failure => writeln!(out, "error: {}", notice.message)?,
    }
    Ok(())
}
