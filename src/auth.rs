//! Password setup and login prompts shown before the vault opens.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{info, warn};
use vaultleaf_core::VaultError;
use vaultleaf_core::credentials::{CredentialGate, validate_new_password};

/// Run setup on first launch, login afterwards. Returns `false` when input
/// ends before the user got in.
pub fn authenticate<R: BufRead, W: Write>(
    gate: &mut CredentialGate,
    input: &mut R,
    out: &mut W,
) -> Result<bool> {
    if gate.is_configured() {
        login(gate, input, out)
    } else {
        setup(gate, input, out)
    }
}

fn setup<R: BufRead, W: Write>(gate: &mut CredentialGate, input: &mut R, out: &mut W) -> Result<bool> {
    writeln!(out, "Choose a password for your vault.")?;
    loop {
        let Some(password) = prompt(input, out, "New password: ")? else {
            return Ok(false);
        };
        let Some(confirmation) = prompt(input, out, "Confirm password: ")? else {
            return Ok(false);
        };
        match validate_new_password(&password, &confirmation) {
            Ok(()) => {}
            Err(VaultError::PasswordRejected(reason)) => {
                writeln!(out, "{}", sentence_case(reason))?;
                continue;
            }
            Err(other) => return Err(other).context("Checking new password"),
        }
        gate.set_password(&password).context("Saving password")?;
        writeln!(out, "Password set successfully!")?;
        return Ok(true);
    }
}

fn login<R: BufRead, W: Write>(gate: &CredentialGate, input: &mut R, out: &mut W) -> Result<bool> {
    loop {
        let Some(password) = prompt(input, out, "Password: ")? else {
            return Ok(false);
        };
        if password.is_empty() {
            writeln!(out, "Please enter your password")?;
            continue;
        }
        if gate.verify(&password) {
            info!("Login accepted");
            writeln!(out, "Login successful!")?;
            return Ok(true);
        }
        warn!("Login rejected");
        writeln!(out, "Incorrect password")?;
    }
}

/// Print `label`, read one line. `None` at end of input.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Result<Option<String>> {
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line).context("Reading input")? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn sentence_case(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
