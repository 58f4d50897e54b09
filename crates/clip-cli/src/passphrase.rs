//! Passphrase input.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};

/// Use `given` if present, otherwise prompt on stderr and read one line.
pub fn resolve(given: Option<String>, input: &mut impl BufRead) -> Result<String> {
    if let Some(passphrase) = given.filter(|p| !p.is_empty()) {
        return Ok(passphrase);
    }

    eprint!("Passphrase: ");
    std::io::stderr().flush().ok();

    let mut line = String::new();
    input.read_line(&mut line).context("reading passphrase")?;
    let passphrase = line.trim_end_matches(['\r', '\n']).to_string();
    if passphrase.is_empty() {
        bail!("passphrase must not be empty");
    }
    Ok(passphrase)
}
