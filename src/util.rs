use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::style::Stylize;

/// Source of interactive answers. `None` means input is exhausted.
pub trait Prompter {
    fn ask(&mut self, label: &str) -> Result<Option<String>>;
}

pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        ask_or_eof(label)
    }
}

pub fn ask_or_eof(label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .context("Failed to read stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(['\n', '\r']).to_string()))
}

pub fn user_label() -> String {
    format!("{}", "You> ".green().bold())
}

pub fn confirm_label() -> String {
    format!(
        "\nDo you want to apply these changes? ({}/{}): ",
        "y".green(),
        "n".red()
    )
}

pub fn truncate_with_suffix(text: &str, max_chars: usize, suffix: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut_at, _)) => format!("{}{}", &text[..cut_at], suffix),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_is_char_boundary_safe() {
        assert_eq!(truncate_with_suffix("ééééé", 3, "..."), "ééé...");
        assert_eq!(truncate_with_suffix("short", 10, "..."), "short");
        assert_eq!(truncate_with_suffix("exact", 5, "..."), "exact");
    }
}
