//! `[y/N]` confirmation prompts on stderr

use colored::Colorize;
use std::io::{self, BufRead, IsTerminal, Write};

/// Ask a yes/no question. `--yes` answers for the user; without a terminal
/// on stdin the answer is no.
pub fn confirm(question: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    if !io::stdin().is_terminal() {
        log::debug!("stdin is not a terminal, declining: {}", question);
        return false;
    }

    eprint!("{} {} ", question, "[y/N]".bright_black());
    let _ = io::stderr().flush();

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
