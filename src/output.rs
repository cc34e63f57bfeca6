//! Terminal output: quiet mode and ranked-result rendering

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::document::Document;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::SeqCst);
}

pub fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::SeqCst)
}

/// Print a message only if not in quiet mode
#[macro_export]
macro_rules! info_print {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            println!($($arg)*);
        }
    };
}

/// Print to stderr only if not in quiet mode
#[macro_export]
macro_rules! warn_print {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            eprintln!($($arg)*);
        }
    };
}

/// `{"result": [...]}` on stdout
pub fn print_json(documents: &[Document]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&json!({ "result": documents }))?);
    Ok(())
}

/// One block per document, best first
pub fn print_ranked(heading: &str, documents: &[Document], show_content: bool) {
    info_print!("{}", heading.bright_cyan().bold());
    info_print!("{}", "=".repeat(60));

    if documents.is_empty() {
        println!("{}", "No documents.".dimmed());
        return;
    }

    for (rank, doc) in documents.iter().enumerate() {
        let score = doc.score();
        let score_text = format!("{:.6}", score);
        let score_text = if score > 0.8 {
            score_text.green()
        } else if score > 0.5 {
            score_text.yellow()
        } else {
            score_text.red()
        };

        println!(
            "{:>3}. {}  {}",
            rank + 1,
            doc.segment_id().bright_green(),
            score_text
        );

        if show_content {
            for line in doc.content.lines().take(10) {
                println!("     │ {}", line.dimmed());
            }
        }
    }
}
