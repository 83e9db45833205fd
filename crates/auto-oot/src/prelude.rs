pub use crate::error::Error;

pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, OptionExt, Result};

use colored::Colorize;

pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// Progress line for a completed pipeline step.
pub fn step(label: &str, message: impl std::fmt::Display) {
    println!("{} {}", format!("{label:>10}").green().bold(), message);
}

/// Progress line for a step that was skipped without failing the run.
pub fn skipped(label: &str, message: impl std::fmt::Display) {
    eprintln!("{} {}", format!("{label:>10}").yellow().bold(), message);
}
