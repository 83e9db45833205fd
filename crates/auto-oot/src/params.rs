use std::path::PathBuf;

use auto_oot_core::config::Config;
use auto_oot_core::failure::Parameter;
use auto_oot_core::segment::Strategy;
use colored::Colorize;

use crate::datasheet;
use crate::prelude::{println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct ParamsOptions {
    /// Datasheet PDF
    pub pdf: PathBuf,

    /// Section detection strategy (defaults to the configured one)
    #[clap(long)]
    pub strategy: Option<Strategy>,

    /// Output as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Debug, Clone, clap::Args)]
pub struct BarsOptions {
    /// Datasheet PDF
    pub pdf: PathBuf,

    /// Output as JSON
    #[clap(long)]
    pub json: bool,
}

fn region_label(parameter: &Parameter) -> String {
    match parameter.region {
        Some(region) if !region.is_empty() => format!("{}-{}", region.start, region.end),
        _ => "-".to_string(),
    }
}

pub fn run_params(options: ParamsOptions, config: &Config, global: crate::Global) -> Result<()> {
    let strategy = options.strategy.unwrap_or(config.datasheet.strategy);
    let import = datasheet::import(&options.pdf, config, strategy)?;

    if options.json {
        std::println!("{}", serde_json::to_string_pretty(&import.report)?);
        return Ok(());
    }

    if global.verbose {
        println!(
            "{} row(s) between markers, {} header bar(s)",
            import.rows.len(),
            import.bars.len()
        );
    }

    if import.report.is_empty() {
        println!("No parameters found.");
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Parameter".bold().cyan(),
        "Header Row".bold().cyan(),
        "Region".bold().cyan(),
        "OOT".bold().cyan()
    ]);
    for parameter in &import.report.parameters {
        let header_row = parameter
            .header_row
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let flag = if parameter.requires_analysis {
            "Fail".red().bold()
        } else {
            "-".bright_black()
        };
        table.add_row(prettytable::row![
            parameter.name.bright_white(),
            header_row,
            region_label(parameter),
            flag
        ]);
    }
    table.printstd();

    if let Some(used) = import.report.strategy {
        if used != strategy {
            println!("{} fell back to the {used} strategy", "note:".yellow());
        }
    }

    Ok(())
}

pub fn run_bars(options: BarsOptions, config: &Config, global: crate::Global) -> Result<()> {
    let pdf = datasheet::open(&options.pdf)?;
    let candidates = datasheet::header_bars(&pdf, config);

    if options.json {
        std::println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if global.verbose {
        println!("{} page(s) scanned", pdf.page_count());
    }

    if candidates.is_empty() {
        println!("No header bars found.");
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Page".bold().cyan(),
        "Top".bold().cyan(),
        "Text".bold().cyan()
    ]);
    for candidate in &candidates {
        table.add_row(prettytable::row![
            candidate.page.to_string().green(),
            format!("{:.1}", candidate.top),
            candidate.text.bright_white()
        ]);
    }
    table.printstd();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auto_oot_core::segment::Region;

    fn parameter(region: Option<Region>) -> Parameter {
        Parameter {
            name: "Gain".into(),
            header_row: Some(4),
            region,
            requires_analysis: false,
        }
    }

    #[test]
    fn region_labels() {
        assert_eq!(region_label(&parameter(Some(Region { start: 5, end: 9 }))), "5-9");
        assert_eq!(region_label(&parameter(Some(Region { start: 9, end: 5 }))), "-");
        assert_eq!(region_label(&parameter(None)), "-");
    }

    #[test]
    fn params_on_missing_pdf_fails() {
        let dir = tempfile::tempdir().unwrap();
        let options = ParamsOptions {
            pdf: dir.path().join("DS.pdf"),
            strategy: Some(Strategy::Keyword),
            json: true,
        };
        let global = crate::Global {
            config: None,
            verbose: false,
        };
        assert!(run_params(options, &Config::default(), global).is_err());
    }
}
