//! The `run` command: Reverse Trace + template (+ datasheet) into
//! `OOT_<UID>.xlsx`.

use std::fs;
use std::path::{Path, PathBuf};

use auto_oot_core::analysis::datasheet_failure_rule;
use auto_oot_core::config::Config;
use auto_oot_core::locate::{resolve, SiteRequest, WorkingDir};
use auto_oot_core::segment::Strategy;
use chrono::NaiveDate;
use colored::Colorize;

use crate::analysis::{add_parameter_sheet, dress};
use crate::datasheet::{self, DatasheetImport};
use crate::populate::{populate, Population};
use crate::prelude::{println, *};
use crate::workbook::{export, import, Sheet, Workbook};

#[derive(Debug, Clone, clap::Args)]
pub struct App {
    /// Working directory holding the Reverse Trace (defaults to the current one)
    #[clap(long)]
    pub dir: Option<PathBuf>,

    /// Owning lab, used to locate the OOT folder
    #[clap(long, requires_all = ["uid", "year"])]
    pub lab: Option<String>,

    /// UID of the OOT folder
    #[clap(long, requires_all = ["lab", "year"])]
    pub uid: Option<String>,

    /// Year folder the OOT lives in
    #[clap(long, requires_all = ["lab", "uid"])]
    pub year: Option<i32>,

    /// Template workbook
    #[clap(long, env = "AUTO_OOT_TEMPLATE")]
    pub template: Option<PathBuf>,

    /// Logo embedded in every analysis sheet
    #[clap(long, env = "AUTO_OOT_LOGO")]
    pub logo: Option<PathBuf>,

    /// Import the datasheet PDF and build one sheet per failing parameter
    #[clap(long, default_value = "false")]
    pub import_datasheet: bool,

    /// Section detection strategy for the datasheet
    #[clap(long)]
    pub strategy: Option<Strategy>,

    /// Output file (defaults to <dir>/OOT_<UID>.xlsx)
    #[clap(long)]
    pub output: Option<PathBuf>,
}

impl App {
    fn site_request(&self) -> Option<SiteRequest> {
        match (&self.lab, &self.uid, self.year) {
            (Some(lab), Some(uid), Some(year)) => Some(SiteRequest {
                lab: lab.clone(),
                uid: uid.clone(),
                year,
            }),
            _ => None,
        }
    }
}

/// Resolved inputs of one run.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub dir: PathBuf,
    pub uid: String,
    pub template: PathBuf,
    pub logo: PathBuf,
    /// Set when the datasheet should be imported.
    pub datasheet: Option<PathBuf>,
    pub strategy: Strategy,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub output: PathBuf,
    pub population: Population,
    pub datasheet_rows: usize,
    pub parameters: usize,
    pub sheets: Vec<String>,
    /// Sheet the workbook opens on.
    pub active: String,
}

/// Find the working directory, creating the OOT folder when it was located
/// through `--lab/--uid/--year` and does not exist yet.
pub fn working_dir(app: &App, config: &Config) -> Result<WorkingDir> {
    let dir = match &app.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().wrap_err("Failed to read the current directory")?,
    };
    let trace_file = &config.files.reverse_trace;
    let request = app.site_request();

    let wd = resolve(
        &dir,
        trace_file,
        dir.join(trace_file).is_file(),
        request.as_ref(),
        &config.paths.oots_root,
        |site| site.is_dir(),
    )?;

    if wd.create {
        fs::create_dir_all(&wd.dir)
            .wrap_err_with(|| format!("Failed to create {}", wd.dir.display()))?;
        step("Created", wd.dir.display());
    }

    Ok(wd)
}

fn inputs(app: &App, config: &Config, wd: WorkingDir) -> Inputs {
    let output = app
        .output
        .clone()
        .unwrap_or_else(|| wd.dir.join(config.files.output_file_name(&wd.uid)));
    let datasheet = app
        .import_datasheet
        .then(|| wd.dir.join(&config.files.datasheet));

    Inputs {
        template: app.template.clone().unwrap_or_else(|| config.paths.template.clone()),
        logo: app.logo.clone().unwrap_or_else(|| config.paths.logo.clone()),
        datasheet,
        strategy: app.strategy.unwrap_or(config.datasheet.strategy),
        output,
        dir: wd.dir,
        uid: wd.uid,
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingInput(format!("{what} {} not found", path.display())).into())
    }
}

/// Replace any existing Datasheet sheet with the imported rows, first in the
/// workbook, with failures highlighted.
fn insert_datasheet(workbook: &mut Workbook, imported: &DatasheetImport, config: &Config) -> Result<()> {
    let name = &config.analysis.datasheet_sheet;
    if workbook.contains(name) {
        workbook.remove_sheet(name)?;
    }

    let mut sheet = Sheet::from_rows(name.as_str(), &imported.rows);
    sheet.add_conditional_format(datasheet_failure_rule(
        config.datasheet.result_column,
        imported.rows.len() as u32,
    ));
    workbook.insert_sheet(sheet, Some(0))?;
    Ok(())
}

/// Parameter sheets for every flagged parameter. Returns their names.
fn parameter_sheets(
    workbook: &mut Workbook,
    imported: &DatasheetImport,
    config: &Config,
    last_row: u32,
    logo: &Path,
) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for parameter in imported.report.flagged() {
        let name = add_parameter_sheet(workbook, parameter, &config.analysis, last_row, Some(logo))?;
        step("Sheet", &name);
        names.push(name);
    }
    Ok(names)
}

/// Build and save the output workbook.
pub fn execute(inputs: &Inputs, config: &Config, today: NaiveDate) -> Result<Summary> {
    let trace_path = inputs.dir.join(&config.files.reverse_trace);
    require_file(&inputs.template, "template")?;
    require_file(&trace_path, "Reverse Trace")?;

    let imported = inputs
        .datasheet
        .as_ref()
        .map(|pdf| datasheet::import(pdf, config, inputs.strategy));

    assemble(inputs, config, today, imported)
}

/// Everything after the datasheet import: `imported` is `None` when no
/// import was requested and an error when it failed.
fn assemble(
    inputs: &Inputs,
    config: &Config,
    today: NaiveDate,
    imported: Option<Result<DatasheetImport>>,
) -> Result<Summary> {
    let trace_path = inputs.dir.join(&config.files.reverse_trace);
    let mut workbook = import::load(&inputs.template)?;
    let trace = import::load_sheet(&trace_path, &config.trace.sheet)
        .wrap_err_with(|| format!("Failed to read {}", trace_path.display()))?;

    let population = populate(&mut workbook, &trace, config, today)?;
    step(
        "Populated",
        format!("{} asset(s), {} visible row(s)", population.asset_count, population.visible_rows),
    );

    let mut datasheet_rows = 0;
    let mut parameters = 0;
    let mut generated = Vec::new();

    if let Some(outcome) = imported {
        match outcome {
            Ok(imported) => {
                insert_datasheet(&mut workbook, &imported, config)?;
                datasheet_rows = imported.rows.len();
                parameters = imported.report.parameters.len();
                step(
                    "Datasheet",
                    format!("{datasheet_rows} row(s), {} flagged", imported.report.flagged().len()),
                );
                generated = parameter_sheets(
                    &mut workbook,
                    &imported,
                    config,
                    population.last_row,
                    &inputs.logo,
                )?;
            }
            Err(err) => {
                log::warn!("datasheet import failed: {err:#}");
                skipped("Datasheet", format!("{err}; parameter sheets skipped"));
            }
        }
    }

    let template_sheet = &config.analysis.template_sheet;
    match generated.first() {
        Some(first) => {
            workbook.remove_sheet(template_sheet)?;
            workbook.set_active(first)?;
        }
        None => {
            dress(
                workbook.sheet_mut(template_sheet)?,
                &config.analysis,
                population.last_row,
                Some(&inputs.logo),
            );
            workbook.set_active(template_sheet)?;
        }
    }

    export::save(&workbook, &inputs.output)?;
    step("Saved", inputs.output.display());

    let sheets = workbook.sheet_names();
    let active = sheets.get(workbook.active_index()).cloned().unwrap_or_default();

    Ok(Summary {
        output: inputs.output.clone(),
        population,
        datasheet_rows,
        parameters,
        sheets,
        active,
    })
}

pub fn run(app: App, config: &Config, global: crate::Global) -> Result<()> {
    let wd = working_dir(&app, config)?;
    log::info!("working in {} (UID {})", wd.dir.display(), wd.uid);

    let inputs = inputs(&app, config, wd);
    let summary = execute(&inputs, config, chrono::Local::now().date_naive())?;

    if global.verbose {
        let mut table = new_table();
        table.add_row(prettytable::row!["UID".bold().cyan(), inputs.uid]);
        table.add_row(prettytable::row!["Assets".bold().cyan(), summary.population.asset_count]);
        table.add_row(prettytable::row!["Last row".bold().cyan(), summary.population.last_row]);
        table.add_row(prettytable::row!["Visible".bold().cyan(), summary.population.visible_rows]);
        table.add_row(prettytable::row!["Datasheet rows".bold().cyan(), summary.datasheet_rows]);
        table.add_row(prettytable::row!["Parameters".bold().cyan(), summary.parameters]);
        table.add_row(prettytable::row!["Sheets".bold().cyan(), summary.sheets.join(", ")]);
        table.add_row(prettytable::row!["Active".bold().cyan(), summary.active]);
        table.printstd();
    }

    println!("{}", summary.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auto_oot_core::grid::{CellValue, Grid};

    fn app() -> App {
        App {
            dir: None,
            lab: None,
            uid: None,
            year: None,
            template: None,
            logo: None,
            import_datasheet: false,
            strategy: None,
            output: None,
        }
    }

    fn write_template(path: &Path) {
        let mut wb = Workbook::new();
        wb.create_sheet("Impact Analysis", None)
            .unwrap()
            .set_value(9, 1, "Asset".into());
        wb.create_sheet("Reverse Trace", None).unwrap();
        export::save(&wb, path).unwrap();
    }

    fn write_trace(path: &Path) {
        let mut wb = Workbook::new();
        let sheet = wb.create_sheet("Reverse Trace - UID", None).unwrap();
        sheet.write_row(1, 1, &["Header".into()]);
        sheet.set_value(2, 4, "U-42".into());
        sheet.set_value(2, 10, "A-1".into());
        sheet.set_value(2, 11, "Scope".into());
        sheet.set_value(3, 10, "A-2".into());
        sheet.set_value(3, 11, "Probe".into());
        export::save(&wb, path).unwrap();
    }

    /// A `<tmp>/U-42` folder holding the trace, plus a template next to it.
    fn fixture(dir: &Path) -> Inputs {
        let oot = dir.join("U-42");
        fs::create_dir_all(&oot).unwrap();
        write_trace(&oot.join("Reverse Trace.xlsx"));
        let template = dir.join("template.xlsx");
        write_template(&template);

        Inputs {
            output: oot.join("OOT_U-42.xlsx"),
            dir: oot,
            uid: "U-42".into(),
            template,
            logo: dir.join("logo.png"),
            datasheet: None,
            strategy: Strategy::Geometric,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn site_request_needs_all_parts() {
        let mut app = app();
        app.lab = Some("LabA".into());
        app.uid = Some("U-7".into());
        assert!(app.site_request().is_none());
        app.year = Some(2024);
        assert_eq!(app.site_request().unwrap().year, 2024);
    }

    #[test]
    fn working_dir_from_trace_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = fixture(tmp.path());

        let mut app = app();
        app.dir = Some(inputs.dir.clone());
        let wd = working_dir(&app, &Config::default()).unwrap();
        assert_eq!(wd.uid, "U-42");
        assert!(!wd.create);
    }

    #[test]
    fn working_dir_is_created_for_site_request() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.oots_root = tmp.path().to_path_buf();

        let mut app = app();
        app.dir = Some(tmp.path().to_path_buf());
        app.lab = Some("LabA".into());
        app.uid = Some("U-7".into());
        app.year = Some(2024);

        let wd = working_dir(&app, &config).unwrap();
        assert_eq!(wd.dir, tmp.path().join("2024").join("LabA").join("U-7"));
        assert!(wd.dir.is_dir());
    }

    #[test]
    fn working_dir_without_trace_or_request_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = app();
        app.dir = Some(tmp.path().to_path_buf());
        assert!(working_dir(&app, &Config::default()).is_err());
    }

    #[test]
    fn default_output_is_named_after_uid() {
        let mut app = app();
        app.import_datasheet = true;
        let wd = WorkingDir {
            dir: PathBuf::from("/oots/U-9"),
            uid: "U-9".into(),
            create: false,
        };
        let inputs = inputs(&app, &Config::default(), wd);
        assert_eq!(inputs.output, PathBuf::from("/oots/U-9/OOT_U-9.xlsx"));
        assert_eq!(inputs.datasheet, Some(PathBuf::from("/oots/U-9/DS.pdf")));
    }

    #[test]
    fn run_without_datasheet_keeps_template_sheet() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = fixture(tmp.path());

        let summary = execute(&inputs, &Config::default(), today()).unwrap();
        assert_eq!(summary.sheets, vec!["Impact Analysis", "Reverse Trace"]);
        assert_eq!(summary.active, "Impact Analysis");
        assert_eq!(summary.population.last_row, 11);

        let out = import::load(&inputs.output).unwrap();
        let sheet = out.sheet("Impact Analysis").unwrap();
        assert_eq!(sheet.value(1, 4), Some(&CellValue::from("U-42")));
        // Sorted by product: Probe before Scope.
        assert_eq!(sheet.value(10, 1), Some(&CellValue::from("A-2")));
        assert_eq!(sheet.value(11, 1), Some(&CellValue::from("A-1")));
    }

    #[test]
    fn missing_datasheet_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = fixture(tmp.path());
        inputs.datasheet = Some(inputs.dir.join("DS.pdf"));

        let summary = execute(&inputs, &Config::default(), today()).unwrap();
        assert_eq!(summary.datasheet_rows, 0);
        assert!(inputs.output.is_file());
    }

    #[test]
    fn corrupt_datasheet_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = fixture(tmp.path());
        let pdf = inputs.dir.join("DS.pdf");
        fs::write(&pdf, b"not a pdf").unwrap();
        inputs.datasheet = Some(pdf);

        let summary = execute(&inputs, &Config::default(), today()).unwrap();
        assert_eq!(summary.datasheet_rows, 0);
        assert_eq!(summary.sheets, vec!["Impact Analysis", "Reverse Trace"]);
        assert_eq!(summary.active, "Impact Analysis");
        assert!(inputs.output.is_file());
    }

    fn raw(cells: &[&str]) -> pdf::RawRow {
        cells
            .iter()
            .map(|c| Some(c.to_string()).filter(|c| !c.is_empty()))
            .collect()
    }

    /// Two failing sections, one of them titled with quotes.
    fn flagged_import(config: &Config) -> DatasheetImport {
        let body = vec![
            raw(&["Function", "Spec", "Measured", "Result"]),
            raw(&["Voltage Accuracy", "", "", ""]),
            raw(&["1 V", "1%", "0.5%", "Pass"]),
            raw(&["'Gain'", "", "", ""]),
            raw(&["x10", "1%", "2%", "Fail"]),
            raw(&["Frequency Response", "", "", ""]),
            raw(&["1 MHz", "3 dB", "4 dB", "Fail"]),
            raw(&["Decision Rule", "Simple acceptance", "", ""]),
        ];
        datasheet::analyze(body, Vec::new(), config, Strategy::Keyword)
    }

    #[test]
    fn flagged_parameters_replace_template_sheet() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = fixture(tmp.path());
        let config = Config::default();
        let imported = flagged_import(&config);
        assert_eq!(imported.report.flagged(), vec!["'Gain'", "Frequency Response"]);

        let summary = assemble(&inputs, &config, today(), Some(Ok(imported))).unwrap();
        assert_eq!(
            summary.sheets,
            vec!["Datasheet", "Reverse Trace", "Gain", "Frequency Response"]
        );
        assert_eq!(summary.active, "Gain");
        assert_eq!(summary.datasheet_rows, 7);

        let out = import::load(&inputs.output).unwrap();
        assert_eq!(out.sheet_names()[0], "Datasheet");
        assert!(!out.contains("Impact Analysis"));
        let gain = out.sheet("Gain").unwrap();
        assert_eq!(gain.value(1, 4), Some(&CellValue::from("U-42")));
    }

    #[test]
    fn missing_template_aborts_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = fixture(tmp.path());
        inputs.template = tmp.path().join("FSMOOTSIA.xlsm");

        let err = execute(&inputs, &Config::default(), today()).unwrap_err();
        assert!(err.to_string().contains("template"));
        assert!(!inputs.output.exists());
    }

    #[test]
    fn imported_datasheet_becomes_first_sheet() {
        let mut wb = Workbook::new();
        wb.create_sheet("Impact Analysis", None).unwrap();
        wb.create_sheet("Datasheet", None)
            .unwrap()
            .set_value(1, 1, "old".into());

        let imported = DatasheetImport {
            rows: vec![vec!["Function".into(), "".into(), "".into(), "Result".into()]],
            bars: Vec::new(),
            report: Default::default(),
        };
        insert_datasheet(&mut wb, &imported, &Config::default()).unwrap();

        assert_eq!(wb.sheet_names(), vec!["Datasheet", "Impact Analysis"]);
        let ds = wb.sheet("Datasheet").unwrap();
        assert_eq!(ds.value(1, 1), Some(&CellValue::from("Function")));
        assert_eq!(ds.conditional_formats().len(), 1);
    }
}
