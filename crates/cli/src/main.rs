// smeta CLI - headless materials pricing reconciliation
//
// pivot:   load estimate spreadsheets, print/export the pivot views
// compare: pivot + comparison against a reference rate list
// import:  reconcile a rate-list file into the persisted rate table
// rates:   inspect/maintain the persisted rate table

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use smeta_core::RateScope;
use smeta_recon::config::ParseConfig;
use smeta_recon::import::RateStore;
use smeta_recon::model::{Decision, ImportReport, RateRecord, RowTable, RunMeta};
use smeta_recon::Dataset;
use smeta_io::store::SqliteRateStore;

use exit_codes::{EXIT_DIFFS, EXIT_ERROR, EXIT_PARSE, EXIT_PARTIAL_COMMIT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "smeta")]
#[command(about = "Materials pricing reconciliation (headless)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML parse config overriding header markers / column layout
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate estimate spreadsheets into pivot views
    #[command(after_help = "\
Examples:
  smeta pivot смета1.xlsx смета2.xlsx
  smeta pivot смета.xlsx --json
  smeta pivot смета.xlsx --output сводная.xlsx")]
    Pivot {
        /// Estimate files (xlsx/xls/ods/csv), 6-column shape
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write the views as an xlsx workbook
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Pivot plus comparison against one reference rate list
    #[command(after_help = "\
Examples:
  smeta compare смета.xlsx --rates бсм.xlsx
  smeta compare смета.xlsx --db расценки.sqlite --object 3
  smeta compare смета.xlsx --rates бсм.csv --json --output отчёт.xlsx")]
    Compare {
        /// Estimate files (xlsx/xls/ods/csv), 6-column shape
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Reference rate list file (3-4 column shape)
        #[arg(long, conflicts_with = "db")]
        rates: Option<PathBuf>,

        /// Read the reference rates from a SQLite rate table instead
        #[arg(long, requires = "scope")]
        db: Option<PathBuf>,

        /// Object id scoping the db rates
        #[arg(long, group = "scope")]
        object: Option<i64>,

        /// Counterparty id scoping the db rates
        #[arg(long, group = "scope")]
        counterparty: Option<i64>,

        /// Output JSON to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write views + comparison as an xlsx workbook
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Reconcile a rate-list file into the persisted rate table
    #[command(after_help = "\
Examples:
  smeta import прайс.xlsx --db расценки.sqlite --object 3 --dry-run
  smeta import прайс.xlsx --db расценки.sqlite --object 3
  smeta import прайс.xlsx --db расценки.sqlite --counterparty 7 --apply update")]
    Import {
        /// Rate-list file (3-4 column shape)
        file: PathBuf,

        /// SQLite rate table
        #[arg(long)]
        db: PathBuf,

        /// Object id scoping the rates
        #[arg(long, group = "scope")]
        object: Option<i64>,

        /// Counterparty id scoping the rates
        #[arg(long, group = "scope")]
        counterparty: Option<i64>,

        /// Bulk decision for every price conflict (default: keep)
        #[arg(long, value_enum)]
        apply: Option<ApplyMode>,

        /// Analyze and report only; never touch the store
        #[arg(long)]
        dry_run: bool,

        /// Output the report/tally as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or maintain the persisted rate table
    Rates {
        #[command(subcommand)]
        command: RatesCommands,
    },
}

#[derive(Subcommand)]
enum RatesCommands {
    /// List all rates within one scope
    List {
        #[arg(long)]
        db: PathBuf,
        #[arg(long, group = "scope")]
        object: Option<i64>,
        #[arg(long, group = "scope")]
        counterparty: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Remove rates by id
    Remove {
        #[arg(long)]
        db: PathBuf,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ApplyMode {
    /// Keep every existing price (conflicts are skipped)
    Keep,
    /// Overwrite every conflicting price with the imported one
    Update,
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let parse_config = match load_parse_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return report(Err(e)),
    };

    let result = match cli.command {
        Commands::Pivot { files, json, output } => cmd_pivot(files, json, output, &parse_config),
        Commands::Compare { files, rates, db, object, counterparty, json, output } => {
            cmd_compare(files, rates, db, object, counterparty, json, output, &parse_config)
        }
        Commands::Import { file, db, object, counterparty, apply, dry_run, json } => {
            cmd_import(file, db, object, counterparty, apply, dry_run, json, &parse_config)
        }
        Commands::Rates { command } => match command {
            RatesCommands::List { db, object, counterparty, json } => {
                cmd_rates_list(db, object, counterparty, json)
            }
            RatesCommands::Remove { db, ids } => cmd_rates_remove(db, ids),
        },
    };

    report(result)
}

fn report(result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared loading
// ---------------------------------------------------------------------------

fn load_parse_config(path: Option<&Path>) -> Result<ParseConfig, CliError> {
    match path {
        None => Ok(ParseConfig::default()),
        Some(path) => {
            let toml_str = std::fs::read_to_string(path)
                .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))?;
            ParseConfig::from_toml(&toml_str).map_err(|e| CliError::args(e.to_string()))
        }
    }
}

/// Decode one source file into a RowTable: csv by extension, otherwise
/// Excel via calamine.
fn load_table(path: &Path) -> Result<RowTable, CliError> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        smeta_io::csv::read_table(path)
            .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))
    } else {
        smeta_io::xlsx::read_table(path)
            .map(|(table, _)| table)
            .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_dataset(files: &[PathBuf], config: &ParseConfig) -> Result<Dataset, CliError> {
    let mut dataset = Dataset::new();
    for path in files {
        let table = load_table(path)?;
        let parsed = smeta_recon::parse_rows(&table, &file_name(path), config)
            .map_err(|e| CliError::parse(e.to_string()))?;
        dataset
            .add_file(&file_name(path), parsed.rows)
            .map_err(|e| CliError::args(e.to_string()))?;
    }
    Ok(dataset)
}

fn scope_from_args(object: Option<i64>, counterparty: Option<i64>) -> Result<RateScope, CliError> {
    match (object, counterparty) {
        (Some(id), None) => Ok(RateScope::Object(id)),
        (None, Some(id)) => Ok(RateScope::Counterparty(id)),
        _ => Err(CliError::args("exactly one of --object or --counterparty is required")),
    }
}

// ---------------------------------------------------------------------------
// pivot
// ---------------------------------------------------------------------------

fn cmd_pivot(
    files: Vec<PathBuf>,
    json: bool,
    output: Option<PathBuf>,
    config: &ParseConfig,
) -> Result<(), CliError> {
    let dataset = load_dataset(&files, config)?;
    let views = dataset.views();
    let meta = RunMeta::now();

    if let Some(ref path) = output {
        let stats = smeta_io::export::export_views(views, None, &meta, path)
            .map_err(|e| CliError::general(e.to_string()))?;
        eprintln!("wrote {} ({} sheets)", path.display(), stats.sheets_exported);
    }

    if json {
        let doc = serde_json::json!({ "meta": &meta, "views": views });
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).map_err(|e| CliError::general(e.to_string()))?
        );
    }

    let s = &views.stats;
    eprintln!(
        "{} files, {} rows: {} positions ({} materials, {} works), {} without price, {} price conflicts, {} unit conflicts",
        dataset.files().len(),
        s.total_rows,
        s.bucket_count,
        s.material_count,
        s.work_count,
        s.zero_price_count,
        s.different_price_count,
        s.different_unit_count,
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_compare(
    files: Vec<PathBuf>,
    rates: Option<PathBuf>,
    db: Option<PathBuf>,
    object: Option<i64>,
    counterparty: Option<i64>,
    json: bool,
    output: Option<PathBuf>,
    config: &ParseConfig,
) -> Result<(), CliError> {
    let dataset = load_dataset(&files, config)?;
    let reference = load_reference(rates, db, object, counterparty, config)?;
    let comparison = smeta_recon::compare(&dataset.views().buckets, &reference);
    let meta = RunMeta::now();

    if let Some(ref path) = output {
        let stats =
            smeta_io::export::export_views(dataset.views(), Some(&comparison), &meta, path)
                .map_err(|e| CliError::general(e.to_string()))?;
        eprintln!("wrote {} ({} sheets)", path.display(), stats.sheets_exported);
    }

    if json {
        let doc = serde_json::json!({ "meta": &meta, "comparison": &comparison });
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).map_err(|e| CliError::general(e.to_string()))?
        );
    }

    let s = &comparison.stats;
    eprintln!(
        "compared {}: {} matched, {} different, {} not in reference; sums {:.2} vs {:.2} (diff {:.2})",
        s.compared + s.not_found,
        s.matched,
        s.different,
        s.not_found,
        s.total_current_sum,
        s.total_reference_sum,
        s.total_difference,
    );

    if s.different > 0 {
        return Err(CliError { code: EXIT_DIFFS, message: String::new(), hint: None });
    }
    Ok(())
}

fn load_reference(
    rates: Option<PathBuf>,
    db: Option<PathBuf>,
    object: Option<i64>,
    counterparty: Option<i64>,
    config: &ParseConfig,
) -> Result<Vec<RateRecord>, CliError> {
    match (rates, db) {
        (Some(path), None) => {
            let table = load_table(&path)?;
            let candidates = smeta_recon::parse_rate_rows(&table, &file_name(&path), config)
                .map_err(|e| CliError::parse(e.to_string()))?;
            // a file-based rate list has no persisted identity; ids are
            // synthetic and the scope is irrelevant to comparison
            Ok(candidates
                .into_iter()
                .enumerate()
                .map(|(i, c)| RateRecord {
                    id: i as i64 + 1,
                    scope: RateScope::Object(0),
                    name: c.name,
                    unit: c.unit,
                    price: c.price,
                })
                .collect())
        }
        (None, Some(path)) => {
            let scope = scope_from_args(object, counterparty)?;
            let store = SqliteRateStore::open(&path)
                .map_err(|e| CliError::general(e.to_string()))?;
            store.list(scope).map_err(|e| CliError::general(e.to_string()))
        }
        _ => Err(CliError::args("exactly one of --rates or --db is required")),
    }
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_import(
    file: PathBuf,
    db: PathBuf,
    object: Option<i64>,
    counterparty: Option<i64>,
    apply: Option<ApplyMode>,
    dry_run: bool,
    json: bool,
    config: &ParseConfig,
) -> Result<(), CliError> {
    let scope = scope_from_args(object, counterparty)?;
    let table = load_table(&file)?;
    let candidates = smeta_recon::parse_rate_rows(&table, &file_name(&file), config)
        .map_err(|e| CliError::parse(e.to_string()))?;

    let mut store =
        SqliteRateStore::open(&db).map_err(|e| CliError::general(e.to_string()))?;

    let mut report = smeta_recon::analyze(&candidates, scope, &store, &file_name(&file));
    print_report(&report);

    if dry_run {
        if json {
            print_json(&serde_json::json!({ "meta": RunMeta::now(), "report": &report }))?;
        }
        return Ok(());
    }

    if let Some(ApplyMode::Update) = apply {
        for conflict in &mut report.conflicts {
            conflict.decision = Decision::Update;
        }
    }

    let result = smeta_recon::commit(&report, &mut store);
    eprintln!(
        "committed: {} inserted, {} updated, {} skipped, {} errors",
        result.inserted,
        result.updated,
        result.skipped,
        result.errors.len(),
    );
    for error in &result.errors {
        eprintln!("  '{}': {}", error.name, error.message);
    }

    if json {
        print_json(&serde_json::json!({ "meta": RunMeta::now(), "report": &report, "result": &result }))?;
    }

    if !result.errors.is_empty() {
        return Err(CliError { code: EXIT_PARTIAL_COMMIT, message: String::new(), hint: None });
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    eprintln!(
        "'{}' ({}): {} parsed: {} new, {} unchanged, {} conflicts, {} lookup errors",
        report.source_file,
        report.scope,
        report.total_parsed,
        report.new_items.len(),
        report.same_items.len(),
        report.conflicts.len(),
        report.lookup_errors.len(),
    );
    for conflict in &report.conflicts {
        eprintln!(
            "  '{}': {:.2} -> {:.2} ({:+.2}, {:+.1}%)",
            conflict.candidate.name,
            conflict.existing_price,
            conflict.new_price,
            conflict.difference,
            conflict.percent_diff,
        );
    }
    for error in &report.lookup_errors {
        eprintln!("  lookup failed: {error}");
    }
}

fn print_json(doc: &serde_json::Value) -> Result<(), CliError> {
    println!(
        "{}",
        serde_json::to_string_pretty(doc).map_err(|e| CliError::general(e.to_string()))?
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// rates
// ---------------------------------------------------------------------------

fn cmd_rates_list(
    db: PathBuf,
    object: Option<i64>,
    counterparty: Option<i64>,
    json: bool,
) -> Result<(), CliError> {
    let scope = scope_from_args(object, counterparty)?;
    let store = SqliteRateStore::open(&db).map_err(|e| CliError::general(e.to_string()))?;
    let rates = store.list(scope).map_err(|e| CliError::general(e.to_string()))?;

    if json {
        print_json(&serde_json::json!({ "scope": scope, "rates": &rates }))?;
    } else {
        for rate in &rates {
            println!("{}\t{}\t{}\t{:.2}", rate.id, rate.name, rate.unit, rate.price);
        }
    }
    eprintln!("{} rates in {scope}", rates.len());
    Ok(())
}

fn cmd_rates_remove(db: PathBuf, ids: Vec<i64>) -> Result<(), CliError> {
    let mut store = SqliteRateStore::open(&db).map_err(|e| CliError::general(e.to_string()))?;
    let deleted = store
        .delete(&ids)
        .map_err(|e| CliError::general(e.to_string()))?;
    eprintln!("removed {deleted} of {} requested", ids.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn scope_requires_exactly_one_id() {
        assert!(scope_from_args(None, None).is_err());
        assert!(scope_from_args(Some(1), Some(2)).is_err());
        assert_eq!(scope_from_args(Some(3), None).unwrap(), RateScope::Object(3));
        assert_eq!(
            scope_from_args(None, Some(7)).unwrap(),
            RateScope::Counterparty(7)
        );
    }

    #[test]
    fn load_table_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "смета.csv", "Код;Наименование;Ед.;Объем;Цена;Цена\n");
        let table = load_table(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn missing_file_maps_to_parse_error() {
        let err = load_table(Path::new("/no/such/файл.xlsx")).unwrap_err();
        assert_eq!(err.code, EXIT_PARSE);
    }

    #[test]
    fn pivot_over_csv_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "смета.csv",
            "Код;Наименование;Ед.;Объем;Цена мат.;Цена раб.\n\
             М-1;Бетон B25;м3;10;4500;0\n\
             М-1;Бетон B25;м3;5;4500;0\n",
        );
        let dataset = load_dataset(&[path], &ParseConfig::default()).unwrap();
        let views = dataset.views();
        assert_eq!(views.stats.bucket_count, 1);
        assert_eq!(views.buckets[0].total_volume, 15.0);
    }

    #[test]
    fn import_dry_run_never_touches_store() {
        let dir = tempfile::tempdir().unwrap();
        let rates = write_csv(
            &dir,
            "прайс.csv",
            "Наименование;Ед.;Цена\nБетон B25;м3;4500\nАрматура А500;т;52000\n",
        );
        let db = dir.path().join("расценки.sqlite");
        cmd_import(
            rates,
            db.clone(),
            Some(3),
            None,
            None,
            true,
            false,
            &ParseConfig::default(),
        )
        .unwrap();

        let store = SqliteRateStore::open(&db).unwrap();
        assert!(store.list(RateScope::Object(3)).unwrap().is_empty());
    }

    #[test]
    fn import_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let rates = write_csv(
            &dir,
            "прайс.csv",
            "Наименование;Ед.;Цена\nБетон B25;м3;4500\nАрматура А500;т;52000\n",
        );
        let db = dir.path().join("расценки.sqlite");
        cmd_import(
            rates,
            db.clone(),
            Some(3),
            None,
            None,
            false,
            false,
            &ParseConfig::default(),
        )
        .unwrap();

        let store = SqliteRateStore::open(&db).unwrap();
        let listed = store.list(RateScope::Object(3)).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(store.list(RateScope::Counterparty(3)).unwrap().is_empty());
    }

    #[test]
    fn compare_with_differences_exits_nonzero() {
        let dir = tempfile::tempdir().unwrap();
        let estimate = write_csv(
            &dir,
            "смета.csv",
            "Код;Наименование;Ед.;Объем;Цена мат.;Цена раб.\n\
             М-1;Бетон B25;м3;10;4500;0\n",
        );
        let rates = write_csv(&dir, "бсм.csv", "Наименование;Ед.;Цена\nБетон B25;м3;4400\n");
        let err = cmd_compare(
            vec![estimate],
            Some(rates),
            None,
            None,
            None,
            false,
            None,
            &ParseConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, EXIT_DIFFS);
    }
}
