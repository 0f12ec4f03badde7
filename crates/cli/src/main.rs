// parqview CLI - headless table viewing and editing
// Every command drives an EditSession exactly as an interactive front end would.

mod exit_codes;
mod render;
mod util;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{debug, warn};
use parqview_config::Settings;
use parqview_engine::aggregate::format_total;
use parqview_engine::sort::SortState;
use parqview_engine::{CellRange, ColumnType, EditSession, SessionError, UnsavedChoice};
use parqview_io::FileSource;

use exit_codes::{session_exit_code, EXIT_SUCCESS, EXIT_USAGE};
use render::{render_table, RenderOptions};

#[derive(Parser)]
#[command(name = "parqview")]
#[command(about = "View and edit Parquet, CSV and TSV tables (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (defaults to <config dir>/parqview/settings.json)
    #[arg(long, global = true, env = "PARQVIEW_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a table with its totals footer
    #[command(after_help = "\
Examples:
  parqview peek sales.parquet
  parqview peek sales.parquet --filter region=north --sort amount:desc
  parqview peek big.csv --max-rows 20 --no-totals")]
    Peek {
        file: PathBuf,

        /// Keep rows whose displayed text contains PATTERN (case-insensitive). Repeatable.
        #[arg(long, value_name = "COLUMN=PATTERN")]
        filter: Vec<String>,

        /// Sort rows by a column
        #[arg(long, value_name = "COLUMN[:asc|desc]")]
        sort: Option<String>,

        /// Print at most N rows
        #[arg(long, value_name = "N")]
        max_rows: Option<usize>,

        /// Omit the totals footer
        #[arg(long)]
        no_totals: bool,

        /// Decimal places for float columns
        #[arg(long, value_name = "N")]
        decimals: Option<usize>,
    },

    /// Print per-column totals and statistics over the (filtered) rows
    Totals {
        file: PathBuf,

        #[arg(long, value_name = "COLUMN=PATTERN")]
        filter: Vec<String>,

        #[arg(long, value_name = "N")]
        decimals: Option<usize>,
    },

    /// Edit cells, rows and columns, then save
    #[command(after_help = "\
Examples:
  parqview edit sales.parquet --set 3:amount=1,500
  parqview edit sales.csv --add-column done:bool=false --delete-row 7
  parqview edit sales.parquet --set 1:region= -o fixed.parquet")]
    Edit {
        file: PathBuf,

        /// Assign a cell (ROW counts from 1; empty VALUE clears). Repeatable.
        #[arg(long = "set", value_name = "ROW:COLUMN=VALUE")]
        assignments: Vec<String>,

        /// Append a column with an optional default. Repeatable.
        #[arg(long, value_name = "NAME:TYPE[=DEFAULT]")]
        add_column: Vec<String>,

        /// Append an empty row. Repeatable.
        #[arg(long, action = clap::ArgAction::Count)]
        append_row: u8,

        /// Delete a row (counted from 1, before any deletion). Repeatable.
        #[arg(long, value_name = "ROW")]
        delete_row: Vec<usize>,

        /// Delete a column. Repeatable.
        #[arg(long, value_name = "COLUMN")]
        drop_column: Vec<String>,

        /// Write to this file instead of overwriting the input
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the result without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Convert between Parquet, CSV and TSV (format chosen by extension)
    Convert {
        input: PathBuf,
        output: PathBuf,

        /// Suppress the summary line
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// List recently opened files
    Recent {
        /// Forget all recent files
        #[arg(long)]
        clear: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ")",
        "\ntarget:  ",
        env!("TARGET"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let mut settings = Settings::load_from(&config_path);

    let result = match cli.command {
        Commands::Peek {
            file,
            filter,
            sort,
            max_rows,
            no_totals,
            decimals,
        } => cmd_peek(&mut settings, &file, &filter, sort.as_deref(), max_rows, !no_totals, decimals),
        Commands::Totals { file, filter, decimals } => cmd_totals(&mut settings, &file, &filter, decimals),
        Commands::Edit {
            file,
            assignments,
            add_column,
            append_row,
            delete_row,
            drop_column,
            output,
            dry_run,
        } => cmd_edit(
            &mut settings,
            &file,
            EditPlan {
                assignments: &assignments,
                add_columns: &add_column,
                append_rows: append_row as usize,
                delete_rows: &delete_row,
                drop_columns: &drop_column,
            },
            output.as_deref(),
            dry_run,
        ),
        Commands::Convert { input, output, quiet } => cmd_convert(&mut settings, &input, &output, quiet),
        Commands::Recent { clear } => cmd_recent(&mut settings, clear),
    };

    if let Err(e) = settings.save_to(&config_path) {
        warn!("settings not saved: {}", e);
    }

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Prefix the message with where it happened
    pub fn context(mut self, ctx: impl std::fmt::Display) -> Self {
        self.message = format!("{}: {}", ctx, self.message);
        self
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        let hint = match &err {
            SessionError::Load(parqview_engine::LoadError::UnsupportedFormat(_)) => {
                Some("supported extensions: .parquet .pq .csv .txt .tsv .tab".to_string())
            }
            _ => None,
        };
        Self {
            code: session_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }
}

/// Open a file in a fresh session and remember it as recent
fn open_session(settings: &mut Settings, path: &Path, decimals: Option<usize>) -> Result<EditSession, CliError> {
    let mut options = settings.to_session_options();
    if let Some(decimals) = decimals {
        options.display.float_decimals = decimals;
    }
    let mut session = EditSession::new(Box::new(FileSource), options);
    // A fresh session is never dirty, so the prompt is never consulted
    session.open(path, || UnsavedChoice::Cancel)?;
    settings.add_recent_file(&absolute(path));
    debug!("{}", session.title());
    Ok(session)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn apply_filters(session: &mut EditSession, filters: &[String]) -> Result<(), CliError> {
    for arg in filters {
        let (col, pattern) = util::parse_filter(arg).map_err(CliError::usage)?;
        let col = util::resolve_column(session.table(), col).map_err(CliError::usage)?;
        session.set_filter(col, pattern)?;
    }
    Ok(())
}

fn cmd_peek(
    settings: &mut Settings,
    file: &Path,
    filters: &[String],
    sort: Option<&str>,
    max_rows: Option<usize>,
    totals: bool,
    decimals: Option<usize>,
) -> Result<(), CliError> {
    let mut session = open_session(settings, file, decimals)?;
    apply_filters(&mut session, filters)?;
    if let Some(arg) = sort {
        let (col, direction) = util::parse_sort(arg).map_err(CliError::usage)?;
        let col = util::resolve_column(session.table(), col).map_err(CliError::usage)?;
        session.set_sort(SortState::by(col, direction))?;
    }
    print!("{}", render_table(&session, RenderOptions { max_rows, totals }));
    Ok(())
}

fn cmd_totals(
    settings: &mut Settings,
    file: &Path,
    filters: &[String],
    decimals: Option<usize>,
) -> Result<(), CliError> {
    let mut session = open_session(settings, file, decimals)?;
    apply_filters(&mut session, filters)?;

    let display = session.options().display.clone();
    let visible = session.visible_row_count();
    println!("column\ttype\tsum\tcount\taverage\tmin\tmax");
    for (col, column) in session.table().columns().iter().enumerate() {
        let Some(total) = session.totals().get(col).copied().flatten() else {
            continue;
        };
        let stats = session.selection_stats(CellRange::new(0, col, visible.saturating_sub(1), col));
        // Averages are never integral, so only sum/min/max keep the column's formatting
        let fmt = |v: Option<f64>| format_total(column.column_type, v, &display);
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            column.name,
            column.column_type,
            fmt(Some(total)),
            stats.numeric_count,
            format_total(ColumnType::Float, stats.average, &display),
            fmt(stats.min),
            fmt(stats.max),
        );
    }
    Ok(())
}

struct EditPlan<'a> {
    assignments: &'a [String],
    add_columns: &'a [String],
    append_rows: usize,
    delete_rows: &'a [usize],
    drop_columns: &'a [String],
}

impl EditPlan<'_> {
    fn is_empty(&self) -> bool {
        self.assignments.is_empty()
            && self.add_columns.is_empty()
            && self.append_rows == 0
            && self.delete_rows.is_empty()
            && self.drop_columns.is_empty()
    }
}

/// Columns are added first and rows appended next, so assignments can target them;
/// deletions run last and use the numbering seen before them.
fn cmd_edit(
    settings: &mut Settings,
    file: &Path,
    plan: EditPlan<'_>,
    output: Option<&Path>,
    dry_run: bool,
) -> Result<(), CliError> {
    if plan.is_empty() {
        return Err(CliError::usage("nothing to do")
            .with_hint("use --set, --add-column, --append-row, --delete-row or --drop-column"));
    }

    let mut session = open_session(settings, file, None)?;
    session.enable_editing();

    for arg in plan.add_columns {
        let (name, column_type, default) = util::parse_column_def(arg).map_err(CliError::usage)?;
        let at = session.table().column_count();
        session
            .insert_column(at, name, column_type, default.unwrap_or(""))
            .map_err(|e| CliError::from(e).context(format!("column '{}'", name)))?;
    }

    for _ in 0..plan.append_rows {
        let end = session.visible_row_count();
        session.insert_row(end)?;
    }

    for arg in plan.assignments {
        let a = util::parse_assignment(arg).map_err(CliError::usage)?;
        let col = util::resolve_column(session.table(), a.column).map_err(CliError::usage)?;
        session
            .edit_cell(a.row, col, a.value)
            .map_err(|e| CliError::from(e).context(format!("row {} column '{}'", a.row + 1, a.column)))?;
    }

    let drop_cols: BTreeSet<usize> = plan
        .drop_columns
        .iter()
        .map(|c| util::resolve_column(session.table(), c))
        .collect::<Result<_, _>>()
        .map_err(CliError::usage)?;

    if !plan.delete_rows.is_empty() {
        if plan.delete_rows.contains(&0) {
            return Err(CliError::usage("rows are counted from 1"));
        }
        let rows: BTreeSet<usize> = plan.delete_rows.iter().map(|r| r - 1).collect();
        session.delete_rows(&rows)?;
    }
    session.delete_columns(&drop_cols)?;

    let modified = session.modified_cells().len();
    if dry_run {
        print!("{}", render_table(&session, RenderOptions::default()));
        println!("{} cell(s) modified (dry run, nothing saved)", modified);
        return Ok(());
    }

    match output {
        Some(out) => {
            session.save_as(out)?;
            settings.add_recent_file(&absolute(out));
        }
        None => {
            session.save()?;
        }
    }
    let target = session.path().unwrap_or(file);
    println!("{} cell(s) modified, saved {}", modified, target.display());
    Ok(())
}

fn cmd_convert(settings: &mut Settings, input: &Path, output: &Path, quiet: bool) -> Result<(), CliError> {
    let mut session = open_session(settings, input, None)?;
    session.save_as(output)?;
    settings.add_recent_file(&absolute(output));
    if !quiet {
        println!(
            "wrote {} rows, {} columns to {}",
            session.table().row_count(),
            session.table().column_count(),
            output.display()
        );
    }
    Ok(())
}

fn cmd_recent(settings: &mut Settings, clear: bool) -> Result<(), CliError> {
    if clear {
        settings.recent_files.clear();
        return Ok(());
    }
    for path in settings.recent_files.iter() {
        println!("{}", path.display());
    }
    Ok(())
}
