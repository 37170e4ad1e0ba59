//! CLI binary for pdfsplit.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SplitConfig` and prints the produced paths.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfsplit::{
    split, DetectionMode, ProgressCallback, SplitConfig, SplitOutput, SplitPolicy,
    SplitProgressCallback,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback. Pages finish out of order in image modes, so
/// the bar only counts; separator hits are printed above it as they come in.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_scan_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    /// Name the preparation step once the job is known.
    fn preparing(&self, config: &SplitConfig) {
        self.bar.set_message(preparing_message(config));
    }

    /// Clear the spinner when the run ends without `on_split_complete`.
    fn abandon(&self) {
        self.bar.finish_and_clear();
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Scanning");
        self.bar.set_message("");
        self.bar.reset_eta();
    }
}

/// What happens before scanning starts: either the Ghostscript rewrite or
/// just opening the source.
fn preparing_message(config: &SplitConfig) -> &'static str {
    if config.needs_rewrite() {
        "Rewriting PDF…"
    } else {
        "Opening PDF…"
    }
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_scan_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_scanned(&self, page_num: usize, total_pages: usize, marker: Option<&str>) {
        if let Some(marker) = marker {
            let label = if marker.is_empty() {
                dim("(no postfix)")
            } else {
                bold(marker)
            };
            self.bar.println(format!(
                "  {} Separator on page {:>3}/{:<3}  {}",
                cyan("◆"),
                page_num,
                total_pages,
                label
            ));
        }
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_segment_written(&self, path: &Path) {
        self.bar.set_prefix("Writing");
        self.bar.println(format!(
            "  {} {}",
            green("✓"),
            dim(&path.display().to_string())
        ));
    }

    fn on_split_complete(&self, files_written: usize, markers_found: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        if errors == 0 {
            eprintln!(
                "{} {} file(s) written, {} separator(s) found",
                green("✔"),
                bold(&files_written.to_string()),
                markers_found
            );
        } else {
            eprintln!(
                "{} {} file(s) written, {} separator(s) found  ({} page(s) could not be scanned)",
                cyan("⚠"),
                bold(&files_written.to_string()),
                markers_found,
                red(&errors.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split at QR codes reading "NEXT", separator pages are dropped
  pdfsplit scans/batch.pdf

  # Keep separator pages as the first page of each document; use
  # "NEXT|<name>" payloads to name the output files
  pdfsplit --sticker-mode scans/batch.pdf

  # Any barcode symbology, only look at the top-left quarter of each image
  pdfsplit -m barcode -a 0.5 scans/batch.pdf

  # Text-layer keyword, no Ghostscript needed
  pdfsplit -m keyword -s "--- SEPARATOR ---" letters.pdf

  # Write outputs plus .txt sidecars elsewhere, without the source name prefix
  pdfsplit -d --extract-text -o out/ scans/batch.pdf

OUTPUT NAMES:
  <source stem>_<postfix>.pdf, where <postfix> is the code's custom value or
  a 4-digit running number. With --drop-filename only <postfix>.pdf.
  Without any separator the source is copied to the output folder unchanged.

ENVIRONMENT VARIABLES:
  PDFSPLIT_*       Every option can be set through its PDFSPLIT_ variable
  PDFIUM_LIB_PATH  Path to an existing libpdfium
  RUST_LOG         Overrides --log (e.g. RUST_LOG=pdfsplit=debug)
"#;

/// Split scanned PDF batches at QR code, barcode or keyword separator pages.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsplit",
    version,
    about = "Split scanned PDF batches at QR code, barcode or keyword separator pages",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to split.
    input: PathBuf,

    /// Token a separator code (or page text) must carry.
    #[arg(short, long, env = "PDFSPLIT_SEPARATOR", default_value = pdfsplit::config::DEFAULT_SEPARATOR)]
    separator: String,

    /// What marks a separator page.
    #[arg(short, long, env = "PDFSPLIT_MODE", value_enum, ignore_case = true, default_value = "qr")]
    mode: ModeArg,

    /// Keep separator pages as the first page of each output document.
    #[arg(long, env = "PDFSPLIT_STICKER_MODE")]
    sticker_mode: bool,

    /// Do not prefix output names with the source file name.
    #[arg(short, long, env = "PDFSPLIT_DROP_FILENAME")]
    drop_filename: bool,

    /// Concurrent page scans (0 = one less than the number of CPUs).
    #[arg(short, long, env = "PDFSPLIT_WORKERS", default_value_t = 0)]
    workers: usize,

    /// Scan the source as-is instead of a Ghostscript-rewritten copy.
    #[arg(long, env = "PDFSPLIT_SKIP_REWRITE")]
    skip_rewrite: bool,

    /// Fraction of each image, from its top-left corner, searched for a code.
    #[arg(
        short,
        long,
        env = "PDFSPLIT_AREA_FACTOR",
        default_value = "1.0",
        value_parser = ["0.25", "0.5", "0.75", "1.0"]
    )]
    area_factor: String,

    /// Write a .txt file with the extracted text next to every output PDF.
    #[arg(long, env = "PDFSPLIT_EXTRACT_TEXT")]
    extract_text: bool,

    /// Folder for output files (default: the source's folder).
    #[arg(short, long, env = "PDFSPLIT_OUTPUT_FOLDER")]
    output_folder: Option<PathBuf>,

    /// Log level.
    #[arg(long, env = "PDFSPLIT_LOG", value_enum, ignore_case = true, default_value = "WARNING")]
    log: LogArg,

    /// Ghostscript executable used for the rewrite step.
    #[arg(long, env = "PDFSPLIT_GS", default_value = pdfsplit::config::DEFAULT_REWRITE_COMMAND)]
    gs: String,

    /// Print the full result as JSON instead of one path per line.
    #[arg(long, env = "PDFSPLIT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSPLIT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Qr,
    Barcode,
    Keyword,
}

impl From<ModeArg> for DetectionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Qr => DetectionMode::Qr,
            ModeArg::Barcode => DetectionMode::Barcode,
            ModeArg::Keyword => DetectionMode::Keyword,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogArg {
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "INFO")]
    Info,
    #[value(name = "DEBUG")]
    Debug,
}

impl LogArg {
    fn filter(self) -> &'static str {
        match self {
            LogArg::Warning => "warn",
            LogArg::Info => "info",
            LogArg::Debug => "debug",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log.filter())),
        )
        .with_writer(io::stderr)
        .init();

    // The bar would fight with log lines below WARNING.
    let show_progress = !cli.no_progress && !cli.json && cli.log == LogArg::Warning;
    let progress = show_progress.then(CliProgressCallback::new_dynamic);

    let outcome = run(&cli, progress.clone()).await;
    if outcome.is_err() {
        if let Some(ref cb) = progress {
            cb.abandon();
        }
    }
    let output = outcome?;

    print_output(&cli, &output)?;
    Ok(())
}

async fn run(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<SplitOutput> {
    let config = build_config(cli, progress.clone().map(|cb| cb as ProgressCallback))?;
    if let Some(ref cb) = progress {
        cb.preparing(&config);
    }

    // ── Run split ────────────────────────────────────────────────────────
    split(&cli.input, &config)
        .await
        .with_context(|| format!("Failed to split '{}'", cli.input.display()))
}

/// Map CLI args to `SplitConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitConfig> {
    let area_factor: f32 = cli
        .area_factor
        .parse()
        .with_context(|| format!("Invalid area factor '{}'", cli.area_factor))?;
    let policy = if cli.sticker_mode {
        SplitPolicy::Sticker
    } else {
        SplitPolicy::Drop
    };

    let mut builder = SplitConfig::builder()
        .separator(cli.separator.clone())
        .mode(cli.mode.into())
        .policy(policy)
        .drop_filename(cli.drop_filename)
        .workers(cli.workers)
        .skip_rewrite(cli.skip_rewrite)
        .area_factor(area_factor)
        .extract_text(cli.extract_text)
        .rewrite_command(cli.gs.clone())
        .quiet_rewrite(cli.log != LogArg::Debug);

    if let Some(ref dir) = cli.output_folder {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_output(cli: &Cli, output: &SplitOutput) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
        return Ok(());
    }

    for path in &output.files {
        writeln!(handle, "{}", path.display()).context("Failed to write to stdout")?;
    }

    for failed in output.segments.iter().filter(|s| !s.is_written()) {
        if let Some(ref e) = failed.error {
            eprintln!("{} {}", red("✗"), e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_map_to_drop_qr() {
        let cli = Cli::try_parse_from(["pdfsplit", "in.pdf"]).unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.mode, DetectionMode::Qr);
        assert_eq!(config.policy, SplitPolicy::Drop);
        assert_eq!(config.separator, "NEXT");
        assert_eq!(config.area_factor, 1.0);
        assert!(config.quiet_rewrite);
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "pdfsplit",
            "-m",
            "KEYWORD",
            "-s",
            "SPLIT",
            "--sticker-mode",
            "-d",
            "-a",
            "0.25",
            "-o",
            "/tmp/out",
            "--log",
            "debug",
            "in.pdf",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.mode, DetectionMode::Keyword);
        assert_eq!(config.policy, SplitPolicy::Sticker);
        assert_eq!(config.separator, "SPLIT");
        assert!(config.drop_filename);
        assert_eq!(config.area_factor, 0.25);
        assert_eq!(config.output_dir.as_deref(), Some(Path::new("/tmp/out")));
        assert!(!config.quiet_rewrite);
    }

    #[test]
    fn preparing_message_follows_rewrite_decision() {
        let message = |args: &[&str]| {
            let cli = Cli::try_parse_from(args).unwrap();
            preparing_message(&build_config(&cli, None).unwrap())
        };
        assert_eq!(message(&["pdfsplit", "in.pdf"]), "Rewriting PDF…");
        assert_eq!(message(&["pdfsplit", "-m", "BARCODE", "in.pdf"]), "Rewriting PDF…");
        assert_eq!(message(&["pdfsplit", "--skip-rewrite", "in.pdf"]), "Opening PDF…");
        assert_eq!(message(&["pdfsplit", "-m", "KEYWORD", "in.pdf"]), "Opening PDF…");
    }

    #[test]
    fn abandoned_spinner_is_cleared() {
        let cb = CliProgressCallback::new_dynamic();
        assert!(!cb.bar.is_finished());
        cb.abandon();
        assert!(cb.bar.is_finished());
    }

    #[test]
    fn area_factor_is_restricted() {
        assert!(Cli::try_parse_from(["pdfsplit", "-a", "0.3", "in.pdf"]).is_err());
    }
}
