// crates/pf_cli/src/args.rs
//
// Deterministic, offline CLI argument surface.
//
// - No networked paths (reject any scheme:// like http/https/file)
// - Every subcommand takes a --manifest; outputs land under --out
// - Seeds are u64 decimal or 0x-hex up to 16 nybbles
// - Sample fractions are comma-separated, each in (0, 1]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser, Clone)]
#[cfg_attr(test, derive(PartialEq))]
#[command(
    name = "pf",
    disable_help_subcommand = true,
    about = "Offline, deterministic election outcome prediction from partial results"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Sets a logging filter. Syntax is `<target>=<level>`, e.g. `--log pf_io=debug`.
    ///
    /// Log levels (least to most verbose) are error, warn, info, debug, and trace.
    /// Directives from RUST_LOG are kept; this one wins for the same target.
    #[arg(long, global = true, default_value = "info")]
    pub log: String,
}

#[derive(Debug, Subcommand, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub enum Command {
    /// Complete the partially counted dataset and write prediction.json.
    Predict(PredictArgs),
    /// Predict from seeded samples of a fully counted dataset and score the error.
    Backtest(BacktestArgs),
    /// Load and check every input without running the engine.
    Validate(ValidateArgs),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Render {
    Text,
    Json,
}

#[derive(Debug, clap::Args, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct PredictArgs {
    /// Manifest JSON naming the historical and current exports.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Output directory for prediction.json (default: current directory).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Report format(s) printed to stdout (default: text).
    #[arg(long, value_enum, value_delimiter = ',')]
    pub render: Vec<Render>,

    /// Match on shares only, overriding the manifest's participation_term.
    #[arg(long)]
    pub no_participation: bool,

    /// Print nothing to stdout; prediction.json is still written.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, clap::Args, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct BacktestArgs {
    /// Manifest JSON; its current dataset is taken as the complete truth.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Sample fractions in (0, 1], comma-separated.
    #[arg(long, required = true, value_delimiter = ',', value_parser = parse_fraction)]
    pub fractions: Vec<f64>,

    /// Sampling seed. Accepts decimal u64 or 0x-hex (≤16 hex digits).
    #[arg(long, default_value = "0", value_parser = parse_seed)]
    pub seed: u64,

    /// Report format printed to stdout.
    #[arg(long, value_enum, default_value = "text")]
    pub render: Render,

    #[arg(long)]
    pub no_participation: bool,
}

#[derive(Debug, clap::Args, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ValidateArgs {
    #[arg(long)]
    pub manifest: PathBuf,

    /// Print nothing on success.
    #[arg(long)]
    pub quiet: bool,
}

/// Errors surfaced by argument checks after clap parsing.
#[derive(Debug)]
pub enum ArgError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgError::NonLocalPath(p) => write!(f, "path must be local (no scheme): {p}"),
            ArgError::NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}
impl std::error::Error for ArgError {}

/// Seed parser: decimal u64 or 0x-hex (1..=16 nybbles).
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty seed".into());
    }
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("hex seed must be 1..16 hex digits".into());
        }
        u64::from_str_radix(rest, 16).map_err(|_| "hex seed out of range".into())
    } else {
        s.parse::<u64>().map_err(|_| "decimal seed must be a valid u64".into())
    }
}

pub fn parse_fraction(s: &str) -> Result<f64, String> {
    let f: f64 = s.trim().parse().map_err(|_| format!("not a number: {s}"))?;
    if f.is_finite() && f > 0.0 && f <= 1.0 {
        Ok(f)
    } else {
        Err(format!("fraction {s} outside (0, 1]"))
    }
}

/// Reject any explicit URI scheme (e.g., http://, https://, file://).
#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

fn ensure_local_path(p: &Path) -> Result<(), ArgError> {
    match p.to_str() {
        Some(s) if has_scheme(s) => Err(ArgError::NonLocalPath(s.to_string())),
        _ => Ok(()),
    }
}

impl Command {
    pub fn manifest(&self) -> &Path {
        match self {
            Command::Predict(a) => &a.manifest,
            Command::Backtest(a) => &a.manifest,
            Command::Validate(a) => &a.manifest,
        }
    }
}

/// Parse argv and check paths (locality, manifest existence).
///
/// Clap usage errors exit on their own (code 2).
pub fn parse_and_validate() -> Result<Args, ArgError> {
    let mut args = Args::parse();
    check(&args)?;
    if let Command::Predict(p) = &mut args.command {
        if p.render.is_empty() {
            p.render.push(Render::Text);
        }
        p.render.dedup();
    }
    Ok(args)
}

fn check(args: &Args) -> Result<(), ArgError> {
    let manifest = args.command.manifest();
    ensure_local_path(manifest)?;
    if let Command::Predict(p) = &args.command {
        ensure_local_path(&p.out)?;
    }
    if !manifest.is_file() {
        return Err(ArgError::NotFound(manifest.display().to_string()));
    }
    Ok(())
}

// ------------------------------
// Tests
// ------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("pf").chain(argv.iter().copied()))
    }

    #[test]
    fn seed_parser_decimal_and_hex() {
        assert_eq!(parse_seed("42").unwrap(), 42u64);
        assert_eq!(parse_seed("0x2A").unwrap(), 42u64);
        assert!(parse_seed("0x").is_err());
        assert!(parse_seed("0xFFFFFFFFFFFFFFFFF").is_err()); // 17 nybbles
        assert!(parse_seed("-1").is_err());
    }

    #[test]
    fn fraction_parser_bounds() {
        assert_eq!(parse_fraction("0.005").unwrap(), 0.005);
        assert_eq!(parse_fraction("1").unwrap(), 1.0);
        assert!(parse_fraction("0").is_err());
        assert!(parse_fraction("1.5").is_err());
        assert!(parse_fraction("NaN").is_err());
    }

    #[test]
    fn predict_flags() {
        let a = parse(&["predict", "--manifest", "m.json", "--render", "text,json", "--no-participation"]).unwrap();
        match a.command {
            Command::Predict(p) => {
                assert_eq!(p.manifest, PathBuf::from("m.json"));
                assert_eq!(p.out, PathBuf::from("."));
                assert_eq!(p.render, vec![Render::Text, Render::Json]);
                assert!(p.no_participation);
                assert!(!p.quiet);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(a.log, "info");
    }

    #[test]
    fn backtest_fractions_and_seed() {
        let a = parse(&["backtest", "--manifest", "m.json", "--fractions", "0.005,0.05", "--seed", "0x10"]).unwrap();
        match a.command {
            Command::Backtest(b) => {
                assert_eq!(b.fractions, vec![0.005, 0.05]);
                assert_eq!(b.seed, 16);
                assert_eq!(b.render, Render::Text);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse(&["backtest", "--manifest", "m.json"]).is_err());
        assert!(parse(&["backtest", "--manifest", "m.json", "--fractions", "2"]).is_err());
    }

    #[test]
    fn log_is_global() {
        let a = parse(&["validate", "--manifest", "m.json", "--log", "pf_io=debug"]).unwrap();
        assert_eq!(a.log, "pf_io=debug");
    }

    #[test]
    fn ensure_local_path_rejects_schemes() {
        assert!(ensure_local_path(Path::new("http://x")).is_err());
        assert!(ensure_local_path(Path::new("file://C:/x.json")).is_err());
        assert!(ensure_local_path(Path::new("/tmp/file.json")).is_ok());
    }

    #[test]
    fn missing_manifest_is_reported() {
        let a = parse(&["validate", "--manifest", "/definitely/not/here.json"]).unwrap();
        assert!(matches!(check(&a), Err(ArgError::NotFound(_))));
    }
}
