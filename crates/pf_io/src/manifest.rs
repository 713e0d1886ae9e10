// crates/pf_io/src/manifest.rs
//
// Manifest: which exports to load, how to read them, and with which engine params.
//
// • Offline only: any path with a scheme ("://", "http:", "https:") is rejected.
// • Paths are resolved against the manifest's directory unless absolute.
// • Dataset names are unique; the current dataset's name differs from every historical one.
// • Digests (optional) are lowercase 64-hex, keyed by dataset name, verified over raw file bytes.
// • Each dataset has its own option columns; `option_names`, when given, has one entry per
//   option column of the current dataset.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use pf_core::variables::{validate_domains, Params};
use pf_core::CoreError;
use serde::{Deserialize, Serialize};

use crate::hasher::{is_lower_hex_64, sha256_file};

const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;

/* ---------------------------------- Types ---------------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Free-form run identifier, echoed in reports.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub option_names: Vec<String>,
    pub historical: Vec<DatasetEntry>,
    pub current: DatasetEntry,
    /// dataset name → expected sha256 of the raw export
    #[serde(default)]
    pub inputs_sha256: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetEntry {
    pub name: String,
    pub source: DatasetSource,
}

/// Declarative column mapping for one delimited export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSource {
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Rows are kept only when every listed column holds exactly this integer.
    #[serde(default)]
    pub filter: BTreeMap<String, i64>,
    /// `[coarse, locality, precinct]`
    pub id_columns: [String; 3],
    pub voters_column: String,
    pub votes_cast_column: String,
    pub option_columns: Vec<OptionColumn>,
}

fn default_delimiter() -> char {
    ';'
}

/// One option slot: a column as-is, or `a - b` saturating at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionColumn {
    Column(String),
    Difference([String; 2]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDataset {
    pub name: String,
    pub path: PathBuf,
    pub source: DatasetSource,
}

/// Manifest with paths resolved and existence-checked.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub id: Option<String>,
    pub params: Params,
    pub option_names: Vec<String>,
    pub historical: Vec<ResolvedDataset>,
    pub current: ResolvedDataset,
    pub digests: BTreeMap<String, String>,
}

impl ResolvedManifest {
    pub fn dataset(&self, name: &str) -> Option<&ResolvedDataset> {
        self.historical.iter().chain(std::iter::once(&self.current)).find(|d| d.name == name)
    }
}

/* ---------------------------------- Errors --------------------------------- */

#[derive(Debug)]
pub enum ManifestError {
    Empty(String),
    UrlPath(String, String),
    Io(String, String),
    NotAFile(String, String),
    Parse(String),
    DuplicateName(String),
    Delimiter(String, char),
    OptionCount { dataset: String, expected: usize, got: usize },
    Params(CoreError),
    DigestShape(String, String),
    DigestMismatch { dataset: String, expected: String, got: String },
    DigestForMissing(String),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ManifestError::*;
        match self {
            Empty(k) => write!(f, "field must not be empty: {k}"),
            UrlPath(k, v) => write!(f, "path must be offline (no scheme) for {k}: {v}"),
            Io(k, v) => write!(f, "cannot access {k}: {v}"),
            NotAFile(k, v) => write!(f, "path is not a file for {k}: {v}"),
            Parse(m) => write!(f, "cannot parse manifest: {m}"),
            DuplicateName(n) => write!(f, "dataset name used twice: {n}"),
            Delimiter(k, c) => write!(f, "delimiter for {k} must be a single ASCII character, got {c:?}"),
            OptionCount { dataset, expected, got } => {
                write!(f, "dataset {dataset}: expected {expected} option columns, got {got}")
            }
            Params(e) => write!(f, "params: {e}"),
            DigestShape(k, v) => write!(f, "invalid sha256 format for {k}: {v}"),
            DigestMismatch { dataset, expected, got } => {
                write!(f, "sha256 mismatch for {dataset}: expected={expected} got={got}")
            }
            DigestForMissing(k) => write!(f, "digest supplied for unknown dataset: {k}"),
        }
    }
}

impl std::error::Error for ManifestError {}

// ---------- helpers (pure) ----------

#[inline]
fn has_any_scheme(s: &str) -> bool {
    s.contains("://") || s.starts_with("http:") || s.starts_with("https:")
}

#[inline]
fn join_under(base: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn non_empty(label: impl Into<String>, s: &str) -> Result<(), ManifestError> {
    if s.trim().is_empty() {
        return Err(ManifestError::Empty(label.into()));
    }
    Ok(())
}

fn validate_entry(entry: &DatasetEntry) -> Result<(), ManifestError> {
    let name = &entry.name;
    let src = &entry.source;
    non_empty("dataset name", name)?;
    non_empty(format!("{name}.path"), &src.path)?;
    if has_any_scheme(&src.path) {
        return Err(ManifestError::UrlPath(name.clone(), src.path.clone()));
    }
    if !src.delimiter.is_ascii() {
        return Err(ManifestError::Delimiter(name.clone(), src.delimiter));
    }
    for c in &src.id_columns {
        non_empty(format!("{name}.id_columns"), c)?;
    }
    non_empty(format!("{name}.voters_column"), &src.voters_column)?;
    non_empty(format!("{name}.votes_cast_column"), &src.votes_cast_column)?;
    if src.option_columns.is_empty() {
        return Err(ManifestError::Empty(format!("{name}.option_columns")));
    }
    Ok(())
}

// ---------- validation (shape, offline, names, digests) ----------

/// Validate manifest shape and offline path policy. No I/O.
pub fn validate_manifest(man: &Manifest) -> Result<(), ManifestError> {
    validate_domains(&man.params).map_err(ManifestError::Params)?;

    if man.historical.is_empty() {
        return Err(ManifestError::Empty("historical".into()));
    }

    let mut names = BTreeSet::new();
    for entry in man.historical.iter().chain(std::iter::once(&man.current)) {
        validate_entry(entry)?;
        if !names.insert(entry.name.as_str()) {
            return Err(ManifestError::DuplicateName(entry.name.clone()));
        }
    }

    // Historical periods may list other options (e.g. a run-off); names label the current one.
    let current_options = man.current.source.option_columns.len();
    if !man.option_names.is_empty() && man.option_names.len() != current_options {
        return Err(ManifestError::OptionCount {
            dataset: man.current.name.clone(),
            expected: man.option_names.len(),
            got: current_options,
        });
    }

    for (name, hex) in &man.inputs_sha256 {
        if !names.contains(name.as_str()) {
            return Err(ManifestError::DigestForMissing(name.clone()));
        }
        if !is_lower_hex_64(hex) {
            return Err(ManifestError::DigestShape(name.clone(), hex.clone()));
        }
    }
    Ok(())
}

// ---------- resolution (join base + existence/type checks) ----------

fn resolve_entry(base_dir: &Path, entry: &DatasetEntry) -> Result<ResolvedDataset, ManifestError> {
    let path = join_under(base_dir, &entry.source.path);
    let md = fs::metadata(&path)
        .map_err(|e| ManifestError::Io(entry.name.clone(), format!("{} ({e})", path.display())))?;
    if !md.is_file() {
        return Err(ManifestError::NotAFile(entry.name.clone(), path.display().to_string()));
    }
    Ok(ResolvedDataset { name: entry.name.clone(), path, source: entry.source.clone() })
}

/// Resolve every dataset path under `base_dir` and check that each is an existing file.
pub fn resolve_paths(base_dir: &Path, man: &Manifest) -> Result<ResolvedManifest, ManifestError> {
    let historical = man
        .historical
        .iter()
        .map(|e| resolve_entry(base_dir, e))
        .collect::<Result<Vec<_>, _>>()?;
    let current = resolve_entry(base_dir, &man.current)?;

    Ok(ResolvedManifest {
        id: man.id.clone(),
        params: man.params.clone(),
        option_names: man.option_names.clone(),
        historical,
        current,
        digests: man.inputs_sha256.clone(),
    })
}

// ---------------------------- digests ----------------------------

/// Verify every provided digest against the raw bytes of its dataset file.
pub fn verify_digests(resolved: &ResolvedManifest) -> Result<(), ManifestError> {
    for (name, expected) in &resolved.digests {
        let ds = resolved.dataset(name).ok_or_else(|| ManifestError::DigestForMissing(name.clone()))?;
        let got = sha256_file(&ds.path)
            .map_err(|e| ManifestError::Io(name.clone(), format!("{} ({e})", ds.path.display())))?;
        if &got != expected {
            return Err(ManifestError::DigestMismatch {
                dataset: name.clone(),
                expected: expected.clone(),
                got,
            });
        }
        tracing::debug!(dataset = %name, "input digest verified");
    }
    Ok(())
}

// ---------------------------- top-level load/verify ----------------------------

/// Parse a manifest from JSON text and validate it (no path resolution).
pub fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
    let man: Manifest = serde_json::from_str(text).map_err(|e| ManifestError::Parse(e.to_string()))?;
    validate_manifest(&man)?;
    Ok(man)
}

/// Load, validate, and resolve a manifest file. Digests are not checked here.
pub fn load_and_resolve_manifest(manifest_path: &Path) -> Result<ResolvedManifest, ManifestError> {
    let label = || manifest_path.display().to_string();
    let f = fs::File::open(manifest_path).map_err(|e| ManifestError::Io(label(), e.to_string()))?;
    let mut text = String::new();
    f.take(MAX_MANIFEST_BYTES)
        .read_to_string(&mut text)
        .map_err(|e| ManifestError::Io(label(), e.to_string()))?;

    let man = parse_manifest(&text)?;
    let base = manifest_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let resolved = resolve_paths(&base, &man)?;
    tracing::debug!(
        manifest = %manifest_path.display(),
        historical = resolved.historical.len(),
        "manifest resolved"
    );
    Ok(resolved)
}

/// Load, validate, resolve, and verify digests.
pub fn load_verify_manifest(manifest_path: &Path) -> Result<ResolvedManifest, ManifestError> {
    let resolved = load_and_resolve_manifest(manifest_path)?;
    verify_digests(&resolved)?;
    Ok(resolved)
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::sha256_hex;
    use serde_json::json;

    fn source(path: &str) -> serde_json::Value {
        json!({
            "path": path,
            "filter": { "CHYBA": 0 },
            "id_columns": ["OKRES", "OBEC", "OKRSEK"],
            "voters_column": "VOL_SEZNAM",
            "votes_cast_column": "VYD_OBALKY",
            "option_columns": [ {"column": "HLASY_01"}, {"difference": ["VYD_OBALKY", "PL_HL_CELK"]} ]
        })
    }

    fn manifest_json() -> serde_json::Value {
        json!({
            "id": "test",
            "params": { "size_bucket_width": 50 },
            "option_names": ["Alpha", "Invalid"],
            "historical": [ { "name": "past", "source": source("past.csv") } ],
            "current": { "name": "now", "source": source("now.csv") }
        })
    }

    #[test]
    fn parses_with_defaults() {
        let m = parse_manifest(&manifest_json().to_string()).unwrap();
        assert_eq!(m.params.size_bucket_width, 50);
        assert!(m.params.participation_term);
        assert_eq!(m.current.source.delimiter, ';');
        assert_eq!(
            m.current.source.option_columns[1],
            OptionColumn::Difference(["VYD_OBALKY".into(), "PL_HL_CELK".into()])
        );
    }

    #[test]
    fn rejects_urls_duplicates_and_option_mismatch() {
        let mut v = manifest_json();
        v["current"]["source"]["path"] = json!("https://example.org/now.csv");
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::UrlPath(..))));

        let mut v = manifest_json();
        v["current"]["name"] = json!("past");
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::DuplicateName(_))));

        let mut v = manifest_json();
        v["option_names"] = json!(["Only one"]);
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::OptionCount { .. })));

        let mut v = manifest_json();
        v["historical"] = json!([]);
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::Empty(_))));

        let mut v = manifest_json();
        v["params"] = json!({ "size_bucket_width": 0 });
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::Params(_))));

        let mut v = manifest_json();
        v["surprise"] = json!(true);
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::Parse(_))));
    }

    #[test]
    fn historical_datasets_may_have_their_own_option_count() {
        let mut v = manifest_json();
        v["historical"][0]["source"]["option_columns"] = json!([
            {"column": "HLASY_01"}, {"column": "HLASY_02"}, {"column": "HLASY_03"}
        ]);
        assert!(parse_manifest(&v.to_string()).is_ok());

        let mut v = manifest_json();
        v["current"]["source"]["option_columns"] = json!([{"column": "HLASY_01"}]);
        match parse_manifest(&v.to_string()) {
            Err(ManifestError::OptionCount { dataset, expected, got }) => {
                assert_eq!((dataset.as_str(), expected, got), ("now", 2, 1));
            }
            other => panic!("expected option count error, got {other:?}"),
        }
    }

    #[test]
    fn digest_shape_and_target_checked() {
        let mut v = manifest_json();
        v["inputs_sha256"] = json!({ "past": "ABC" });
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::DigestShape(..))));

        let mut v = manifest_json();
        v["inputs_sha256"] = json!({ "elsewhere": sha256_hex(b"") });
        assert!(matches!(parse_manifest(&v.to_string()), Err(ManifestError::DigestForMissing(_))));
    }

    #[test]
    fn resolves_relative_paths_and_verifies_digests() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("past.csv"), b"past").unwrap();
        fs::write(dir.path().join("now.csv"), b"now").unwrap();

        let mut v = manifest_json();
        v["inputs_sha256"] = json!({ "past": sha256_hex(b"past") });
        let path = dir.path().join("manifest.json");
        fs::write(&path, v.to_string()).unwrap();

        let r = load_verify_manifest(&path).unwrap();
        assert_eq!(r.historical[0].path, dir.path().join("past.csv"));
        assert_eq!(r.current.source.option_columns.len(), 2);

        v["inputs_sha256"] = json!({ "now": sha256_hex(b"not now") });
        fs::write(&path, v.to_string()).unwrap();
        assert!(matches!(load_verify_manifest(&path), Err(ManifestError::DigestMismatch { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, manifest_json().to_string()).unwrap();
        assert!(matches!(load_and_resolve_manifest(&path), Err(ManifestError::Io(..))));
    }
}
