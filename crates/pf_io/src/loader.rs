//! Loader: delimited result exports → `pf_core::Dataset`.
//!
//! Every cell referenced by the column mapping must hold a non-negative integer
//! (filter columns may be negative). Rows whose cell count differs from the
//! header are skipped and counted; rows failing the filter are dropped.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::path::Path;

use csv::StringRecord;
use pf_core::{AreaCode, Dataset, SizeBucket, UnitId, UnitRecord};
use tracing::{debug, info};

use crate::hasher::sha256_file;
use crate::manifest::{ManifestError, OptionColumn, ResolvedDataset, ResolvedManifest};
use crate::IoError;

/// Datasets named by a manifest plus the raw digest of each export.
#[derive(Debug)]
pub struct LoadedInputs {
    pub historical: Vec<Dataset>,
    pub current: Dataset,
    /// dataset name → sha256 of the file as read
    pub digests: BTreeMap<String, String>,
}

// ----------------------------- column mapping -----------------------------

enum Slot {
    Column(usize),
    Difference(usize, usize),
}

struct Columns {
    filter: Vec<(usize, String, i64)>,
    ids: [usize; 3],
    voters: usize,
    votes_cast: usize,
    options: Vec<Slot>,
}

impl Columns {
    fn resolve(headers: &StringRecord, ds: &ResolvedDataset) -> Result<Self, IoError> {
        let find = |name: &str| -> Result<usize, IoError> {
            headers.iter().position(|h| h.trim() == name).ok_or_else(|| IoError::Csv {
                path: ds.path.display().to_string(),
                line: 1,
                msg: format!("missing column {name}"),
            })
        };
        let src = &ds.source;

        let filter = src
            .filter
            .iter()
            .map(|(col, want)| Ok((find(col)?, col.clone(), *want)))
            .collect::<Result<Vec<_>, IoError>>()?;
        let ids = [find(&src.id_columns[0])?, find(&src.id_columns[1])?, find(&src.id_columns[2])?];
        let options = src
            .option_columns
            .iter()
            .map(|oc| match oc {
                OptionColumn::Column(c) => Ok(Slot::Column(find(c)?)),
                OptionColumn::Difference([a, b]) => Ok(Slot::Difference(find(a)?, find(b)?)),
            })
            .collect::<Result<Vec<_>, IoError>>()?;

        Ok(Self {
            filter,
            ids,
            voters: find(&src.voters_column)?,
            votes_cast: find(&src.votes_cast_column)?,
            options,
        })
    }
}

// ----------------------------- row parsing -----------------------------

struct Row<'r> {
    rec: &'r StringRecord,
    headers: &'r StringRecord,
    path: &'r Path,
    line: u64,
}

impl Row<'_> {
    fn cell(&self, idx: usize) -> &str {
        self.rec.get(idx).unwrap_or("").trim()
    }

    fn bad(&self, idx: usize, what: &str) -> IoError {
        IoError::Csv {
            path: self.path.display().to_string(),
            line: self.line,
            msg: format!("column {}: {what} {:?}", self.headers.get(idx).unwrap_or("?"), self.cell(idx)),
        }
    }

    fn count(&self, idx: usize) -> Result<u64, IoError> {
        self.cell(idx).parse::<u64>().map_err(|_| self.bad(idx, "expected a non-negative integer, got"))
    }

    fn int(&self, idx: usize) -> Result<i64, IoError> {
        self.cell(idx).parse::<i64>().map_err(|_| self.bad(idx, "expected an integer, got"))
    }

    fn area(&self, idx: usize) -> Result<AreaCode, IoError> {
        self.cell(idx).parse::<AreaCode>().map_err(|_| self.bad(idx, "invalid area code"))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> IoError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    IoError::Csv { path: path.display().to_string(), line, msg: e.to_string() }
}

// ----------------------------- public entry points -----------------------------

/// Read one export into a `Dataset`, bucketing electorates with `bucket`.
pub fn load_dataset(ds: &ResolvedDataset, bucket: SizeBucket) -> Result<Dataset, IoError> {
    let path = ds.path.as_path();
    let delimiter = u8::try_from(ds.source.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| ManifestError::Delimiter(ds.name.clone(), ds.source.delimiter))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let cols = Columns::resolve(&headers, ds)?;

    let mut units = Vec::new();
    let (mut skipped, mut filtered_out) = (0u64, 0u64);

    for (n, result) in reader.records().enumerate() {
        let rec = result.map_err(|e| csv_error(path, e))?;
        let line = rec.position().map(|p| p.line()).unwrap_or(n as u64 + 2);
        if rec.len() != headers.len() {
            skipped += 1;
            debug!(dataset = %ds.name, line, cells = rec.len(), expected = headers.len(), "skipping ragged row");
            continue;
        }
        let row = Row { rec: &rec, headers: &headers, path, line };

        let mut keep = true;
        for (idx, _, want) in &cols.filter {
            if row.int(*idx)? != *want {
                keep = false;
                break;
            }
        }
        if !keep {
            filtered_out += 1;
            continue;
        }

        let coarse = row.area(cols.ids[0])?;
        let locality = row.area(cols.ids[1])?;
        let id = UnitId::from_parts(&coarse, &locality, row.cell(cols.ids[2]))
            .map_err(|_| row.bad(cols.ids[2], "invalid precinct code"))?;

        let votes = cols
            .options
            .iter()
            .map(|slot| match *slot {
                Slot::Column(i) => row.count(i),
                Slot::Difference(a, b) => Ok(row.count(a)?.saturating_sub(row.count(b)?)),
            })
            .collect::<Result<Vec<u64>, IoError>>()?;

        units.push(UnitRecord::new(
            id,
            coarse,
            locality,
            row.count(cols.voters)?,
            row.count(cols.votes_cast)?,
            votes,
            bucket,
        ));
    }

    let dataset =
        Dataset::new(ds.name.clone(), units).map_err(|source| IoError::Dataset { name: ds.name.clone(), source })?;

    info!(
        dataset = %ds.name,
        units = dataset.units().len(),
        options = ?dataset.num_options(),
        skipped,
        filtered_out,
        filter = ?cols.filter.iter().map(|(_, c, v)| format!("{c}={v}")).collect::<Vec<_>>(),
        "dataset loaded"
    );

    Ok(dataset)
}

/// Load every dataset named by a resolved manifest, hashing each export.
pub fn load_inputs(resolved: &ResolvedManifest) -> Result<LoadedInputs, IoError> {
    let bucket = resolved
        .params
        .size_bucket()
        .map_err(ManifestError::Params)?;

    let mut digests = BTreeMap::new();
    let mut load = |ds: &ResolvedDataset| -> Result<Dataset, IoError> {
        digests.insert(ds.name.clone(), sha256_file(&ds.path)?);
        load_dataset(ds, bucket)
    };

    let historical = resolved.historical.iter().map(&mut load).collect::<Result<Vec<_>, _>>()?;
    let current = load(&resolved.current)?;
    Ok(LoadedInputs { historical, current, digests })
}

/* ---------------------------------- Tests --------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DatasetSource;
    use std::fs;

    const HEADER: &str = "OKRES;OBEC;OKRSEK;KOLO;CHYBA;VOL_SEZNAM;VYD_OBALKY;PL_HL_CELK;HLASY_01;HLASY_02";

    fn source() -> DatasetSource {
        DatasetSource {
            path: "x.csv".into(),
            delimiter: ';',
            filter: [("KOLO".to_string(), 1), ("CHYBA".to_string(), 0)].into_iter().collect(),
            id_columns: ["OKRES".into(), "OBEC".into(), "OKRSEK".into()],
            voters_column: "VOL_SEZNAM".into(),
            votes_cast_column: "VYD_OBALKY".into(),
            option_columns: vec![
                OptionColumn::Column("HLASY_01".into()),
                OptionColumn::Column("HLASY_02".into()),
                OptionColumn::Difference(["VYD_OBALKY".into(), "PL_HL_CELK".into()]),
            ],
        }
    }

    fn write(dir: &tempfile::TempDir, body: &str) -> ResolvedDataset {
        let path = dir.path().join("x.csv");
        fs::write(&path, format!("{HEADER}\n{body}")).unwrap();
        ResolvedDataset { name: "x".into(), path, source: source() }
    }

    #[test]
    fn loads_filters_and_derives_invalid_ballots() {
        let dir = tempfile::tempdir().unwrap();
        let ds = write(
            &dir,
            "3702;582786;1;1;0;300;200;195;120;75\n\
             3702;582786;1;2;0;300;210;210;100;110\n\
             3702;582786;2;1;1;250;150;150;70;80\n\
             3703;582787;1;1;0;90;60;58;30;28\n",
        );
        let d = load_dataset(&ds, SizeBucket::default()).unwrap();
        assert_eq!(d.len(), 2);

        let u = d.get(&"3702-582786-1".parse().unwrap()).unwrap();
        assert_eq!(u.votes(), &[120, 75, 5]);
        assert_eq!(u.total_voters(), 300);
        assert_eq!(u.total_votes(), 200);
        assert_eq!(u.size_class(), 3);
        assert_eq!(u.area_coarse().as_str(), "3702");
        assert_eq!(u.area_locality().as_str(), "582786");
    }

    #[test]
    fn ragged_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ds = write(&dir, "3702;582786;1;1;0;300;200;195;120;75\n3702;582786;2;1;0;300\n");
        assert_eq!(load_dataset(&ds, SizeBucket::default()).unwrap().len(), 1);
    }

    #[test]
    fn non_integer_cell_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let ds = write(&dir, "3702;582786;1;1;0;300;200;195;120;75\n3702;582786;2;1;0;300;abc;195;120;75\n");
        match load_dataset(&ds, SizeBucket::default()) {
            Err(IoError::Csv { line, msg, .. }) => {
                assert_eq!(line, 3);
                assert!(msg.contains("VYD_OBALKY"), "{msg}");
            }
            other => panic!("expected csv error, got {other:?}"),
        }
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = write(&dir, "");
        ds.source.voters_column = "NOPE".into();
        assert!(matches!(load_dataset(&ds, SizeBucket::default()), Err(IoError::Csv { line: 1, .. })));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = write(&dir, "3702;582786;1;1;0;300;200;195;120;75\n");
        ds.source.delimiter = '§';
        assert!(matches!(
            load_dataset(&ds, SizeBucket::default()),
            Err(IoError::Manifest(ManifestError::Delimiter(_, '§')))
        ));
    }

    #[test]
    fn duplicate_units_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ds = write(
            &dir,
            "3702;582786;1;1;0;300;200;195;120;75\n3702;582786;1;1;0;300;200;195;120;75\n",
        );
        assert!(matches!(load_dataset(&ds, SizeBucket::default()), Err(IoError::Dataset { .. })));
    }
}
