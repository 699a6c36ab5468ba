use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::Rng;

use super::error::{DataError, DataResult};
use super::model::{
    Condition, Dataset, DurationColumn, ExperimentId, ExperimentRecord, ExperimentTable,
    SoaPolarity,
};
use crate::config::SourceConfig;

const SUBJECT: &str = "subject";
/// Some exports carry the subject header with a trailing space.
const SUBJECT_VARIANT: &str = "subject ";
const EXCLUDE: &str = "exclude";
const CONDITION: &str = "condition";
const SOA: &str = "soa";
const TRIAL: &str = "trial";

/// Exclusion flag value of rows that are analyzed.
const INCLUDED: i64 = 0;

/// Jitter offsets are drawn from `JITTER_RANGE` and added to the SOA.
const JITTER_RANGE: std::ops::Range<i64> = 1..150;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load all eight experiments described by `config`.
///
/// Stops at the first failing experiment; no partial dataset is returned.
pub fn load_dataset<R: Rng>(config: &SourceConfig, rng: &mut R) -> DataResult<Dataset> {
    let mut tables = BTreeMap::new();
    for id in ExperimentId::all() {
        let path = config.path_for(id);
        let table = load_experiment(id, &path, config.delimiter_byte(), rng)?;
        if table.is_empty() {
            log::warn!("{id}: no included rows in {}", path.display());
        } else {
            log::info!("{id}: {} rows retained from {}", table.len(), path.display());
        }
        tables.insert(id, table);
    }
    Ok(Dataset::from_tables(tables))
}

/// Load and clean the table of one experiment from disk.
pub fn load_experiment<R: Rng>(
    id: ExperimentId,
    path: &Path,
    delimiter: u8,
    rng: &mut R,
) -> DataResult<ExperimentTable> {
    let file = File::open(path).map_err(|e| unavailable(id, path, e))?;
    parse_experiment(id, file, delimiter, rng).map_err(|e| match e {
        // Attach the real path to errors raised while reading.
        DataError::DataSourceUnavailable {
            experiment, reason, ..
        } => DataError::DataSourceUnavailable {
            experiment,
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })
}

/// Parse and clean one experiment table from any reader.
///
/// Steps, in order: normalize the subject header, keep included rows,
/// coerce durations, flip SOA sign for negative-polarity experiments,
/// add `soa_jitter`, tag `condition_color`.
pub fn parse_experiment<R: Read, G: Rng>(
    id: ExperimentId,
    reader: R,
    delimiter: u8,
    rng: &mut G,
) -> DataResult<ExperimentTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| malformed(id, format!("reading headers: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let (columns, layout) = ColumnLayout::resolve(id, raw_headers)?;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for result in reader.records() {
        let row = result.map_err(|e| malformed(id, e.to_string()))?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize| row.get(idx).unwrap_or("");

        if parse_integer(field(layout.exclude)) != Some(INCLUDED) {
            dropped += 1;
            continue;
        }

        let subject = parse_integer(field(layout.subject))
            .and_then(|s| u32::try_from(s).ok())
            .filter(|s| *s > 0)
            .ok_or_else(|| {
                malformed(id, format!("line {line}: bad subject id '{}'", field(layout.subject)))
            })?;

        let mut soa = coerce_numeric(field(layout.soa))
            .ok_or_else(|| malformed(id, format!("line {line}: bad soa '{}'", field(layout.soa))))?;
        if id.polarity() == SoaPolarity::Negative {
            soa = -soa;
        }

        let label = field(layout.condition);
        let condition = Condition::parse(label).ok_or_else(|| DataError::UnknownCondition {
            experiment: id,
            line,
            label: label.to_string(),
        })?;

        let mut durations = [None; 8];
        for (slot, idx) in durations.iter_mut().zip(layout.durations) {
            *slot = coerce_numeric(field(idx));
        }

        let soa_jitter = soa + rng.gen_range(JITTER_RANGE) as f64;

        records.push(ExperimentRecord {
            experiment: id,
            subject,
            trial: layout.trial.and_then(|idx| coerce_numeric(field(idx))),
            condition,
            exclude: INCLUDED,
            soa,
            durations,
            soa_jitter,
            condition_color: condition.color(),
        });
    }

    log::debug!("{id}: dropped {dropped} excluded rows");

    Ok(ExperimentTable { id, columns, records })
}

// ---------------------------------------------------------------------------
// Header handling
// ---------------------------------------------------------------------------

/// Column positions of everything the loader reads.
#[derive(Debug)]
struct ColumnLayout {
    subject: usize,
    exclude: usize,
    condition: usize,
    soa: usize,
    trial: Option<usize>,
    durations: [usize; 8],
}

impl ColumnLayout {
    /// Normalize the headers and locate the required columns.
    ///
    /// A table with no subject column under either spelling is reported as
    /// a malformed source, like any other missing required column.
    fn resolve(id: ExperimentId, raw_headers: Vec<String>) -> DataResult<(Vec<String>, Self)> {
        // `columns` mirrors the table after normalization; `positions` maps
        // each kept column back to its index in the raw rows.
        let variant = raw_headers.iter().position(|h| h == SUBJECT_VARIANT);
        let mut columns = Vec::with_capacity(raw_headers.len());
        let mut positions = Vec::with_capacity(raw_headers.len());
        for (idx, header) in raw_headers.into_iter().enumerate() {
            // The variant's values replace the canonical column.
            if header == SUBJECT && variant.is_some() {
                continue;
            }
            if header == SUBJECT_VARIANT {
                columns.push(SUBJECT.to_string());
            } else {
                columns.push(header);
            }
            positions.push(idx);
        }

        let find = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .map(|i| positions[i])
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| malformed(id, format!("missing column '{name}'")))
        };

        let mut durations = [0usize; 8];
        for (slot, column) in durations.iter_mut().zip(DurationColumn::ALL) {
            *slot = require(column.name())?;
        }

        let layout = ColumnLayout {
            subject: require(SUBJECT)?,
            exclude: require(EXCLUDE)?,
            condition: require(CONDITION)?,
            soa: require(SOA)?,
            trial: find(TRIAL),
            durations,
        };
        Ok((columns, layout))
    }
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

/// Tolerant numeric coercion: anything unparseable, or NaN, becomes `None`.
fn coerce_numeric(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Integers written either as `3` or as `3.0`.
fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let f = s.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f.is_finite()).then_some(f as i64)
}

fn unavailable(id: ExperimentId, path: &Path, err: std::io::Error) -> DataError {
    DataError::DataSourceUnavailable {
        experiment: id,
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn malformed(id: ExperimentId, reason: String) -> DataError {
    DataError::DataSourceUnavailable {
        experiment: id,
        path: Default::default(),
        reason,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::data::model::{NumericColumn, PaletteColor};

    pub(crate) const HEADER: &str = concat!(
        "subject\ttrial\texclude\tcondition\tsoa\t",
        "onset_dur\tlog_onset_dur\tthe_dur\tlog_the_dur\t",
        "object_dur\tlog_object_dur\taction_dur\tlog_action_dur",
    );

    /// The durations after `onset_dur` are the same on every fixture row.
    const OTHER_DURATIONS: &str = "5.1\t120\t4.8\t300\t5.7\t410\t6.0";

    pub(crate) fn row(
        subject: u32,
        trial: u32,
        exclude: i64,
        condition: &str,
        soa: i64,
        onset: &str,
    ) -> String {
        format!("{subject}\t{trial}\t{exclude}\t{condition}\t{soa}\t{onset}\t{OTHER_DURATIONS}")
    }

    /// Rows for one experiment: participants 1..=3, four trials each, one excluded row.
    pub(crate) fn sample_rows(experiment: u8) -> Vec<String> {
        let conditions = ["control", "identical", "related", "unrelated"];
        let mut rows = Vec::new();
        for subject in 1..=3u32 {
            for trial in 1..=4u32 {
                let onset = format!("{}", 150 + 10 * trial + subject + experiment as u32);
                let condition = conditions[(trial - 1) as usize];
                rows.push(row(subject, trial, 0, condition, 50 * trial as i64, &onset));
            }
        }
        rows.push(row(1, 5, 1, "control", 999, "200"));
        rows
    }

    pub(crate) fn table_text(header: &str, rows: &[String]) -> String {
        let mut text = header.to_string();
        for r in rows {
            text.push('\n');
            text.push_str(r);
        }
        text.push('\n');
        text
    }

    /// Write the default layout for all eight experiments under `root`.
    pub(crate) fn write_dataset(root: &Path) {
        for id in ExperimentId::all() {
            let dir = root.join(format!("Exp{}", id.get()));
            std::fs::create_dir_all(&dir).unwrap();
            let header = if id.get() == 1 {
                HEADER.replacen("subject", "subject ", 1)
            } else {
                HEADER.to_string()
            };
            std::fs::write(
                dir.join(format!("dissexp{}r.txt", id.get())),
                table_text(&header, &sample_rows(id.get())),
            )
            .unwrap();
        }
    }

    fn exp(n: i64) -> ExperimentId {
        ExperimentId::new(n).unwrap()
    }

    fn parse(n: i64, text: &str) -> DataResult<ExperimentTable> {
        parse_experiment(exp(n), text.as_bytes(), b'\t', &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn drops_excluded_rows() {
        let rows = vec![
            row(1, 1, 0, "control", 100, "200"),
            row(1, 2, 1, "control", 100, "200"),
            row(2, 1, 2, "related", 100, "200"),
            row(2, 2, 0, "related", 100, "200"),
        ];
        let table = parse(2, &table_text(HEADER, &rows)).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.records.iter().all(|r| r.exclude == 0));
        assert_eq!(
            table.records.iter().map(|r| (r.subject, r.trial)).collect::<Vec<_>>(),
            vec![(1, Some(1.0)), (2, Some(2.0))]
        );
    }

    #[test]
    fn blank_exclusion_flag_is_not_included() {
        let mut blank = row(1, 1, 0, "control", 100, "200");
        blank = blank.replacen("\t0\t", "\t\t", 1);
        let table = parse(2, &table_text(HEADER, &[blank])).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn soa_sign_follows_polarity() {
        let rows = vec![row(1, 1, 0, "control", 100, "200"), row(1, 2, 0, "control", -50, "200")];
        let text = table_text(HEADER, &rows);
        for n in 1..=8 {
            let table = parse(n, &text).unwrap();
            let soas: Vec<f64> = table.records.iter().map(|r| r.soa).collect();
            if n % 2 == 1 {
                assert_eq!(soas, vec![-100.0, 50.0], "experiment {n}");
            } else {
                assert_eq!(soas, vec![100.0, -50.0], "experiment {n}");
            }
        }
    }

    #[test]
    fn jitter_stays_in_range() {
        let rows: Vec<String> = (1..=200).map(|t| row(1, t, 0, "control", 300, "200")).collect();
        let table = parse(3, &table_text(HEADER, &rows)).unwrap();
        for r in &table.records {
            let offset = r.soa_jitter - r.soa;
            assert!((1.0..150.0).contains(&offset), "offset {offset}");
            assert_eq!(offset.fract(), 0.0);
        }
    }

    #[test]
    fn jitter_is_reproducible_with_a_seed() {
        let text = table_text(HEADER, &sample_rows(4));
        assert_eq!(parse(4, &text).unwrap(), parse(4, &text).unwrap());
    }

    #[test]
    fn unparseable_durations_become_null() {
        let rows = vec![
            row(1, 1, 0, "control", 100, "NA"),
            row(1, 2, 0, "control", 100, ""),
            row(1, 3, 0, "control", 100, "NaN"),
            row(1, 4, 0, "control", 100, " 212.5 "),
        ];
        let table = parse(2, &table_text(HEADER, &rows)).unwrap();
        let onsets: Vec<Option<f64>> = table
            .records
            .iter()
            .map(|r| r.duration(DurationColumn::OnsetDur))
            .collect();
        assert_eq!(onsets, vec![None, None, None, Some(212.5)]);
        let action = NumericColumn::Duration(DurationColumn::ActionDur);
        assert_eq!(table.records[0].value(action), Some(410.0));
    }

    #[test]
    fn condition_colors_follow_palette() {
        let rows = vec![
            row(1, 1, 0, "unrelated", 100, "200"),
            row(1, 2, 0, "control", 100, "200"),
            row(1, 3, 0, "identical", 100, "200"),
            row(1, 4, 0, "related", 100, "200"),
        ];
        let table = parse(2, &table_text(HEADER, &rows)).unwrap();
        let colors: Vec<PaletteColor> = table.records.iter().map(|r| r.condition_color).collect();
        assert_eq!(
            colors,
            vec![PaletteColor::Yellow, PaletteColor::Blue, PaletteColor::Red, PaletteColor::Green]
        );
        for r in &table.records {
            assert_eq!(r.condition_color, r.condition.color());
        }
    }

    #[test]
    fn unknown_condition_fails() {
        let rows = vec![row(1, 1, 0, "control", 100, "200"), row(1, 2, 0, "filler", 100, "200")];
        let err = parse(2, &table_text(HEADER, &rows)).unwrap_err();
        match err {
            DataError::UnknownCondition { experiment, line, label } => {
                assert_eq!(experiment, exp(2));
                assert_eq!(line, 3);
                assert_eq!(label, "filler");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_condition_on_excluded_row_is_ignored() {
        let rows = vec![row(1, 1, 0, "control", 100, "200"), row(1, 2, 1, "filler", 100, "200")];
        assert_eq!(parse(2, &table_text(HEADER, &rows)).unwrap().len(), 1);
    }

    #[test]
    fn subject_variant_is_renamed() {
        let header = HEADER.replacen("subject", "subject ", 1);
        let table = parse(1, &table_text(&header, &sample_rows(1))).unwrap();
        assert!(table.columns.iter().any(|c| c == "subject"));
        assert!(!table.columns.iter().any(|c| c == "subject "));
        assert_eq!(table.len(), 12);
    }

    #[test]
    fn subject_variant_wins_over_canonical() {
        let header = format!("subject\t{}", HEADER.replacen("subject", "subject ", 1));
        let rows = vec![format!("99\t{}", row(7, 1, 0, "control", 100, "200"))];
        let table = parse(2, &table_text(&header, &rows)).unwrap();
        assert_eq!(table.columns.iter().filter(|c| *c == "subject").count(), 1);
        assert!(!table.columns.iter().any(|c| c == "subject "));
        assert_eq!(table.records[0].subject, 7);
    }

    #[test]
    fn missing_trial_column_is_tolerated() {
        let header = HEADER.replacen("\ttrial", "", 1);
        let line = "4\t0\trelated\t100\t200\t5.1\t120\t4.8\t300\t5.7\t410\t6.0".to_string();
        let table = parse(2, &table_text(&header, &[line])).unwrap();
        assert_eq!(table.records[0].trial, None);
        assert_eq!(table.records[0].subject, 4);
    }

    #[test]
    fn missing_required_column_is_malformed() {
        let header = HEADER.replacen("\tlog_action_dur", "", 1);
        let line = "1\t1\t0\tcontrol\t100\t200\t5.1\t120\t4.8\t300\t5.7\t410".to_string();
        let err = parse(2, &table_text(&header, &[line])).unwrap_err();
        assert!(matches!(
            err,
            DataError::DataSourceUnavailable { ref reason, .. } if reason.contains("log_action_dur")
        ));
    }

    #[test]
    fn missing_subject_column_is_malformed() {
        let header = HEADER.replacen("subject\t", "participant\t", 1);
        let err = parse(2, &table_text(&header, &sample_rows(2))).unwrap_err();
        match err {
            DataError::DataSourceUnavailable { experiment, reason, .. } => {
                assert_eq!(experiment, exp(2));
                assert_eq!(reason, "missing column 'subject'");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let err = load_experiment(exp(1), &path, b'\t', &mut StdRng::seed_from_u64(0)).unwrap_err();
        match err {
            DataError::DataSourceUnavailable { experiment, path: p, .. } => {
                assert_eq!(experiment, exp(1));
                assert_eq!(p, path);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn load_dataset_builds_pairings_and_split() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let config = SourceConfig::from_root(dir.path());
        let dataset = load_dataset(&config, &mut StdRng::seed_from_u64(9)).unwrap();

        assert_eq!(dataset.experiments().count(), 8);
        assert_eq!(dataset.len(), 8 * 12);

        let exp1 = dataset.experiment(exp(1)).unwrap();
        assert!(exp1.columns.iter().any(|c| c == "subject"));
        assert!(!exp1.columns.iter().any(|c| c == "subject "));

        assert_eq!(dataset.pairings().len(), 4);
        for (i, pairing) in dataset.pairings().iter().enumerate() {
            let first = dataset.experiment(exp(2 * i as i64 + 1)).unwrap();
            let second = dataset.experiment(exp(2 * i as i64 + 2)).unwrap();
            assert_eq!(pairing.first, first.id);
            assert_eq!(pairing.second, second.id);
            assert_eq!(pairing.records.len(), first.len() + second.len());
            let expected: Vec<ExperimentRecord> =
                first.records.iter().chain(&second.records).cloned().collect();
            assert_eq!(pairing.records, expected);
        }
        assert_eq!(dataset.pairings()[2].title(), "Experiments 5 & 6");

        let split = dataset.polarity_split();
        assert_eq!(split.negative, vec![exp(1), exp(3), exp(5), exp(7)]);
        assert_eq!(split.positive, vec![exp(2), exp(4), exp(6), exp(8)]);
        assert!(dataset.negative_soa().flat_map(|t| &t.records).all(|r| r.soa <= 0.0));
        assert!(dataset.positive_soa().flat_map(|t| &t.records).all(|r| r.soa >= 0.0));
        assert_eq!(dataset.legend().len(), 4);
    }

    #[test]
    fn load_dataset_stops_at_first_missing_experiment() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let missing: PathBuf = dir.path().join("Exp6").join("dissexp6r.txt");
        std::fs::remove_file(&missing).unwrap();

        let config = SourceConfig::from_root(dir.path());
        let err = load_dataset(&config, &mut StdRng::seed_from_u64(9)).unwrap_err();
        assert!(matches!(
            err,
            DataError::DataSourceUnavailable { experiment, .. } if experiment == exp(6)
        ));
    }

    #[test]
    fn integers_accept_float_notation() {
        assert_eq!(parse_integer("0"), Some(0));
        assert_eq!(parse_integer(" 0.0 "), Some(0));
        assert_eq!(parse_integer("1.5"), None);
        assert_eq!(parse_integer(""), None);
    }
}
