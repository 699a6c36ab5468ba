use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{DataError, DataResult};

// ---------------------------------------------------------------------------
// ExperimentId – one of the eight experiments
// ---------------------------------------------------------------------------

/// Index of an experiment, guaranteed to be in `1..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExperimentId(u8);

/// Sign convention of the SOA values in an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoaPolarity {
    /// Prime before target; raw SOAs are negated on load.
    Negative,
    Positive,
}

/// The participant ids that exist for an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantPool {
    /// Ids run from 1 up to, but not including, this bound.
    pub upper_exclusive: u32,
    /// Ids inside the range that have no data.
    pub missing: &'static [u32],
}

impl ParticipantPool {
    pub fn candidates(&self) -> Vec<u32> {
        (1..self.upper_exclusive)
            .filter(|id| !self.missing.contains(id))
            .collect()
    }
}

impl ExperimentId {
    pub const COUNT: u8 = 8;

    pub fn new(n: i64) -> DataResult<Self> {
        if (1..=Self::COUNT as i64).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(DataError::InvalidArgument(format!(
                "experiment index must be in 1..=8, got {n}"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All eight experiments in ascending order.
    pub fn all() -> impl Iterator<Item = ExperimentId> {
        (1..=Self::COUNT).map(ExperimentId)
    }

    pub fn polarity(self) -> SoaPolarity {
        if self.0 % 2 == 1 {
            SoaPolarity::Negative
        } else {
            SoaPolarity::Positive
        }
    }

    /// Experiments 1–4 ran 35 participants, 5–8 ran 39; experiment 8 lost #38.
    pub fn participant_pool(self) -> ParticipantPool {
        match self.0 {
            1..=4 => ParticipantPool {
                upper_exclusive: 36,
                missing: &[],
            },
            8 => ParticipantPool {
                upper_exclusive: 40,
                missing: &[38],
            },
            _ => ParticipantPool {
                upper_exclusive: 40,
                missing: &[],
            },
        }
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Experiment {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Condition and colours
// ---------------------------------------------------------------------------

/// Named colours used for condition tags and participant lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaletteColor {
    Blue,
    Red,
    Green,
    Yellow,
    Cyan,
    Magenta,
}

impl PaletteColor {
    /// One colour per sampled participant; this bounds the sample size.
    pub const PARTICIPANTS: [PaletteColor; 6] = [
        PaletteColor::Blue,
        PaletteColor::Red,
        PaletteColor::Green,
        PaletteColor::Yellow,
        PaletteColor::Cyan,
        PaletteColor::Magenta,
    ];
}

/// Experimental manipulation of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Condition {
    Control,
    Identical,
    Related,
    Unrelated,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Control,
        Condition::Identical,
        Condition::Related,
        Condition::Unrelated,
    ];

    /// Parse a raw label as it appears in the source files.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "control" => Some(Condition::Control),
            "identical" => Some(Condition::Identical),
            "related" => Some(Condition::Related),
            "unrelated" => Some(Condition::Unrelated),
            _ => None,
        }
    }

    pub const fn color(self) -> PaletteColor {
        match self {
            Condition::Control => PaletteColor::Blue,
            Condition::Identical => PaletteColor::Red,
            Condition::Related => PaletteColor::Green,
            Condition::Unrelated => PaletteColor::Yellow,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Condition::Control => "Control",
            Condition::Identical => "Identical",
            Condition::Related => "Related",
            Condition::Unrelated => "Unrelated",
        }
    }
}

/// One entry of the shared plot legend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendEntry {
    pub condition: Condition,
    pub label: &'static str,
    pub color: PaletteColor,
    pub alpha: f32,
}

const fn legend_entry(condition: Condition) -> LegendEntry {
    LegendEntry {
        condition,
        label: condition.label(),
        color: condition.color(),
        alpha: 0.5,
    }
}

/// Legend shown next to every condition-coloured panel.
pub const LEGEND: [LegendEntry; 4] = [
    legend_entry(Condition::Identical),
    legend_entry(Condition::Control),
    legend_entry(Condition::Unrelated),
    legend_entry(Condition::Related),
];

// ---------------------------------------------------------------------------
// Numeric columns
// ---------------------------------------------------------------------------

/// The duration measures that are coerced to nullable numbers on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DurationColumn {
    OnsetDur,
    LogOnsetDur,
    TheDur,
    LogTheDur,
    ObjectDur,
    LogObjectDur,
    ActionDur,
    LogActionDur,
}

impl DurationColumn {
    pub const ALL: [DurationColumn; 8] = [
        DurationColumn::OnsetDur,
        DurationColumn::LogOnsetDur,
        DurationColumn::TheDur,
        DurationColumn::LogTheDur,
        DurationColumn::ObjectDur,
        DurationColumn::LogObjectDur,
        DurationColumn::ActionDur,
        DurationColumn::LogActionDur,
    ];

    /// Header of the column in the source files.
    pub fn name(self) -> &'static str {
        match self {
            DurationColumn::OnsetDur => "onset_dur",
            DurationColumn::LogOnsetDur => "log_onset_dur",
            DurationColumn::TheDur => "the_dur",
            DurationColumn::LogTheDur => "log_the_dur",
            DurationColumn::ObjectDur => "object_dur",
            DurationColumn::LogObjectDur => "log_object_dur",
            DurationColumn::ActionDur => "action_dur",
            DurationColumn::LogActionDur => "log_action_dur",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Any column that can be put on a plot axis or fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericColumn {
    Trial,
    Soa,
    /// Display-only: SOA plus a random offset against overplotting.
    SoaJitter,
    Duration(DurationColumn),
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 11] = [
        NumericColumn::Trial,
        NumericColumn::Soa,
        NumericColumn::SoaJitter,
        NumericColumn::Duration(DurationColumn::OnsetDur),
        NumericColumn::Duration(DurationColumn::LogOnsetDur),
        NumericColumn::Duration(DurationColumn::TheDur),
        NumericColumn::Duration(DurationColumn::LogTheDur),
        NumericColumn::Duration(DurationColumn::ObjectDur),
        NumericColumn::Duration(DurationColumn::LogObjectDur),
        NumericColumn::Duration(DurationColumn::ActionDur),
        NumericColumn::Duration(DurationColumn::LogActionDur),
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::Trial => "trial",
            NumericColumn::Soa => "soa",
            NumericColumn::SoaJitter => "soa_jitter",
            NumericColumn::Duration(d) => d.name(),
        }
    }
}

impl FromStr for NumericColumn {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumericColumn::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| DataError::InvalidArgument(format!("'{s}' is not a numeric column")))
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ExperimentRecord – one retained trial response
// ---------------------------------------------------------------------------

/// A single cleaned row of an experiment table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentRecord {
    pub experiment: ExperimentId,
    pub subject: u32,
    pub trial: Option<f64>,
    pub condition: Condition,
    /// Always 0 once loaded; other rows are dropped.
    pub exclude: i64,
    /// Sign already normalized for the experiment's polarity.
    pub soa: f64,
    pub durations: [Option<f64>; 8],
    pub soa_jitter: f64,
    pub condition_color: PaletteColor,
}

impl ExperimentRecord {
    pub fn duration(&self, column: DurationColumn) -> Option<f64> {
        self.durations[column.index()]
    }

    pub fn value(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Trial => self.trial,
            NumericColumn::Soa => Some(self.soa),
            NumericColumn::SoaJitter => Some(self.soa_jitter),
            NumericColumn::Duration(d) => self.duration(d),
        }
    }

    /// `(x, y)` when both columns are present on this row.
    pub fn point(&self, x: NumericColumn, y: NumericColumn) -> Option<[f64; 2]> {
        Some([self.value(x)?, self.value(y)?])
    }
}

// ---------------------------------------------------------------------------
// Tables, pairings and the loaded dataset
// ---------------------------------------------------------------------------

/// One experiment after cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentTable {
    pub id: ExperimentId,
    /// Source headers after subject-column normalization.
    pub columns: Vec<String>,
    pub records: Vec<ExperimentRecord>,
}

impl ExperimentTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn participant(&self, subject: u32) -> impl Iterator<Item = &ExperimentRecord> {
        self.records.iter().filter(move |r| r.subject == subject)
    }
}

/// Two adjacent experiments concatenated for joint plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPairing {
    pub first: ExperimentId,
    pub second: ExperimentId,
    /// First experiment's rows followed by the second's.
    pub records: Vec<ExperimentRecord>,
}

impl ExperimentPairing {
    pub fn title(&self) -> String {
        format!("Experiments {} & {}", self.first.get(), self.second.get())
    }
}

/// Experiments grouped by SOA direction.
#[derive(Debug, Clone, PartialEq)]
pub struct PolaritySplit {
    pub negative: Vec<ExperimentId>,
    pub positive: Vec<ExperimentId>,
}

/// The complete, read-only result of a load.
#[derive(Debug, Clone)]
pub struct Dataset {
    experiments: BTreeMap<ExperimentId, ExperimentTable>,
    pairings: Vec<ExperimentPairing>,
    polarity: PolaritySplit,
}

impl Dataset {
    /// Build pairings and the polarity split from the cleaned tables.
    ///
    /// Pairing `i` is always experiments `2i - 1` and `2i`; a pair with a
    /// missing table is left out rather than shifted.
    pub fn from_tables(experiments: BTreeMap<ExperimentId, ExperimentTable>) -> Self {
        let pairings = (1..=i64::from(ExperimentId::COUNT / 2))
            .filter_map(|i| {
                let first = experiments.get(&ExperimentId::new(2 * i - 1).ok()?)?;
                let second = experiments.get(&ExperimentId::new(2 * i).ok()?)?;
                Some(ExperimentPairing {
                    first: first.id,
                    second: second.id,
                    records: first
                        .records
                        .iter()
                        .chain(second.records.iter())
                        .cloned()
                        .collect(),
                })
            })
            .collect();

        let (negative, positive): (Vec<ExperimentId>, Vec<ExperimentId>) = experiments
            .keys()
            .partition(|id| id.polarity() == SoaPolarity::Negative);

        Dataset {
            experiments,
            pairings,
            polarity: PolaritySplit { negative, positive },
        }
    }

    pub fn experiment(&self, id: ExperimentId) -> Option<&ExperimentTable> {
        self.experiments.get(&id)
    }

    pub fn experiments(&self) -> impl Iterator<Item = &ExperimentTable> {
        self.experiments.values()
    }

    pub fn pairings(&self) -> &[ExperimentPairing] {
        &self.pairings
    }

    pub fn polarity_split(&self) -> &PolaritySplit {
        &self.polarity
    }

    /// Tables of the negative-SOA experiments, ascending.
    pub fn negative_soa(&self) -> impl Iterator<Item = &ExperimentTable> {
        self.polarity_split()
            .negative
            .iter()
            .filter_map(|id| self.experiments.get(id))
    }

    pub fn positive_soa(&self) -> impl Iterator<Item = &ExperimentTable> {
        self.polarity_split()
            .positive
            .iter()
            .filter_map(|id| self.experiments.get(id))
    }

    pub fn legend(&self) -> &'static [LegendEntry] {
        &LEGEND
    }

    /// Number of retained rows across all experiments.
    pub fn len(&self) -> usize {
        self.experiments.values().map(ExperimentTable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
