use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SourceConfig;
use crate::data::filter::{init_filter_state, ConditionFilter};
use crate::data::fit::{participant_line, LineFit};
use crate::data::loader::load_dataset;
use crate::data::model::{Condition, Dataset, DurationColumn, ExperimentId, NumericColumn};
use crate::data::sampler::{select_participants, MAX_SAMPLE};

/// Which panel grid the central area shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelView {
    /// 2×2 scatter of the four experiment pairings.
    Pairs,
    /// 2×4 scatter with regression lines, split by SOA sign.
    Soa,
    /// 2×4 fitted lines of sampled participants.
    Participants,
}

impl PanelView {
    pub const ALL: [PanelView; 3] = [PanelView::Pairs, PanelView::Soa, PanelView::Participants];

    pub fn label(self) -> &'static str {
        match self {
            PanelView::Pairs => "Experiment pairs",
            PanelView::Soa => "SOA polarity",
            PanelView::Participants => "Participants",
        }
    }
}

/// A fitted line for one sampled participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticipantFit {
    pub participant: u32,
    /// Position in the sample; selects the line colour.
    pub slot: usize,
    pub fit: LineFit,
}

/// Fitted lines for the participants sampled from one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantLines {
    pub experiment: ExperimentId,
    pub lines: Vec<ParticipantFit>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until a data source is opened).
    pub dataset: Option<Dataset>,

    /// Source of the current dataset, kept for reloading.
    pub config: Option<SourceConfig>,

    /// Drives jitter and participant sampling.
    rng: StdRng,

    pub view: PanelView,
    pub x_column: NumericColumn,
    pub y_column: NumericColumn,

    /// Conditions drawn on scatter panels.
    pub filters: ConditionFilter,

    /// Participant ids sampled per experiment.
    pub participant_samples: Vec<(ExperimentId, Vec<u32>)>,

    /// Lines fitted for `participant_samples` on the current axes (cached).
    pub participant_lines: Vec<ParticipantLines>,

    /// Figure title shown above the panel grid.
    pub title: String,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            config: None,
            rng: StdRng::from_entropy(),
            view: PanelView::Pairs,
            x_column: NumericColumn::SoaJitter,
            y_column: NumericColumn::Duration(DurationColumn::OnsetDur),
            filters: init_filter_state(),
            participant_samples: Vec::new(),
            participant_lines: Vec::new(),
            title: "Default Title".to_string(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Load all experiments from `config`, replacing any current dataset.
    ///
    /// On failure the previous dataset is kept and the error is shown.
    pub fn load(&mut self, config: SourceConfig) {
        if let Some(seed) = config.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        match load_dataset(&config, &mut self.rng) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} rows from {}",
                    dataset.len(),
                    config.root.display()
                );
                self.set_dataset(dataset);
                self.config = Some(config);
            }
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Load the current source again (fresh jitter unless seeded).
    pub fn reload(&mut self) {
        if let Some(config) = self.config.clone() {
            self.load(config);
        }
    }

    /// Ingest a newly loaded dataset and draw a fresh participant sample.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
        self.status_message = None;
        self.resample_participants();
    }

    /// Draw a new participant sample for every experiment and refit.
    pub fn resample_participants(&mut self) {
        self.participant_samples = ExperimentId::all()
            .filter_map(|id| {
                match select_participants(id.get() as i64, MAX_SAMPLE as i64, &mut self.rng) {
                    Ok(ids) => Some((id, ids)),
                    Err(e) => {
                        log::warn!("{id}: {e}");
                        None
                    }
                }
            })
            .collect();
        self.refit_participants();
    }

    /// Recompute `participant_lines` for the current sample and axes.
    pub fn refit_participants(&mut self) {
        let Some(dataset) = &self.dataset else {
            self.participant_lines.clear();
            return;
        };
        self.participant_lines = self
            .participant_samples
            .iter()
            .map(|(id, participants)| {
                let lines = participants
                    .iter()
                    .enumerate()
                    .filter_map(|(slot, &participant)| {
                        match participant_line(
                            dataset,
                            id.get() as i64,
                            participant as i64,
                            self.x_column,
                            self.y_column,
                        ) {
                            Ok(fit) => Some(ParticipantFit {
                                participant,
                                slot,
                                fit,
                            }),
                            Err(e) => {
                                log::warn!("Skipping participant line: {e}");
                                None
                            }
                        }
                    })
                    .collect();
                ParticipantLines {
                    experiment: *id,
                    lines,
                }
            })
            .collect();
    }

    /// Change the plotted columns; participant lines follow.
    pub fn set_columns(&mut self, x: NumericColumn, y: NumericColumn) {
        if (x, y) != (self.x_column, self.y_column) {
            self.x_column = x;
            self.y_column = y;
            self.refit_participants();
        }
    }

    /// Toggle a single condition in the scatter filter.
    pub fn toggle_condition(&mut self, condition: Condition) {
        if !self.filters.remove(&condition) {
            self.filters.insert(condition);
        }
    }

    pub fn select_all(&mut self) {
        self.filters = init_filter_state();
    }

    pub fn select_none(&mut self) {
        self.filters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::write_dataset;

    fn seeded_config(root: &std::path::Path) -> SourceConfig {
        SourceConfig {
            seed: Some(17),
            ..SourceConfig::from_root(root)
        }
    }

    #[test]
    fn load_failure_keeps_state_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::default();
        state.load(SourceConfig::from_root(dir.path()));
        assert!(state.dataset.is_none());
        assert!(state.config.is_none());
        assert!(state.status_message.as_deref().unwrap_or("").starts_with("Error"));
    }

    #[test]
    fn load_samples_participants_for_every_experiment() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let mut state = AppState::default();
        state.set_columns(
            NumericColumn::Trial,
            NumericColumn::Duration(DurationColumn::OnsetDur),
        );
        state.load(seeded_config(dir.path()));

        assert!(state.dataset.is_some());
        assert_eq!(state.participant_samples.len(), 8);
        assert_eq!(state.participant_lines.len(), 8);
        for (id, sample) in &state.participant_samples {
            assert_eq!(sample.len(), MAX_SAMPLE);
            if id.get() == 8 {
                assert!(!sample.contains(&38));
            }
        }
        // The fixture only has participants 1..=3, each with onset slope 10.
        for group in &state.participant_lines {
            let sample = &state
                .participant_samples
                .iter()
                .find(|(id, _)| *id == group.experiment)
                .unwrap()
                .1;
            for line in &group.lines {
                assert!((1..=3).contains(&line.participant));
                assert_eq!(sample[line.slot], line.participant);
                assert!((line.fit.slope - 10.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn seeded_loads_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let mut a = AppState::default();
        let mut b = AppState::default();
        a.load(seeded_config(dir.path()));
        b.load(seeded_config(dir.path()));
        assert_eq!(a.participant_samples, b.participant_samples);
        let jitter = |s: &AppState| -> Vec<f64> {
            s.dataset
                .as_ref()
                .unwrap()
                .experiments()
                .flat_map(|t| &t.records)
                .map(|r| r.soa_jitter)
                .collect()
        };
        assert_eq!(jitter(&a), jitter(&b));
    }

    #[test]
    fn condition_toggles() {
        let mut state = AppState::default();
        state.toggle_condition(Condition::Related);
        assert!(!state.filters.contains(&Condition::Related));
        state.toggle_condition(Condition::Related);
        assert!(state.filters.contains(&Condition::Related));
        state.select_none();
        assert!(state.filters.is_empty());
        state.select_all();
        assert_eq!(state.filters.len(), 4);
    }
}
