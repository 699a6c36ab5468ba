use rand::seq::index;
use rand::Rng;

use super::error::{DataError, DataResult};
use super::model::{ExperimentId, PaletteColor};

/// Upper bound on a sample: one participant per palette colour.
pub const MAX_SAMPLE: usize = PaletteColor::PARTICIPANTS.len();

/// Draw `count` distinct participant ids of `experiment`, sorted ascending.
///
/// Only ids that exist for the experiment are candidates, so the draw never
/// needs to be retried.
pub fn select_participants<R: Rng>(
    experiment: i64,
    count: i64,
    rng: &mut R,
) -> DataResult<Vec<u32>> {
    let count = usize::try_from(count)
        .ok()
        .filter(|c| (1..=MAX_SAMPLE).contains(c))
        .ok_or_else(|| {
            DataError::InvalidArgument(format!(
                "sample size must be in 1..={MAX_SAMPLE}, got {count}"
            ))
        })?;
    let id = ExperimentId::new(experiment)?;

    let candidates = id.participant_pool().candidates();
    let mut sample: Vec<u32> = index::sample(rng, candidates.len(), count)
        .into_iter()
        .map(|i| candidates[i])
        .collect();
    sample.sort_unstable();
    Ok(sample)
}
