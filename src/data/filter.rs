use std::collections::BTreeSet;

use super::model::{Condition, ExperimentRecord};

// ---------------------------------------------------------------------------
// Condition filter: which conditions are drawn on scatter panels
// ---------------------------------------------------------------------------

/// Set of conditions currently shown. Empty means nothing is drawn.
pub type ConditionFilter = BTreeSet<Condition>;

/// Initialise a [`ConditionFilter`] with every condition selected.
pub fn init_filter_state() -> ConditionFilter {
    Condition::ALL.into_iter().collect()
}

/// Records whose condition passes `filter`, in their original order.
pub fn filtered_records<'a>(
    records: &'a [ExperimentRecord],
    filter: &'a ConditionFilter,
) -> impl Iterator<Item = &'a ExperimentRecord> + 'a {
    let everything = filter.len() == Condition::ALL.len();
    records
        .iter()
        .filter(move |r| everything || filter.contains(&r.condition))
}
