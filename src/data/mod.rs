/// Data layer: typed records, loading, fitting, sampling and filtering.
///
/// Architecture:
/// ```text
///  Exp1/dissexp1r.txt … Exp8/dissexp8r.txt
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + clean each table → ExperimentTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  per-experiment map, pairings, polarity split
///   └──────────┘
///        │
///        ├──────────────┬──────────────┐
///        ▼              ▼              ▼
///   ┌────────┐    ┌──────────┐   ┌──────────┐
///   │  fit    │    │ sampler   │   │  filter   │
///   └────────┘    └──────────┘   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod fit;
pub mod loader;
pub mod model;
pub mod sampler;
