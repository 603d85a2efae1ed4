/// Data layer: core types, loading, filtering and the metric computations
/// the charts are drawn from.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet          resumen .csv
///        │                               │
///        ▼                               ▼
///   ┌──────────┐                   ┌──────────┐
///   │  loader   │  strict parse    │  loader   │
///   └──────────┘                   └──────────┘
///        │                               │
///        ▼                               ▼
///   ┌────────────┐                ┌───────────────┐
///   │ FanDataset │                │ ClusterSummary │
///   └────────────┘                └───────────────┘
///        │                               │
///        ▼                               │
///   ┌──────────┐                         │
///   │  filter   │  visible fans          │
///   └──────────┘                         │
///        │                               │
///        ├──────► stats (box, corr, funnel, derived summary)
///        ▼                               ▼
///   ┌─────────────────────────────────────────┐
///   │ normalize / radar  → scale to pop. max  │
///   └─────────────────────────────────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
pub mod normalize;
pub mod radar;
pub mod stats;

#[cfg(test)]
pub(crate) mod fixtures;
