//! Radar normalization: scale an entity's metrics by the population maximum.
//!
//! Maxima are recomputed from the population passed in on every call, so two
//! vectors are only comparable when they were normalized against the same
//! population snapshot.

use thiserror::Error;

use super::model::{CellValue, ClusterSummaryRow, FanRecord, CLUSTER};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Anything whose attributes can be looked up by metric name.
pub trait MetricSource {
    /// `None` when the entity has no attribute of that name.
    fn metric(&self, name: &str) -> Option<CellValue>;
}

impl<T: MetricSource + ?Sized> MetricSource for &T {
    fn metric(&self, name: &str) -> Option<CellValue> {
        (**self).metric(name)
    }
}

impl MetricSource for FanRecord {
    fn metric(&self, name: &str) -> Option<CellValue> {
        self.attribute(name)
    }
}

impl MetricSource for ClusterSummaryRow {
    fn metric(&self, name: &str) -> Option<CellValue> {
        if name == CLUSTER {
            return Some(CellValue::Text(self.cluster.clone()));
        }
        self.values.get(name).copied().map(CellValue::Number)
    }
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("metric '{metric}' is missing")]
    MissingMetric { metric: String },

    #[error("metric '{metric}' has a degenerate scale (population maximum {max})")]
    DegenerateScale { metric: String, max: f64 },

    #[error("metric '{metric}' has non-numeric value '{value}'")]
    InvalidValue { metric: String, value: String },

    #[error("no metrics requested")]
    NoMetrics,

    #[error("population is empty")]
    EmptyPopulation,
}

impl NormalizeError {
    /// The metric the fault is about, if it concerns a single metric.
    pub fn metric(&self) -> Option<&str> {
        match self {
            NormalizeError::MissingMetric { metric }
            | NormalizeError::DegenerateScale { metric, .. }
            | NormalizeError::InvalidValue { metric, .. } => Some(metric),
            NormalizeError::NoMetrics | NormalizeError::EmptyPopulation => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized vector
// ---------------------------------------------------------------------------

/// Values parallel to `labels`; `values[i]` belongs to `labels[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedVector {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl NormalizedVector {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Scale each of `entity`'s metrics by that metric's maximum over `population`.
///
/// Faults are checked metric by metric in the order given: first the entity's
/// own value, then every population member. The first fault wins. Values are
/// never coerced; a text or null cell is an [`NormalizeError::InvalidValue`].
pub fn normalize<E, P, S>(
    entity: &E,
    metric_names: &[S],
    population: &[P],
) -> Result<NormalizedVector, NormalizeError>
where
    E: MetricSource + ?Sized,
    P: MetricSource,
    S: AsRef<str>,
{
    if metric_names.is_empty() {
        return Err(NormalizeError::NoMetrics);
    }
    if population.is_empty() {
        return Err(NormalizeError::EmptyPopulation);
    }

    let mut labels = Vec::with_capacity(metric_names.len());
    let mut values = Vec::with_capacity(metric_names.len());

    for name in metric_names {
        let name = name.as_ref();
        let value = numeric_value(entity, name)?;
        let max = population_max(population, name)?;
        if max <= 0.0 {
            return Err(NormalizeError::DegenerateScale {
                metric: name.to_string(),
                max,
            });
        }
        labels.push(name.to_string());
        values.push(value / max);
    }

    Ok(NormalizedVector { labels, values })
}

/// Maximum of `metric` across `population`.
pub fn population_max<P: MetricSource>(
    population: &[P],
    metric: &str,
) -> Result<f64, NormalizeError> {
    if population.is_empty() {
        return Err(NormalizeError::EmptyPopulation);
    }
    population
        .iter()
        .map(|member| numeric_value(member, metric))
        .try_fold(f64::NEG_INFINITY, |acc, v| v.map(|v| acc.max(v)))
}

fn numeric_value<E: MetricSource + ?Sized>(entity: &E, metric: &str) -> Result<f64, NormalizeError> {
    match entity.metric(metric) {
        None => Err(NormalizeError::MissingMetric {
            metric: metric.to_string(),
        }),
        Some(cell) => cell.as_f64().ok_or_else(|| NormalizeError::InvalidValue {
            metric: metric.to_string(),
            value: cell.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::fixtures::fan;
    use crate::data::model::{CHANNEL, TOTAL_SPEND};

    /// A loosely-typed row, so tests can build entities with arbitrary columns.
    #[derive(Debug, Clone, Default)]
    struct Row(BTreeMap<String, CellValue>);

    impl Row {
        fn with(mut self, name: &str, value: f64) -> Self {
            self.0.insert(name.to_string(), CellValue::Number(value));
            self
        }

        fn with_cell(mut self, name: &str, value: CellValue) -> Self {
            self.0.insert(name.to_string(), value);
            self
        }
    }

    impl MetricSource for Row {
        fn metric(&self, name: &str) -> Option<CellValue> {
            self.0.get(name).cloned()
        }
    }

    fn score(v: f64) -> Row {
        Row::default().with("score", v)
    }

    #[test]
    fn half_of_maximum() {
        let population = vec![score(50.0), score(100.0)];
        let out = normalize(&score(50.0), &["score"], &population).unwrap();
        assert_eq!(out.values, vec![0.5]);
        assert_eq!(out.labels, vec!["score".to_string()]);
    }

    #[test]
    fn zero_maximum_is_degenerate() {
        let population = vec![score(0.0)];
        let err = normalize(&score(0.0), &["score"], &population).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::DegenerateScale {
                metric: "score".into(),
                max: 0.0
            }
        );
    }

    #[test]
    fn negative_maximum_is_degenerate() {
        let population = vec![score(-3.0), score(-1.0)];
        let err = normalize(&score(-3.0), &["score"], &population).unwrap_err();
        assert!(matches!(err, NormalizeError::DegenerateScale { max, .. } if max == -1.0));
    }

    #[test]
    fn missing_metric_on_entity_is_named() {
        let population = vec![score(10.0).with("visits", 4.0)];
        let err = normalize(&score(5.0), &["score", "visits"], &population).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::MissingMetric {
                metric: "visits".into()
            }
        );
        assert_eq!(err.metric(), Some("visits"));
    }

    #[test]
    fn missing_metric_in_population() {
        let entity = score(5.0).with("visits", 1.0);
        let population = vec![entity.clone(), score(10.0)];
        let err = normalize(&entity, &["visits"], &population).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingMetric { ref metric } if metric == "visits"));
    }

    #[test]
    fn text_value_is_invalid_not_coerced() {
        let entity = Row::default().with_cell("score", CellValue::Text("N/A".into()));
        let population = vec![score(10.0)];
        let err = normalize(&entity, &["score"], &population).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::InvalidValue {
                metric: "score".into(),
                value: "N/A".into()
            }
        );
    }

    #[test]
    fn null_or_nan_in_population_is_invalid() {
        let population = vec![score(10.0), Row::default().with_cell("score", CellValue::Null)];
        let err = normalize(&score(1.0), &["score"], &population).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidValue { .. }));

        let population = vec![score(10.0), score(f64::NAN)];
        let err = normalize(&score(1.0), &["score"], &population).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidValue { .. }));
    }

    #[test]
    fn categorical_fan_column_is_invalid() {
        let f = fan("a", "1", 10.0);
        let err = normalize(&f, &[CHANNEL], &[f.clone()]).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidValue { ref value, .. } if value == "app"));
    }

    #[test]
    fn empty_inputs_are_reported() {
        let empty: Vec<Row> = Vec::new();
        let no_metrics: [&str; 0] = [];
        assert_eq!(
            normalize(&score(1.0), &no_metrics, &[score(1.0)]),
            Err(NormalizeError::NoMetrics)
        );
        assert_eq!(
            normalize(&score(1.0), &["score"], &empty),
            Err(NormalizeError::EmptyPopulation)
        );
    }

    #[test]
    fn single_member_population_is_all_ones() {
        let entity = score(7.5).with("visits", 3.0).with("spend", 0.25);
        let out = normalize(&entity, &["score", "visits", "spend"], &[entity.clone()]).unwrap();
        assert_eq!(out.values, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn maximum_holder_gets_exactly_one() {
        let population = vec![score(3.0), score(0.1), score(17.3), score(9.9)];
        let out = normalize(&population[2], &["score"], &population).unwrap();
        assert_eq!(out.values[0], 1.0);
    }

    #[test]
    fn members_stay_within_unit_interval() {
        let population: Vec<Row> = (1..=20)
            .map(|i| {
                let i = i as f64;
                score(i * 3.7).with("visits", (i * 1.3) % 7.0 + 0.5)
            })
            .collect();
        for member in &population {
            let out = normalize(member, &["score", "visits"], &population).unwrap();
            for v in out.values {
                assert!((0.0..=1.0).contains(&v), "{v} out of range");
            }
        }
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let population: Vec<Row> = (0..10).map(|i| score(1.0 / (i as f64 + 3.0))).collect();
        let a = normalize(&population[4], &["score"], &population).unwrap();
        let b = normalize(&population[4], &["score"], &population).unwrap();
        assert_eq!(a.values[0].to_bits(), b.values[0].to_bits());
    }

    #[test]
    fn output_follows_metric_order() {
        let entity = score(5.0).with("visits", 2.0);
        let population = vec![entity.clone(), score(10.0).with("visits", 8.0)];
        let forward = normalize(&entity, &["score", "visits"], &population).unwrap();
        let reversed = normalize(&entity, &["visits", "score"], &population).unwrap();
        assert_eq!(forward.values, vec![0.5, 0.25]);
        assert_eq!(reversed.values, vec![0.25, 0.5]);
        assert_eq!(reversed.labels, vec!["visits".to_string(), "score".to_string()]);
    }

    #[test]
    fn fans_normalize_against_fans() {
        let fans = vec![fan("a", "1", 200.0), fan("b", "1", 50.0)];
        let refs: Vec<&FanRecord> = fans.iter().collect();
        let out = normalize(&fans[1], &[TOTAL_SPEND], &refs).unwrap();
        assert_eq!(out.iter().collect::<Vec<_>>(), vec![(TOTAL_SPEND, 0.25)]);
    }

    #[test]
    fn summary_rows_expose_their_columns() {
        let row = ClusterSummaryRow {
            cluster: "2".into(),
            values: BTreeMap::from([("gasto_medio".to_string(), 40.0)]),
        };
        assert_eq!(row.metric(CLUSTER), Some(CellValue::Text("2".into())));
        assert_eq!(row.metric("gasto_medio"), Some(CellValue::Number(40.0)));
        assert_eq!(row.metric("otro"), None);
    }
}
