use super::model::column_label;
use super::normalize::{normalize, MetricSource, NormalizeError};

// ---------------------------------------------------------------------------
// Radar profile: normalized metrics with the dashboard's fallback policy
// ---------------------------------------------------------------------------

/// One spoke of a radar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarAxis {
    pub metric: String,
    pub value: f64,
    /// False when the population maximum was not positive and `value` is a
    /// stand-in zero.
    pub informative: bool,
}

impl RadarAxis {
    pub fn label(&self) -> String {
        let label = column_label(&self.metric);
        if self.informative {
            label.to_string()
        } else {
            format!("{label} (uninformative)")
        }
    }
}

/// A named series ready for polar rendering, plus the metrics that had to
/// be left out.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarProfile {
    pub name: String,
    pub axes: Vec<RadarAxis>,
    pub dropped: Vec<NormalizeError>,
}

impl RadarProfile {
    /// Normalize metric by metric so one bad column cannot blank the chart.
    ///
    /// Degenerate scales render as 0; missing and non-numeric metrics are
    /// dropped and reported. Empty metric lists and empty populations are
    /// still errors.
    pub fn build<E, P, S>(
        name: impl Into<String>,
        entity: &E,
        metric_names: &[S],
        population: &[P],
    ) -> Result<Self, NormalizeError>
    where
        E: MetricSource + ?Sized,
        P: MetricSource,
        S: AsRef<str>,
    {
        if metric_names.is_empty() {
            return Err(NormalizeError::NoMetrics);
        }

        let name = name.into();
        let mut axes = Vec::with_capacity(metric_names.len());
        let mut dropped = Vec::new();

        for metric in metric_names {
            let metric = metric.as_ref();
            match normalize(entity, &[metric], population) {
                Ok(vector) => axes.extend(vector.iter().map(|(metric, value)| RadarAxis {
                    metric: metric.to_string(),
                    value,
                    informative: true,
                })),
                Err(NormalizeError::DegenerateScale { max, .. }) => {
                    log::debug!("{name}: '{metric}' has population maximum {max}, drawing 0");
                    axes.push(RadarAxis {
                        metric: metric.to_string(),
                        value: 0.0,
                        informative: false,
                    });
                }
                Err(e @ (NormalizeError::MissingMetric { .. } | NormalizeError::InvalidValue { .. })) => {
                    log::debug!("{name}: dropping radar axis: {e}");
                    dropped.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(RadarProfile { name, axes, dropped })
    }

    /// A one-line explanation of the dropped metrics, for display under the chart.
    pub fn notice(&self) -> Option<String> {
        if self.dropped.is_empty() {
            return None;
        }
        let names: Vec<&str> = self
            .dropped
            .iter()
            .filter_map(NormalizeError::metric)
            .map(column_label)
            .collect();
        Some(format!("Not shown (missing or non-numeric): {}", names.join(", ")))
    }

    /// Cartesian vertices of the closed polygon, first spoke pointing up and
    /// the rest clockwise.
    pub fn polygon(&self) -> Vec<[f64; 2]> {
        let n = self.axes.len();
        let mut points: Vec<[f64; 2]> = self
            .axes
            .iter()
            .enumerate()
            .map(|(i, axis)| spoke_point(i, n, axis.value))
            .collect();
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        points
    }
}

/// Point at `radius` along spoke `i` of `n`.
pub fn spoke_point(i: usize, n: usize, radius: f64) -> [f64; 2] {
    let angle = std::f64::consts::FRAC_PI_2 - std::f64::consts::TAU * i as f64 / n.max(1) as f64;
    [radius * angle.cos(), radius * angle.sin()]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::ClusterSummaryRow;

    fn row(cluster: &str, values: &[(&str, f64)]) -> ClusterSummaryRow {
        ClusterSummaryRow {
            cluster: cluster.to_string(),
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn degenerate_metric_is_flagged_and_zeroed() {
        let rows = vec![
            row("0", &[("gasto", 50.0), ("eventos", 0.0)]),
            row("1", &[("gasto", 100.0), ("eventos", 0.0)]),
        ];
        let profile = RadarProfile::build("Cluster 0", &rows[0], &["gasto", "eventos"], &rows).unwrap();
        assert_eq!(profile.axes.len(), 2);
        assert_eq!(profile.axes[0].value, 0.5);
        assert!(profile.axes[0].informative);
        assert_eq!(profile.axes[1].value, 0.0);
        assert!(!profile.axes[1].informative);
        assert_eq!(profile.axes[1].label(), "eventos (uninformative)");
        assert!(profile.notice().is_none());
    }

    #[test]
    fn missing_metric_is_dropped_with_notice() {
        let rows = vec![row("0", &[("gasto", 50.0)]), row("1", &[("gasto", 100.0), ("visitas", 3.0)])];
        let profile = RadarProfile::build("Cluster 0", &rows[0], &["gasto", "visitas"], &rows).unwrap();
        assert_eq!(profile.axes.len(), 1);
        assert_eq!(profile.dropped.len(), 1);
        assert_eq!(profile.dropped[0].metric(), Some("visitas"));
        assert!(profile.notice().unwrap().contains("visitas"));
    }

    #[test]
    fn cluster_column_is_not_plotted() {
        let rows = vec![row("0", &[("gasto", 50.0)])];
        let profile = RadarProfile::build("Cluster 0", &rows[0], &["cluster_marketing", "gasto"], &rows).unwrap();
        assert_eq!(profile.axes.len(), 1);
        assert!(matches!(
            profile.dropped[0],
            NormalizeError::InvalidValue { ref value, .. } if value == "0"
        ));
    }

    #[test]
    fn empty_population_is_still_an_error() {
        let rows: Vec<ClusterSummaryRow> = Vec::new();
        let entity = row("0", &[("gasto", 1.0)]);
        assert_eq!(
            RadarProfile::build("x", &entity, &["gasto"], &rows),
            Err(NormalizeError::EmptyPopulation)
        );
        let none: [&str; 0] = [];
        assert_eq!(
            RadarProfile::build("x", &entity, &none, &[entity.clone()]),
            Err(NormalizeError::NoMetrics)
        );
    }

    #[test]
    fn polygon_is_closed_and_starts_at_the_top() {
        let rows = vec![row("0", &[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0)])];
        let profile = RadarProfile::build("p", &rows[0], &["a", "b", "c", "d"], &rows).unwrap();
        let poly = profile.polygon();
        assert_eq!(poly.len(), 5);
        assert_eq!(poly[0], poly[4]);
        assert!(poly[0][0].abs() < 1e-12 && (poly[0][1] - 1.0).abs() < 1e-12);
        // second spoke of four points right (clockwise)
        assert!((poly[1][0] - 1.0).abs() < 1e-12 && poly[1][1].abs() < 1e-12);
    }
}
