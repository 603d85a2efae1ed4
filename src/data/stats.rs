use std::collections::BTreeMap;

use super::model::{
    ClusterSummary, ClusterSummaryRow, FanRecord, APP_VISITS, EVENT_PARTICIPATION, FAN_METRICS,
    NEWSLETTER_CLICK_RATE, TOTAL_PURCHASES,
};

/// Column holding the fan count in a summary derived from the fan table.
pub const FAN_COUNT: &str = "fans";

// ---------------------------------------------------------------------------
// Single series
// ---------------------------------------------------------------------------

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Five-number summary for a box plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Quartiles by linear interpolation between order statistics at `(n-1)·p`.
pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(BoxSummary {
        min: sorted[0],
        q1: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q3: quantile_sorted(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * p;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Pearson correlation; `None` when undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Fan table aggregates
// ---------------------------------------------------------------------------

pub fn cluster_counts(fans: &[&FanRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for fan in fans {
        *counts.entry(fan.cluster.clone()).or_insert(0) += 1;
    }
    counts
}

/// Values of `metric` grouped by cluster, in cluster order.
pub fn values_by_cluster(fans: &[&FanRecord], metric: &str) -> BTreeMap<String, Vec<f64>> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for fan in fans {
        if let Some(v) = fan.numeric(metric) {
            groups.entry(fan.cluster.clone()).or_default().push(v);
        }
    }
    groups
}

pub fn metric_values(fans: &[&FanRecord], metric: &str) -> Vec<f64> {
    fans.iter().filter_map(|f| f.numeric(metric)).collect()
}

/// Symmetric matrix of pairwise Pearson correlations.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// `cells[i][j]` correlates `labels[i]` with `labels[j]`.
    pub cells: Vec<Vec<Option<f64>>>,
}

pub fn correlation_matrix(fans: &[&FanRecord], metrics: &[&str]) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = metrics.iter().map(|m| metric_values(fans, m)).collect();
    let n = metrics.len();
    let mut cells = vec![vec![None; n]; n];
    for i in 0..n {
        cells[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]);
            cells[i][j] = r;
            cells[j][i] = r;
        }
    }
    CorrelationMatrix {
        labels: metrics.iter().map(|m| m.to_string()).collect(),
        cells,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelStage {
    pub label: &'static str,
    pub count: usize,
}

/// All fans → app visitors → newsletter clickers → buyers → event participants.
/// Each stage only counts fans that passed every earlier stage.
pub fn engagement_funnel(fans: &[&FanRecord]) -> Vec<FunnelStage> {
    let steps: [(&'static str, Option<&str>); 5] = [
        ("All fans", None),
        ("App visitors", Some(APP_VISITS)),
        ("Newsletter clickers", Some(NEWSLETTER_CLICK_RATE)),
        ("Buyers", Some(TOTAL_PURCHASES)),
        ("Event participants", Some(EVENT_PARTICIPATION)),
    ];

    let mut remaining: Vec<&FanRecord> = fans.to_vec();
    steps
        .iter()
        .map(|&(label, metric)| {
            if let Some(metric) = metric {
                remaining.retain(|f| f.numeric(metric).is_some_and(|v| v > 0.0));
            }
            FunnelStage {
                label,
                count: remaining.len(),
            }
        })
        .collect()
}

/// Per-cluster means of every numeric fan metric, plus a fan count. Used
/// when no precomputed summary file is loaded.
pub fn derive_cluster_summary(fans: &[&FanRecord]) -> ClusterSummary {
    let mut groups: BTreeMap<&str, Vec<&FanRecord>> = BTreeMap::new();
    for &fan in fans {
        groups.entry(fan.cluster.as_str()).or_default().push(fan);
    }

    let rows = groups
        .into_iter()
        .map(|(cluster, members)| {
            let mut values = BTreeMap::new();
            values.insert(FAN_COUNT.to_string(), members.len() as f64);
            for metric in FAN_METRICS {
                if let Some(m) = mean(&metric_values(&members, metric)) {
                    values.insert(metric.to_string(), m);
                }
            }
            ClusterSummaryRow {
                cluster: cluster.to_string(),
                values,
            }
        })
        .collect();

    let mut metric_names = vec![FAN_COUNT.to_string()];
    metric_names.extend(FAN_METRICS.iter().map(|m| m.to_string()));
    ClusterSummary { metric_names, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::fan;
    use crate::data::model::TOTAL_SPEND;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn quartiles_interpolate() {
        let b = box_summary(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(
            b,
            BoxSummary {
                min: 1.0,
                q1: 1.75,
                median: 2.5,
                q3: 3.25,
                max: 4.0
            }
        );
        let single = box_summary(&[7.0]).unwrap();
        assert_eq!(single.q1, 7.0);
        assert_eq!(single.max, 7.0);
        assert!(box_summary(&[]).is_none());
    }

    #[test]
    fn pearson_extremes() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let up = [2.0, 4.0, 6.0, 8.0];
        let down = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&xs, &up).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &down).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&xs, &[5.0; 4]), None);
        assert_eq!(pearson(&xs, &up[..3]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let mut a = fan("a", "1", 10.0);
        a.app_visits = 1.0;
        let mut b = fan("b", "1", 20.0);
        b.app_visits = 3.0;
        let mut c = fan("c", "2", 30.0);
        c.app_visits = 2.0;
        let fans = [&a, &b, &c];
        let m = correlation_matrix(&fans, &[TOTAL_SPEND, APP_VISITS, EVENT_PARTICIPATION]);
        assert_eq!(m.cells[0][0], Some(1.0));
        assert_eq!(m.cells[0][1], m.cells[1][0]);
        assert!((m.cells[0][1].unwrap() - 0.5).abs() < 1e-12);
        // event participation is constant in the fixtures
        assert_eq!(m.cells[0][2], None);
        assert_eq!(m.cells[2][2], Some(1.0));
    }

    #[test]
    fn funnel_is_non_increasing() {
        let mut idle = fan("idle", "1", 0.0);
        idle.app_visits = 0.0;
        let mut browser = fan("browser", "1", 0.0);
        browser.total_purchases = 0.0;
        let buyer = fan("buyer", "2", 40.0);
        let mut no_events = fan("no_events", "2", 40.0);
        no_events.event_participation = 0.0;
        let fans = [&idle, &browser, &buyer, &no_events];

        let stages = engagement_funnel(&fans);
        let counts: Vec<usize> = stages.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![4, 3, 3, 2, 1]);
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(stages[0].label, "All fans");
    }

    #[test]
    fn derived_summary_averages_each_cluster() {
        let a = fan("a", "1", 10.0);
        let b = fan("b", "1", 30.0);
        let c = fan("c", "2", 5.0);
        let summary = derive_cluster_summary(&[&a, &b, &c]);
        assert_eq!(summary.clusters().collect::<Vec<_>>(), vec!["1", "2"]);
        let one = summary.row("1").unwrap();
        assert_eq!(one.values[FAN_COUNT], 2.0);
        assert_eq!(one.values[TOTAL_SPEND], 20.0);
        assert_eq!(summary.metric_names.len(), FAN_METRICS.len() + 1);
        assert_eq!(summary.metric_names[0], FAN_COUNT);
    }

    #[test]
    fn counts_and_groups_by_cluster() {
        let a = fan("a", "1", 10.0);
        let b = fan("b", "2", 30.0);
        let c = fan("c", "1", 5.0);
        let fans = [&a, &b, &c];
        assert_eq!(cluster_counts(&fans)["1"], 2);
        assert_eq!(values_by_cluster(&fans, TOTAL_SPEND)["1"], vec![10.0, 5.0]);
        assert!(values_by_cluster(&fans, "nope").is_empty());
    }
}
