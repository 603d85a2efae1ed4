use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::Path;

use crate::color::ColorMap;
use crate::config::{Config, DataSource};
use crate::data::filter::{FilterState, filtered_indices, init_filter_state};
use crate::data::loader;
use crate::data::model::{
    CellValue, ClusterSummary, FanDataset, FanRecord, APP_VISITS, CLUSTER, FAN_METRICS,
    TOTAL_SPEND,
};
use crate::data::normalize::NormalizeError;
use crate::data::radar::RadarProfile;
use crate::data::stats::derive_cluster_summary;

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Overview,
    Clusters,
    FanDetail,
    Explore,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Overview,
        Section::Clusters,
        Section::FanDetail,
        Section::Explore,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Overview => "Overview",
            Section::Clusters => "Clusters",
            Section::FanDetail => "Fan detail",
            Section::Explore => "Explore",
        }
    }
}

/// Which fans a single fan's radar is scaled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopulationScope {
    #[default]
    AllFans,
    SameCluster,
}

impl PopulationScope {
    pub fn label(self) -> &'static str {
        match self {
            PopulationScope::AllFans => "All visible fans",
            PopulationScope::SameCluster => "Fan's cluster",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded fan table (None until a file is loaded).
    pub dataset: Option<FanDataset>,

    /// Loaded cluster summary; derived from the visible fans when absent.
    pub summary: Option<ClusterSummary>,

    /// Per-column filter selections.
    pub filters: FilterState,

    /// Indices of fans passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Which categorical column is used for colouring.
    pub color_column: Option<String>,

    /// Active colour map.
    pub color_map: Option<ColorMap>,

    /// Cluster colours, independent of the colour-by choice.
    pub cluster_colors: Option<ColorMap>,

    pub section: Section,
    pub selected_cluster: Option<String>,
    pub selected_fan: Option<String>,
    pub fan_scope: PopulationScope,
    pub scatter_x: String,
    pub scatter_y: String,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            summary: None,
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            color_column: None,
            color_map: None,
            cluster_colors: None,
            section: Section::default(),
            selected_cluster: None,
            selected_fan: None,
            fan_scope: PopulationScope::default(),
            scatter_x: APP_VISITS.to_string(),
            scatter_y: TOTAL_SPEND.to_string(),
            status_message: None,
        }
    }
}

impl AppState {
    /// State with the startup files from `config` already loaded.
    pub fn from_config(config: &Config) -> Self {
        let mut state = Self::default();
        let fans = config.fans_source();
        if fans.should_load() {
            state.load_fans_from(fans.path());
        } else {
            log::info!("No fan table at {}, starting empty", fans.path().display());
        }
        let summary = config.summary_source();
        if summary.should_load() {
            state.load_summary_from(summary.path());
        } else if let DataSource::Default(p) = &summary {
            log::debug!("No cluster summary at {}, deriving from fans", p.display());
        }
        state
    }

    /// Load a fan table, keeping the current one on failure.
    pub fn load_fans_from(&mut self, path: &Path) {
        match loader::load_fans(path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} fans from {} ({} clusters)",
                    dataset.len(),
                    path.display(),
                    dataset.unique_values.get(CLUSTER).map_or(0, |v| v.len())
                );
                if dataset.is_empty() {
                    log::warn!("{} has a header but no fan rows", path.display());
                }
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Load a cluster summary, keeping the current one on failure.
    pub fn load_summary_from(&mut self, path: &Path) {
        match loader::load_summary(path) {
            Ok(summary) => {
                log::info!(
                    "Loaded summary for {} clusters with metrics {:?}",
                    summary.rows.len(),
                    summary.metric_names
                );
                self.set_summary(summary);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded dataset, initialise filters, colour and selections.
    pub fn set_dataset(&mut self, dataset: FanDataset) {
        self.filters = init_filter_state(&dataset);
        self.visible_indices = (0..dataset.len()).collect();

        self.color_column = Some(CLUSTER.to_string());
        self.rebuild_color_map(&dataset);
        self.cluster_colors = dataset
            .unique_values
            .get(CLUSTER)
            .map(|vals| ColorMap::new(CLUSTER, vals));

        self.selected_fan = dataset.fans.first().map(|f| f.fan_id.clone());
        self.dataset = Some(dataset);
        self.ensure_cluster_selection();
        self.status_message = None;
    }

    pub fn set_summary(&mut self, summary: ClusterSummary) {
        self.summary = Some(summary);
        self.selected_cluster = None;
        self.ensure_cluster_selection();
        self.status_message = None;
    }

    /// Keep `selected_cluster` pointing at a row of the effective summary.
    fn ensure_cluster_selection(&mut self) {
        let summary = self.effective_summary();
        let valid = self
            .selected_cluster
            .as_deref()
            .is_some_and(|c| summary.row(c).is_some());
        if valid {
            return;
        }
        let first = summary.clusters().next().map(str::to_string);
        drop(summary);
        self.selected_cluster = first;
    }

    /// Keep `selected_fan` pointing at a visible fan, so its radar population
    /// always contains it.
    fn ensure_fan_selection(&mut self) {
        let visible = self.visible_fans();
        let valid = self
            .selected_fan
            .as_deref()
            .is_some_and(|id| visible.iter().any(|f| f.fan_id == id));
        if valid {
            return;
        }
        let first = visible.first().map(|f| f.fan_id.clone());
        drop(visible);
        self.selected_fan = first;
    }

    /// Rebuild the colour map from the current `color_column`.
    pub fn rebuild_color_map(&mut self, dataset: &FanDataset) {
        self.color_map = self.color_column.as_ref().and_then(|col| {
            dataset
                .unique_values
                .get(col)
                .map(|vals| ColorMap::new(col, vals))
        });
    }

    /// Recompute `visible_indices` after filter change.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            self.visible_indices = filtered_indices(ds, &self.filters);
        }
        self.ensure_fan_selection();
        if self.summary.is_none() {
            self.ensure_cluster_selection();
        }
    }

    /// Set colour column and rebuild the map.
    pub fn set_color_column(&mut self, col: String) {
        self.color_column = Some(col);
        if let Some(ds) = self.dataset.take() {
            self.rebuild_color_map(&ds);
            self.dataset = Some(ds);
        }
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &CellValue) {
        let selected = self.filters.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(ds) = &self.dataset {
            if let Some(all_vals) = ds.unique_values.get(column) {
                self.filters.insert(column.to_string(), all_vals.clone());
                self.refilter();
            }
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.filters.insert(column.to_string(), BTreeSet::new());
        self.refilter();
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// Fans passing the current filters, in file order.
    pub fn visible_fans(&self) -> Vec<&FanRecord> {
        match &self.dataset {
            Some(ds) => self.visible_indices.iter().map(|&i| &ds.fans[i]).collect(),
            None => Vec::new(),
        }
    }

    /// The loaded summary, or one derived from the visible fans.
    pub fn effective_summary(&self) -> Cow<'_, ClusterSummary> {
        match &self.summary {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(derive_cluster_summary(&self.visible_fans())),
        }
    }

    pub fn selected_fan_record(&self) -> Option<&FanRecord> {
        let id = self.selected_fan.as_deref()?;
        self.dataset.as_ref()?.find(id)
    }

    /// Radar of the selected cluster scaled against every summary row.
    pub fn cluster_radar(&self) -> Option<Result<RadarProfile, NormalizeError>> {
        let summary = self.effective_summary();
        let cluster = self.selected_cluster.as_deref()?;
        let row = summary.row(cluster)?;
        Some(RadarProfile::build(
            format!("Cluster {cluster}"),
            row,
            &summary.metric_names,
            &summary.rows,
        ))
    }

    /// Radar of the selected fan scaled against the chosen population.
    /// `None` when the fan is hidden by the filters.
    pub fn fan_radar(&self) -> Option<Result<RadarProfile, NormalizeError>> {
        let fan = self.selected_fan_record()?;
        let visible = self.visible_fans();
        if !visible.iter().any(|f| f.fan_id == fan.fan_id) {
            return None;
        }
        let population: Vec<&FanRecord> = match self.fan_scope {
            PopulationScope::AllFans => visible,
            PopulationScope::SameCluster => visible
                .into_iter()
                .filter(|f| f.cluster == fan.cluster)
                .collect(),
        };
        Some(RadarProfile::build(
            format!("Fan {}", fan.fan_id),
            fan,
            &FAN_METRICS,
            &population,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::fan;
    use crate::data::model::CHANNEL;

    fn state() -> AppState {
        let mut big = fan("big", "1", 400.0);
        big.channel = "web".into();
        let mut state = AppState::default();
        state.set_dataset(FanDataset::from_fans(vec![
            fan("a", "1", 100.0),
            fan("b", "2", 50.0),
            big,
        ]));
        state
    }

    #[test]
    fn loading_selects_first_fan_and_cluster() {
        let state = state();
        assert_eq!(state.selected_fan.as_deref(), Some("a"));
        assert_eq!(state.selected_cluster.as_deref(), Some("1"));
        assert_eq!(state.visible_fans().len(), 3);
        assert!(state.cluster_colors.is_some());
    }

    #[test]
    fn filters_narrow_visible_fans() {
        let mut state = state();
        state.toggle_filter_value(CHANNEL, &CellValue::Text("web".into()));
        let ids: Vec<&str> = state.visible_fans().iter().map(|f| f.fan_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        state.select_none(CLUSTER);
        assert!(state.visible_fans().is_empty());
        state.select_all(CLUSTER);
        assert_eq!(state.visible_fans().len(), 2);
    }

    #[test]
    fn fan_radar_scope_changes_the_scale() {
        let mut state = state();
        let all = state.fan_radar().unwrap().unwrap();
        let spend = |p: &RadarProfile| p.axes.iter().find(|a| a.metric == TOTAL_SPEND).unwrap().value;
        assert_eq!(spend(&all), 0.25);

        state.selected_fan = Some("b".into());
        state.fan_scope = PopulationScope::SameCluster;
        let own = state.fan_radar().unwrap().unwrap();
        assert_eq!(spend(&own), 1.0);
        assert_eq!(own.axes.len(), FAN_METRICS.len());
    }

    #[test]
    fn hiding_the_selected_fan_moves_the_selection() {
        let mut state = state();
        state.selected_fan = Some("big".into());
        state.toggle_filter_value(CHANNEL, &CellValue::Text("web".into()));
        assert_eq!(state.selected_fan.as_deref(), Some("a"));

        let radar = state.fan_radar().unwrap().unwrap();
        for axis in &radar.axes {
            assert!((0.0..=1.0).contains(&axis.value), "{} = {}", axis.metric, axis.value);
        }

        state.select_none(CLUSTER);
        assert_eq!(state.selected_fan, None);
        assert!(state.fan_radar().is_none());
    }

    #[test]
    fn fan_radar_skips_a_hidden_fan() {
        let mut state = state();
        state.filters.insert(CHANNEL.to_string(), BTreeSet::from([CellValue::Text("app".into())]));
        state.visible_indices = vec![0, 1];
        state.selected_fan = Some("big".into());
        assert!(state.fan_radar().is_none());
    }

    #[test]
    fn cluster_radar_uses_derived_summary_without_a_file() {
        let state = state();
        let radar = state.cluster_radar().unwrap().unwrap();
        assert_eq!(radar.name, "Cluster 1");
        let spend = radar.axes.iter().find(|a| a.metric == TOTAL_SPEND).unwrap();
        // cluster 1 mean 250 vs cluster 2 mean 50
        assert_eq!(spend.value, 1.0);
    }

    #[test]
    fn loaded_summary_replaces_derived_one() {
        let mut state = state();
        let summary = ClusterSummary {
            metric_names: vec!["gasto_medio".into()],
            rows: vec![
                crate::data::model::ClusterSummaryRow {
                    cluster: "A".into(),
                    values: [("gasto_medio".to_string(), 10.0)].into_iter().collect(),
                },
                crate::data::model::ClusterSummaryRow {
                    cluster: "B".into(),
                    values: [("gasto_medio".to_string(), 40.0)].into_iter().collect(),
                },
            ],
        };
        state.set_summary(summary);
        assert_eq!(state.selected_cluster.as_deref(), Some("A"));
        let radar = state.cluster_radar().unwrap().unwrap();
        assert_eq!(radar.axes[0].value, 0.25);
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut state = state();
        state.load_fans_from(Path::new("/definitely/not/here.csv"));
        assert!(state.status_message.as_deref().is_some_and(|m| m.starts_with("Error")));
        assert_eq!(state.dataset.as_ref().map(|d| d.len()), Some(3));
    }
}
