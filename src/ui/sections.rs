use eframe::egui::{self, Color32, Grid, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::ACCENT;
use crate::data::model::{
    AGE, APP_VISITS, CHANNEL, CLUSTER, EVENT_PARTICIPATION, FAN_METRICS, FanRecord, LOCALITY,
    NEWSLETTER_CLICK_RATE, SOCIAL_INTERACTIONS, TOTAL_PURCHASES, TOTAL_SPEND, column_label,
};
use crate::data::radar::RadarProfile;
use crate::data::normalize::NormalizeError;
use crate::data::stats::{
    cluster_counts, correlation_matrix, engagement_funnel, mean, metric_values, values_by_cluster,
};
use crate::state::{AppState, PopulationScope};
use crate::ui::plot;

/// Big number with a caption, like a dashboard KPI card.
fn metric_card(ui: &mut Ui, caption: &str, value: impl Into<String>) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.label(RichText::new(caption).weak());
            ui.label(RichText::new(value).size(26.0).strong());
        });
    });
}

fn empty_notice(ui: &mut Ui) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading("Open a fan table to begin  (File → Open fans…)");
    });
}

/// Radar chart, or the reason there is none.
fn radar_or_message(
    ui: &mut Ui,
    id: &str,
    profile: Option<Result<RadarProfile, NormalizeError>>,
    color: Color32,
) {
    match profile {
        None => {
            ui.label("Nothing selected.");
        }
        Some(Err(e)) => {
            ui.label(RichText::new(format!("Cannot draw radar: {e}")).color(Color32::YELLOW));
        }
        Some(Ok(profile)) => {
            plot::radar_chart(ui, id, &[(&profile, color)]);
            if let Some(notice) = profile.notice() {
                ui.label(RichText::new(notice).weak());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

pub fn overview(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        empty_notice(ui);
        return;
    }
    let fans = state.visible_fans();

    ui.heading("Fan base overview");
    ui.horizontal(|ui: &mut Ui| {
        metric_card(ui, "Total fans", fans.len().to_string());
        let avg_spend = mean(&metric_values(&fans, TOTAL_SPEND))
            .map_or_else(|| "–".to_string(), |m| format!("{m:.2} €"));
        metric_card(ui, "Mean total spend", avg_spend);
    });

    let colors = state.cluster_colors.as_ref();

    ui.add_space(8.0);
    ui.strong("Fans per cluster");
    plot::cluster_histogram(ui, &cluster_counts(&fans), colors);

    ui.add_space(8.0);
    ui.strong("Social interactions by cluster");
    plot::box_plot_by_cluster(
        ui,
        SOCIAL_INTERACTIONS,
        &values_by_cluster(&fans, SOCIAL_INTERACTIONS),
        colors,
    );

    ui.add_space(8.0);
    ui.strong("Total spend by cluster");
    plot::box_plot_by_cluster(ui, TOTAL_SPEND, &values_by_cluster(&fans, TOTAL_SPEND), colors);
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

pub fn clusters(ui: &mut Ui, state: &mut AppState) {
    let summary = state.effective_summary().into_owned();
    if summary.is_empty() {
        ui.label("No clusters to show. Load a fan table or a cluster summary.");
        return;
    }

    ui.heading("Cluster segmentation");
    ui.push_id("cluster_summary_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto().at_least(80.0))
            .columns(Column::auto().at_least(70.0), summary.metric_names.len())
            .header(22.0, |mut header| {
                header.col(|ui: &mut Ui| {
                    ui.strong(column_label(CLUSTER));
                });
                for name in &summary.metric_names {
                    header.col(|ui: &mut Ui| {
                        ui.strong(column_label(name));
                    });
                }
            })
            .body(|mut body| {
                for row in &summary.rows {
                    body.row(20.0, |mut table_row| {
                        table_row.col(|ui: &mut Ui| {
                            let color = state
                                .cluster_colors
                                .as_ref()
                                .map_or(ACCENT, |cm| cm.color_for_label(&row.cluster));
                            ui.label(RichText::new(&row.cluster).color(color));
                        });
                        for name in &summary.metric_names {
                            table_row.col(|ui: &mut Ui| {
                                match row.values.get(name) {
                                    Some(v) => ui.label(format!("{v:.2}")),
                                    None => ui.label("–"),
                                };
                            });
                        }
                    });
                }
            });
    });

    ui.add_space(12.0);
    ui.strong("Radar comparison of cluster metrics");
    let current = state.selected_cluster.clone().unwrap_or_default();
    egui::ComboBox::from_label("Cluster")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for cluster in summary.clusters() {
                ui.selectable_value(&mut state.selected_cluster, Some(cluster.to_string()), cluster);
            }
        });

    radar_or_message(ui, "cluster_radar", state.cluster_radar(), ACCENT);
}

// ---------------------------------------------------------------------------
// Fan detail
// ---------------------------------------------------------------------------

pub fn fan_detail(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = &state.dataset else {
        empty_notice(ui);
        return;
    };
    let ids: Vec<String> = state
        .visible_indices
        .iter()
        .map(|&i| dataset.fans[i].fan_id.clone())
        .collect();

    ui.heading("Individual fan");
    let current = state.selected_fan.clone().unwrap_or_default();
    egui::ComboBox::from_label("Fan")
        .selected_text(&current)
        .height(300.0)
        .show_ui(ui, |ui: &mut Ui| {
            for id in &ids {
                ui.selectable_value(&mut state.selected_fan, Some(id.clone()), id);
            }
        });

    let Some(fan) = state.selected_fan_record().cloned() else {
        ui.label("Select a fan.");
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        metric_card(ui, column_label(TOTAL_SPEND), format!("{:.2}", fan.total_spend));
        metric_card(ui, column_label(CLUSTER), fan.cluster.clone());
    });

    ui.add_space(8.0);
    ui.strong("Advanced metrics");
    advanced_metrics_grid(ui, &fan);
    if ui.button("Copy as JSON").clicked() {
        match serde_json::to_string_pretty(&fan) {
            Ok(json) => ui.ctx().copy_text(json),
            Err(e) => log::error!("Failed to serialise fan {}: {e}", fan.fan_id),
        }
    }

    ui.add_space(12.0);
    ui.strong("Profile against population maxima");
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Scale against:");
        for scope in [PopulationScope::AllFans, PopulationScope::SameCluster] {
            ui.radio_value(&mut state.fan_scope, scope, scope.label());
        }
    });
    let color = state
        .cluster_colors
        .as_ref()
        .map_or(ACCENT, |cm| cm.color_for_label(&fan.cluster));
    radar_or_message(ui, "fan_radar", state.fan_radar(), color);
}

fn advanced_metrics_grid(ui: &mut Ui, fan: &FanRecord) {
    let rows: [(&str, String); 8] = [
        (AGE, format!("{}", fan.age)),
        (LOCALITY, fan.locality.clone()),
        (CHANNEL, fan.channel.clone()),
        (APP_VISITS, format!("{}", fan.app_visits)),
        (SOCIAL_INTERACTIONS, format!("{}", fan.social_interactions)),
        (NEWSLETTER_CLICK_RATE, format!("{:.2}", fan.newsletter_click_rate)),
        (TOTAL_PURCHASES, format!("{}", fan.total_purchases)),
        (EVENT_PARTICIPATION, format!("{}", fan.event_participation)),
    ];
    Grid::new("fan_metrics")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for (name, value) in rows {
                ui.label(column_label(name));
                ui.label(value);
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// Explore
// ---------------------------------------------------------------------------

pub fn explore(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        empty_notice(ui);
        return;
    }

    ui.heading("Explore metrics");
    ui.horizontal(|ui: &mut Ui| {
        metric_selector(ui, "scatter_x", "X", &mut state.scatter_x);
        metric_selector(ui, "scatter_y", "Y", &mut state.scatter_y);
    });

    let fans = state.visible_fans();
    plot::scatter_plot(
        ui,
        &fans,
        &state.scatter_x,
        &state.scatter_y,
        state.color_map.as_ref(),
    );

    ui.add_space(12.0);
    ui.strong("Correlation between metrics");
    plot::correlation_heatmap(ui, &correlation_matrix(&fans, &FAN_METRICS));

    ui.add_space(12.0);
    ui.strong("Engagement funnel");
    plot::funnel_chart(ui, &engagement_funnel(&fans));
}

fn metric_selector(ui: &mut Ui, id: &str, label: &str, value: &mut String) {
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(column_label(value))
        .show_ui(ui, |ui: &mut Ui| {
            for metric in FAN_METRICS {
                ui.selectable_value(value, metric.to_string(), column_label(metric));
            }
        });
}
