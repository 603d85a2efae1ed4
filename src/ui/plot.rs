use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use eframe::egui::{Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, Plot, PlotPoint,
    PlotPoints, Points, Polygon, Text,
};

use crate::color::{ACCENT, ColorMap, diverging};
use crate::data::model::{CellValue, FanRecord, column_label};
use crate::data::radar::{RadarProfile, spoke_point};
use crate::data::stats::{CorrelationMatrix, FunnelStage, box_summary};

const CHART_HEIGHT: f32 = 300.0;

/// `labels[i]` when `position` is the integer `i`, otherwise empty.
fn category_label(labels: &[String], position: f64) -> String {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// Axis formatter that prints `labels[i]` at integer position `i`.
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| category_label(&labels, mark.value)
}

fn cluster_color(colors: Option<&ColorMap>, cluster: &str) -> Color32 {
    colors.map_or(ACCENT, |cm| cm.color_for_label(cluster))
}

// ---------------------------------------------------------------------------
// Overview charts
// ---------------------------------------------------------------------------

/// Bar per cluster with its fan count.
pub fn cluster_histogram(ui: &mut Ui, counts: &BTreeMap<String, usize>, colors: Option<&ColorMap>) {
    let labels: Vec<String> = counts.keys().map(|c| format!("Cluster {c}")).collect();
    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, (cluster, &n))| {
            Bar::new(i as f64, n as f64)
                .name(format!("Cluster {cluster}"))
                .fill(cluster_color(colors, cluster))
                .width(0.7)
        })
        .collect();

    Plot::new("cluster_histogram")
        .height(CHART_HEIGHT)
        .y_axis_label("Fans")
        .x_axis_formatter(category_axis(labels))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Fans"));
        });
}

/// One box per cluster for `metric`.
pub fn box_plot_by_cluster(
    ui: &mut Ui,
    metric: &str,
    groups: &BTreeMap<String, Vec<f64>>,
    colors: Option<&ColorMap>,
) {
    let labels: Vec<String> = groups.keys().map(|c| format!("Cluster {c}")).collect();
    let boxes: Vec<BoxElem> = groups
        .iter()
        .enumerate()
        .filter_map(|(i, (cluster, values))| {
            let b = box_summary(values)?;
            let color = cluster_color(colors, cluster);
            Some(
                BoxElem::new(i as f64, BoxSpread::new(b.min, b.q1, b.median, b.q3, b.max))
                    .name(format!("Cluster {cluster}"))
                    .box_width(0.5)
                    .whisker_width(0.3)
                    .fill(color.gamma_multiply(0.4))
                    .stroke(Stroke::new(1.5, color)),
            )
        })
        .collect();

    Plot::new(format!("box_{metric}"))
        .height(CHART_HEIGHT)
        .y_axis_label(column_label(metric))
        .x_axis_formatter(category_axis(labels))
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(boxes).name(column_label(metric)));
        });
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

/// Two numeric fan metrics against each other, one series per group of the
/// colour map's column.
pub fn scatter_plot(
    ui: &mut Ui,
    fans: &[&FanRecord],
    x: &str,
    y: &str,
    color_map: Option<&ColorMap>,
) {
    let color_column = color_map.map(|cm| cm.column.as_str());
    let mut groups: BTreeMap<CellValue, Vec<[f64; 2]>> = BTreeMap::new();
    for fan in fans {
        let (Some(xv), Some(yv)) = (fan.numeric(x), fan.numeric(y)) else {
            continue;
        };
        let key = color_column
            .and_then(|col| fan.attribute(col))
            .unwrap_or(CellValue::Null);
        groups.entry(key).or_default().push([xv, yv]);
    }

    Plot::new("scatter_plot")
        .height(CHART_HEIGHT * 1.3)
        .legend(Legend::default())
        .x_axis_label(column_label(x))
        .y_axis_label(column_label(y))
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            for (key, points) in groups {
                let color = color_map.map_or(ACCENT, |cm| cm.color_for(&key));
                let name = match (&key, color_column) {
                    (CellValue::Null, _) | (_, None) => "fans".to_string(),
                    (v, Some(col)) => format!("{}: {v}", column_label(col)),
                };
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .radius(3.0)
                        .color(color)
                        .name(name),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Radar
// ---------------------------------------------------------------------------

/// Polar chart of one or more profiles sharing the same spokes. Spoke labels
/// come from the first profile.
pub fn radar_chart(ui: &mut Ui, id: &str, profiles: &[(&RadarProfile, Color32)]) {
    let Some((first, _)) = profiles.first() else {
        return;
    };
    let n = first.axes.len();
    if n == 0 {
        ui.label(RichText::new("No metric could be normalized.").italics());
        return;
    }

    Plot::new(id)
        .height(CHART_HEIGHT * 1.4)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_x(-1.5)
        .include_x(1.5)
        .include_y(-1.3)
        .include_y(1.3)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            let grid = Color32::from_gray(90);
            for ring in [0.25, 0.5, 0.75, 1.0] {
                let points: PlotPoints = (0..=n).map(|i| spoke_point(i % n, n, ring)).collect();
                plot_ui.line(Line::new(points).color(grid).width(0.5));
            }
            for (i, axis) in first.axes.iter().enumerate() {
                let tip = spoke_point(i, n, 1.0);
                plot_ui.line(Line::new(vec![[0.0, 0.0], tip]).color(grid).width(0.5));
                let at = spoke_point(i, n, 1.15);
                plot_ui.text(
                    Text::new(PlotPoint::new(at[0], at[1]), axis.label())
                        .color(Color32::LIGHT_GRAY)
                        .anchor(Align2::CENTER_CENTER),
                );
            }
            for (profile, color) in profiles {
                let [r, g, b, _] = color.to_array();
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(profile.polygon()))
                        .fill_color(Color32::from_rgba_unmultiplied(r, g, b, 50))
                        .stroke(Stroke::new(2.0, *color))
                        .name(&profile.name),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Correlation heatmap
// ---------------------------------------------------------------------------

/// Square per metric pair, blue for negative and red for positive correlation.
pub fn correlation_heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    let labels: Vec<String> = matrix.labels.iter().map(|l| column_label(l).to_string()).collect();
    // rows run top to bottom, so row i sits at y = -i
    let row_labels = labels.clone();
    let n = labels.len();

    Plot::new("correlation_heatmap")
        .height(CHART_HEIGHT * 1.6)
        .data_aspect(1.0)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(category_axis(labels))
        .y_axis_formatter(move |mark, _range| category_label(&row_labels, -mark.value))
        .show(ui, |plot_ui| {
            for (i, row) in matrix.cells.iter().enumerate() {
                for (j, cell) in row.iter().enumerate() {
                    let (x, y) = (j as f64, -(i as f64));
                    let square = vec![
                        [x - 0.5, y - 0.5],
                        [x + 0.5, y - 0.5],
                        [x + 0.5, y + 0.5],
                        [x - 0.5, y + 0.5],
                    ];
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(square))
                            .fill_color(diverging(*cell))
                            .stroke(Stroke::new(0.5, Color32::BLACK)),
                    );
                    let text = cell.map_or_else(|| "–".to_string(), |r| format!("{r:.2}"));
                    plot_ui.text(
                        Text::new(PlotPoint::new(x, y), text)
                            .color(Color32::BLACK)
                            .anchor(Align2::CENTER_CENTER),
                    );
                }
            }
            if n == 0 {
                plot_ui.text(Text::new(PlotPoint::new(0.0, 0.0), "No metrics"));
            }
        });
}

// ---------------------------------------------------------------------------
// Funnel
// ---------------------------------------------------------------------------

/// Centred horizontal bars, widest stage on top.
pub fn funnel_chart(ui: &mut Ui, stages: &[FunnelStage]) {
    let total = stages.first().map_or(0, |s| s.count);
    let bars: Vec<Bar> = stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let width = stage.count as f64;
            Bar::new(-(i as f64), width)
                .base_offset(-width / 2.0)
                .width(0.8)
                .name(stage.label)
                .fill(ACCENT.gamma_multiply(1.0 - 0.15 * i as f32))
        })
        .collect();

    Plot::new("engagement_funnel")
        .height(CHART_HEIGHT)
        .show_axes([false, false])
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
            for (i, stage) in stages.iter().enumerate() {
                let share = if total > 0 {
                    100.0 * stage.count as f64 / total as f64
                } else {
                    0.0
                };
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(0.0, -(i as f64)),
                        format!("{}: {} ({share:.0}%)", stage.label, stage.count),
                    )
                    .color(Color32::BLACK)
                    .anchor(Align2::CENTER_CENTER),
                );
            }
        });
}
