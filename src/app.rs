use eframe::egui::{self, ScrollArea, Ui};

use crate::config::Config;
use crate::state::{AppState, Section};
use crate::ui::{panels, sections};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct FanDashboardApp {
    pub state: AppState,
}

impl FanDashboardApp {
    pub fn new(config: &Config) -> Self {
        Self {
            state: AppState::from_config(config),
        }
    }
}

impl eframe::App for FanDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: navigation and filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: active section ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| match self.state.section {
                    Section::Overview => sections::overview(ui, &self.state),
                    Section::Clusters => sections::clusters(ui, &mut self.state),
                    Section::FanDetail => sections::fan_detail(ui, &mut self.state),
                    Section::Explore => sections::explore(ui, &mut self.state),
                });
        });
    }
}
