use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DissdataApp {
    pub state: AppState,
}

impl DissdataApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DissdataApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: axes, legend, participants ----
        egui::SidePanel::left("control_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot grid ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::panel_grid(ui, &self.state);
        });
    }
}
