mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::DissdataApp;
use config::SourceConfig;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let mut state = AppState::default();
    match SourceConfig::from_env() {
        Ok(Some(config)) => state.load(config),
        Ok(None) => log::info!(
            "Neither {} nor {} set; waiting for a data folder",
            config::CONFIG_ENV,
            config::ROOT_ENV
        ),
        Err(e) => {
            log::error!("Failed to read configuration: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dissertation Data – Panel Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(DissdataApp::new(state)))),
    )
}
