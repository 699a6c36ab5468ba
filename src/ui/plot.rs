use std::collections::BTreeMap;

use eframe::egui::{self, Color32, RichText, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints, PlotUi, Points};

use crate::color::{legend_color, participant_color};
use crate::data::filter::filtered_records;
use crate::data::fit::fit_line;
use crate::data::model::{
    Condition, Dataset, ExperimentId, ExperimentRecord, ExperimentTable, LegendEntry,
};
use crate::state::{AppState, PanelView};

/// Height reserved above each plot for its title.
const TITLE_HEIGHT: f32 = 22.0;
/// Participant lines are drawn over x in `0..PARTICIPANT_X_MAX`.
const PARTICIPANT_X_MAX: u32 = 100;

// ---------------------------------------------------------------------------
// Panel grid (central panel)
// ---------------------------------------------------------------------------

/// Render the selected panel grid in the central panel.
pub fn panel_grid(ui: &mut Ui, state: &AppState) {
    let dataset = match &state.dataset {
        Some(ds) => ds,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a data folder to view the experiments (File → Open data folder…)");
            });
            return;
        }
    };

    if dataset.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Every row of the loaded experiments is excluded");
        });
        return;
    }

    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(&state.title);
    });

    match state.view {
        PanelView::Pairs => pair_panel(ui, dataset, state),
        PanelView::Soa => soa_panel(ui, dataset, state),
        PanelView::Participants => participant_panel(ui, state),
    }
}

/// 2×2 scatter of the experiment pairings, coloured by condition.
fn pair_panel(ui: &mut Ui, dataset: &Dataset, state: &AppState) {
    let pairings = dataset.pairings();
    grid(ui, 2, 2, |ui, row, col, height| {
        let Some(pairing) = pairings.get(row * 2 + col) else {
            return;
        };
        ui.label(RichText::new(pairing.title()).strong());
        let mut plot = axes(
            Plot::new(("pairs", row, col)),
            state.view,
            height,
            AxisLabels::for_cell(state, row, col),
        );
        if row == 0 && col == 1 {
            plot = plot.legend(Legend::default());
        }
        plot.show(ui, |plot_ui| {
            condition_scatter(plot_ui, &pairing.records, dataset.legend(), state);
        });
    });
}

/// 2×4 grid: negative-SOA experiments on the left, positive on the right,
/// each with its least-squares line.
fn soa_panel(ui: &mut Ui, dataset: &Dataset, state: &AppState) {
    let negative: Vec<&ExperimentTable> = dataset.negative_soa().collect();
    let positive: Vec<&ExperimentTable> = dataset.positive_soa().collect();
    grid(ui, 2, 4, |ui, row, col, height| {
        let (tables, sign) = if col < 2 {
            (&negative, "Negative")
        } else {
            (&positive, "Positive")
        };
        let Some(table) = tables.get(row * 2 + col % 2) else {
            return;
        };
        ui.label(RichText::new(format!("{} ({sign} SOAs)", table.id)).small().strong());
        let mut plot = axes(
            Plot::new(("soa", row, col)),
            state.view,
            height,
            AxisLabels::for_cell(state, row, col),
        );
        if row == 0 && col == 3 {
            plot = plot.legend(Legend::default());
        }
        plot.show(ui, |plot_ui| {
            condition_scatter(plot_ui, &table.records, dataset.legend(), state);
            regression_line(plot_ui, &table.records, state);
        });
    });
}

/// 2×4 grid of fitted lines for the sampled participants of each experiment.
fn participant_panel(ui: &mut Ui, state: &AppState) {
    grid(ui, 2, 4, |ui, row, col, height| {
        let Ok(id) = ExperimentId::new((row * 4 + col + 1) as i64) else {
            return;
        };
        ui.label(RichText::new(id.to_string()).strong());
        let lines = state.participant_lines.iter().find(|l| l.experiment == id);
        let plot = axes(
            Plot::new(("participants", row, col)),
            state.view,
            height,
            AxisLabels::for_cell(state, row, col),
        );
        plot.legend(Legend::default()).show(ui, |plot_ui| {
            for line in lines.into_iter().flat_map(|l| &l.lines) {
                let points: PlotPoints = (0..PARTICIPANT_X_MAX)
                    .map(|x| [x as f64, line.fit.at(x as f64)])
                    .collect();
                plot_ui.line(
                    Line::new(points)
                        .color(participant_color(line.slot))
                        .name(line.participant.to_string())
                        .width(1.5),
                );
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lay out `rows × cols` equally sized cells filling the available space.
fn grid(
    ui: &mut Ui,
    rows: usize,
    cols: usize,
    mut cell: impl FnMut(&mut Ui, usize, usize, f32),
) {
    let spacing = ui.spacing().item_spacing.y;
    let per_row = (ui.available_height() - spacing * rows as f32) / rows as f32;
    let height = (per_row - TITLE_HEIGHT).max(80.0);
    for row in 0..rows {
        ui.columns(cols, |columns: &mut [Ui]| {
            for (col, ui) in columns.iter_mut().enumerate() {
                cell(ui, row, col, height);
            }
        });
    }
}

/// Which axis labels a cell carries; only the outer plots get them.
#[derive(Clone, Copy)]
struct AxisLabels {
    x: Option<&'static str>,
    y: Option<&'static str>,
}

impl AxisLabels {
    fn for_cell(state: &AppState, row: usize, col: usize) -> Self {
        AxisLabels {
            x: (row == 1).then(|| state.x_column.name()),
            y: (col == 0).then(|| state.y_column.name()),
        }
    }
}

/// Shared axis setup: axes are linked across every plot of a view.
fn axes(plot: Plot, view: PanelView, height: f32, labels: AxisLabels) -> Plot {
    let mut plot = plot
        .height(height)
        .link_axis(egui::Id::new(view), egui::Vec2b::new(true, true))
        .allow_scroll(false);
    if let Some(label) = labels.x {
        plot = plot.x_axis_label(label);
    }
    if let Some(label) = labels.y {
        plot = plot.y_axis_label(label);
    }
    plot
}

/// Scatter `records` on the current axes, one series per visible condition,
/// in legend order.
fn condition_scatter(
    plot_ui: &mut PlotUi,
    records: &[ExperimentRecord],
    legend: &[LegendEntry],
    state: &AppState,
) {
    let mut by_condition: BTreeMap<Condition, Vec<[f64; 2]>> = BTreeMap::new();
    for record in filtered_records(records, &state.filters) {
        if let Some(point) = record.point(state.x_column, state.y_column) {
            by_condition.entry(record.condition).or_default().push(point);
        }
    }

    for entry in legend {
        let Some(points) = by_condition.remove(&entry.condition) else {
            continue;
        };
        let points: PlotPoints = points.into_iter().collect();
        plot_ui.points(
            Points::new(points)
                .color(legend_color(entry))
                .radius(2.5)
                .name(entry.label),
        );
    }
}

/// Least-squares line through the visible points, if one can be fit.
fn regression_line(plot_ui: &mut PlotUi, records: &[ExperimentRecord], state: &AppState) {
    let points: Vec<[f64; 2]> = filtered_records(records, &state.filters)
        .filter_map(|r| r.point(state.x_column, state.y_column))
        .collect();
    let Ok(fit) = fit_line(&points) else {
        return;
    };
    let (min_x, max_x) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[0]), hi.max(p[0]))
        });
    let line: PlotPoints = vec![[min_x, fit.at(min_x)], [max_x, fit.at(max_x)]]
        .into_iter()
        .collect();
    plot_ui.line(Line::new(line).color(Color32::RED).width(2.0));
}
