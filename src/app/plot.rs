//! Painting one slot with `egui_plot`.

use eframe::egui::{self, Color32};
use egui_plot::{Legend, Line, Plot, VLine};

use crate::data::render::{DrawKind, SlotRender};

const PALETTE: [Color32; 8] = [
    Color32::from_rgb(31, 119, 180),
    Color32::from_rgb(255, 127, 14),
    Color32::from_rgb(44, 160, 44),
    Color32::from_rgb(214, 39, 40),
    Color32::from_rgb(148, 103, 189),
    Color32::from_rgb(140, 86, 75),
    Color32::from_rgb(227, 119, 194),
    Color32::from_rgb(23, 190, 207),
];

/// Color follows the drawable id, so patched lines keep their color.
fn color_for(id: u64) -> Color32 {
    PALETTE[(id as usize) % PALETTE.len()]
}

/// Draw one slot. Returns `true` when the plot was clicked.
pub(super) fn show_slot(
    ui: &mut egui::Ui,
    render: Option<&SlotRender>,
    (tab, slot): (usize, usize),
    height: f32,
    selected: bool,
) -> bool {
    let frame = if selected {
        egui::Frame::NONE.stroke(egui::Stroke::new(1.5, ui.visuals().selection.bg_fill))
    } else {
        egui::Frame::NONE
    };
    frame
        .show(ui, |ui| {
            let plot = Plot::new(("tailplot_slot", tab, slot))
                .height(height)
                .legend(Legend::default())
                .allow_scroll(false);

            plot.show(ui, |plot_ui| {
                let Some(render) = render else {
                    return;
                };
                if let Some(limits) = render.limits {
                    plot_ui.set_plot_bounds_x(limits.x.min..=limits.x.max);
                    plot_ui.set_plot_bounds_y(limits.y.min..=limits.y.max);
                }
                for d in &render.drawables {
                    let color = color_for(d.id);
                    match d.kind {
                        DrawKind::Line => {
                            plot_ui.line(
                                Line::new(d.label.clone(), d.points.clone()).color(color),
                            );
                        }
                        DrawKind::StateMarkers => {
                            for p in &d.points {
                                plot_ui.vline(VLine::new(d.label.clone(), p[0]).color(color));
                            }
                        }
                    }
                }
            })
            .response
            .clicked()
        })
        .inner
}
