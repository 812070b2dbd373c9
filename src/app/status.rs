//! Bottom status strip: per-source rows/rate/state and the notification log.

use eframe::egui::{self, Color32, RichText};

use super::TailPlotApp;

pub(super) fn show(ctx: &egui::Context, app: &mut TailPlotApp) {
    egui::TopBottomPanel::bottom("tailplot_status")
        .resizable(true)
        .show(ctx, |ui| {
            let statuses = app.session.ingest().status();
            egui::Grid::new("tailplot_sources")
                .striped(true)
                .show(ui, |ui| {
                    for st in statuses {
                        let label = app
                            .session
                            .ingest()
                            .source_label(st.index)
                            .unwrap_or_else(|| st.path.display().to_string());
                        ui.label(label).on_hover_text(st.path.display().to_string());
                        ui.label(st.state.label());
                        ui.label(format!("{} rows", st.rows));
                        ui.label(format!("{:.1} rows/s", st.rate));
                        if st.state.is_polling() {
                            if ui.small_button("Stop").clicked() {
                                app.session.stop(st.index);
                            }
                        } else if ui.small_button("Restart").clicked() {
                            app.session.restart(st.index, std::time::Instant::now());
                        }
                        ui.end_row();
                    }
                });

            if let Some(line) = app.log.front() {
                let color = if line.problem {
                    Color32::from_rgb(230, 140, 40)
                } else {
                    ui.visuals().text_color()
                };
                ui.label(RichText::new(&line.text).color(color));
            }
            ui.collapsing("Log", |ui| {
                egui::ScrollArea::vertical().max_height(120.0).show(ui, |ui| {
                    for line in &app.log {
                        ui.label(&line.text);
                    }
                });
            });
        });
}
