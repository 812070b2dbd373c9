//! Signal list: per-name scale/state editing and assignment to the current slot.

use eframe::egui;

use crate::data::assignment::SignalRef;

use super::TailPlotApp;

/// Every (source, name) pair that carries `name`; derived names map to source `-1`.
fn instances(app: &TailPlotApp, name: &str) -> Vec<(SignalRef, String)> {
    let ingest = app.session.ingest();
    let mut out: Vec<(SignalRef, String)> = ingest
        .sources()
        .filter(|s| s.table().column(name).is_some())
        .map(|s| {
            let label = ingest
                .source_label(s.index)
                .unwrap_or_else(|| s.stem());
            (SignalRef::new(s.index as i32, name), label)
        })
        .collect();
    if out.is_empty() {
        out.push((SignalRef::derived(name), "derived".to_string()));
    }
    out
}

pub(super) fn show(ctx: &egui::Context, app: &mut TailPlotApp) {
    egui::SidePanel::left("tailplot_signals")
        .resizable(true)
        .default_width(260.0)
        .show(ctx, |ui| {
            let (tab, slot) = app.session.assignments().current();
            ui.heading(format!("Slot {}.{}", tab + 1, slot + 1));
            render_assigned(ui, app, tab, slot);
            ui.separator();

            ui.heading("Signals");
            ui.horizontal(|ui| {
                ui.label("Filter:");
                ui.text_edit_singleline(&mut app.filter);
            });
            let filter = app.filter.to_lowercase();
            let names: Vec<String> = app
                .session
                .signal_names()
                .iter()
                .filter(|n| filter.is_empty() || n.to_lowercase().contains(&filter))
                .cloned()
                .collect();

            egui::ScrollArea::vertical().show(ui, |ui| {
                for name in names {
                    render_signal(ui, app, &name, tab, slot);
                }
            });
        });
}

fn render_assigned(ui: &mut egui::Ui, app: &mut TailPlotApp, tab: usize, slot: usize) {
    let assigned: Vec<SignalRef> = app
        .session
        .assignments()
        .slot(tab, slot)
        .map(<[SignalRef]>::to_vec)
        .unwrap_or_default();
    if assigned.is_empty() {
        ui.weak("nothing assigned");
    }
    let labels: Vec<String> = {
        let render = app.session.render().slot(tab, slot);
        assigned
            .iter()
            .map(|signal| {
                render
                    .and_then(|r| r.label_for(signal))
                    .map_or_else(|| signal.name.clone(), str::to_string)
            })
            .collect()
    };

    for (signal, text) in assigned.iter().zip(labels) {
        ui.horizontal(|ui| {
            ui.label(text);
            if ui.small_button("x").clicked()
                && matches!(app.session.assignments_mut().remove(tab, slot, signal), Ok(true))
            {
                app.mark_dirty();
            }
        });
    }

    let current = app.session.render().x_override(tab, slot).cloned();
    let mut chosen = current.clone();
    egui::ComboBox::from_id_salt(("x_override", tab, slot))
        .selected_text(
            current
                .as_ref()
                .map_or_else(|| "X: time".to_string(), |r| format!("X: {}", r.name)),
        )
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut chosen, None, "time");
            for signal in &assigned {
                ui.selectable_value(&mut chosen, Some(signal.clone()), signal.name.as_str());
            }
        });
    if chosen != current {
        app.session.render_mut().set_x_override(tab, slot, chosen);
        app.mark_dirty();
    }
}

fn render_signal(ui: &mut egui::Ui, app: &mut TailPlotApp, name: &str, tab: usize, slot: usize) {
    ui.collapsing(name, |ui| {
        let mut scale = app.session.signals().scale(name);
        ui.horizontal(|ui| {
            ui.label("Scale");
            if ui.add(egui::DragValue::new(&mut scale).speed(0.01)).changed() {
                app.session.signals_mut().set_scale(name, scale);
                app.mark_dirty();
            }
        });
        let mut state = app.session.signals().state(name);
        if ui.checkbox(&mut state, "State signal").changed() {
            app.session.signals_mut().set_state(name, state);
            app.mark_dirty();
        }
        for (signal, label) in instances(app, name) {
            if ui.button(format!("+ {}", label)).clicked()
                && matches!(app.session.assignments_mut().add(tab, slot, signal), Ok(true))
            {
                app.mark_dirty();
            }
        }
    });
}
