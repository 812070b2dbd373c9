//! Viewer for TailPlot.
//!
//! The viewer only consumes what the [`Session`] exposes: the signal-name
//! set, per-source status, per-slot drawables and source notifications.
//! Edits (assignments, scale/state, mode) go back through the session and
//! mark the view dirty so the next frame refreshes the render state.
//!
//! | Sub-module  | Responsibility |
//! | ----------- | -------------- |
//! | [`plot`]    | Painting one slot's drawables with `egui_plot` |
//! | [`sidebar`] | Signal list with scale/state editing and assignment |
//! | [`status`]  | Per-source status strip and notification log |
//! | [`run`]     | Top-level [`run_tailplot()`] entry point |

mod plot;
mod run;
mod sidebar;
mod status;

pub use run::run_tailplot;

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use eframe::egui;
use tracing::debug;

use crate::events::SourceEvent;
use crate::session::Session;

/// Notifications kept for the status strip.
const EVENT_LOG_LEN: usize = 50;

/// One line of the notification log.
#[derive(Debug, Clone)]
pub(crate) struct StatusLine {
    pub text: String,
    pub problem: bool,
}

/// Standalone TailPlot application that implements [`eframe::App`].
pub struct TailPlotApp {
    pub session: Session,
    events: Receiver<SourceEvent>,
    log: VecDeque<StatusLine>,
    tab: usize,
    filter: String,
    dirty: bool,
}

impl TailPlotApp {
    pub fn new(mut session: Session) -> Self {
        let events = session.subscribe();
        Self {
            session,
            events,
            log: VecDeque::new(),
            tab: 0,
            filter: String::new(),
            dirty: true,
        }
    }

    /// Request a render refresh on the next frame.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn drain_events(&mut self) {
        while let Ok(ev) = self.events.try_recv() {
            let label = self
                .session
                .ingest()
                .source_label(ev.source)
                .unwrap_or_else(|| format!("#{}", ev.source));
            self.log.push_front(StatusLine {
                text: ev.describe(&label),
                problem: ev.kind.is_problem(),
            });
            self.log.truncate(EVENT_LOG_LEN);
            self.dirty = true;
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("tailplot_top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Add files…").clicked() {
                    if let Some(paths) = rfd::FileDialog::new()
                        .add_filter("Delimited text", &["csv", "txt", "tsv", "dat"])
                        .pick_files()
                    {
                        let now = Instant::now();
                        for path in paths {
                            self.session.add_source(path, now);
                        }
                        self.dirty = true;
                    }
                }
                if ui.button("Clear sources").clicked() {
                    self.session.clear_sources();
                    self.dirty = true;
                }
                ui.separator();

                let mut live = self.session.is_live();
                if ui.checkbox(&mut live, "Live").changed() {
                    self.session.set_live(live, Instant::now());
                    self.dirty = true;
                }
                ui.separator();

                for tab in 0..self.session.assignments().tab_count() {
                    if ui
                        .selectable_label(self.tab == tab, format!("Tab {}", tab + 1))
                        .clicked()
                    {
                        self.tab = tab;
                        let slot = self.session.assignments().current().1;
                        self.session.assignments_mut().set_current(tab, slot);
                    }
                }
                ui.separator();

                let slots = self.session.assignments().slot_count(self.tab);
                let mut wanted = slots;
                ui.label("Slots:");
                ui.add(egui::DragValue::new(&mut wanted).range(1..=8));
                if wanted != slots {
                    self.session.assignments_mut().resize(self.tab, wanted);
                    self.dirty = true;
                }
                ui.separator();

                let (tab, slot) = self.session.assignments().current();
                if ui.button("Clear slot").clicked()
                    && self.session.assignments_mut().clear_slot(tab, slot).is_ok()
                {
                    self.dirty = true;
                }
                if ui.button("Clear all").clicked() {
                    self.session.assignments_mut().clear_all();
                    self.dirty = true;
                }
                let can_undo = self.session.assignments().can_undo();
                if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked()
                    && self.session.assignments_mut().undo()
                {
                    self.dirty = true;
                }
            });
        });
    }

    fn render_slots(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let tab = self.tab;
            let count = self.session.assignments().slot_count(tab);
            if count == 0 {
                ui.label("No slots in this tab.");
                return;
            }
            let current = self.session.assignments().current();
            let spacing = ui.spacing().item_spacing.y;
            let height = ((ui.available_height() - spacing * (count as f32 - 1.0))
                / count as f32)
                .max(60.0);
            for slot in 0..count {
                let selected = current == (tab, slot);
                let render = self.session.render().slot(tab, slot);
                if plot::show_slot(ui, render, (tab, slot), height, selected) {
                    self.session.assignments_mut().set_current(tab, slot);
                }
            }
        });
    }
}

impl eframe::App for TailPlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        if self.session.tick(now) {
            self.dirty = true;
        }
        self.drain_events();

        if self.dirty {
            let report = self.session.refresh_all();
            if !report.failures.is_empty() {
                debug!(failures = report.failures.len(), "refresh finished with failures");
            }
            self.dirty = false;
        }

        self.render_top_bar(ctx);
        status::show(ctx, self);
        sidebar::show(ctx, self);
        self.render_slots(ctx);

        if let Some(wait) = self.session.next_wake(Instant::now()) {
            ctx.request_repaint_after(wait.max(Duration::from_millis(10)));
        }
    }
}
