//! Top-level entry point for running TailPlot as a native window.

use std::path::PathBuf;
use std::time::Instant;

use eframe::egui;
use tracing::info;

use crate::config::TailPlotConfig;
use crate::session::Session;

use super::TailPlotApp;

/// Register `paths` as sources and open the viewer.
///
/// In static mode every source is read once before the window opens; in
/// live mode the first poll cycle happens on the first frame.
/// The call blocks until the window is closed.
pub fn run_tailplot(paths: Vec<PathBuf>, cfg: TailPlotConfig) -> eframe::Result<()> {
    let title = cfg.title.clone();
    let mut session = Session::new(cfg);
    let now = Instant::now();
    for path in paths {
        session.add_source(path, now);
    }
    info!(
        sources = session.ingest().source_count(),
        live = session.is_live(),
        "starting viewer"
    );
    let app = TailPlotApp::new(session);

    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(egui::vec2(1400.0, 900.0)),
        ..Default::default()
    };
    eframe::run_native(&title, opts, Box::new(|_cc| Ok(Box::new(app))))
}
