use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant, UNIX_EPOCH};

use tailplot::config::TailPlotConfig;
use tailplot::data::assignment::SignalRef;
use tailplot::data::render::DrawKind;
use tailplot::data::xaxis::Series;
use tailplot::error::SignalError;
use tailplot::session::Session;

fn set_mtime(path: &Path, secs: u64) {
    let f = File::options().write(true).open(path).unwrap();
    f.set_modified(UNIX_EPOCH + Duration::from_secs(2_000_000 + secs))
        .unwrap();
}

fn append_at(path: &Path, text: &str, secs: u64) {
    let mut f = OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(text.as_bytes()).unwrap();
    drop(f);
    set_mtime(path, secs);
}

fn live_config() -> TailPlotConfig {
    TailPlotConfig {
        live: true,
        ..TailPlotConfig::default()
    }
}

#[test]
fn static_mode_autofits_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,a,b\n0,1,-2\n1,3,4\n2,2,0\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&path, Instant::now());
    session
        .assignments_mut()
        .assign(0, 0, vec![SignalRef::new(0, "a"), SignalRef::new(0, "b")])
        .unwrap();
    session.refresh_all();

    let slot = session.render().slot(0, 0).unwrap();
    let lim = slot.limits.unwrap();
    assert_eq!((lim.x.min, lim.x.max), (0.0, 2.0));
    assert_eq!((lim.y.min, lim.y.max), (-2.0, 4.0));

    // Narrower assignment: static limits shrink to the new data.
    session
        .assignments_mut()
        .assign(0, 0, vec![SignalRef::new(0, "a")])
        .unwrap();
    session.refresh_all();
    let lim = session.render().slot(0, 0).unwrap().limits.unwrap();
    assert_eq!((lim.y.min, lim.y.max), (1.0, 3.0));
}

#[test]
fn live_limits_never_shrink_and_patch_keeps_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,a\n0,0\n1,10\n").unwrap();
    set_mtime(&path, 1);

    let mut session = Session::new(live_config());
    let mut now = Instant::now();
    session.add_source(&path, now);
    assert!(session.tick(now));
    session
        .assignments_mut()
        .add(0, 0, SignalRef::new(0, "a"))
        .unwrap();
    session.refresh_all();

    let first = session.render().slot(0, 0).unwrap().clone();
    let id = first.drawables[0].id;
    let mut prev = first.limits.unwrap();

    for (k, row) in ["2,3\n", "3,-4\n", "4,5\n"].iter().enumerate() {
        append_at(&path, row, 2 + k as u64);
        now += Duration::from_millis(150);
        assert!(session.tick(now), "tick {} should see growth", k);
        let report = session.refresh_all();
        // Slot 1 is empty and therefore always redrawn.
        assert_eq!((report.patched, report.redrawn), (1, 1));

        let slot = session.render().slot(0, 0).unwrap();
        assert_eq!(slot.drawables[0].id, id);
        let lim = slot.limits.unwrap();
        assert!(lim.contains(&prev), "limits shrank at step {}", k);
        prev = lim;
    }
    let slot = session.render().slot(0, 0).unwrap();
    assert_eq!(slot.drawables[0].points.len(), 5);
    assert!(prev.x.max >= 4.0 && prev.y.min <= -4.0);
}

#[test]
fn live_patch_removes_stale_drawables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,a,b\n0,1,2\n").unwrap();

    let mut session = Session::new(live_config());
    let now = Instant::now();
    session.add_source(&path, now);
    session.tick(now);
    session
        .assignments_mut()
        .assign(0, 0, vec![SignalRef::new(0, "a"), SignalRef::new(0, "b")])
        .unwrap();
    session.refresh_all();
    let b_id = session.render().slot(0, 0).unwrap().drawable("b").unwrap().id;

    session
        .assignments_mut()
        .remove(0, 0, &SignalRef::new(0, "a"))
        .unwrap();
    session.refresh_all();
    let slot = session.render().slot(0, 0).unwrap();
    assert_eq!(slot.labels(), vec!["b"]);
    assert_eq!(slot.drawable("b").unwrap().id, b_id);
}

#[test]
fn scale_and_non_finite_filtering_apply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,a\n0,1\n1,oops\n2,3\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&path, Instant::now());
    assert_eq!(session.signals_mut().set_scale("a", 0.0), 1.0);
    session.signals_mut().set_scale("a", 2.0);
    session
        .assignments_mut()
        .add(0, 0, SignalRef::new(0, "a"))
        .unwrap();
    session.refresh_all();

    let d = &session.render().slot(0, 0).unwrap().drawables[0];
    assert_eq!(d.kind, DrawKind::Line);
    assert_eq!(d.points, vec![[0.0, 2.0], [2.0, 6.0]]);
}

#[test]
fn state_signal_draws_change_markers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,mode\n0,0\n1,0\n2,1\n3,1\n4,2\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&path, Instant::now());
    session.signals_mut().set_state("mode", true);
    session
        .assignments_mut()
        .add(0, 0, SignalRef::new(0, "mode"))
        .unwrap();
    session.refresh_all();

    let d = &session.render().slot(0, 0).unwrap().drawables[0];
    assert_eq!(d.kind, DrawKind::StateMarkers);
    assert_eq!(d.points, vec![[2.0, 1.0], [4.0, 2.0]]);
}

#[test]
fn failing_signal_does_not_abort_the_slot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,a\n0,1\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&path, Instant::now());
    session
        .assignments_mut()
        .assign(
            0,
            0,
            vec![
                SignalRef::new(7, "ghost"),
                SignalRef::new(0, "missing"),
                SignalRef::new(0, "a"),
            ],
        )
        .unwrap();
    let report = session.refresh_all();

    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].error, SignalError::UnknownSource(7));
    assert!(matches!(
        report.failures[1].error,
        SignalError::UnknownSignal { .. }
    ));
    assert_eq!(session.render().slot(0, 0).unwrap().labels(), vec!["a"]);
}

#[test]
fn empty_slot_autofits_to_neutral_in_static_mode() {
    let mut session = Session::new(TailPlotConfig::default());
    session.refresh_all();
    let cfg = session.config().render.neutral_limits;
    assert_eq!(session.render().slot(0, 1).unwrap().limits, Some(cfg));
}

#[test]
fn x_override_aligns_or_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,a,pos\n0,1,10\n1,2,20\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&path, Instant::now());
    session
        .assignments_mut()
        .add(0, 0, SignalRef::new(0, "a"))
        .unwrap();
    session
        .render_mut()
        .set_x_override(0, 0, Some(SignalRef::new(0, "pos")));
    session.refresh_all();
    let d = &session.render().slot(0, 0).unwrap().drawables[0];
    assert_eq!(d.points, vec![[10.0, 1.0], [20.0, 2.0]]);

    // Unknown override: time axis, one reported failure.
    session
        .render_mut()
        .set_x_override(0, 0, Some(SignalRef::new(0, "nope")));
    let report = session.refresh_all();
    assert_eq!(report.failures.len(), 1);
    let d = &session.render().slot(0, 0).unwrap().drawables[0];
    assert_eq!(d.points, vec![[0.0, 1.0], [1.0, 2.0]]);
}

#[test]
fn derived_and_linked_signals_resolve_through_injected_functions() {
    let mut session = Session::new(TailPlotConfig::default());
    session.register_derived("power");
    session
        .render_mut()
        .set_derived_accessor(Some(Box::new(|name: &str| {
            if name == "power" {
                Series::new(vec![0.0, 1.0, 2.0], vec![5.0, f64::NAN, 7.0])
            } else {
                Series::default()
            }
        })));
    session.render_mut().set_linker(Some(Box::new(|refs: &[SignalRef]| {
        let mut out = refs.to_vec();
        if refs.iter().any(|r| r.name == "power") {
            out.push(SignalRef::derived("unknown"));
        }
        out
    })));
    session
        .assignments_mut()
        .add(0, 0, SignalRef::derived("power"))
        .unwrap();
    session.refresh_all();

    let slot = session.render().slot(0, 0).unwrap();
    assert_eq!(slot.labels(), vec!["power", "unknown"]);
    assert_eq!(slot.drawables[0].points, vec![[0.0, 5.0], [2.0, 7.0]]);
    assert!(slot.drawables[1].points.is_empty());
}

#[test]
fn live_slot_drops_placeholder_limits_once_data_arrives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("far.csv");
    let rows: String = (0..=10)
        .map(|k| format!("{},{}\n", 1000 + k, 500 + k))
        .collect();
    fs::write(&path, format!("t,a\n{}", rows)).unwrap();
    set_mtime(&path, 1);

    let mut session = Session::new(live_config());
    let now = Instant::now();
    session.add_source(&path, now);
    session.refresh_all();
    let neutral = session.config().render.neutral_limits;
    assert_eq!(session.render().slot(0, 0).unwrap().limits, Some(neutral));

    assert!(session.tick(now));
    session
        .assignments_mut()
        .add(0, 0, SignalRef::new(0, "a"))
        .unwrap();
    session.refresh_all();

    let lim = session.render().slot(0, 0).unwrap().limits.unwrap();
    assert!((lim.x.min - 999.5).abs() < 1e-9, "x.min = {}", lim.x.min);
    assert!((lim.y.min - 499.0).abs() < 1e-9, "y.min = {}", lim.y.min);

    // Emptying the slot holds the fitted limits.
    session.assignments_mut().clear_slot(0, 0).unwrap();
    session.refresh_all();
    assert_eq!(session.render().slot(0, 0).unwrap().limits, Some(lim));
}

#[test]
fn assigned_signals_map_to_their_own_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.csv");
    fs::write(&path, "t,a,b\n0,1,2\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&path, Instant::now());
    let ghost = SignalRef::new(0, "ghost");
    let b = SignalRef::new(0, "b");
    session
        .assignments_mut()
        .assign(0, 0, vec![ghost.clone(), b.clone()])
        .unwrap();
    session.render_mut().set_linker(Some(Box::new(|refs: &[SignalRef]| {
        let mut out = vec![SignalRef::new(0, "a")];
        out.extend_from_slice(refs);
        out
    })));
    session.refresh_all();

    let slot = session.render().slot(0, 0).unwrap();
    assert_eq!(slot.labels(), vec!["a", "b"]);
    assert_eq!(slot.label_for(&b), Some("b"));
    assert_eq!(slot.label_for(&ghost), None);
}
