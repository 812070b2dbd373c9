use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant, UNIX_EPOCH};

use tailplot::config::TailPlotConfig;
use tailplot::data::assignment::SignalRef;
use tailplot::data::source::SourceState;
use tailplot::scheduler::PollScheduler;
use tailplot::session::Session;

fn set_mtime(path: &Path, secs: u64) {
    let f = File::options().write(true).open(path).unwrap();
    f.set_modified(UNIX_EPOCH + Duration::from_secs(3_000_000 + secs))
        .unwrap();
}

fn append_at(path: &Path, text: &str, secs: u64) {
    let mut f = OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(text.as_bytes()).unwrap();
    drop(f);
    set_mtime(path, secs);
}

fn live_session() -> Session {
    Session::new(TailPlotConfig {
        live: true,
        ..TailPlotConfig::default()
    })
}

#[test]
fn scheduler_runs_each_due_ticker_once() {
    let t0 = Instant::now();
    let mut sched = PollScheduler::new(Duration::from_millis(100));
    sched.add(t0);
    sched.add(t0);

    let mut ran = Vec::new();
    assert_eq!(sched.run_due(t0, |i| ran.push(i)), 2);
    assert_eq!(ran, vec![0, 1]);

    // Not due again until one period has elapsed.
    assert_eq!(sched.run_due(t0 + Duration::from_millis(50), |_| {}), 0);
    sched.cancel(1);
    sched.cancel(1);
    assert_eq!(sched.active(), 1);
    assert_eq!(sched.run_due(t0 + Duration::from_millis(100), |_| {}), 1);
}

#[test]
fn sources_poll_independently() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");
    fs::write(&a, "t,x\n0,1\n").unwrap();
    fs::write(&b, "t,y\n0,1\n").unwrap();
    set_mtime(&a, 1);
    set_mtime(&b, 1);

    let mut session = live_session();
    let t0 = Instant::now();
    session.add_source(&a, t0);
    session.add_source(&b, t0);
    assert!(session.tick(t0));

    // `a` keeps growing, `b` stalls past the timeout.
    let mut now = t0;
    for k in 0..12 {
        now += Duration::from_millis(100);
        append_at(&a, &format!("{},1\n", k + 1), 2 + k);
        session.tick(now);
    }

    let a_src = session.ingest().source(0).unwrap();
    let b_src = session.ingest().source(1).unwrap();
    assert!(a_src.state().is_polling());
    assert_eq!(a_src.rows(), 13);
    assert_eq!(b_src.state(), SourceState::TimedOut);
    assert_eq!(b_src.rows(), 1);
    assert!(session.next_wake(now).is_some());
}

#[test]
fn stopped_source_is_not_polled_until_restart() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    fs::write(&a, "t,x\n0,1\n").unwrap();
    set_mtime(&a, 1);

    let mut session = live_session();
    let t0 = Instant::now();
    session.add_source(&a, t0);
    session.tick(t0);
    session.stop(0);
    session.stop(0);

    append_at(&a, "1,2\n", 2);
    assert!(!session.tick(t0 + Duration::from_millis(200)));
    assert_eq!(session.ingest().source(0).unwrap().rows(), 1);

    session.restart(0, t0 + Duration::from_millis(300));
    assert!(session.tick(t0 + Duration::from_millis(300)));
    assert_eq!(session.ingest().source(0).unwrap().rows(), 2);
}

#[test]
fn signal_registry_follows_the_name_set() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    fs::write(&a, "t,x,y\n0,1,2\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&a, Instant::now());
    assert!(session.signals().contains("x"));
    assert!(session.signals().contains("y"));
    assert_eq!(session.signals().scale("x"), 1.0);
    assert!(!session.signals().state("x"));

    session.signals_mut().set_scale("x", 3.0);
    session.register_derived("z");
    assert_eq!(session.signals().len(), 3);
    // Re-registration keeps edits.
    session.reconcile();
    assert_eq!(session.signals().scale("x"), 3.0);

    session.unregister_derived("z");
    assert!(!session.signals().contains("z"));

    session.clear_sources();
    assert!(session.signals().is_empty());
}

#[test]
fn clearing_sources_drops_their_assignments() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    fs::write(&a, "t,x\n0,1\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&a, Instant::now());
    session.register_derived("d");
    session
        .assignments_mut()
        .assign(0, 0, vec![SignalRef::new(0, "x"), SignalRef::derived("d")])
        .unwrap();
    session.clear_sources();

    assert_eq!(
        session.assignments().slot(0, 0).unwrap(),
        &[SignalRef::derived("d")]
    );
    assert_eq!(session.ingest().source_count(), 0);
}

#[test]
fn switching_to_static_loads_everything() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    fs::write(&a, "t,x\n0,1\n1,2\n").unwrap();

    let mut session = live_session();
    let now = Instant::now();
    session.add_source(&a, now);
    assert_eq!(session.ingest().source(0).unwrap().rows(), 0);

    session.set_live(false, now);
    assert!(!session.is_live());
    assert!(!session.render().is_live());
    assert_eq!(session.ingest().source(0).unwrap().rows(), 2);
    assert!(session.signals().contains("x"));
    assert!(!session.tick(now));
}

#[test]
fn switching_to_live_restarts_the_stall_clock() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    fs::write(&a, "t,x\n0,1\n").unwrap();
    set_mtime(&a, 1);

    let mut session = Session::new(TailPlotConfig::default());
    let t0 = Instant::now();
    session.add_source(&a, t0);
    assert_eq!(session.ingest().source(0).unwrap().rows(), 1);

    let later = t0 + Duration::from_secs(5);
    session.set_live(true, later);
    assert!(!session.tick(later));
    assert!(session.ingest().source(0).unwrap().state().is_polling());

    append_at(&a, "1,2\n", 2);
    assert!(session.tick(later + Duration::from_millis(100)));
    assert_eq!(session.ingest().source(0).unwrap().rows(), 2);
}

#[test]
fn static_reload_of_timed_out_source_resumes_polling_in_live_mode() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    fs::write(&a, "t,x\n0,1\n").unwrap();
    set_mtime(&a, 1);

    let mut session = live_session();
    let t0 = Instant::now();
    session.add_source(&a, t0);
    session.tick(t0);
    session.tick(t0 + Duration::from_secs(2));
    assert_eq!(session.ingest().source(0).unwrap().state(), SourceState::TimedOut);

    append_at(&a, "1,2\n", 2);
    let t1 = t0 + Duration::from_secs(3);
    session.set_live(false, t1);
    assert_eq!(session.ingest().source(0).unwrap().state(), SourceState::Updated);

    session.set_live(true, t1);
    append_at(&a, "2,3\n", 3);
    assert!(session.tick(t1));
    assert_eq!(session.ingest().source(0).unwrap().rows(), 3);
    assert!(session.next_wake(t1).is_some());
}

#[test]
fn clearing_sources_forgets_assignment_history() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.csv");
    fs::write(&a, "t,x\n0,1\n").unwrap();

    let mut session = Session::new(TailPlotConfig::default());
    session.add_source(&a, Instant::now());
    session
        .assignments_mut()
        .add(0, 0, SignalRef::new(0, "x"))
        .unwrap();
    assert!(session.assignments().can_undo());

    session.clear_sources();
    assert!(!session.assignments().can_undo());
    assert!(!session.assignments_mut().undo());
    assert!(session.assignments().slot(0, 0).unwrap().is_empty());
}
