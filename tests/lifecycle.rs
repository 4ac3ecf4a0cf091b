mod common;

use common::{Harness, Journal, Probe};
use loopcell::{Error, ManualPlatform, Phase, PlatformError, RuntimeBuilder};

#[test]
fn test_phase_transitions() {
    let mut h = Harness::new();
    assert_eq!(h.rt.phase(), Phase::Uninitialized);

    h.rt.initialize().unwrap();
    assert_eq!(h.rt.phase(), Phase::Initialized);

    h.rt.prepare(h.probe("root")).unwrap();
    assert_eq!(h.rt.phase(), Phase::Prepared);

    h.rt.cleanup().unwrap();
    assert_eq!(h.rt.phase(), Phase::Initialized);

    h.rt.finalize();
    assert_eq!(h.rt.phase(), Phase::Uninitialized);
}

#[test]
fn test_out_of_order_calls_fail_with_status() {
    let mut h = Harness::new();

    assert!(matches!(h.rt.prepare(h.probe("root")), Err(Error::Status(_))));
    assert!(matches!(h.rt.resume_and_yield(), Err(Error::Status(_))));
    assert!(matches!(h.rt.cleanup(), Err(Error::Status(_))));
    assert!(matches!(h.rt.push(h.probe("a")), Err(Error::Status(_))));
    assert!(matches!(h.rt.pop(), Err(Error::Status(_))));

    h.rt.initialize().unwrap();
    assert!(matches!(h.rt.initialize(), Err(Error::Status(_))));
    assert!(matches!(h.rt.resume_and_yield(), Err(Error::Status(_))));

    h.rt.prepare(h.probe("root")).unwrap();
    assert!(matches!(h.rt.prepare(h.probe("again")), Err(Error::Status(_))));
    assert_eq!(h.journal.count("again.init"), 0);
}

#[test]
fn test_prepare_runs_root_init_and_appear() {
    let mut h = Harness::new();
    h.rt.initialize().unwrap();
    h.rt.prepare(h.probe("root")).unwrap();

    assert_eq!(h.journal.take(), ["root.init", "root.appear"]);
    assert_eq!(h.rt.depth(), 1);
    assert_eq!(h.rt.top_tag(), Some(0));
}

#[test]
fn test_negative_root_tag_is_rejected() {
    let mut h = Harness::new();
    h.rt.initialize().unwrap();

    assert!(matches!(
        h.rt.prepare(h.probe("root").tagged(-2)),
        Err(Error::Parameter(_))
    ));
    assert_eq!(h.rt.phase(), Phase::Initialized);
    assert!(h.journal.entries().is_empty());

    h.rt.prepare(h.probe("root").tagged(5)).unwrap();
    assert_eq!(h.rt.top_tag(), Some(5));
}

#[test]
fn test_platform_error_is_passed_through() {
    let platform = ManualPlatform::new().failing_initialize(PlatformError::new("no tick source"));
    let mut rt = RuntimeBuilder::new().platform(platform).build();

    match rt.initialize() {
        Err(Error::Platform(err)) => assert_eq!(err.message(), "no tick source"),
        other => panic!("expected platform error, got {other:?}"),
    }
    assert_eq!(rt.phase(), Phase::Uninitialized);
}

#[test]
fn test_runtime_can_be_prepared_again_after_cleanup() {
    let mut h = Harness::prepared();
    h.rt.push(h.probe("a")).unwrap();
    h.tick();
    h.rt.cleanup().unwrap();
    h.journal.take();

    h.rt.prepare(h.probe("second")).unwrap();
    h.tick();

    assert_eq!(h.journal.take(), ["second.init", "second.appear"]);
    assert_eq!(h.rt.depth(), 1);
}

#[test]
fn test_finalize_cleans_up_prepared_runtime() {
    let mut h = Harness::prepared();
    h.rt.push(h.probe("a")).unwrap();
    h.tick();
    h.journal.take();

    h.rt.finalize();

    assert_eq!(
        h.journal.take(),
        ["a.destroy", "a.release", "root.destroy", "root.release"]
    );
    assert_eq!(h.rt.phase(), Phase::Uninitialized);

    // Finalizing twice is harmless.
    h.rt.finalize();
}

#[test]
fn test_drop_releases_handlers() {
    let journal = Journal::default();
    {
        let mut rt = RuntimeBuilder::new().platform(ManualPlatform::new()).build();
        rt.initialize().unwrap();
        rt.prepare(Probe::new("root", &journal)).unwrap();
    }

    assert_eq!(journal.count("root.release"), 1);
}

#[test]
fn test_push_then_pop_by_tag_end_to_end() {
    let mut h = Harness::new();
    h.rt.initialize().unwrap();
    h.rt.prepare(h.probe("root")).unwrap();

    h.rt.push(h.probe("a").tagged(1)).unwrap();
    h.tick();
    h.rt.pop_by_tag(1).unwrap();
    h.tick();

    assert_eq!(h.rt.depth(), 1);
    assert_eq!(h.rt.top_tag(), Some(0));

    assert_eq!(h.journal.count("root.appear"), 2);
    for hook in ["a.init", "a.appear", "a.disappear", "a.destroy", "a.release"] {
        assert_eq!(h.journal.count(hook), 1, "{hook}");
    }
    assert_eq!(h.journal.count("root.destroy"), 0);
}

#[test]
fn test_independent_runtimes() {
    let mut first = Harness::prepared();
    let mut second = Harness::prepared();

    first.rt.push(first.probe("a")).unwrap();
    first.tick();
    second.tick();

    assert_eq!(first.rt.depth(), 2);
    assert_eq!(second.rt.depth(), 1);
    assert!(second.journal.entries().is_empty());
}
