use super::*;
use crate::key::CallSite;
use crate::scope::StateSetter;
use crate::worker::StateHandle;
use shutter_layout::{LayoutStyle, MemoryLayoutEngine};
use shutter_render::{Color, MemoryRenderCache};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn runtime() -> UiRuntime {
    UiRuntime::new(
        Box::new(MemoryLayoutEngine::new()),
        SchedulerConfig::default(),
    )
}

#[test]
fn unchanged_subtrees_are_not_reevaluated() {
    let mut rt = runtime();
    let child_evals = Rc::new(Cell::new(0usize));

    let app = |version: u32, evals: Rc<Cell<usize>>| {
        crate::widget!("app")
            .arg(version)
            .body(move |scope: &mut Scope<'_>| {
                let evals = Rc::clone(&evals);
                scope.child(
                    crate::widget!("static")
                        .arg(1u32)
                        .style(LayoutStyle::sized(10.0, 10.0))
                        .body(move |_scope: &mut Scope<'_>| {
                            evals.set(evals.get() + 1);
                        }),
                );
            })
    };

    let first = rt.render_root(app(1, Rc::clone(&child_evals))).unwrap();
    assert_eq!(child_evals.get(), 1);
    assert_eq!(first.evaluated, 2);
    assert_eq!(first.layout.inserted, 1);

    // Only the root argument changed; the child keeps last frame's result and
    // the layout engine sees nothing.
    let second = rt.render_root(app(2, Rc::clone(&child_evals))).unwrap();
    assert_eq!(child_evals.get(), 1);
    assert_eq!(second.evaluated, 1);
    assert_eq!(second.layout.total(), 0);
}

#[test]
fn state_write_converges_in_two_passes_for_parent_child_chain() {
    let mut rt = runtime();
    let setter: Rc<RefCell<Option<StateSetter<u32>>>> = Rc::new(RefCell::new(None));
    let child_evals = Rc::new(Cell::new(0usize));

    let setter_probe = Rc::clone(&setter);
    let evals_probe = Rc::clone(&child_evals);
    let root = crate::widget!("row").body(move |scope: &mut Scope<'_>| {
        let (count, set_count) = scope.use_state(|| 0u32);
        *setter_probe.borrow_mut() = Some(set_count);
        let evals = Rc::clone(&evals_probe);
        scope.child(
            crate::widget!("counter-label")
                .arg(count)
                .style(LayoutStyle::sized(80.0, 20.0))
                .body(move |_scope: &mut Scope<'_>| {
                    evals.set(evals.get() + 1);
                }),
        );
    });

    rt.render_root(root).unwrap();
    assert_eq!(child_evals.get(), 1);

    setter.borrow().as_ref().unwrap().set(5);
    let report = rt.advance_frame().unwrap();
    // Pass one re-runs the parent, pass two the child whose argument changed.
    assert_eq!(report.passes, 2);
    assert_eq!(report.evaluated, 2);
    assert_eq!(child_evals.get(), 2);

    let idle = rt.advance_frame().unwrap();
    assert_eq!(idle.passes, 0);
    assert_eq!(idle.evaluated, 0);
}

#[test]
fn dependency_chain_settles_one_level_per_pass() {
    let mut rt = runtime();
    let setter: Rc<RefCell<Option<StateSetter<u32>>>> = Rc::new(RefCell::new(None));

    let setter_probe = Rc::clone(&setter);
    let root = crate::widget!("top").body(move |scope: &mut Scope<'_>| {
        let (count, set_count) = scope.use_state(|| 0u32);
        *setter_probe.borrow_mut() = Some(set_count);
        scope.child(
            crate::widget!("mid")
                .arg(count)
                .body(move |scope: &mut Scope<'_>| {
                    scope.child(
                        crate::widget!("leaf")
                            .arg(count)
                            .style(LayoutStyle::sized(10.0, 10.0)),
                    );
                }),
        );
    });

    rt.render_root(root).unwrap();
    setter.borrow().as_ref().unwrap().set(3);
    let report = rt.advance_frame().unwrap();
    assert_eq!(report.passes, 3);
    assert_eq!(report.evaluated, 3);
}

#[test]
fn unmount_runs_cleanup_once_and_drops_late_setter_writes() {
    let mut rt = runtime();
    let cleanups = Rc::new(Cell::new(0usize));
    let setter: Rc<RefCell<Option<StateSetter<u32>>>> = Rc::new(RefCell::new(None));

    let app = |show: bool, cleanups: Rc<Cell<usize>>, setter: Rc<RefCell<Option<StateSetter<u32>>>>| {
        crate::widget!("gate")
            .arg(show)
            .body(move |scope: &mut Scope<'_>| {
                if show {
                    let cleanups = Rc::clone(&cleanups);
                    let setter = Rc::clone(&setter);
                    scope.child(crate::widget!("panel").body(move |scope: &mut Scope<'_>| {
                        let (_n, set) = scope.use_state(|| 0u32);
                        *setter.borrow_mut() = Some(set);
                        let cleanups = Rc::clone(&cleanups);
                        scope.on_unmount(move || cleanups.set(cleanups.get() + 1));
                    }));
                }
            })
    };

    rt.render_root(app(true, Rc::clone(&cleanups), Rc::clone(&setter)))
        .unwrap();
    assert_eq!(cleanups.get(), 0);

    rt.render_root(app(false, Rc::clone(&cleanups), Rc::clone(&setter)))
        .unwrap();
    assert_eq!(cleanups.get(), 1);
    assert_eq!(rt.store().len(), 1);

    // The captured setter now points at an unmounted widget.
    setter.borrow().as_ref().unwrap().set(9);
    let report = rt.advance_frame().unwrap();
    assert_eq!(report.evaluated, 0);
    assert_eq!(cleanups.get(), 1);
}

#[test]
fn replacing_the_root_unmounts_the_old_tree() {
    let mut rt = runtime();
    let cleanups = Rc::new(Cell::new(0usize));

    let probe = Rc::clone(&cleanups);
    let first = crate::widget!("screen-a").body(move |scope: &mut Scope<'_>| {
        let probe = Rc::clone(&probe);
        scope.on_unmount(move || probe.set(probe.get() + 1));
    });
    rt.render_root(first).unwrap();
    assert_eq!(rt.store().len(), 1);

    rt.render_root(crate::widget!("screen-b")).unwrap();
    assert_eq!(cleanups.get(), 1);
    assert_eq!(rt.store().len(), 1);
}

#[test]
fn after_frame_effects_coalesce_within_a_frame() {
    let mut rt = runtime();
    let log: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

    let probe = Rc::clone(&log);
    let root = crate::widget!("app").body(move |scope: &mut Scope<'_>| {
        let (count, set_count) = scope.use_state(|| 0u32);
        if count == 0 {
            set_count.set(1);
        }
        let log = Rc::clone(&probe);
        scope.use_effect_after_frame(move || log.borrow_mut().push(count));
    });

    let report = rt.render_root(root).unwrap();
    assert_eq!(report.passes, 2);
    // Re-registration in pass two replaced the pass-one callback.
    assert_eq!(report.effects_run, 1);
    assert_eq!(*log.borrow(), vec![1]);
}

#[test]
fn measured_rects_lag_one_frame() {
    let mut rt = runtime();
    let observed: Rc<RefCell<Vec<Option<shutter_layout::Rect>>>> =
        Rc::new(RefCell::new(Vec::new()));

    let app = |version: u32, observed: Rc<RefCell<Vec<Option<shutter_layout::Rect>>>>| {
        crate::widget!("app")
            .arg(version)
            .body(move |scope: &mut Scope<'_>| {
                let key = scope.child(
                    crate::widget!("box").style(LayoutStyle::sized(100.0, 50.0)),
                );
                observed.borrow_mut().push(scope.measured_of(key));
            })
    };

    rt.render_root(app(1, Rc::clone(&observed))).unwrap();
    assert_eq!(*observed.borrow(), vec![None]);

    rt.render_root(app(2, Rc::clone(&observed))).unwrap();
    let second = observed.borrow()[1].unwrap();
    assert_eq!(second.width, 100.0);
    assert_eq!(second.height, 50.0);
}

#[test]
fn reference_arguments_diff_by_allocation() {
    let mut rt = runtime();
    let child_evals = Rc::new(Cell::new(0usize));
    let shared: Rc<Vec<u8>> = Rc::new(vec![1, 2, 3]);

    let app = |version: u32, data: Rc<Vec<u8>>, evals: Rc<Cell<usize>>| {
        crate::widget!("viewer")
            .arg(version)
            .body(move |scope: &mut Scope<'_>| {
                let evals = Rc::clone(&evals);
                scope.child(
                    crate::widget!("blob")
                        .arg_ref(Rc::clone(&data))
                        .body(move |_scope: &mut Scope<'_>| {
                            evals.set(evals.get() + 1);
                        }),
                );
            })
    };

    rt.render_root(app(1, Rc::clone(&shared), Rc::clone(&child_evals)))
        .unwrap();
    assert_eq!(child_evals.get(), 1);

    // Same allocation: clean.
    rt.render_root(app(2, Rc::clone(&shared), Rc::clone(&child_evals)))
        .unwrap();
    assert_eq!(child_evals.get(), 1);

    // Equal contents, fresh allocation: dirty.
    rt.render_root(app(3, Rc::new(vec![1, 2, 3]), Rc::clone(&child_evals)))
        .unwrap();
    assert_eq!(child_evals.get(), 2);
}

#[test]
fn runaway_writes_fail_with_non_convergence() {
    let mut rt = UiRuntime::new(
        Box::new(MemoryLayoutEngine::new()),
        SchedulerConfig {
            max_passes: 8,
            ..SchedulerConfig::default()
        },
    );

    let root = crate::widget!("spinner").body(|scope: &mut Scope<'_>| {
        let (n, set) = scope.use_state(|| 0u64);
        set.set(n + 1);
    });

    match rt.render_root(root) {
        Err(UiError::NonConvergence { passes, dirty }) => {
            assert_eq!(passes, 8);
            assert_eq!(dirty.len(), 1);
        }
        other => panic!("expected non-convergence, got {other:?}"),
    }
}

#[test]
fn hook_order_mismatch_is_fatal() {
    let mut rt = runtime();

    let root = crate::widget!("flaky").body(|scope: &mut Scope<'_>| {
        let (swapped, set) = scope.use_state(|| false);
        if swapped {
            scope.on_unmount(|| {});
        } else {
            scope.use_effect_after_frame(|| {});
            set.set(true);
        }
    });

    match rt.render_root(root) {
        Err(UiError::HookOrderViolation {
            index,
            expected,
            found,
            ..
        }) => {
            assert_eq!(index, 1);
            assert_eq!(expected, "cleanup");
            assert_eq!(found, "effect");
        }
        other => panic!("expected hook order violation, got {other:?}"),
    }
}

#[test]
fn identity_conflict_remounts_fresh_and_is_reported() {
    let mut rt = runtime();
    let cleanups = Rc::new(Cell::new(0usize));

    let app = |version: u32, cleanups: Rc<Cell<usize>>| {
        crate::widget!("host")
            .arg(version)
            .body(move |scope: &mut Scope<'_>| {
                // Two different widget kinds behind one forged call site.
                if version == 1 {
                    let cleanups = Rc::clone(&cleanups);
                    scope.child(Widget::new("alpha", CallSite::new(77)).body(
                        move |scope: &mut Scope<'_>| {
                            let cleanups = Rc::clone(&cleanups);
                            scope.on_unmount(move || cleanups.set(cleanups.get() + 1));
                        },
                    ));
                } else {
                    scope.child(Widget::new("beta", CallSite::new(77)));
                }
            })
    };

    let first = rt.render_root(app(1, Rc::clone(&cleanups))).unwrap();
    assert_eq!(first.identity_conflicts, 0);

    let second = rt.render_root(app(2, Rc::clone(&cleanups))).unwrap();
    assert_eq!(second.identity_conflicts, 1);
    assert_eq!(cleanups.get(), 1);
}

#[test]
fn keyed_items_keep_identity_across_reorder() {
    let mut rt = runtime();
    let keys: Rc<RefCell<Vec<(u32, WidgetKey)>>> = Rc::new(RefCell::new(Vec::new()));

    let list = |version: u32, order: Vec<u32>, keys: Rc<RefCell<Vec<(u32, WidgetKey)>>>| {
        crate::widget!("list")
            .arg(version)
            .body(move |scope: &mut Scope<'_>| {
                for &id in &order {
                    let key = scope.child(
                        crate::widget!("item")
                            .keyed(id)
                            .style(LayoutStyle::sized(40.0, 16.0)),
                    );
                    keys.borrow_mut().push((id, key));
                }
            })
    };

    rt.render_root(list(1, vec![1, 2, 3], Rc::clone(&keys))).unwrap();
    let before: Vec<(u32, WidgetKey)> = keys.borrow().clone();
    keys.borrow_mut().clear();

    rt.render_root(list(2, vec![3, 1, 2], Rc::clone(&keys))).unwrap();
    for (id, key) in keys.borrow().iter() {
        let original = before.iter().find(|(old, _)| old == id).unwrap().1;
        assert_eq!(*key, original, "item {id} lost its identity");
    }
    assert_eq!(rt.store().len(), 4);
}

#[test]
fn unkeyed_items_reconcile_by_position() {
    let mut rt = runtime();
    let keys: Rc<RefCell<Vec<WidgetKey>>> = Rc::new(RefCell::new(Vec::new()));

    let list = |version: u32, count: usize, keys: Rc<RefCell<Vec<WidgetKey>>>| {
        crate::widget!("list")
            .arg(version)
            .body(move |scope: &mut Scope<'_>| {
                for _ in 0..count {
                    let key =
                        scope.child(crate::widget!("cell").style(LayoutStyle::sized(8.0, 8.0)));
                    keys.borrow_mut().push(key);
                }
            })
    };

    rt.render_root(list(1, 3, Rc::clone(&keys))).unwrap();
    let before: Vec<WidgetKey> = keys.borrow().clone();
    keys.borrow_mut().clear();

    rt.render_root(list(2, 2, Rc::clone(&keys))).unwrap();
    assert_eq!(keys.borrow().as_slice(), &before[..2]);
    assert!(!rt.store().is_alive(before[2]));
}

#[test]
fn worker_writes_apply_at_the_next_frame_boundary() {
    let mut rt = runtime();
    let handle: Rc<RefCell<Option<StateHandle<u64>>>> = Rc::new(RefCell::new(None));
    let seen = Rc::new(Cell::new(0u64));

    let handle_probe = Rc::clone(&handle);
    let seen_probe = Rc::clone(&seen);
    let root = crate::widget!("downloads").body(move |scope: &mut Scope<'_>| {
        let (progress, set_progress) = scope.use_state(|| 0u64);
        seen_probe.set(progress);
        if handle_probe.borrow().is_none() {
            *handle_probe.borrow_mut() = Some(scope.worker_handle(&set_progress));
        }
    });

    rt.render_root(root).unwrap();
    assert_eq!(seen.get(), 0);

    let worker = handle.borrow().clone().unwrap();
    std::thread::spawn(move || worker.write(42)).join().unwrap();

    let report = rt.advance_frame().unwrap();
    assert_eq!(report.evaluated, 1);
    assert_eq!(seen.get(), 42);

    // A write racing an unmount is dropped without failing the frame.
    rt.render_root(crate::widget!("empty")).unwrap();
    let late = handle.borrow().clone().unwrap();
    late.write(7);
    let report = rt.advance_frame().unwrap();
    assert_eq!(report.evaluated, 0);
    assert_eq!(seen.get(), 42);
}

#[test]
fn mid_frame_worker_writes_stay_invisible_until_the_next_frame() {
    let mut rt = runtime();
    let seen = Rc::new(Cell::new(0u64));
    let wrote = Rc::new(Cell::new(false));

    let seen_probe = Rc::clone(&seen);
    let wrote_probe = Rc::clone(&wrote);
    let root = crate::widget!("progress").body(move |scope: &mut Scope<'_>| {
        let (value, set_value) = scope.use_state(|| 0u64);
        seen_probe.set(value);
        if !wrote_probe.get() {
            wrote_probe.set(true);
            // Enqueued while this very frame is evaluating.
            scope.worker_handle(&set_value).write(10);
        }
    });

    rt.render_root(root).unwrap();
    assert_eq!(seen.get(), 0);

    let report = rt.advance_frame().unwrap();
    assert_eq!(report.evaluated, 1);
    assert_eq!(seen.get(), 10);
}

#[test]
fn draw_list_is_paint_ordered_and_cache_friendly() {
    let mut rt = runtime();

    let canvas = |version: u32| {
        crate::widget!("canvas")
            .arg(version)
            .style(LayoutStyle::column())
            .body(|scope: &mut Scope<'_>| {
                scope.child(
                    crate::widget!("red")
                        .style(LayoutStyle::sized(80.0, 20.0))
                        .draw(DrawPrimitive::FilledRect {
                            corner_radius: 0.0,
                            color: Color::rgb(1.0, 0.0, 0.0),
                        }),
                );
                scope.child(
                    crate::widget!("blue")
                        .style(LayoutStyle::sized(80.0, 20.0))
                        .draw(DrawPrimitive::FilledRect {
                            corner_radius: 0.0,
                            color: Color::rgb(0.0, 0.0, 1.0),
                        }),
                );
            })
    };

    rt.render_root(canvas(1)).unwrap();
    let mut cache = MemoryRenderCache::new();
    let ops = rt.resolve_draw(&mut cache);
    assert_eq!(ops.len(), 2);
    assert_ne!(ops[0].hash, ops[1].hash);
    assert_eq!(ops[0].rect.y, 0.0);
    assert_eq!(ops[1].rect.y, 20.0);
    assert_eq!(cache.regenerated(), 2);

    rt.render_root(canvas(2)).unwrap();
    rt.resolve_draw(&mut cache);
    assert_eq!(cache.regenerated(), 2);
    assert_eq!(cache.hits(), 2);
}
