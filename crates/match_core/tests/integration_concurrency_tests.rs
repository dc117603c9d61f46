mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use match_core::clock::ONE_MIN_MS;
use match_core::demand::{DemandAction, DemandFieldConfig};
use match_core::matching::MatchOutcome;
use match_core::test_helpers::{berlin_selector, candidate_at_km, TEST_PICKUP};

use support::zones::{assert_in_bounds, corridor_field};

#[test]
fn racing_evaporators_apply_exactly_one_tick() {
    let (field, clock) =
        corridor_field(DemandFieldConfig::default().with_initial_intensity("center", 60.0));
    let now = clock.advance(ONE_MIN_MS);
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let applied = Arc::new(AtomicUsize::new(0));

    let handles = (0..threads)
        .map(|_| {
            let field = field.clone();
            let barrier = barrier.clone();
            let applied = applied.clone();
            thread::spawn(move || {
                barrier.wait();
                if field.evaporate(now) {
                    applied.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("thread");
    }

    assert_eq!(applied.load(Ordering::SeqCst), 1);
    let center = field.intensity_of("center").expect("center");
    assert!((center - 57.0).abs() < 1e-9);
}

#[test]
fn concurrent_deposits_are_not_lost() {
    let (field, _) = corridor_field(DemandFieldConfig::default().with_initial_intensity("north", 0.0));
    let threads = 8;
    let per_thread = 25;
    let barrier = Arc::new(Barrier::new(threads));

    let handles = (0..threads)
        .map(|_| {
            let field = field.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    // 0.4 per deposit, 200 deposits total = 80, well under the cap.
                    field.deposit("north", DemandAction::Cancel, 2.4);
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("thread");
    }

    let north = field.intensity_of("north").expect("north");
    assert!((north - 80.0).abs() < 1e-6, "got {north}");
}

#[test]
fn mixed_matching_traffic_keeps_invariants() {
    let (selector, clock) = berlin_selector(DemandFieldConfig::default());
    let selector = Arc::new(selector);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads + 1));

    let workers = (0..threads)
        .map(|t| {
            let selector = selector.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let drivers = (0..10)
                    .map(|i| candidate_at_km(&format!("t{t}-d{i}"), 0.3 * i as f64, 4.5, 0.9))
                    .collect::<Vec<_>>();
                for round in 0..200 {
                    if let Some(best) = selector.find_best(TEST_PICKUP, &drivers) {
                        let outcome = if round % 3 == 0 {
                            MatchOutcome::Rejected
                        } else {
                            MatchOutcome::Completed
                        };
                        selector.record_outcome(&best, outcome);
                    }
                    let top = selector.find_top_k(TEST_PICKUP, &drivers, 3);
                    assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
                }
            })
        })
        .collect::<Vec<_>>();

    barrier.wait();
    for _ in 0..50 {
        clock.advance(ONE_MIN_MS / 4);
        assert_in_bounds(selector.demand());
    }
    for worker in workers {
        worker.join().expect("worker");
    }

    assert_in_bounds(selector.demand());
    assert_eq!(
        selector.snapshot().len(),
        selector.demand().registry().len()
    );
}
