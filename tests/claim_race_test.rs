//! Cross-thread claim arbitration against one shared store.
//!
//! Threads stand in for dispatcher processes here; the store contract is
//! identical either way. These tests validate:
//! - Exactly-one-winner semantics for a contested entry
//! - Full backlog partitioning between competing claim loops

use std::sync::{Arc, Barrier};
use std::thread;

use crossbeam_channel::unbounded;

use piecework::core::{NewQueueEntry, QueueEntry, QueueState, WorkType, TRACK_NORMAL};
use piecework::infra::{InMemoryStore, QueueStore};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn enqueue(store: &InMemoryStore, group_id: i64) -> QueueEntry {
    store
        .insert(NewQueueEntry {
            work_item_id: group_id,
            work_type: WorkType::InboundRule,
            owner_id: 1,
            group_id,
            track: TRACK_NORMAL,
        })
        .unwrap()
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_exactly_one_claimer_wins() {
    println!("\n=== test_exactly_one_claimer_wins ===");

    let store = InMemoryStore::new();
    let entry = enqueue(&store, 1);

    let contenders = 8;
    let barrier = Arc::new(Barrier::new(contenders));
    let (tx, rx) = unbounded();

    let mut handles = Vec::new();
    for _ in 0..contenders {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        let tx = tx.clone();
        let mut copy = entry.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            let won = store.try_claim(&mut copy).unwrap();
            tx.send((won, copy.state)).unwrap();
        }));
    }
    drop(tx);
    for handle in handles {
        handle.join().unwrap();
    }

    let results: Vec<(bool, QueueState)> = rx.iter().collect();
    let winners = results.iter().filter(|(won, _)| *won).count();
    assert_eq!(winners, 1, "the conditional claim admits exactly one winner");

    for (won, seen) in results {
        if won {
            assert_eq!(seen, QueueState::Processing);
        } else {
            assert_eq!(seen, QueueState::Justin, "losers keep their stale copy");
        }
    }
    assert_eq!(
        store.get(entry.id).unwrap().unwrap().state,
        QueueState::Processing
    );

    println!("{contenders} contenders, {winners} winner");
    println!("=== test_exactly_one_claimer_wins PASSED ===\n");
}

#[test]
fn test_competing_loops_partition_the_backlog() {
    println!("\n=== test_competing_loops_partition_the_backlog ===");

    let store = InMemoryStore::new();
    let total = 40_i64;
    for n in 1..=total {
        enqueue(&store, n);
    }

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let (tx, rx) = unbounded();

    // Each loop mirrors a dispatcher's fill phase: select, claim, and on a
    // lost race fall through to the next selection.
    let mut handles = Vec::new();
    for _ in 0..workers {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            loop {
                let Some(mut entry) = store
                    .select_claimable(TRACK_NORMAL, WorkType::InboundRule)
                    .unwrap()
                else {
                    break;
                };
                if store.try_claim(&mut entry).unwrap() {
                    tx.send(entry.id).unwrap();
                }
            }
        }));
    }
    drop(tx);
    for handle in handles {
        handle.join().unwrap();
    }

    let mut claimed: Vec<i64> = rx.iter().collect();
    claimed.sort_unstable();
    let expected: Vec<i64> = (1..=total).collect();
    assert_eq!(claimed, expected, "every entry claimed exactly once");

    println!("{total} entries split across {workers} claim loops");
    println!("=== test_competing_loops_partition_the_backlog PASSED ===\n");
}
