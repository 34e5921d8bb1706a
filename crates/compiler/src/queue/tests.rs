//! Unit tests for the work queue

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn collect_ok<R>(results: Vec<Result<R, TaskError>>) -> Vec<R> {
    results
        .into_iter()
        .map(|r| r.expect("task should succeed"))
        .collect()
}

#[cfg(test)]
mod parallel_map_tests {
    use super::*;

    #[test]
    fn test_output_matches_input_order() {
        let queue = WorkQueue::new(4).unwrap();
        let items: Vec<u64> = (0..64).collect();

        // Later items finish first
        let results = queue.parallel_map(items, |i| {
            thread::sleep(Duration::from_micros((64 - i) * 50));
            i * 10
        });

        let expected: Vec<u64> = (0..64).map(|i| i * 10).collect();
        assert_eq!(collect_ok(results), expected);
    }

    #[test]
    fn test_single_worker_and_eight_workers_agree() {
        let items: Vec<String> = (0..200).map(|i| format!("file_{}", i)).collect();

        let single = WorkQueue::new(1).unwrap();
        let eight = WorkQueue::new(8).unwrap();

        let a = collect_ok(single.parallel_map(items.clone(), |s| s.to_uppercase()));
        let b = collect_ok(eight.parallel_map(items, |s| s.to_uppercase()));

        assert_eq!(a, b);
        assert_eq!(a[0], "FILE_0");
        assert_eq!(a[199], "FILE_199");
    }

    #[test]
    fn test_empty_input() {
        let queue = WorkQueue::new(2).unwrap();
        let results: Vec<Result<u8, TaskError>> = queue.parallel_map(Vec::<u8>::new(), |x| x);
        assert!(results.is_empty());
    }

    #[test]
    fn test_panic_is_confined_to_its_slot() {
        let queue = WorkQueue::new(1).unwrap();

        let results = queue.parallel_map(vec![1, 2, 3, 4], |i| {
            if i == 2 {
                panic!("bad archive {}", i);
            }
            i
        });

        assert_eq!(results[0], Ok(1));
        assert!(matches!(&results[1], Err(TaskError::Panicked(msg)) if msg.contains("bad archive 2")));
        assert_eq!(results[2], Ok(3));
        assert_eq!(results[3], Ok(4));

        // The only worker survived the panic
        assert_eq!(queue.spawn(|| 42).join(), Ok(42));
    }

    #[test]
    fn test_nested_map_on_single_worker_does_not_deadlock() {
        let queue = Arc::new(WorkQueue::new(1).unwrap());
        let inner = Arc::clone(&queue);

        let handle = queue.spawn(move || {
            let nested = inner.parallel_map(vec![1, 2, 3], |i| i + 1);
            nested.into_iter().map(|r| r.unwrap_or(0)).sum::<i32>()
        });

        assert_eq!(handle.join(), Ok(9));
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_zero_threads_uses_hardware_parallelism() {
        let queue = WorkQueue::new(0).unwrap();
        assert_eq!(queue.thread_count(), default_thread_count());
        assert!(queue.thread_count() >= 1);
    }

    #[test]
    fn test_shutdown_mid_drain_abandons_unstarted_tasks() {
        let queue = WorkQueue::new(2).unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();

        // Occupy both workers until the gate closes
        for _ in 0..2 {
            let started_tx = started_tx.clone();
            let gate_rx = gate_rx.clone();
            queue
                .submit(move || {
                    started_tx.send(()).unwrap();
                    let _ = gate_rx.recv();
                })
                .unwrap();
        }
        started_rx.recv().unwrap();
        started_rx.recv().unwrap();

        let executed = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let executed = Arc::clone(&executed);
            queue
                .submit(move || {
                    executed.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        queue.cancel();
        drop(gate_tx);
        queue.shutdown();

        assert_eq!(executed.load(Ordering::SeqCst), 0);
        assert!(queue.cancellation_token().is_cancelled());
    }

    #[test]
    fn test_cancel_releases_blocked_parallel_map() {
        let queue = Arc::new(WorkQueue::new(1).unwrap());
        let canceller = Arc::clone(&queue);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            canceller.cancel();
        });

        let (done_tx, done_rx) = mpsc::channel();
        let mapper = Arc::clone(&queue);
        thread::spawn(move || {
            let results = mapper.parallel_map((0..20).collect::<Vec<u64>>(), |i| {
                thread::sleep(Duration::from_millis(100));
                i
            });
            done_tx.send(results).unwrap();
        });

        let results = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("parallel_map must return once the queue is cancelled");

        assert_eq!(results.len(), 20);
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[19], Err(TaskError::Cancelled));
        let finished = results.iter().filter(|r| r.is_ok()).count();
        assert!(finished < 20);
        // Finished slots form a prefix on a single worker
        assert!(results[finished..].iter().all(|r| *r == Err(TaskError::Cancelled)));
    }

    #[test]
    fn test_cancel_releases_waiting_handle() {
        let queue = WorkQueue::new(1).unwrap();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let (started_tx, started_rx) = mpsc::channel();

        let busy = queue.spawn(move || {
            started_tx.send(()).unwrap();
            let _ = gate_rx.recv();
            "busy"
        });
        started_rx.recv().unwrap();
        let queued = queue.spawn(|| "queued");

        queue.cancel();
        assert_eq!(queued.join(), Err(TaskError::Cancelled));

        drop(gate_tx);
        assert_eq!(busy.join(), Ok("busy"));
    }

    #[test]
    fn test_work_after_shutdown_is_cancelled() {
        let queue = WorkQueue::new(2).unwrap();
        queue.shutdown();

        assert!(matches!(queue.submit(|| {}), Err(QueueError::ShutDown)));
        assert_eq!(queue.spawn(|| 1).join(), Err(TaskError::Cancelled));

        let results = queue.parallel_map(vec![1, 2], |i| i);
        assert_eq!(results, vec![Err(TaskError::Cancelled), Err(TaskError::Cancelled)]);
    }

    #[test]
    fn test_shutdown_from_worker_thread_returns() {
        let queue = Arc::new(WorkQueue::new(2).unwrap());
        let inner = Arc::clone(&queue);
        let (done_tx, done_rx) = mpsc::channel();

        queue
            .submit(move || {
                inner.shutdown();
                done_tx.send(()).unwrap();
            })
            .unwrap();

        done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("shutdown from a worker must not join itself");
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn test_task_status_is_broadcast() {
        let queue = WorkQueue::new(1).unwrap();
        let mut first = queue.subscribe();
        let mut second = queue.subscribe();
        let reporter = queue.reporter();

        queue
            .spawn(move || reporter.report("Hashing archive.7z", 50))
            .join()
            .unwrap();

        for rx in [&mut first, &mut second] {
            let mut events = Vec::new();
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
            assert!(events.iter().any(|e| e.msg == "Working" && e.is_working));
            assert!(events.iter().any(|e| {
                e.msg == "Hashing archive.7z" && e.progress == 50 && e.is_working && e.id == 0
            }));
        }
    }

    #[test]
    fn test_report_outside_worker_is_ignored() {
        let queue = WorkQueue::new(1).unwrap();
        queue.shutdown();
        let mut rx = queue.subscribe();

        queue.reporter().report("not a worker", 10);

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_slow_subscriber_does_not_block_workers() {
        let queue = WorkQueue::new(2).unwrap();
        let mut idle = queue.subscribe();

        let results = queue.parallel_map((0..5000).collect::<Vec<u32>>(), |i| i);
        assert_eq!(results.len(), 5000);

        assert!(matches!(idle.try_recv(), Err(TryRecvError::Lagged(_))));
    }

    #[test]
    fn test_progress_is_clamped() {
        let queue = WorkQueue::new(1).unwrap();
        let mut rx = queue.subscribe();
        let reporter = queue.reporter();

        queue.spawn(move || reporter.report("Overflow", 250)).join().unwrap();

        let mut seen = None;
        while let Ok(event) = rx.try_recv() {
            if event.msg == "Overflow" {
                seen = Some(event);
            }
        }
        let event = seen.expect("status event");
        assert_eq!(event.progress, 100);
        assert_eq!(event.progress_percent(), 1.0);
    }
}
