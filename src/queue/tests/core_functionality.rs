//! Core queue protocol tests: buffering, ordering, stage draining

#[cfg(test)]
mod tests {
    use crate::queue::tests::support::{capture_sink, captured, ints, seq};
    use crate::queue::{LifecycleState, QueueError, QueueRegistry};
    use crate::stage::UnaryFn;
    use crate::value::Value;

    #[test]
    fn test_fifo_order_preserved() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue.to_array(sink);
        queue.push_all(ints(&[1, 2, 3]));
        queue.close();

        assert_eq!(captured(&slot), Some(seq(&[1, 2, 3])));
        assert_eq!(queue.state(), LifecycleState::Closed);
    }

    #[test]
    fn test_eager_queue_buffers_until_stage_attached() {
        let registry = QueueRegistry::new();
        let queue = registry.queue_from(ints(&[1, 2, 3]));

        // No stage yet: values wait in the buffer and the queue stays open.
        assert_eq!(queue.state(), LifecycleState::Open);
        assert_eq!(queue.len(), 3);

        let (sink, slot) = capture_sink();
        queue.to_array(sink);

        // Attaching drains everything and the eager queue auto-closes.
        assert_eq!(queue.state(), LifecycleState::Closed);
        assert_eq!(captured(&slot), Some(seq(&[1, 2, 3])));
    }

    #[test]
    fn test_eager_queue_with_no_values_closes_immediately() {
        let registry = QueueRegistry::new();
        let queue = registry.queue_from(Vec::<Value>::new());
        assert_eq!(queue.state(), LifecycleState::Closed);
    }

    #[test]
    fn test_push_reports_acceptance() {
        let registry = QueueRegistry::new();
        let queue = registry.queue();

        assert!(queue.push(1i64));
        queue.close();
        assert!(!queue.push(2i64));

        match queue.try_push(3i64) {
            Err(QueueError::QueueClosed { state, .. }) => {
                assert_eq!(state, "closed");
            }
            other => panic!("Expected QueueClosed error, got: {:?}", other.err()),
        }
    }

    #[test]
    fn test_push_all_counts_accepted_values() {
        let registry = QueueRegistry::new();
        let queue = registry.queue();

        assert_eq!(queue.push_all(ints(&[1, 2, 3])), 3);
        queue.close();
        assert_eq!(queue.push_all(ints(&[4, 5])), 0);
    }

    #[test]
    fn test_map_transforms_in_order() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        registry
            .queue_from(ints(&[1, 2, 3]))
            .map(UnaryFn::sync(|v: Value| {
                Value::Int(v.as_f64().unwrap_or(0.0) as i64 * 2)
            }))
            .to_array(sink);

        assert_eq!(captured(&slot), Some(seq(&[2, 4, 6])));
    }

    #[test]
    fn test_filter_keeps_numbers_only() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let values = vec![
            Value::Int(1),
            Value::Int(2),
            Value::from("skip a few"),
            Value::Int(99),
            Value::Int(100),
        ];
        registry
            .queue_from(values)
            .filter(UnaryFn::sync(|v: Value| v.is_number()))
            .to_array(sink);

        assert_eq!(captured(&slot), Some(seq(&[1, 2, 99, 100])));
    }

    #[test]
    fn test_each_forwards_original_values() {
        use std::sync::{Arc, Mutex};

        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = Arc::clone(&seen);

        registry
            .queue_from(ints(&[10, 20]))
            .each(UnaryFn::sync(move |v: Value| {
                observer.lock().unwrap().push(v);
                // The return value must be ignored by `each`.
                Value::Null
            }))
            .to_array(sink);

        assert_eq!(captured(&slot), Some(seq(&[10, 20])));
        assert_eq!(*seen.lock().unwrap(), ints(&[10, 20]));
    }

    #[test]
    fn test_stage_pipelining_overlap() {
        use std::sync::{Arc, Mutex};

        let registry = QueueRegistry::new();
        let (sink, _slot) = capture_sink();
        let trace: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let queue = registry.queue();
        let map_trace = Arc::clone(&trace);
        let mapped = queue.map(UnaryFn::sync(move |v: Value| {
            map_trace.lock().unwrap().push(format!("map:{v:?}"));
            v
        }));
        let reduce_trace = Arc::clone(&trace);
        mapped.reduce(
            crate::stage::BinaryFn::sync(move |acc: Value, v: Value| {
                reduce_trace.lock().unwrap().push(format!("reduce:{v:?}"));
                Value::Int(
                    acc.as_f64().unwrap_or(0.0) as i64 + v.as_f64().unwrap_or(0.0) as i64,
                )
            }),
            sink,
            0i64,
        );

        queue.push_all(0i64..10);
        queue.close();

        // The reduce stage must start before the map stage has seen every
        // item: the stages overlap instead of running to completion one
        // after the other.
        let trace = trace.lock().unwrap();
        let first_reduce = trace.iter().position(|t| t.starts_with("reduce")).unwrap();
        let last_map = trace.iter().rposition(|t| t.starts_with("map")).unwrap();
        assert!(
            first_reduce < last_map,
            "expected stage overlap, trace: {trace:?}"
        );
    }

    #[test]
    fn test_stats_track_depth_and_processed() {
        let registry = QueueRegistry::new();
        let queue = registry.queue();

        queue.push_all(ints(&[1, 2]));
        let stats = queue.stats().unwrap();
        assert_eq!(stats.depth, 2);
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.state, LifecycleState::Open);
        assert!(!stats.in_flight);

        queue.each(UnaryFn::sync(|v: Value| v));
        let stats = queue.stats().unwrap();
        assert_eq!(stats.depth, 0);
        assert_eq!(stats.processed, 2);
    }
}
