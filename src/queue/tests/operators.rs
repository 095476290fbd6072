//! Operator layer tests: reduce family, flatten, branch, chain, exec

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::ops::{ExecErrorPolicy, ExecFailure};
    use crate::queue::tests::support::{capture_sink, captured, ints, seq};
    use crate::queue::{LifecycleState, QueueRegistry};
    use crate::stage::{BinaryFn, UnaryFn};
    use crate::value::Value;

    fn add() -> BinaryFn {
        BinaryFn::sync(|acc: Value, v: Value| {
            Value::Int(acc.as_f64().unwrap_or(0.0) as i64 + v.as_f64().unwrap_or(0.0) as i64)
        })
    }

    #[test]
    fn test_reduce_delivers_only_after_close() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue.reduce(add(), sink, 0i64);
        queue.push_all(ints(&[1, 2, 3]));

        // Every value is folded, but the sink must wait for close.
        assert_eq!(captured(&slot), None);

        queue.close();
        assert_eq!(captured(&slot), Some(Value::Int(6)));
    }

    #[test]
    fn test_reduce_into_named_queue_sink() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();
        registry.lookup("totals").unwrap().to_array(sink);

        let queue = registry.queue();
        queue.reduce(add(), "totals", 0i64);
        queue.push_all(ints(&[4, 5]));
        queue.close();

        assert_eq!(captured(&slot), None);
        registry.lookup("totals").unwrap().close();
        assert_eq!(captured(&slot), Some(seq(&[9])));
    }

    #[test]
    fn test_reduce_default_initial_is_null() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue.reduce(
            BinaryFn::sync(|acc: Value, v: Value| {
                if acc == Value::Null {
                    v
                } else {
                    Value::Int(
                        acc.as_f64().unwrap_or(0.0) as i64 + v.as_f64().unwrap_or(0.0) as i64,
                    )
                }
            }),
            sink,
            Value::Null,
        );
        queue.push_all(ints(&[5, 6]));
        queue.close();

        assert_eq!(captured(&slot), Some(Value::Int(11)));
    }

    #[test]
    fn test_every_short_circuits_on_falsy() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();
        let invocations = Arc::new(AtomicUsize::new(0));

        let queue = registry.queue();
        let counter = Arc::clone(&invocations);
        queue.every(
            UnaryFn::sync(move |v: Value| {
                counter.fetch_add(1, Ordering::SeqCst);
                v.is_truthy()
            }),
            sink,
        );

        queue.push_all(ints(&[1, 2, 0, 3, 4]));
        // Settled at the third value; the rest drained without invoking
        // the predicate.
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
        assert_eq!(queue.len(), 0);

        assert_eq!(captured(&slot), None);
        queue.close();
        assert_eq!(captured(&slot), Some(Value::Bool(false)));
    }

    #[test]
    fn test_every_true_when_all_satisfy() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue.every(UnaryFn::sync(|v: Value| v.is_truthy()), sink);
        queue.push_all(ints(&[1, 2, 3]));
        queue.close();

        assert_eq!(captured(&slot), Some(Value::Bool(true)));
    }

    #[test]
    fn test_some_short_circuits_on_truthy() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();
        let invocations = Arc::new(AtomicUsize::new(0));

        let queue = registry.queue();
        let counter = Arc::clone(&invocations);
        queue.some(
            UnaryFn::sync(move |v: Value| {
                counter.fetch_add(1, Ordering::SeqCst);
                v.is_truthy()
            }),
            sink,
        );

        queue.push_all(ints(&[0, 0, 7, 0]));
        assert_eq!(invocations.load(Ordering::SeqCst), 3);

        queue.close();
        assert_eq!(captured(&slot), Some(Value::Bool(true)));
    }

    #[test]
    fn test_some_false_when_none_satisfy() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue.some(UnaryFn::sync(|v: Value| v.is_truthy()), sink);
        queue.push_all(ints(&[0, 0]));
        queue.close();

        assert_eq!(captured(&slot), Some(Value::Bool(false)));
    }

    #[test]
    fn test_to_array_with_no_values() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue.to_array(sink);
        queue.close();

        assert_eq!(captured(&slot), Some(Value::Seq(Vec::new())));
    }

    #[test]
    fn test_flatten_unbounded() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let values = vec![
            Value::Seq(vec![
                Value::Int(1),
                Value::Seq(vec![Value::Int(2), Value::Int(3)]),
            ]),
            Value::Int(4),
        ];
        registry.queue_from(values).flatten().to_array(sink);

        assert_eq!(captured(&slot), Some(seq(&[1, 2, 3, 4])));
    }

    #[test]
    fn test_flatten_depth_zero_passes_through() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let nested = Value::Seq(vec![Value::Int(1), Value::Int(2)]);
        registry
            .queue_from(vec![nested.clone()])
            .flatten_depth(0)
            .to_array(sink);

        assert_eq!(captured(&slot), Some(Value::Seq(vec![nested])));
    }

    #[test]
    fn test_branch_routes_by_rule() {
        let registry = QueueRegistry::new();
        let (big_sink, big) = capture_sink();
        let (small_sink, small) = capture_sink();
        let (invalid_sink, invalid) = capture_sink();
        registry.lookup("big").unwrap().to_array(big_sink);
        registry.lookup("small").unwrap().to_array(small_sink);
        registry.lookup("invalid").unwrap().to_array(invalid_sink);

        let source = registry.queue();
        source.branch(UnaryFn::sync(|v: Value| {
            if !v.is_number() {
                "invalid"
            } else if v.as_f64().unwrap_or(0.0) > 50.0 {
                "big"
            } else {
                "small"
            }
        }));

        source.push_all(vec![
            Value::Int(1),
            Value::Int(2),
            Value::from("skip a few"),
            Value::Int(99),
            Value::Int(100),
        ]);
        source.close();

        // Named targets are independent queues: nothing is delivered
        // until each of them has drained and closed.
        assert_eq!(captured(&big), None);
        for name in ["big", "small", "invalid"] {
            registry.lookup(name).unwrap().close();
        }

        assert_eq!(captured(&big), Some(seq(&[99, 100])));
        assert_eq!(captured(&small), Some(seq(&[1, 2])));
        assert_eq!(
            captured(&invalid),
            Some(Value::Seq(vec![Value::from("skip a few")]))
        );
    }

    #[test]
    fn test_branch_list_of_targets_copies_value() {
        let registry = QueueRegistry::new();
        let source = registry.queue();
        source.branch(UnaryFn::sync(|_: Value| {
            Value::Seq(vec![Value::from("a"), Value::from("b")])
        }));

        source.push(1i64);

        assert_eq!(registry.lookup("a").unwrap().len(), 1);
        assert_eq!(registry.lookup("b").unwrap().len(), 1);
    }

    #[test]
    fn test_branch_downstream_receives_nothing() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let source = registry.queue();
        let downstream = source.branch(UnaryFn::sync(|_: Value| "elsewhere"));
        downstream.to_array(sink);

        source.push_all(ints(&[1, 2, 3]));
        source.close();

        assert_eq!(captured(&slot), Some(Value::Seq(Vec::new())));
        assert_eq!(registry.lookup("elsewhere").unwrap().len(), 3);
    }

    #[test]
    fn test_chain_forwards_without_close_propagation() {
        let registry = QueueRegistry::new();
        let source = registry.queue();
        source.chain(["shared"]);

        source.push_all(ints(&[1, 2]));
        source.close();

        // Values arrived, but the named destination was not closed:
        // other chains may still be feeding it.
        let shared = registry.lookup("shared").unwrap();
        assert_eq!(shared.len(), 2);
        assert_eq!(shared.state(), LifecycleState::Open);
    }

    #[test]
    fn test_chain_multiple_targets() {
        let registry = QueueRegistry::new();
        let source = registry.queue();
        source.chain(["left", "right"]);

        source.push(5i64);

        assert_eq!(registry.lookup("left").unwrap().len(), 1);
        assert_eq!(registry.lookup("right").unwrap().len(), 1);
    }

    #[test]
    fn test_exec_spreads_sequence_args() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue
            .exec(
                |args, reply| {
                    let total: f64 = args.iter().filter_map(|a| a.as_f64()).sum();
                    reply.ok(Value::Int(total as i64));
                },
                ExecErrorPolicy::Ignore,
            )
            .to_array(sink);

        queue.push(Value::Seq(ints(&[2, 3])));
        queue.push(7i64);
        queue.close();

        assert_eq!(captured(&slot), Some(seq(&[5, 7])));
    }

    #[test]
    fn test_exec_ignore_policy_continues() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue
            .exec(
                |args, reply| {
                    if args[0] == Value::Int(0) {
                        reply.err("division by zero");
                    } else {
                        reply.ok(args[0].clone());
                    }
                },
                ExecErrorPolicy::Ignore,
            )
            .to_array(sink);

        queue.push_all(ints(&[1, 0, 3]));
        queue.close();

        assert_eq!(captured(&slot), Some(seq(&[1, 3])));
    }

    #[test]
    fn test_exec_close_on_error_policy() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        let downstream = queue.exec(
            |args, reply| {
                if args[0] == Value::Int(0) {
                    reply.err("boom");
                } else {
                    reply.ok(args[0].clone());
                }
            },
            ExecErrorPolicy::CloseOnError,
        );
        downstream.to_array(sink);

        queue.push(1i64);
        queue.push(0i64);
        assert_eq!(queue.state(), LifecycleState::Closed);
        assert!(!queue.push(3i64));

        assert_eq!(captured(&slot), Some(seq(&[1])));
    }

    #[test]
    fn test_exec_report_policy_hands_over_failure() {
        let registry = QueueRegistry::new();
        let reported: Arc<Mutex<Option<ExecFailure>>> = Arc::new(Mutex::new(None));

        let queue = registry.queue();
        let stash = Arc::clone(&reported);
        queue.exec(
            |args, reply| {
                if args.len() > 1 {
                    reply.err_with_partial("too many arguments", args.len() as i64);
                } else {
                    reply.ok(args[0].clone());
                }
            },
            ExecErrorPolicy::report(move |failure| {
                *stash.lock().unwrap() = Some(failure);
            }),
        );

        queue.push(Value::Seq(ints(&[1, 2, 3])));

        let failure = reported.lock().unwrap().take().unwrap();
        assert_eq!(failure.error, Value::from("too many arguments"));
        assert_eq!(failure.partial, Some(Value::Int(3)));
        assert_eq!(failure.args, ints(&[1, 2, 3]));
        assert_eq!(queue.state(), LifecycleState::Closed);
    }

    #[test]
    fn test_exec_route_to_policy_keeps_processing() {
        let registry = QueueRegistry::new();
        let (sink, slot) = capture_sink();

        let queue = registry.queue();
        queue
            .exec(
                |args, reply| {
                    if args[0] == Value::Int(0) {
                        reply.err("bad input");
                    } else {
                        reply.ok(args[0].clone());
                    }
                },
                ExecErrorPolicy::route_to("failures"),
            )
            .to_array(sink);

        queue.push_all(ints(&[1, 0, 3]));
        queue.close();

        assert_eq!(captured(&slot), Some(seq(&[1, 3])));

        let failures = registry.lookup("failures").unwrap();
        assert_eq!(failures.len(), 1);

        let (failure_sink, failure_slot) = capture_sink();
        failures.to_array(failure_sink);
        failures.close();
        assert_eq!(
            captured(&failure_slot),
            Some(Value::Seq(vec![Value::Seq(vec![
                Value::from("bad input"),
                Value::Null,
                Value::Seq(ints(&[0])),
            ])]))
        );
    }
}
