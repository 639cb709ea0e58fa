//! 容器生命周期集成测试：依赖顺序、并发单例、原型、关闭与销毁顺序

use di_impl::{Container, ContainerEvent};
use infrastructure_common::{ComponentDescriptor, ContainerError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn recording(id: &str, log: &Arc<Mutex<Vec<String>>>) -> ComponentDescriptor {
    let log = Arc::clone(log);
    let name = id.to_string();
    ComponentDescriptor::singleton(id, |_| Ok(())).on_teardown::<(), _>(move |_| {
        log.lock().push(name.clone());
        Ok(())
    })
}

#[test]
fn test_resolved_order_puts_dependencies_first() {
    let container = Container::builder()
        .register(ComponentDescriptor::singleton("C", |_| Ok(())).with_dependency("A").with_dependency("B"))
        .register(ComponentDescriptor::singleton("B", |_| Ok(())).with_dependency("A"))
        .register(ComponentDescriptor::singleton("A", |_| Ok(())))
        .build()
        .unwrap();

    assert_eq!(container.resolved_order(), ["A", "B", "C"]);
    container.close().unwrap();
}

#[test]
fn test_every_dependency_precedes_dependents() {
    let container = Container::builder()
        .register(ComponentDescriptor::singleton("api", |_| Ok(())).with_dependency("service"))
        .register(
            ComponentDescriptor::singleton("service", |_| Ok(()))
                .with_dependency("repo")
                .with_dependency("cache"),
        )
        .register(ComponentDescriptor::singleton("repo", |_| Ok(())).with_dependency("db"))
        .register(ComponentDescriptor::singleton("cache", |_| Ok(())).depends_on("config"))
        .register(ComponentDescriptor::singleton("db", |_| Ok(())).depends_on("config"))
        .register(ComponentDescriptor::singleton("config", |_| Ok(())))
        .register(ComponentDescriptor::singleton("metrics", |_| Ok(())))
        .build()
        .unwrap();

    let order = container.resolved_order();
    let position = |id: &str| order.iter().position(|o| o == id).unwrap();
    let graph = container.dependency_graph();
    assert_eq!(order.len(), 7);
    for id in graph.nodes() {
        for dependency in graph.dependencies_of(id) {
            assert!(
                position(dependency) < position(id),
                "{dependency} 应排在 {id} 之前"
            );
        }
    }
    container.close().unwrap();
}

#[test]
fn test_cycle_is_reported_with_path() {
    let result = Container::builder()
        .register(ComponentDescriptor::singleton("a", |_| Ok(())).with_dependency("b"))
        .register(ComponentDescriptor::singleton("b", |_| Ok(())).with_dependency("c"))
        .register(ComponentDescriptor::singleton("c", |_| Ok(())).with_dependency("a"))
        .register(ComponentDescriptor::singleton("d", |_| Ok(())))
        .build();

    match result {
        Err(ContainerError::CycleDetected { path }) => {
            assert_eq!(path.first(), path.last());
            assert!(path.iter().all(|id| ["a", "b", "c"].contains(&id.as_str())));
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_duplicate_registration_is_fatal() {
    let result = Container::builder()
        .register(ComponentDescriptor::singleton("dup", |_| Ok(1_u8)))
        .register(ComponentDescriptor::prototype("dup", |_| Ok(2_u8)))
        .build();

    assert!(matches!(
        result,
        Err(ContainerError::DuplicateRegistration { id }) if id == "dup"
    ));
}

#[test]
fn test_concurrent_first_access_constructs_once() {
    const THREADS: usize = 16;
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructed);

    let container = Container::builder()
        .register(
            ComponentDescriptor::singleton("slow", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                Ok(String::from("ready"))
            })
            .lazy(),
        )
        .build()
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let container = container.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.get_as::<String>("slow").unwrap()
            })
        })
        .collect();

    let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(container.stats().singletons_constructed, 1);
    container.close().unwrap();
}

#[test]
fn test_concurrent_failure_reaches_every_waiter() {
    const THREADS: usize = 8;
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let container = Container::builder()
        .register(
            ComponentDescriptor::singleton("broken", move |_| -> anyhow::Result<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                anyhow::bail!("连接被拒绝")
            })
            .lazy(),
        )
        .build()
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let container = container.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.get("broken")
            })
        })
        .collect();

    for handle in handles {
        assert!(matches!(
            handle.join().unwrap(),
            Err(ContainerError::Construction { ref id, .. }) if id == "broken"
        ));
    }
    let attempts = attempts.load(Ordering::SeqCst);
    assert!((1..=THREADS).contains(&attempts));
}

#[test]
fn test_distinct_ids_construct_in_parallel() {
    let barrier = Arc::new(Barrier::new(2));
    let descriptor = |id: &str| {
        let barrier = Arc::clone(&barrier);
        ComponentDescriptor::singleton(id, move |_| {
            barrier.wait();
            Ok(())
        })
        .lazy()
    };

    let container = Container::builder()
        .register(descriptor("left"))
        .register(descriptor("right"))
        .build()
        .unwrap();

    let other = container.clone();
    let handle = thread::spawn(move || other.get("left").map(|_| ()));
    container.get("right").unwrap();
    handle.join().unwrap().unwrap();
    container.close().unwrap();
}

#[test]
fn test_prototypes_are_distinct_and_share_singletons() {
    #[derive(Debug)]
    struct Pool;
    #[derive(Debug)]
    struct Session {
        pool: Arc<Pool>,
    }

    let container = Container::builder()
        .register(ComponentDescriptor::singleton("pool", |_| Ok(Pool)))
        .register(
            ComponentDescriptor::prototype("session", |deps| {
                Ok(Session {
                    pool: deps.require::<Pool>("pool")?,
                })
            })
            .with_dependency("pool"),
        )
        .build()
        .unwrap();

    let sessions: Vec<Arc<Session>> = (0..5)
        .map(|_| container.get_as::<Session>("session").unwrap())
        .collect();

    for (i, a) in sessions.iter().enumerate() {
        assert!(Arc::ptr_eq(&a.pool, &sessions[0].pool));
        for b in &sessions[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
    assert_eq!(container.stats().prototypes_constructed, 5);
    container.close().unwrap();
}

#[test]
fn test_teardown_runs_in_reverse_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::builder()
        .register(recording("A", &log))
        .register(recording("B", &log).with_dependency("A"))
        .register(recording("C", &log).with_dependency("A").with_dependency("B"))
        .build()
        .unwrap();

    container.close().unwrap();
    assert_eq!(*log.lock(), vec!["C", "B", "A"]);
}

#[test]
fn test_close_is_idempotent() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let container = Container::builder()
        .register(recording("A", &log))
        .on_event(move |event: &ContainerEvent| sink.lock().push(event.clone()))
        .build()
        .unwrap();

    container.close().unwrap();
    container.close().unwrap();

    assert_eq!(*log.lock(), vec!["A"]);
    assert!(matches!(container.get("A"), Err(ContainerError::ContainerClosed)));
    assert!(container.try_get("A").unwrap().is_none());
    assert!(matches!(
        container.get_provider("A"),
        Err(ContainerError::ContainerClosed)
    ));
    assert_eq!(
        events
            .lock()
            .iter()
            .filter(|e| matches!(e, ContainerEvent::Closed { .. }))
            .count(),
        1
    );
}

#[test]
fn test_teardown_failures_are_aggregated() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let failing = |id: &str| {
        let log = Arc::clone(&log);
        let name = id.to_string();
        ComponentDescriptor::singleton(id, |_| Ok(())).on_teardown::<(), _>(move |_| {
            log.lock().push(name.clone());
            anyhow::bail!("{} 释放失败", name)
        })
    };

    let container = Container::builder()
        .register(failing("A"))
        .register(recording("B", &log).with_dependency("A"))
        .register(failing("C").with_dependency("B"))
        .build()
        .unwrap();

    match container.close() {
        Err(ContainerError::Teardown { failures }) => {
            let components: Vec<&str> = failures.iter().map(|f| f.component.as_str()).collect();
            assert_eq!(components, vec!["C", "A"]);
        }
        other => panic!("expected teardown error, got {other:?}"),
    }
    assert_eq!(*log.lock(), vec!["C", "B", "A"]);
    assert!(container.close().is_ok());
}

#[test]
fn test_events_serialize() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let container = Container::builder()
        .register(ComponentDescriptor::singleton("a", |_| Ok(())))
        .on_event(move |event: &ContainerEvent| sink.lock().push(event.clone()))
        .build()
        .unwrap();
    container.close().unwrap();

    let events = events.lock();
    let started = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(started["type"], "started");
    assert_eq!(started["component_count"], 1);
    assert_eq!(
        started["container_id"],
        serde_json::Value::String(container.id().to_string())
    );
    let closed = serde_json::to_value(&events[1]).unwrap();
    assert_eq!(closed["type"], "closed");
    assert_eq!(closed["destroyed_count"], 1);
}
