use super::*;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug)]
struct Counter {
    name: String,
    value: i64,
    history: Vec<&'static str>,
}

impl Capability for Counter {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn counting_factory(calls: Arc<AtomicUsize>) -> Factory<Counter> {
    Arc::new(move |name: &str, args: &Value| -> Result<Box<Counter>, BoxError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Counter {
            name: name.to_string(),
            value: args.as_i64().unwrap_or_default(),
            history: Vec::new(),
        }))
    })
}

fn recipe(factory: Factory<Counter>) -> Recipe<Counter> {
    Recipe {
        factory,
        rules: Vec::new(),
    }
}

fn entry(name: &str, args: Value) -> Entry<Counter> {
    Entry::new(name.to_string(), "counter".to_string(), args)
}

#[test]
fn test_new_entry_is_declared() {
    let entry = entry("a", Value::Null);
    assert_eq!(entry.name(), "a");
    assert_eq!(entry.subtype(), "counter");
    assert_eq!(entry.state(), RealizationState::Declared);
}

#[test]
fn test_realize_applies_actions_then_rules_in_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let entry = entry("a", Value::from(10));

    entry
        .push_action(Box::new(|c: &mut Counter| {
            c.value *= 2;
            c.history.push("first");
            Ok(())
        }))
        .unwrap();
    entry
        .push_action(Box::new(|c: &mut Counter| {
            c.value += 1;
            c.history.push("second");
            Ok(())
        }))
        .unwrap();

    let rule: SharedAction<Counter> = Arc::new(|c: &mut Counter| {
        c.history.push("rule");
        Ok(())
    });
    let instance = entry
        .realize(|| {
            Ok(Recipe {
                factory: counting_factory(calls.clone()),
                rules: vec![rule],
            })
        })
        .unwrap();

    assert_eq!(instance.value, 21);
    assert_eq!(instance.history, vec!["first", "second", "rule"]);
    assert_eq!(entry.state(), RealizationState::Realized);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_second_realize_returns_cached_instance() {
    let calls = Arc::new(AtomicUsize::new(0));
    let entry = entry("a", Value::Null);

    let first = entry.realize(|| Ok(recipe(counting_factory(calls.clone())))).unwrap();
    let second = entry
        .realize(|| panic!("prepare must not run twice"))
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_push_action_after_realization_fails() {
    let calls = Arc::new(AtomicUsize::new(0));
    let entry = entry("a", Value::from(1));
    let instance = entry.realize(|| Ok(recipe(counting_factory(calls)))).unwrap();

    let result = entry.push_action(Box::new(|c: &mut Counter| {
        c.value = 99;
        Ok(())
    }));
    assert!(matches!(
        result,
        Err(RegistryError::AlreadyRealized { ref name, ref subtype })
            if name == "a" && subtype == "counter"
    ));
    assert_eq!(instance.value, 1);
}

#[test]
fn test_failed_factory_is_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = calls.clone();
    let failing: Factory<Counter> = Arc::new(move |_name: &str, _args: &Value| -> Result<Box<Counter>, BoxError> {
        factory_calls.fetch_add(1, Ordering::SeqCst);
        Err("no counters today".into())
    });

    let entry = entry("a", Value::Null);
    let first = entry.realize(|| Ok(recipe(failing))).unwrap_err();
    assert_eq!(entry.state(), RealizationState::Failed);

    let second = entry
        .realize(|| panic!("prepare must not run after a failure"))
        .unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    match (&first, &second) {
        (
            RegistryError::Realization { source: a, .. },
            RegistryError::Realization { source: b, .. },
        ) => {
            assert!(Arc::ptr_eq(a, b));
            assert_eq!(a.to_string(), "no counters today");
        }
        other => panic!("expected realization errors, got {:?}", other),
    }
}

#[test]
fn test_failing_action_fails_realization() {
    let calls = Arc::new(AtomicUsize::new(0));
    let entry = entry("a", Value::Null);
    entry
        .push_action(Box::new(|_c: &mut Counter| Err("bad action".into())))
        .unwrap();

    let err = entry.realize(|| Ok(recipe(counting_factory(calls)))).unwrap_err();
    assert!(err.to_string().contains("bad action"));
    assert_eq!(entry.state(), RealizationState::Failed);
}

#[test]
fn test_push_action_after_failure_fails() {
    let entry = entry("a", Value::Null);
    let failing: Factory<Counter> = Arc::new(|_name: &str, _args: &Value| -> Result<Box<Counter>, BoxError> {
        Err("nope".into())
    });
    let _ = entry.realize(|| Ok(recipe(failing)));

    let result = entry.push_action(Box::new(|_c: &mut Counter| Ok(())));
    assert!(matches!(result, Err(RegistryError::AlreadyRealized { .. })));
}

#[test]
fn test_prepare_error_is_cached() {
    let entry = entry("a", Value::Null);
    let err = entry
        .realize(|| {
            Err(RegistryError::UnknownType {
                subtype: "counter".to_string(),
                name: Some("a".to_string()),
            })
        })
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownType { .. }));
    assert_eq!(entry.state(), RealizationState::Failed);
}

#[test]
fn test_factory_must_use_declared_name() {
    let renaming: Factory<Counter> = Arc::new(|_name: &str, _args: &Value| -> Result<Box<Counter>, BoxError> {
        Ok(Box::new(Counter {
            name: "someone-else".to_string(),
            value: 0,
            history: Vec::new(),
        }))
    });

    let entry = entry("a", Value::Null);
    let err = entry.realize(|| Ok(recipe(renaming))).unwrap_err();
    assert!(err.to_string().contains("someone-else"));
}

#[test]
fn test_reentrant_realization_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let entry = entry("a", Value::Null);
    let mut inner = None;

    let outer = entry.realize(|| {
        inner = Some(entry.realize(|| panic!("inner prepare must not run")));
        Ok(recipe(counting_factory(calls.clone())))
    });

    assert!(outer.is_ok());
    assert!(matches!(
        inner,
        Some(Err(RegistryError::ReentrantRealization { .. }))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panicking_factory_marks_entry_failed() {
    let entry = entry("a", Value::Null);
    let exploding: Factory<Counter> =
        Arc::new(|_name: &str, _args: &Value| -> Result<Box<Counter>, BoxError> {
            panic!("factory blew up")
        });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = entry.realize(|| Ok(recipe(exploding)));
    }));
    assert!(result.is_err());
    assert_eq!(entry.state(), RealizationState::Failed);

    let err = entry
        .realize(|| panic!("prepare must not run after a panic"))
        .unwrap_err();
    assert!(err.to_string().contains("panicked"));
}

#[test]
fn test_concurrent_realization_runs_factory_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = calls.clone();
    let slow: Factory<Counter> = Arc::new(move |name: &str, _args: &Value| -> Result<Box<Counter>, BoxError> {
        factory_calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        Ok(Box::new(Counter {
            name: name.to_string(),
            value: 7,
            history: Vec::new(),
        }))
    });

    let entry = entry("a", Value::Null);
    let instances: Vec<Arc<Counter>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slow = slow.clone();
                let entry = &entry;
                scope.spawn(move || entry.realize(|| Ok(recipe(slow))).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
    assert_eq!(instances[0].value, 7);
}
