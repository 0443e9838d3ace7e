use kinit::mock::{Journal, MockConstructor, MockFunctor};
use kinit::{
    constructor, functor, processor, Arena, Container, Destructor, Error, ErrorKind, Functor,
    InspectOptions, Inspector, Runtime, TypeKey,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

struct Database {
    dsn: String,
}

struct Repository {
    table: &'static str,
}

/// Destructors are composed from non-commuting operations so the final value
/// proves the order they ran in.
#[test]
fn test_dependents_are_destroyed_before_their_dependencies() {
    let counter = Arc::new(Mutex::new(1i64));
    let container = Container::new();

    let on_database = Arc::clone(&counter);
    container
        .provide(
            constructor(|()| {
                Ok(Database {
                    dsn: "mem://".into(),
                })
            })
            .on_teardown(move |_: &Database| {
                *on_database.lock().unwrap() *= 2;
                Ok(())
            }),
        )
        .unwrap();

    let on_repository = Arc::clone(&counter);
    container
        .provide(
            constructor(|(db,): (Rc<Database>,)| {
                assert_eq!(db.dsn, "mem://");
                Ok(Repository { table: "orders" })
            })
            .on_teardown(move |_: &Repository| {
                *on_repository.lock().unwrap() += 3;
                Ok(())
            }),
        )
        .unwrap();

    container
        .run([functor(|(repo,): (Rc<Repository>,)| {
            assert_eq!(repo.table, "orders");
            Ok(())
        })])
        .unwrap();

    // (1 + 3) * 2, not 1 * 2 + 3
    assert_eq!(*counter.lock().unwrap(), 8);
}

#[test]
fn test_follow_up_functors_run_before_the_next_sibling() {
    let journal = Journal::new();
    let f4 = MockFunctor::named("f4").with_journal(&journal);
    let f3 = MockFunctor::named("f3").with_journal(&journal).then(f4);
    let f1 = MockFunctor::named("f1").with_journal(&journal).then(f3);
    let f2 = MockFunctor::named("f2").with_journal(&journal);

    Container::new().run([f1.boxed(), f2.boxed()]).unwrap();

    assert_eq!(
        journal.entries(),
        vec!["call f1", "call f3", "call f4", "call f2"]
    );
}

#[test]
fn test_nested_run_sees_parent_objects_and_cleans_up_its_own() {
    let journal = Journal::new();
    let container = Container::new();
    let database = MockConstructor::of(|| 0u8).with_journal(&journal);
    let database_calls = database.call_counter();
    container.provide(database).unwrap();
    container
        .provide(
            MockConstructor::of(|| 0u16)
                .depends_on::<u8>()
                .with_journal(&journal),
        )
        .unwrap();

    let marker = journal.clone();
    container
        .run([
            MockFunctor::named("outer")
                .depends_on::<u8>()
                .with_journal(&journal)
                .boxed(),
            functor(move |(runtime,): (Rc<Runtime>,)| {
                for _ in 0..2 {
                    runtime.run([MockFunctor::named("request")
                        .depends_on::<u16>()
                        .with_journal(&marker)
                        .boxed()])?;
                }
                marker.record("requests done");
                Ok(())
            }),
        ])
        .unwrap();

    assert_eq!(database_calls.get(), 1);
    assert_eq!(
        journal.entries(),
        vec![
            "create u8",
            "call outer",
            "create u16",
            "call request",
            "destroy u16",
            "create u16",
            "call request",
            "destroy u16",
            "requests done",
            "destroy u8",
        ]
    );
}

/// A panic inside a nested run unwinds through both runs; each arena is
/// finalized on the way out, innermost first.
#[test]
fn test_panic_in_nested_run_tears_down_both_arenas() {
    let journal = Journal::new();
    let container = Container::new();
    container
        .provide(MockConstructor::of(|| 1u8).with_journal(&journal))
        .unwrap();
    container
        .provide(MockConstructor::of(|| 2u16).with_journal(&journal))
        .unwrap();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        container.run([functor(|(runtime, _byte): (Rc<Runtime>, Rc<u8>)| {
            runtime.run([functor(|(_word,): (Rc<u16>,)| -> Result<(), Error> {
                panic!("handler crashed")
            })])
        })])
    }));

    assert!(outcome.is_err());
    assert_eq!(
        journal.entries(),
        vec!["create u8", "create u16", "destroy u16", "destroy u8"]
    );
}

#[test]
fn test_shared_dependency_is_built_once_per_run() {
    let container = Container::new();
    let mock = MockConstructor::of(|| 5u32);
    let calls = mock.call_counter();
    container.provide(mock).unwrap();

    for _ in 0..2 {
        container
            .run([
                MockFunctor::named("a").depends_on::<u32>().boxed(),
                MockFunctor::named("b").depends_on::<u32>().boxed(),
            ])
            .unwrap();
    }

    // once per run, never shared across runs
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_failures_stop_the_run_without_applying_later_functors() {
    let journal = Journal::new();
    let container = Container::new();
    container
        .provide(MockConstructor::of(|| 1u8).depends_on::<u64>())
        .unwrap();

    let err = container
        .run([
            MockFunctor::named("needs u8").depends_on::<u8>().boxed(),
            MockFunctor::named("later").with_journal(&journal).boxed(),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = container
        .run([
            MockFunctor::named("nil").depends_on_key(TypeKey::nil()).boxed(),
            MockFunctor::named("later").with_journal(&journal).boxed(),
        ])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    assert!(journal.entries().is_empty());
}

#[test]
fn test_processor_with_nil_parameter_is_invalid() {
    let container = Container::new();
    container.provide(MockConstructor::of(|| 1u8)).unwrap();
    container
        .attach(kinit::mock::MockProcessor::<u8>::new())
        .unwrap();

    struct NilProcessor;
    impl kinit::Processor for NilProcessor {
        fn type_key(&self) -> TypeKey {
            TypeKey::of::<u8>()
        }
        fn parameters(&self) -> Vec<TypeKey> {
            vec![TypeKey::nil()]
        }
        fn process(&self, _: &kinit::Object, _: &[kinit::Object]) -> Result<(), Error> {
            Ok(())
        }
    }
    container.attach(NilProcessor).unwrap();

    let err = container
        .run([MockFunctor::named("f").depends_on::<u8>().boxed()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[test]
fn test_arena_lifecycle() {
    let journal = Journal::new();
    let arena = Arena::new();
    for (key, name) in [(TypeKey::of::<u8>(), "a"), (TypeKey::of::<u16>(), "b")] {
        let journal = journal.clone();
        arena
            .put(
                key,
                Rc::new(name),
                Destructor::new(move || {
                    journal.record(name);
                    Ok(())
                }),
            )
            .unwrap();
    }

    let err = arena
        .put(TypeKey::of::<u8>(), Rc::new("c"), Destructor::noop())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ambiguous);
    assert_eq!(
        arena
            .get(TypeKey::of::<u8>())
            .and_then(|o| o.downcast_ref::<&'static str>().copied()),
        Some("a")
    );

    arena.finalize().unwrap();
    assert_eq!(journal.entries(), vec!["b", "a"]);
    assert_eq!(arena.finalize().unwrap_err().kind(), ErrorKind::Illegal);
    assert_eq!(
        arena
            .put(TypeKey::of::<u32>(), Rc::new(0u32), Destructor::noop())
            .unwrap_err()
            .kind(),
        ErrorKind::Illegal
    );
    assert!(arena.get(TypeKey::of::<u16>()).is_some());

    let child = Arena::with_parents(&[arena.clone()]);
    assert!(child.get(TypeKey::of::<u8>()).is_none());
}

#[test]
fn test_inspection_matches_run_outcome() {
    let container = Container::new();
    container
        .provide(constructor(|()| {
            Ok(Database {
                dsn: "mem://".into(),
            })
        }))
        .unwrap();
    container
        .provide(constructor(|(_db,): (Rc<Database>,)| {
            Ok(Repository { table: "users" })
        }))
        .unwrap();
    let checked = Rc::new(Cell::new(false));
    container
        .attach(processor(|db: &Database, (_runtime,): (Rc<Runtime>,)| {
            if db.dsn.is_empty() {
                return Err(Error::Invalid("empty dsn".into()));
            }
            Ok(())
        }))
        .unwrap();

    let mut inspector = Inspector::new();
    inspector.require(TypeKey::of::<Repository>()).unwrap();
    inspector
        .inspect(&container, &InspectOptions::default())
        .unwrap();

    let sink = Rc::clone(&checked);
    container
        .run([functor(move |(_repo,): (Rc<Repository>,)| {
            sink.set(true);
            Ok(())
        })])
        .unwrap();
    assert!(checked.get());
}

#[test]
fn test_functor_list_can_be_built_dynamically() {
    let journal = Journal::new();
    let functors: Vec<Box<dyn Functor>> = (0..3)
        .map(|i| {
            MockFunctor::named(&format!("step {i}"))
                .with_journal(&journal)
                .boxed()
        })
        .collect();
    Container::new().run(functors).unwrap();
    assert_eq!(journal.entries(), vec!["call step 0", "call step 1", "call step 2"]);
}
