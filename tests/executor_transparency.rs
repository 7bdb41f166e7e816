//! Executor Transparency Tests
//!
//! Tests for executor invariants:
//! - Index-driven execution returns exactly what a full scan returns
//! - Results are in ascending id order
//! - The smallest index candidate drives verification
//! - `_limit` filters are re-executable and always fully scanned

use dirquery::executor::{QueryExecutor, ScanStrategy};
use dirquery::model::{ObjectDraft, ObjectId, ObjectSource, ObjectStore, ObjectStoreBuilder};
use dirquery::query::{parse, Evaluator};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// =============================================================================
// Helper Functions
// =============================================================================

const NAMES: &[&str] = &["alice", "Bob", "bob", "carol", "dave"];
const DEPARTMENTS: &[&str] = &["IT", "hr", "Ops"];

/// (name index, optional department index, uac)
type ObjectSpec = (usize, Option<usize>, i64);

fn build_store(specs: &[ObjectSpec]) -> ObjectStore {
    let mut builder = ObjectStoreBuilder::new();
    builder.index_attribute("department");
    for (i, (name, department, uac)) in specs.iter().enumerate() {
        let mut draft = ObjectDraft::new(format!("CN=obj{},DC=corp", i))
            .with("cn", NAMES[*name])
            .with("userAccountControl", *uac);
        if let Some(d) = department {
            draft = draft.with("department", DEPARTMENTS[*d]);
        }
        builder.add(draft);
    }
    builder.build().unwrap()
}

/// Reference result: one fresh evaluator over every object in id order.
fn scan(store: &ObjectStore, text: &str) -> Vec<ObjectId> {
    let filter = parse(text, store.registry()).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let mut evaluator = Evaluator::new(&filter, store, &mut rng);
    store
        .scan(&mut |object| evaluator.matches(object))
        .iter()
        .collect()
}

fn execute(store: &ObjectStore, text: &str) -> Vec<ObjectId> {
    let filter = parse(text, store.registry()).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    QueryExecutor::new(store)
        .execute_with_rng(&filter, &mut rng)
        .iter()
        .collect()
}

fn leaf() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "(cn=bob)",
        "(cn=ALICE)",
        "(cn:caseExactMatch:=Bob)",
        "(cn=b*)",
        "(cn=/^[a-c]/)",
        "(department=it)",
        "(department=ops)",
        "(department=*)",
        "(userAccountControl:and:=2)",
        "(userAccountControl>=4)",
        "(cn:len:=5)",
        "(sAMAccountName=bob)",
    ])
    .prop_map(str::to_string)
}

fn filter_text() -> impl Strategy<Value = String> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4)
                .prop_map(|children| format!("(&{})", children.concat())),
            prop::collection::vec(inner.clone(), 1..4)
                .prop_map(|children| format!("(|{})", children.concat())),
            inner.prop_map(|child| format!("(!{})", child)),
        ]
    })
}

fn object_specs() -> impl Strategy<Value = Vec<ObjectSpec>> {
    prop::collection::vec(
        (0..NAMES.len(), prop::option::of(0..DEPARTMENTS.len()), 0i64..8),
        0..40,
    )
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    /// Execution equals a full scan for every limit-free filter.
    #[test]
    fn prop_execute_matches_scan(specs in object_specs(), text in filter_text()) {
        let store = build_store(&specs);
        prop_assert_eq!(execute(&store, &text), scan(&store, &text));
    }

    /// Negation yields the complement within the store.
    #[test]
    fn prop_negation_is_complement(specs in object_specs(), text in filter_text()) {
        let store = build_store(&specs);
        let positive = execute(&store, &text);
        let negative = execute(&store, &format!("(!{})", text));

        prop_assert_eq!(positive.len() + negative.len(), store.len());
        prop_assert!(positive.iter().all(|id| !negative.contains(id)));
    }

    /// Conjunction is intersection and disjunction is union.
    #[test]
    fn prop_and_or_algebra(
        specs in object_specs(),
        left in filter_text(),
        right in filter_text()
    ) {
        let store = build_store(&specs);
        let a = execute(&store, &left);
        let b = execute(&store, &right);

        let and: Vec<ObjectId> = a.iter().copied().filter(|id| b.contains(id)).collect();
        prop_assert_eq!(execute(&store, &format!("(&{}{})", left, right)), and);

        let mut or: Vec<ObjectId> = a.iter().chain(b.iter()).copied().collect();
        or.sort();
        or.dedup();
        prop_assert_eq!(execute(&store, &format!("(|{}{})", left, right)), or);
    }

    /// Results come back in ascending id order.
    #[test]
    fn prop_results_ascending(specs in object_specs(), text in filter_text()) {
        let store = build_store(&specs);
        let ids = execute(&store, &text);
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}

// =============================================================================
// Planning Tests
// =============================================================================

/// The smaller candidate drives; only its members are examined.
#[test]
fn test_smallest_candidate_drives() {
    let mut builder = ObjectStoreBuilder::new();
    builder.index_attribute("department");
    for i in 0..1000 {
        let mut draft = ObjectDraft::new(format!("CN=a{},DC=corp", i)).with("cn", "A");
        if i % 400 == 7 {
            draft = draft.with("department", "B");
        }
        builder.add(draft);
    }
    let store = builder.build().unwrap();

    let filter = parse("(&(cn=a)(department=b))", store.registry()).unwrap();
    let result = QueryExecutor::new(&store).execute(&filter);

    assert_eq!(result.len(), 3);
    assert_eq!(result.examined, 3);
    match &result.strategy {
        ScanStrategy::IndexVerified { candidates, .. } => assert_eq!(*candidates, 3),
        other => panic!("unexpected strategy {:?}", other),
    }
}

/// A bare case-insensitive equality is answered from the index alone.
#[test]
fn test_bare_equality_is_direct() {
    let store = build_store(&[(1, None, 0), (2, None, 0), (3, None, 0)]);
    let filter = parse("(cn=BOB)", store.registry()).unwrap();
    let result = QueryExecutor::new(&store).execute(&filter);

    assert!(matches!(result.strategy, ScanStrategy::IndexDirect { .. }));
    assert_eq!(result.examined, 0);
    assert_eq!(result.len(), 2);
}

/// When no candidate has index entries the filter is scanned, not short-circuited.
#[test]
fn test_index_miss_falls_back_to_scan() {
    let store = build_store(&[(0, Some(0), 0), (1, Some(1), 0)]);
    let result = QueryExecutor::new(&store)
        .execute(&parse("(&(cn=zed)(userAccountControl>=0))", store.registry()).unwrap());

    assert!(result.is_empty());
    assert_eq!(result.strategy, ScanStrategy::FullScan);
    assert_eq!(result.examined, 2);
}

/// Unindexed attributes fall back to a full scan.
#[test]
fn test_unindexed_full_scan() {
    let store = build_store(&[(0, None, 1), (1, None, 2), (2, None, 3)]);
    let result = QueryExecutor::new(&store)
        .execute(&parse("(userAccountControl>=2)", store.registry()).unwrap());

    assert_eq!(result.strategy, ScanStrategy::FullScan);
    assert_eq!(result.examined, 3);
    assert_eq!(result.len(), 2);
}

// =============================================================================
// Limit Tests
// =============================================================================

/// `_limit` forces a full scan and re-execution starts from fresh counters.
#[test]
fn test_limit_reexecution() {
    let specs: Vec<ObjectSpec> = (0..10).map(|i| (i % 2 + 1, None, 0)).collect();
    let store = build_store(&specs);
    let filter = parse("(&(cn=bob)(_limit=2))", store.registry()).unwrap();
    let executor = QueryExecutor::new(&store);

    let first = executor.execute(&filter);
    let second = executor.execute(&filter);

    assert_eq!(first.strategy, ScanStrategy::FullScan);
    assert_eq!(first.examined, 10);
    let expected = vec![ObjectId::new(0), ObjectId::new(1)];
    assert_eq!(first.iter().collect::<Vec<_>>(), expected);
    assert_eq!(second.iter().collect::<Vec<_>>(), expected);
}

/// A limit inside a nested target filter is still order dependent.
#[test]
fn test_nested_limit_is_scanned() {
    let store = build_store(&[(1, None, 0), (2, None, 0)]);
    let filter = parse("(&(cn=bob)(_canpwn=*,(_limit=1)))", store.registry()).unwrap();
    let result = QueryExecutor::new(&store).execute(&filter);

    assert_eq!(result.strategy, ScanStrategy::FullScan);
    assert!(result.is_empty());
}
