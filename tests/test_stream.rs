use deferred_stream::{
    Callable, CheckPolicy, GeneratorOptions, Stream, StreamConfig, StreamError, StepKind,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
struct Student {
    id: u32,
    name: &'static str,
    age: u32,
    scores: Vec<u32>,
}

fn students() -> Vec<Student> {
    let names = ["Tom", "Kate", "Lucy", "Jim", "Jack", "King", "Lee", "Mask", "Ann", "Bob"];
    (0..10)
        .map(|i| Student {
            id: i + 1,
            name: names[i as usize],
            age: i + 1,
            scores: vec![60 + i, 70 + i, 80 + i],
        })
        .collect()
}

#[test]
fn test_filter_map_reduce_sum() {
    let total = Stream::of([1, 2, 3, 4, 5, 6, 7, 8, 9, 0])
        .filter(|x| x % 2 == 0)
        .map(|x| x * 2)
        .reduce(0, |sum, x| sum + x)
        .expect("Reduce failed");
    assert_eq!(total, 40);
}

#[test]
fn test_limit_then_reset_and_skip() {
    let stream = Stream::from_vec(students()).limit(5);
    let first = stream.to_vec().expect("Materialize failed");
    assert_eq!(first, students()[..5].to_vec());

    let stream = stream.reset().skip(5);
    let last = stream.to_vec().expect("Materialize failed");
    assert_eq!(last, students()[5..].to_vec());
}

#[test]
fn test_negative_limit_and_skip() {
    let stream = Stream::from_vec(students());
    assert_eq!(stream.reset().limit(-1).count().expect("Count failed"), 0);

    let stream = Stream::from_vec(students()).skip(-1);
    assert_eq!(stream.count().expect("Count failed"), 10);

    let stream = stream.reset().skip(11);
    assert!(stream.to_vec().expect("Materialize failed").is_empty());
}

#[test]
fn test_sort_by_score_descending() {
    #[derive(Debug, Clone)]
    struct Entry {
        score: u32,
    }
    let entries = vec![Entry { score: 70 }, Entry { score: 85 }, Entry { score: 60 }];
    let scores: Vec<u32> = Stream::from_vec(entries)
        .sort(|a, b| a.score > b.score)
        .map(|e| e.score)
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(scores, vec![85, 70, 60]);
}

#[test]
fn test_sort_ties_only_guarantee_grouping() {
    let pairs = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd'), (2, 'e')];
    let sorted = Stream::from_vec(pairs)
        .sort(|a, b| a.0 < b.0)
        .to_vec()
        .expect("Materialize failed");

    // The sort is unstable: check keys are ordered and each tie group holds
    // the right members, whatever their order.
    let keys: Vec<i32> = sorted.iter().map(|p| p.0).collect();
    assert_eq!(keys, vec![1, 1, 2, 2, 2]);
    let mut ones: Vec<char> = sorted.iter().filter(|p| p.0 == 1).map(|p| p.1).collect();
    ones.sort();
    assert_eq!(ones, vec!['b', 'd']);
    let mut twos: Vec<char> = sorted.iter().filter(|p| p.0 == 2).map(|p| p.1).collect();
    twos.sort();
    assert_eq!(twos, vec!['a', 'c', 'e']);
}

#[test]
fn test_filter_preserves_relative_order() {
    let kept = Stream::from_vec(students())
        .filter(|s| s.age % 3 == 0)
        .map(|s| s.id)
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(kept, vec![3, 6, 9]);
}

#[test]
fn test_filter_indexed_uses_current_positions() {
    let kept = Stream::from_vec(students())
        .skip(3)
        .filter_indexed(|_, i| i < 2)
        .map(|s| s.id)
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(kept, vec![4, 5]);
}

#[test]
fn test_map_preserves_length() {
    let stream = Stream::from_vec(students()).map_indexed(|s, i| format!("{}:{}", i, s.name));
    let names = stream.to_vec().expect("Materialize failed");
    assert_eq!(names.len(), 10);
    assert_eq!(names[0], "0:Tom");
    assert_eq!(names[9], "9:Bob");
}

#[test]
fn test_flat_map_concatenates_in_order() {
    let scores = Stream::from_vec(students())
        .limit(2)
        .flat_map(|s| s.scores)
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(scores, vec![60, 70, 80, 61, 71, 81]);

    let tagged = Stream::of(["ab", "c"])
        .flat_map_indexed(|s, i| s.chars().map(move |c| (i, c)))
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(tagged, vec![(0, 'a'), (0, 'b'), (1, 'c')]);
}

#[test]
fn test_distinct_first_occurrence_order() {
    let words = Stream::of(["pear", "Plum", "apple", "PEAR", "plum", "fig"])
        .distinct(|a, b| a.eq_ignore_ascii_case(b))
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(words, vec!["pear", "Plum", "apple", "fig"]);
}

#[test]
fn test_peek_and_call_run_on_every_evaluation() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let calls = Rc::new(Cell::new(0));
    let seen_sink = Rc::clone(&seen);
    let call_count = Rc::clone(&calls);

    let stream = Stream::of([1, 2, 3])
        .peek_indexed(move |x, i| seen_sink.borrow_mut().push((i, *x)))
        .call(move || call_count.set(call_count.get() + 1));

    assert_eq!(stream.count().expect("Count failed"), 3);
    assert_eq!(stream.count().expect("Count failed"), 3);
    assert_eq!(calls.get(), 2);
    assert_eq!(seen.borrow().len(), 6);
    assert_eq!(seen.borrow()[..3], [(0, 1), (1, 2), (2, 3)]);
}

#[test]
fn test_replay_without_reset_is_deterministic() {
    let stream = Stream::from_vec(students())
        .filter(|s| s.age > 4)
        .sort(|a, b| a.scores[0] > b.scores[0])
        .map(|s| s.name);
    let first = stream.to_vec().expect("Materialize failed");
    let second = stream.to_vec().expect("Materialize failed");
    assert_eq!(first, second);
    assert_eq!(first[0], "Bob");
}

#[test]
fn test_check_halts_by_default() {
    let after = Rc::new(Cell::new(false));
    let flag = Rc::clone(&after);
    let stream = Stream::from_vec(students())
        .filter(|s| s.age % 2 == 0)
        .check(|evens| evens.len() > 5)
        .call(move || flag.set(true));

    assert_eq!(stream.count().expect("Count failed"), 0);
    assert!(!after.get());
    assert_eq!(stream.step_metrics(2).expect("Metrics not found").total_skipped(), 1);
}

#[test]
fn test_check_ignored_when_configured() {
    let stream = Stream::from_vec(students())
        .with_config(StreamConfig::new().with_check_policy(CheckPolicy::Ignore))
        .filter(|s| s.age % 2 == 0)
        .check(|evens| evens.len() > 5);
    assert_eq!(stream.count().expect("Count failed"), 5);
}

#[test]
fn test_empty_results() {
    let empty = Stream::from_vec(students()).filter(|s| s.age > 100);
    assert!(empty.all_match(|_| false).expect("Match failed"));
    assert!(!empty.any_match(|_| true).expect("Match failed"));
    assert!(empty.none_match(|_| true).expect("Match failed"));
    assert_eq!(empty.count().expect("Count failed"), 0);
    assert!(empty.max(|a, b| a.age < b.age).expect("Max failed").is_none());
    assert!(empty.min(|a, b| a.age < b.age).expect("Min failed").is_none());
    assert_eq!(empty.reduce(7, |acc, _| acc + 1).expect("Reduce failed"), 7);
    assert!(empty.group(|s| (s.age, s.id)).expect("Group failed").is_empty());
}

#[test]
fn test_matches_and_extremes() {
    let stream = Stream::from_vec(students());
    assert!(stream.all_match(|s| s.scores.len() == 3).expect("Match failed"));
    assert!(stream.any_match(|s| s.name == "Jim").expect("Match failed"));
    assert!(stream.none_match(|s| s.age > 10).expect("Match failed"));

    let oldest = stream.max(|a, b| a.age < b.age).expect("Max failed");
    assert_eq!(oldest.map(|s| s.id), Some(10));
    let youngest = stream.min(|a, b| a.age < b.age).expect("Min failed");
    assert_eq!(youngest.map(|s| s.id), Some(1));

    let first = stream.first(|s| s.age > 6).expect("First failed");
    assert_eq!(first.map(|s| s.id), Some(7));
    let last = stream.last(|s| s.age < 4).expect("Last failed");
    assert_eq!(last.map(|s| s.id), Some(3));
}

#[test]
fn test_group_by_age_band() {
    let stream = Stream::from_vec(students());
    let bands = stream
        .group(|s| (s.age / 5, s.id))
        .expect("Group failed");
    assert_eq!(bands[&0], vec![1, 2, 3, 4]);
    assert_eq!(bands[&1], vec![5, 6, 7, 8, 9]);
    assert_eq!(bands[&2], vec![10]);

    let seeded = stream
        .group_seeded(|s| (s.age / 5, s.id))
        .expect("Group failed");
    assert_eq!(seeded[&2], vec![0, 10]);
    assert_eq!(seeded[&0].len(), bands[&0].len() + 1);
}

#[test]
fn test_for_each_and_collect_into() {
    let mut names = Vec::new();
    Stream::from_vec(students())
        .limit(3)
        .for_each(|s| names.push(s.name))
        .expect("ForEach failed");
    assert_eq!(names, vec!["Tom", "Kate", "Lucy"]);

    let mut ids = std::collections::BTreeSet::new();
    let written = Stream::from_vec(students())
        .map(|s| s.id % 3)
        .collect_into(&mut ids)
        .expect("Collect failed");
    assert_eq!(written, 10);
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn test_pointer_elements() {
    let shared: Vec<Rc<Student>> = students().into_iter().map(Rc::new).collect();
    let total = Stream::from_vec(shared)
        .filter(|s| s.age > 8)
        .flat_map(|s| s.scores.clone())
        .reduce(0, |sum, x| sum + x)
        .expect("Reduce failed");
    assert_eq!(total, (68 + 78 + 88) + (69 + 79 + 89));
}

#[test]
fn test_invocation_error_aborts_terminal() {
    let stream = Stream::of(["4", "8", "fifteen", "16"])
        .try_map(|s| s.parse::<u32>())
        .map(|n| n * 2);
    match stream.to_vec() {
        Err(StreamError::InvocationError { operation, .. }) => {
            assert_eq!(operation, "map step #0");
        }
        other => panic!("Expected invocation error, got {:?}", other),
    }

    let panicking = Stream::of([1, 2, 3]);
    let result = panicking.for_each(|x| {
        if x == 2 {
            panic!("refusing {}", x);
        }
    });
    assert!(matches!(
        result,
        Err(StreamError::InvocationError { ref reason, .. }) if reason == "refusing 2"
    ));
}

#[test]
fn test_invalid_source_is_rejected() {
    let result = Stream::<i32>::from_any(&5_i32);
    assert!(matches!(result, Err(StreamError::InvalidSource(_))));
}

#[test]
fn test_generators_feed_pipeline() {
    let evens = Stream::iterate(0_u64, |prev| (prev + 2, *prev < 8))
        .expect("Iterate failed")
        .map(|x| x / 2)
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(evens, vec![1, 2, 3, 4, 5]);

    let squares = Stream::generate_n(5, |i| i * i)
        .expect("Generate failed")
        .filter(|x| x % 2 == 1)
        .to_vec()
        .expect("Materialize failed");
    assert_eq!(squares, vec![1, 9]);

    let strict = GeneratorOptions::new().strict(true);
    let result = Stream::<u8>::generate_callable(Callable::nullary(|| (1_u8, 2_u8)), &strict);
    assert!(matches!(result, Err(StreamError::ShapeError(_))));
}

#[test]
fn test_steps_describe_queue() {
    let stream = Stream::from_vec(students())
        .filter(|s| s.age > 1)
        .peek(|_| {})
        .map(|s| s.age)
        .distinct(|a, b| a == b)
        .sort(|a, b| a < b)
        .skip(1)
        .limit(2);
    let kinds: Vec<StepKind> = stream.steps().iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StepKind::Filter,
            StepKind::Peek,
            StepKind::Map,
            StepKind::Distinct,
            StepKind::Sort,
            StepKind::Skip,
            StepKind::Limit,
        ]
    );
    assert_eq!(stream.to_vec().expect("Materialize failed"), vec![3, 4]);
    assert_eq!(stream.element_type(), std::any::type_name::<Student>());
}
