//! Queue behaviour against the in-memory store.

use std::sync::Arc;

use redis_unique_queue::db::memory::MemoryStore;
use redis_unique_queue::model::QueueOptions;
use redis_unique_queue::{Error, UniqueQueue};

fn queue(name: &str) -> UniqueQueue<MemoryStore> {
    UniqueQueue::new(name, Arc::new(MemoryStore::new()), QueueOptions::default()).unwrap()
}

fn abc() -> UniqueQueue<MemoryStore> {
    let q = queue("some_queue");
    q.push("a").unwrap();
    q.push("b").unwrap();
    q.push("c").unwrap();
    q
}

#[test]
fn jobs_scenario() {
    let q = queue("jobs");
    q.push("a").unwrap();
    q.push("b").unwrap();
    q.push("c").unwrap();
    assert_eq!(q.size().unwrap(), 3);
    assert_eq!(q.all().unwrap(), vec!["a", "b", "c"]);

    assert_eq!(q.pop().unwrap().as_deref(), Some("a"));
    assert_eq!(q.size().unwrap(), 2);

    assert_eq!(q.pop_multi(2).unwrap(), vec!["b", "c"]);
    assert_eq!(q.size().unwrap(), 0);

    assert_eq!(q.pop().unwrap(), None);
}

#[test]
fn empty_name_is_rejected() {
    let result = UniqueQueue::new("", Arc::new(MemoryStore::new()), QueueOptions::default());
    assert!(matches!(result, Err(Error::InvalidName(_))));
}

#[test]
fn push_returns_the_item() {
    let q = queue("q");
    assert_eq!(q.push("a").unwrap(), "a");
    assert_eq!(q.name(), "q");
}

#[test]
fn pushes_keep_insertion_order() {
    let q = queue("q");
    let items: Vec<String> = (0..50).map(|i| format!("item-{i:02}")).rev().collect();
    for item in &items {
        q.push(item.as_str()).unwrap();
    }
    assert_eq!(q.all().unwrap(), items);
}

#[test]
fn re_pushing_moves_item_to_the_back() {
    let q = abc();
    q.push("a").unwrap();
    assert_eq!(q.size().unwrap(), 3);
    assert_eq!(q.all().unwrap(), vec!["b", "c", "a"]);
}

#[test]
fn push_multi_keeps_batch_order() {
    let q = queue("q");
    assert_eq!(q.push_multi(["z", "y", "x"]).unwrap(), vec!["z", "y", "x"]);
    assert_eq!(q.size().unwrap(), 3);
    assert_eq!(q.all().unwrap(), vec!["z", "y", "x"]);
}

#[test]
fn push_after_batch_lands_behind_it() {
    let q = queue("q");
    q.push_multi(vec!["x".to_string(), "y".to_string(), "z".to_string()])
        .unwrap();
    q.push("a").unwrap();
    assert_eq!(q.all().unwrap(), vec!["x", "y", "z", "a"]);
    assert_eq!(q.back().unwrap().as_deref(), Some("a"));
}

#[test]
fn push_multi_with_nothing_is_a_no_op() {
    let q = queue("q");
    assert!(q.push_multi(Vec::<String>::new()).unwrap().is_empty());
    assert_eq!(q.size().unwrap(), 0);
}

#[test]
fn pop_drains_in_push_order() {
    let q = abc();
    assert_eq!(q.pop().unwrap().as_deref(), Some("a"));
    assert_eq!(q.size().unwrap(), 2);
    assert_eq!(q.pop().unwrap().as_deref(), Some("b"));
    assert_eq!(q.size().unwrap(), 1);
    assert_eq!(q.pop().unwrap().as_deref(), Some("c"));
    assert_eq!(q.size().unwrap(), 0);
}

#[test]
fn pop_on_empty_queue_returns_none() {
    assert_eq!(queue("q").pop().unwrap(), None);
}

#[test]
fn pop_multi_takes_a_prefix() {
    let q = abc();
    assert_eq!(q.pop_multi(2).unwrap(), vec!["a", "b"]);
    assert_eq!(q.all().unwrap(), vec!["c"]);
}

#[test]
fn pop_multi_past_the_end_takes_everything() {
    let q = abc();
    assert_eq!(q.pop_multi(10).unwrap(), vec!["a", "b", "c"]);
    assert_eq!(q.size().unwrap(), 0);
    assert!(q.pop_multi(1).unwrap().is_empty());
}

#[test]
fn pop_multi_zero_leaves_queue_alone() {
    let q = abc();
    assert!(q.pop_multi(0).unwrap().is_empty());
    assert_eq!(q.size().unwrap(), 3);
}

#[test]
fn pop_all_returns_everything_and_empties() {
    let q = queue("q");
    q.push_multi(["a", "b", "c"]).unwrap();
    assert_eq!(q.pop_all().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(q.size().unwrap(), 0);
    assert!(q.pop_all().unwrap().is_empty());
}

#[test]
fn front_and_back() {
    let q = abc();
    assert_eq!(q.front().unwrap().as_deref(), Some("a"));
    assert_eq!(q.back().unwrap().as_deref(), Some("c"));
    assert_eq!(q.size().unwrap(), 3);

    let empty = queue("empty");
    assert_eq!(empty.front().unwrap(), None);
    assert_eq!(empty.back().unwrap(), None);
}

#[test]
fn peek_does_not_mutate() {
    let q = abc();
    assert_eq!(q.peek(0, 1).unwrap(), vec!["a"]);
    assert_eq!(q.peek(1, 1).unwrap(), vec!["b"]);
    assert_eq!(q.peek(2, 1).unwrap(), vec!["c"]);
    assert!(q.peek(3, 1).unwrap().is_empty());

    assert_eq!(q.peek(0, 2).unwrap(), vec!["a", "b"]);
    assert_eq!(q.peek(0, 3).unwrap(), vec!["a", "b", "c"]);
    assert_eq!(q.peek(0, 4).unwrap(), vec!["a", "b", "c"]);

    assert_eq!(q.peek(1, 2).unwrap(), vec!["b", "c"]);
    assert_eq!(q.peek(1, 3).unwrap(), vec!["b", "c"]);
    assert!(q.peek(0, 0).unwrap().is_empty());

    assert_eq!(q.size().unwrap(), 3);
    assert_eq!(q.peek(0, q.size().unwrap()).unwrap(), q.all().unwrap());
}

#[test]
fn remove_by_value() {
    let q = abc();
    assert!(q.remove("b").unwrap());
    assert_eq!(q.size().unwrap(), 2);
    assert_eq!(q.all().unwrap(), vec!["a", "c"]);
    assert!(!q.contains("b").unwrap());

    assert!(!q.remove("b").unwrap());
    assert_eq!(q.size().unwrap(), 2);
}

#[test]
fn remove_by_index() {
    let q = abc();
    assert_eq!(q.remove_item_by_index(1).unwrap(), 1);
    assert_eq!(q.all().unwrap(), vec!["a", "c"]);
    assert_eq!(q.remove_item_by_index(5).unwrap(), 0);
    assert_eq!(q.size().unwrap(), 2);
}

#[test]
fn contains_is_exact() {
    let q = abc();
    for (present, absent) in [("a", "A"), ("b", "B"), ("c", "C")] {
        assert!(q.contains(present).unwrap());
        assert!(!q.contains(absent).unwrap());
    }
}

#[test]
fn clear_empties_the_queue() {
    let q = abc();
    assert!(q.clear().unwrap().is_empty());
    assert_eq!(q.size().unwrap(), 0);
    assert!(q.all().unwrap().is_empty());
}

#[test]
fn size_of_missing_queue_is_zero() {
    assert_eq!(queue("never-pushed").size().unwrap(), 0);
}

#[test]
fn queues_on_one_store_are_independent() {
    let store = Arc::new(MemoryStore::new());
    let jobs = UniqueQueue::new("jobs", Arc::clone(&store), QueueOptions::default()).unwrap();
    let mail = UniqueQueue::new("mail", Arc::clone(&store), QueueOptions::default()).unwrap();
    jobs.push("a").unwrap();
    mail.push("a").unwrap();
    assert_eq!(jobs.pop().unwrap().as_deref(), Some("a"));
    assert_eq!(mail.size().unwrap(), 1);
}

#[test]
fn expire_option_applies_at_construction() {
    let store = Arc::new(MemoryStore::new());
    let first = UniqueQueue::new("q", Arc::clone(&store), QueueOptions::default()).unwrap();
    first.push("a").unwrap();

    let second =
        UniqueQueue::new("q", Arc::clone(&store), QueueOptions::default().expire(3600)).unwrap();
    assert_eq!(second.all().unwrap(), vec!["a"]);

    UniqueQueue::new("q", store, QueueOptions::default().expire(0)).unwrap();
    assert_eq!(first.size().unwrap(), 0);
}

#[test]
fn out_of_range_ttl_is_an_error_not_a_panic() {
    let q = queue("q");
    q.push("a").unwrap();
    assert!(matches!(q.expire(i64::MAX), Err(Error::Other(_))));
    assert_eq!(q.all().unwrap(), vec!["a"]);

    let store = Arc::new(MemoryStore::new());
    UniqueQueue::new("q", Arc::clone(&store), QueueOptions::default())
        .unwrap()
        .push("a")
        .unwrap();
    let built = UniqueQueue::new("q", store, QueueOptions::default().expire(i64::MAX));
    assert!(matches!(built, Err(Error::Other(_))));
}

#[test]
fn expire_on_missing_queue_reports_false() {
    let q = queue("q");
    assert!(!q.expire(60).unwrap());
    q.push("a").unwrap();
    assert!(q.expire(60).unwrap());
    assert_eq!(q.size().unwrap(), 1);
}
