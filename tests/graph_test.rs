mod helpers;

use feather::Edge;
use helpers::{insert_record, test_db, test_embedding, test_meta};

const DIM: usize = 4;

#[test]
fn link_dedup_keeps_first_weight() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 1, DIM, 0, "one");
    insert_record(&mut db, 2, DIM, 1, "two");

    db.link(1, 2, "derived_from", 0.5);
    db.link(1, 2, "derived_from", 0.9);

    let edges = db.get_edges(1);
    assert_eq!(edges, vec![Edge::new(2, "derived_from", 0.5)]);

    let incoming = db.get_incoming(2);
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].source_id, 1);
    assert_eq!(incoming[0].rel_type, "derived_from");
    assert_eq!(incoming[0].weight, 0.5);
}

#[test]
fn link_from_unknown_source_is_silent_noop() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 2, DIM, 0, "two");

    db.link(99, 2, "related_to", 1.0);
    assert!(db.get_edges(99).is_empty());
    assert!(db.get_incoming(2).is_empty());
}

#[test]
fn dangling_edge_targets_are_accepted() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 1, DIM, 0, "one");

    db.link(1, 555, "references", 0.4);
    assert_eq!(db.get_edges(1).len(), 1);
    assert_eq!(db.get_incoming(555).len(), 1);
}

#[test]
fn edges_keep_insertion_order() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 1, DIM, 0, "hub");
    for target in [30u64, 10, 20] {
        db.link(1, target, "related_to", 1.0);
    }
    let targets: Vec<u64> = db.get_edges(1).iter().map(|e| e.target_id).collect();
    assert_eq!(targets, vec![30, 10, 20]);
}

#[test]
fn update_metadata_resyncs_reverse_index() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 1, DIM, 0, "one");
    insert_record(&mut db, 2, DIM, 1, "two");
    insert_record(&mut db, 3, DIM, 2, "three");
    db.link(1, 2, "supports", 1.0);

    let mut replacement = test_meta("one rewritten");
    replacement.edges.push(Edge::new(3, "contradicts", 0.6));
    db.update_metadata(1, replacement);

    assert!(db.get_incoming(2).is_empty());
    let incoming = db.get_incoming(3);
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].rel_type, "contradicts");
}

#[test]
fn rebuild_reverse_index_restores_derived_view() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 1, DIM, 0, "one");
    insert_record(&mut db, 2, DIM, 1, "two");
    db.link(1, 2, "related_to", 1.0);
    db.link(2, 1, "related_to", 0.5);

    db.rebuild_reverse_index();

    assert_eq!(db.get_incoming(1).len(), 1);
    assert_eq!(db.get_incoming(2).len(), 1);
    assert_eq!(db.get_incoming(1)[0].weight, 0.5);
}

#[test]
fn auto_link_connects_identical_vectors_only() {
    let (mut db, _dir, _path) = test_db(2);
    db.add(10, &[1.0, 0.0], test_meta("a"), "text").unwrap();
    db.add(11, &[1.0, 0.0], test_meta("a twin"), "text").unwrap();
    db.add(12, &[0.0, 1.0], test_meta("unrelated"), "text").unwrap();

    let created = db.auto_link_with("text", 0.99, "related_to", 15);
    assert_eq!(created, 2, "one edge each way between the twins");

    let edges_10 = db.get_edges(10);
    assert_eq!(edges_10.len(), 1);
    assert_eq!(edges_10[0].target_id, 11);
    assert_eq!(edges_10[0].weight, 1.0);
    assert_eq!(db.get_edges(11), vec![Edge::new(10, "related_to", 1.0)]);
    assert!(db.get_edges(12).is_empty());
    assert!(db.get_incoming(12).is_empty());
}

#[test]
fn auto_link_is_idempotent() {
    let (mut db, _dir, _path) = test_db(2);
    db.add(10, &[1.0, 0.0], test_meta("a"), "text").unwrap();
    db.add(11, &[1.0, 0.0], test_meta("b"), "text").unwrap();

    let first = db.auto_link_with("text", 0.99, "related_to", 15);
    let second = db.auto_link_with("text", 0.99, "related_to", 15);
    assert_eq!(first, 2);
    assert_eq!(second, 0, "existing pairs are not re-linked");
}

#[test]
fn auto_link_unknown_modality_creates_nothing() {
    let (mut db, _dir, _path) = test_db(2);
    db.add(10, &[1.0, 0.0], test_meta("a"), "text").unwrap();
    assert_eq!(db.auto_link("depth"), 0);
}

#[test]
fn auto_link_below_threshold_skips() {
    let (mut db, _dir, _path) = test_db(2);
    // Orthogonal vectors: similarity well under any high threshold
    db.add(1, &[1.0, 0.0], test_meta("x"), "text").unwrap();
    db.add(2, &[0.0, 1.0], test_meta("y"), "text").unwrap();
    assert_eq!(db.auto_link_with("text", 0.9, "related_to", 5), 0);
}

#[test]
fn re_add_with_new_edges_replaces_and_resyncs() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 1, DIM, 0, "one");
    insert_record(&mut db, 2, DIM, 1, "two");
    insert_record(&mut db, 3, DIM, 2, "three");
    db.link(1, 2, "related_to", 1.0);

    // Re-add with a non-empty edge list: the edge set is replaced outright
    let mut meta = test_meta("one again");
    meta.edges.push(Edge::new(3, "supports", 0.9));
    db.add(1, &test_embedding(DIM, 0), meta, "text").unwrap();

    assert_eq!(db.get_edges(1), vec![Edge::new(3, "supports", 0.9)]);
    assert!(db.get_incoming(2).is_empty(), "stale reverse entry removed");
    assert_eq!(db.get_incoming(3).len(), 1);
}

#[test]
fn touch_outside_search_bumps_recall() {
    let (mut db, _dir, _path) = test_db(DIM);
    insert_record(&mut db, 1, DIM, 0, "one");
    db.touch(1);
    db.touch(1);
    let meta = db.get_metadata(1).unwrap();
    assert_eq!(meta.recall_count, 2);
    assert!(meta.last_recalled_at > 0);
}
