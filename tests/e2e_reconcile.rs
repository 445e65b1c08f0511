//! End-to-end tests for canonical membership resync.
//!
//! Canonical members come from the relationship payload cache; the live
//! list is resynced with `MembershipList::flush_canonical` and observers
//! see one `ChangeRegion` per resync.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use relcache::{
    change_region, reconcile, ChangeEvent, ChangeRegion, EntityRef, InverseSpec, MemorySchema,
    MemoryStore, MembershipList, NullSink, RelationshipPayloadCache,
};
use serde_json::json;

fn comment(id: &str) -> EntityRef {
    EntityRef::new("comment", id)
}

fn setup() -> (RelationshipPayloadCache, Arc<MemoryStore>) {
    let schema = MemorySchema::builder()
        .has_many("post", "comments", "comment", InverseSpec::Infer)
        .belongs_to("comment", "post", "post", InverseSpec::Infer)
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new());
    let cache = RelationshipPayloadCache::new(Arc::new(schema), store.clone());
    (cache, store)
}

fn membership_regions(store: &MemoryStore) -> Vec<ChangeRegion> {
    store
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            ChangeEvent::Membership { region, .. } => Some(region),
            _ => None,
        })
        .collect()
}

// ============================================================================
// 1. Diff
// ============================================================================

#[test]
fn test_single_substitution_region() {
    let old = ["a", "b", "c", "d"];
    let new = ["a", "x", "c", "d"];
    assert_eq!(change_region(&old, &new), Some(ChangeRegion::new(1, 1, 1)));
}

#[test]
fn test_identical_lists_have_no_region() {
    let same = ["a", "b"];
    assert_eq!(change_region(&same, &same), None);
    assert_eq!(reconcile(&same, &same, |_| false).change, None);
}

#[test]
fn test_local_member_survives_resync() {
    let current = ["a", "b", "local"];
    let canonical = ["a", "c"];

    let out = reconcile(&current, &canonical, |m| *m == "local");

    assert_eq!(out.members, vec!["a", "c", "local"]);
    assert_eq!(out.change, Some(ChangeRegion::new(1, 1, 1)));
}

// ============================================================================
// 2. Membership lists fed from the cache
// ============================================================================

#[test]
fn test_membership_follows_cache() {
    let (cache, store) = setup();
    cache
        .push(
            "post",
            1u64,
            &json!({ "comments": { "data": [{ "type": "comment", "id": 1 }, { "type": "comment", "id": 2 }] } }),
        )
        .unwrap();

    let mut list = MembershipList::new(EntityRef::new("post", "1"), "comments");
    assert!(cache.refresh_canonical(&mut list).unwrap());
    assert_eq!(list.flush_canonical(&*store, &*store), Some(ChangeRegion::new(0, 0, 2)));
    assert_eq!(list.members(), &[comment("1"), comment("2")]);

    // A locally created comment the server has not seen yet.
    store.create_local(comment("9"));
    list.add_members(vec![comment("9")], None, &*store);

    // Another comment arrives from the server side of the relationship.
    cache
        .push("comment", 3u64, &json!({ "post": { "data": { "type": "post", "id": 1 } } }))
        .unwrap();
    assert!(cache.refresh_canonical(&mut list).unwrap());
    assert_eq!(list.canonical(), &[comment("1"), comment("2"), comment("3")]);

    let region = list.flush_canonical(&*store, &*store);
    assert_eq!(region, Some(ChangeRegion::new(2, 0, 1)));
    assert_eq!(list.members(), &[comment("1"), comment("2"), comment("3"), comment("9")]);

    assert_eq!(
        membership_regions(&store),
        vec![ChangeRegion::new(0, 0, 2), ChangeRegion::new(2, 0, 1), ChangeRegion::new(2, 0, 1)]
    );
}

#[test]
fn test_acknowledged_and_deleted_members() {
    let (cache, store) = setup();
    let mut list = MembershipList::new(EntityRef::new("post", "1"), "comments");
    list.set_canonical(vec![comment("1"), comment("2"), comment("3")]);
    list.flush_canonical(&*store, &NullSink);
    store.create_local(comment("9"));
    list.add_members(vec![comment("9")], None, &NullSink);

    // The server confirms comment 9 and drops comment 2.
    store.acknowledge(&comment("9"));
    cache
        .push(
            "post",
            1u64,
            &json!({
                "comments": {
                    "data": [
                        { "type": "comment", "id": 1 },
                        { "type": "comment", "id": 3 },
                        { "type": "comment", "id": 9 }
                    ],
                    "meta": { "total": 3 }
                }
            }),
        )
        .unwrap();
    cache.refresh_canonical(&mut list).unwrap();
    assert_eq!(list.meta(), Some(&json!({ "total": 3 })));

    let region = list.flush_canonical(&*store, &*store);
    assert_eq!(region, Some(ChangeRegion::new(1, 1, 0)));
    assert_eq!(list.members(), &[comment("1"), comment("3"), comment("9")]);

    // Soft-deleted members leave the live list before the server agrees.
    store.soft_delete(comment("3"));
    let region = list.flush_canonical(&*store, &*store);
    assert_eq!(region, Some(ChangeRegion::new(1, 1, 0)));
    assert_eq!(list.members(), &[comment("1"), comment("9")]);

    // Nothing left to change.
    assert_eq!(list.flush_canonical(&*store, &*store), None);
}

#[test]
fn test_refresh_without_entry() {
    let (cache, _) = setup();
    let mut list = MembershipList::new(EntityRef::new("post", "7"), "comments");
    assert!(!cache.refresh_canonical(&mut list).unwrap());
    assert!(list.canonical().is_empty());
    assert!(cache.canonical_members("post", 7u64, "comments").unwrap().is_empty());
}

#[test]
fn test_remove_members_ignores_absent() {
    let store = MemoryStore::new();
    let mut list = MembershipList::new(EntityRef::new("post", "1"), "comments");
    list.add_members(vec![comment("1"), comment("2")], None, &store);

    assert_eq!(list.remove_members(&[comment("5"), comment("1")], &store), 1);
    assert_eq!(list.members(), &[comment("2")]);
    assert_eq!(membership_regions(&store), vec![ChangeRegion::new(0, 0, 2), ChangeRegion::new(0, 1, 0)]);
}
