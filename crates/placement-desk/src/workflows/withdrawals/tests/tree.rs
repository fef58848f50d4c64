use super::common::*;
use crate::workflows::withdrawals::builder::WithdrawableTreeBuilder;
use crate::workflows::withdrawals::domain::{EntityKind, EntityRef};
use crate::workflows::withdrawals::state::BlockingReason;
use crate::workflows::withdrawals::tree::WithdrawableTreeNode;

fn build(directory: &MemoryDirectory, target: EntityRef) -> WithdrawableTreeNode {
    let user = manager();
    let policy = StubPolicy::allowing();
    WithdrawableTreeBuilder::new(directory, &policy, &user)
        .build(&target)
        .expect("tree builds")
}

fn application_target(id_value: &str) -> EntityRef {
    EntityRef::new(EntityKind::Application, id(id_value))
}

#[test]
fn builds_the_full_chain_in_pre_order() {
    let directory = MemoryDirectory::default();
    seed_chain(&directory);

    let tree = build(&directory, application_target("app-1"));

    let kinds: Vec<EntityKind> = tree.flatten().iter().map(|node| node.entity.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::Application,
            EntityKind::PlacementRequest,
            EntityKind::MatchRequest,
            EntityKind::Booking,
        ]
    );
    assert_eq!(tree.descendants().len(), 3);
    assert!(tree
        .flatten()
        .iter()
        .all(|node| node.owner_application_id == id("app-1")));
}

#[test]
fn missing_relationships_produce_no_children() {
    let directory = MemoryDirectory::default();
    directory.add_application(application("app-1"));
    directory.add_placement_request(placement_request("pr-1", "app-1"));

    let tree = build(&directory, application_target("app-1"));

    assert_eq!(tree.children.len(), 1);
    assert!(tree.children[0].children.is_empty(), "no match request yet");
}

#[test]
fn superseded_and_unsubmitted_requests_are_excluded() {
    let directory = MemoryDirectory::default();
    directory.add_application(application("app-1"));
    directory.add_placement_request(placement_request("pr-1", "app-1"));
    let mut superseded = placement_request("pr-2", "app-1");
    superseded.superseded = true;
    directory.add_placement_request(superseded);
    let mut draft = placement_request("pr-3", "app-1");
    draft.submitted_at = None;
    directory.add_placement_request(draft);

    let tree = build(&directory, application_target("app-1"));

    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].entity.id, id("pr-1"));
}

#[test]
fn implicit_match_request_appears_as_a_direct_child() {
    let directory = MemoryDirectory::default();
    let mut legacy = application("app-1");
    legacy.arrival_date = Some(arrival());
    directory.add_application(legacy);
    directory.add_placement_request(placement_request("pr-1", "app-1"));
    directory.add_match_request(match_request("mr-implicit", "app-1", None));

    let tree = build(&directory, application_target("app-1"));

    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.children[0].entity.kind, EntityKind::PlacementRequest);
    assert_eq!(tree.children[1].entity.kind, EntityKind::MatchRequest);
    assert_eq!(tree.children[1].entity.id, id("mr-implicit"));
}

#[test]
fn transfer_chains_list_every_booking_under_the_match_request() {
    let directory = MemoryDirectory::default();
    seed_chain(&directory);
    let mut transfer = booking("bk-2", "app-1", "mr-1");
    transfer.transferred_from = Some(id("bk-1"));
    directory.add_booking(transfer);

    let tree = build(&directory, application_target("app-1"));

    let match_node = &tree.children[0].children[0];
    assert_eq!(match_node.children.len(), 2);
    assert_eq!(match_node.children[0].entity.id, id("bk-1"));
    assert_eq!(match_node.children[1].entity.id, id("bk-2"));
}

#[test]
fn building_twice_yields_identical_trees() {
    let directory = MemoryDirectory::default();
    seed_chain(&directory);

    let first = build(&directory, application_target("app-1"));
    let second = build(&directory, application_target("app-1"));
    assert_eq!(first, second);
}

#[test]
fn blocking_bubbles_to_every_ancestor() {
    let directory = MemoryDirectory::default();
    directory.add_application(application("app-1"));
    directory.add_placement_request(placement_request("pr-1", "app-1"));
    directory.add_match_request(match_request("mr-1", "app-1", Some("pr-1")));
    let mut arrived = booking("bk-1", "app-1", "mr-1");
    arrived.arrival_recorded = true;
    directory.add_booking(arrived);

    let tree = build(&directory, application_target("app-1"));

    assert!(tree.is_blocked());
    assert!(tree.children[0].is_blocked());
    assert!(tree.children[0].children[0].is_blocked());
    let leaf = &tree.children[0].children[0].children[0];
    assert!(leaf.is_blocked());
    assert_eq!(
        leaf.state.blocking_reason,
        Some(BlockingReason::ArrivalRecorded)
    );
}

#[test]
fn unblocked_chain_reports_no_blocking() {
    let directory = MemoryDirectory::default();
    seed_chain(&directory);

    let tree = build(&directory, application_target("app-1"));
    assert!(!tree.is_blocked());
    assert!(tree.blocking_reasons().is_empty());
    assert!(tree.notes().is_empty());
}

#[test]
fn notes_deduplicate_blocking_reasons() {
    let directory = MemoryDirectory::default();
    directory.add_application(application("app-1"));
    directory.add_placement_request(placement_request("pr-1", "app-1"));
    directory.add_match_request(match_request("mr-1", "app-1", Some("pr-1")));
    for booking_id in ["bk-1", "bk-2"] {
        let mut arrived = booking(booking_id, "app-1", "mr-1");
        arrived.arrival_recorded = true;
        directory.add_booking(arrived);
    }
    let mut non_arrival = booking("bk-3", "app-1", "mr-1");
    non_arrival.non_arrival_confirmed = true;
    directory.add_booking(non_arrival);

    let tree = build(&directory, application_target("app-1"));

    assert_eq!(tree.blocking_reasons().len(), 2);
    let notes = tree.notes();
    assert_eq!(notes.len(), 2);
    assert!(notes
        .contains(&"1 or more placements cannot be withdrawn as they have an arrival"));
}

#[test]
fn render_lists_one_line_per_node() {
    let directory = MemoryDirectory::default();
    seed_chain(&directory);

    let tree = build(&directory, application_target("app-1"));
    let rendered = tree.render();

    assert_eq!(rendered.lines().count(), 4);
    assert!(rendered.starts_with("application app-1"));
    assert!(rendered.contains("  placement_request pr-1"));
    assert!(rendered.contains("      booking bk-1"));
}

#[test]
fn build_for_a_placement_request_scopes_to_its_subtree() {
    let directory = MemoryDirectory::default();
    seed_chain(&directory);
    directory.add_placement_request(placement_request("pr-2", "app-1"));
    directory.add_match_request(match_request("mr-2", "app-1", Some("pr-2")));

    let tree = build(
        &directory,
        EntityRef::new(EntityKind::PlacementRequest, id("pr-1")),
    );

    assert_eq!(tree.entity.id, id("pr-1"));
    let ids: Vec<&str> = tree
        .flatten()
        .iter()
        .map(|node| node.entity.id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["pr-1", "mr-1", "bk-1"]);
}
