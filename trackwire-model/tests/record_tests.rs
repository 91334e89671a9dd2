mod common;

use common::{TestContext, group, remote_user, user_type};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use trackwire_model::{Collection, Error, Identity, NOT_SET, Record, RecordState, Value};

// ── Construction ────────────────────────────────────────────────

#[test]
fn new_record_values_are_local() {
    let user = Record::new(user_type(), [("username", Value::from("bob"))], None).unwrap();
    let username = user.attribute("username").unwrap();

    assert_eq!(username.get_local_value(&user), Value::from("bob"));
    assert_eq!(username.get_remote_value(&user), NOT_SET);
}

#[test]
fn reconstructed_record_values_are_remote_without_defaults() {
    let user = Record::reconstruct(
        user_type(),
        [("id", Value::from("u1")), ("username", Value::from("bob"))],
        None,
    )
    .unwrap();

    let username = user.attribute("username").unwrap();
    assert_eq!(username.get_remote_value(&user), Value::from("bob"));
    assert_eq!(username.get_local_value(&user), NOT_SET);

    let is_active = user.attribute("is_active").unwrap();
    assert_eq!(is_active.get_local_value(&user), NOT_SET);
    assert_eq!(is_active.get_remote_value(&user), NOT_SET);
    assert!(!user.is_modified());
}

#[test]
fn new_record_starts_with_empty_collection() {
    let user = Record::new(user_type(), [("username", Value::from("bob"))], None).unwrap();
    let groups = user.get("groups").unwrap();
    let groups = groups.as_collection().unwrap();
    assert!(groups.is_empty());
    assert_eq!(groups.attribute(), "groups");
}

#[test]
fn unknown_keys_are_ignored() {
    let user = Record::new(
        user_type(),
        [("username", Value::from("bob")), ("shoe_size", Value::from(42))],
        None,
    )
    .unwrap();
    assert!(user.attribute("shoe_size").is_err());
    assert_eq!(user.get("username").unwrap(), Value::from("bob"));
}

#[test]
fn reconstruction_accepts_server_values_of_any_shape() {
    let user = Record::reconstruct(
        user_type(),
        [("id", Value::from("u1")), ("manager", Value::from("u2"))],
        None,
    )
    .unwrap();
    let manager = user.attribute("manager").unwrap();
    assert_eq!(manager.get_remote_value(&user), Value::from("u2"));

    let err = Record::new(
        user_type(),
        [("id", Value::from("u3")), ("manager", Value::from("u2"))],
        None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

#[test]
fn missing_primary_key_fails_construction() {
    let err = Record::reconstruct(user_type(), [("username", Value::from("bob"))], None)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingPrimaryKey { ref attribute, .. } if attribute == "id"
    ));
}

#[test]
fn null_primary_key_fails_construction() {
    let err = Record::reconstruct(user_type(), [("id", Value::Null)], None).unwrap_err();
    assert!(matches!(err, Error::MissingPrimaryKey { .. }));
}

#[test]
fn new_record_registers_as_created() {
    let context = TestContext::new();
    let user = Record::new(
        user_type(),
        [("username", Value::from("bob"))],
        context.handle(),
    )
    .unwrap();
    assert_eq!(user.state(), Some(RecordState::Created));
}

#[test]
fn reconstructed_record_has_no_state() {
    let context = TestContext::new();
    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();
    assert_eq!(user.state(), None);
}

// ── Identity ────────────────────────────────────────────────────

#[test]
fn identity_from_type_and_primary_key() {
    let user = remote_user("u1");
    assert_eq!(
        user.identity().unwrap(),
        Identity::new("User", vec!["u1".to_string()])
    );
    assert_eq!(user.primary_key().unwrap().get("id"), Some("u1"));
}

#[test]
fn records_with_same_identity_are_equal() {
    let a = remote_user("u1");
    let b = remote_user("u1");
    let c = remote_user("u2");

    assert_eq!(a, b);
    assert!(!a.ptr_eq(&b));
    assert_ne!(a, c);
}

#[test]
fn hash_follows_identity() {
    let mut set = HashSet::new();
    set.insert(remote_user("u1"));
    set.insert(remote_user("u1"));
    set.insert(remote_user("u2"));
    assert_eq!(set.len(), 2);
}

#[test]
fn clones_share_slots() {
    let user = remote_user("u1");
    let alias = user.clone();
    alias.set("email", "x@y.z").unwrap();
    assert!(user.ptr_eq(&alias));
    assert_eq!(user.get("email").unwrap(), Value::from("x@y.z"));
}

#[test]
fn display_shows_identity() {
    assert_eq!(remote_user("u1").to_string(), "User(u1)");
}

// ── Mapping interface ───────────────────────────────────────────

#[test]
fn keys_follow_declaration_order() {
    let user = remote_user("u1");
    let keys: Vec<&str> = user.keys().collect();
    assert_eq!(keys, vec!["id", "username", "email", "is_active", "manager", "groups"]);
    assert_eq!(user.len(), 6);
}

#[test]
fn get_unknown_attribute_fails() {
    let err = remote_user("u1").get("nope").unwrap_err();
    assert!(matches!(err, Error::UnknownAttribute { .. }));
}

#[test]
fn remove_reverts_to_remote_value() {
    let user = Record::reconstruct(
        user_type(),
        [("id", Value::from("u1")), ("email", Value::from("old@x.com"))],
        None,
    )
    .unwrap();
    user.set("email", "new@x.com").unwrap();
    assert_eq!(user.get("email").unwrap(), Value::from("new@x.com"));

    user.remove("email").unwrap();
    assert_eq!(user.get("email").unwrap(), Value::from("old@x.com"));
}

#[test]
fn clear_resets_every_local_value() {
    let user = Record::new(user_type(), [("username", Value::from("bob"))], None).unwrap();
    assert!(user.is_modified());
    user.clear();
    assert!(!user.is_modified());
}

#[test]
fn items_pairs_names_with_values() {
    let user = Record::reconstruct(
        user_type(),
        [("id", Value::from("u1")), ("username", Value::from("bob"))],
        None,
    )
    .unwrap();
    let items = user.items().unwrap();
    assert_eq!(items[0], ("id".to_string(), Value::from("u1")));
    assert_eq!(items[1], ("username".to_string(), Value::from("bob")));
    assert_eq!(items[2], ("email".to_string(), NOT_SET));
}

#[test]
fn values_populate_unset_scalars_in_one_call() {
    let context = TestContext::new();
    context.auto_populate.set(true);
    context.serve("username", "bob");
    context.serve("email", "bob@x.com");

    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();
    let values = user.values().unwrap();

    assert_eq!(values[1], Value::from("bob"));
    assert_eq!(values[2], Value::from("bob@x.com"));

    let calls = context.populate_calls.borrow();
    assert_eq!(
        calls[0],
        vec!["username".to_string(), "email".to_string(), "is_active".to_string()]
    );
}

// ── Lifecycle through writes ────────────────────────────────────

#[test]
fn writing_clean_record_marks_modified() {
    let context = TestContext::new();
    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();
    user.set("email", "a@b.c").unwrap();
    assert_eq!(user.state(), Some(RecordState::Modified));
}

#[test]
fn writing_created_record_stays_created() {
    let context = TestContext::new();
    let user = Record::new(user_type(), [("username", Value::from("bob"))], context.handle())
        .unwrap();
    user.set("email", "bob@x.com").unwrap();
    assert_eq!(user.state(), Some(RecordState::Created));
}

#[test]
fn clearing_to_sentinel_does_not_mark_modified() {
    let context = TestContext::new();
    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();
    user.set("email", NOT_SET).unwrap();
    assert_eq!(user.state(), None);
}

#[test]
fn writing_deleted_record_fails() {
    let context = TestContext::new();
    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();
    trackwire_model::RecordContext::transition(&*context, &user, RecordState::Deleted).unwrap();

    let err = user.set("email", "a@b.c").unwrap_err();
    assert!(matches!(err, Error::InvalidStateTransition { .. }));
    assert_eq!(user.get("email").unwrap(), NOT_SET);
}

#[test]
fn failed_immutable_write_leaves_state_clean() {
    let context = TestContext::new();
    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();
    assert!(user.set("id", "u2").is_err());
    assert_eq!(user.state(), None);
}

#[test]
fn detached_after_context_dropped() {
    let context = TestContext::new();
    let user = Record::new(user_type(), [("username", Value::from("bob"))], context.handle())
        .unwrap();
    drop(context);
    assert!(user.context().is_none());
    assert_eq!(user.state(), None);
    user.set("email", "still@works.com").unwrap();
}

#[test]
fn collection_values_compare_by_identity_set() {
    let user = remote_user("u1");
    user.set(
        "groups",
        Collection::new("groups", true, vec![group("g1"), group("g2")]),
    )
    .unwrap();
    let expected = Value::Collection(Collection::new("groups", true, vec![group("g2"), group("g1")]));
    assert_eq!(user.get("groups").unwrap(), expected);
}
