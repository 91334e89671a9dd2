mod common;

use common::{TestContext, group, remote_user, user_type};
use trackwire_model::{Attribute, Collection, DefaultValue, Error, NOT_SET, Record, ScalarKind, Value};

fn new_user(data: Vec<(&str, Value)>) -> Record {
    Record::new(user_type(), data, None).unwrap()
}

// ── Dual-value slots ────────────────────────────────────────────

#[test]
fn local_and_remote_slots_are_independent() {
    let user = remote_user("u1");
    let email = user.attribute("email").unwrap();

    email.set_remote_value(&user, Value::from("remote@x.com")).unwrap();
    assert_eq!(email.get_local_value(&user), NOT_SET);
    assert_eq!(email.get_remote_value(&user), Value::from("remote@x.com"));

    email.set_local_value(&user, Value::from("local@x.com")).unwrap();
    assert_eq!(email.get_remote_value(&user), Value::from("remote@x.com"));
    assert_eq!(email.get_local_value(&user), Value::from("local@x.com"));
}

#[test]
fn local_value_wins_over_remote() {
    let user = remote_user("u1");
    let email = user.attribute("email").unwrap();
    email.set_remote_value(&user, Value::from("remote@x.com")).unwrap();
    email.set_local_value(&user, Value::from("local@x.com")).unwrap();

    assert_eq!(email.get_value(&user).unwrap(), Value::from("local@x.com"));
}

#[test]
fn remote_value_read_when_local_unset() {
    let user = remote_user("u1");
    let email = user.attribute("email").unwrap();
    email.set_remote_value(&user, Value::from("remote@x.com")).unwrap();

    assert_eq!(email.get_value(&user).unwrap(), Value::from("remote@x.com"));
}

#[test]
fn setting_sentinel_clears_local_value() {
    let user = remote_user("u1");
    let email = user.attribute("email").unwrap();
    email.set_remote_value(&user, Value::from("remote@x.com")).unwrap();
    email.set_local_value(&user, Value::from("local@x.com")).unwrap();
    assert!(email.is_modified(&user));

    email.set_local_value(&user, NOT_SET).unwrap();
    assert!(!email.is_modified(&user));
    assert_eq!(email.get_value(&user).unwrap(), Value::from("remote@x.com"));
}

#[test]
fn null_is_a_value_not_the_sentinel() {
    let user = remote_user("u1");
    let email = user.attribute("email").unwrap();
    email.set_local_value(&user, Value::Null).unwrap();

    assert!(email.is_modified(&user));
    assert_eq!(email.get_value(&user).unwrap(), Value::Null);
}

// ── Mutability ──────────────────────────────────────────────────

#[test]
fn writing_immutable_attribute_fails() {
    let user = remote_user("u1");
    let id = user.attribute("id").unwrap();

    let err = id.set_local_value(&user, Value::from("other")).unwrap_err();
    assert!(matches!(err, Error::ImmutableAttribute { attribute } if attribute == "id"));
    assert_eq!(id.get_value(&user).unwrap(), Value::from("u1"));
}

#[test]
fn remote_write_ignores_mutability() {
    let user = remote_user("u1");
    let id = user.attribute("id").unwrap();
    id.set_remote_value(&user, Value::from("u2")).unwrap();
    assert_eq!(id.get_remote_value(&user), Value::from("u2"));
}

#[test]
fn kind_mismatch_is_rejected() {
    let user = remote_user("u1");
    let manager = user.attribute("manager").unwrap();
    let err = manager.set_local_value(&user, Value::from("bob")).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));

    let email = user.attribute("email").unwrap();
    let err = email
        .set_local_value(&user, Value::Record(remote_user("u2")))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidValue { .. }));
}

#[test]
fn reference_and_collection_values_accepted() {
    let user = remote_user("u1");
    user.attribute("manager")
        .unwrap()
        .set_local_value(&user, Value::Record(remote_user("boss")))
        .unwrap();
    user.attribute("groups")
        .unwrap()
        .set_local_value(
            &user,
            Value::Collection(Collection::new("groups", true, vec![group("g1")])),
        )
        .unwrap();

    let manager = user.get("manager").unwrap();
    assert_eq!(manager.as_record().unwrap(), &remote_user("boss"));
}

// ── Defaults ────────────────────────────────────────────────────

#[test]
fn generated_default_is_fresh_per_instance() {
    let a = new_user(vec![("username", Value::from("a"))]);
    let b = new_user(vec![("username", Value::from("b"))]);

    let id_a = a.get("id").unwrap();
    let id_b = b.get("id").unwrap();
    assert!(id_a.is_set());
    assert_ne!(id_a, id_b);
}

#[test]
fn literal_default_applied_as_local_value() {
    let user = new_user(vec![("username", Value::from("a"))]);
    let is_active = user.attribute("is_active").unwrap();
    assert_eq!(is_active.get_local_value(&user), Value::Boolean(true));
    assert_eq!(is_active.get_remote_value(&user), NOT_SET);
}

#[test]
fn default_value_debug_hides_generator() {
    assert_eq!(format!("{:?}", DefaultValue::uid()), "Generate(..)");
    assert_eq!(format!("{:?}", DefaultValue::NotSet), "NotSet");
}

#[test]
fn attribute_builders() {
    let attribute = Attribute::scalar("name", ScalarKind::String).with_mutable(false);
    assert_eq!(attribute.name(), "name");
    assert!(attribute.kind().is_scalar());
    assert!(!attribute.is_mutable());
    assert!(Attribute::reference("parent", "Task").kind().is_reference());
}

// ── Auto-populate ───────────────────────────────────────────────

#[test]
fn get_value_fetches_when_auto_populate_enabled() {
    let context = TestContext::new();
    context.auto_populate.set(true);
    context.serve("email", "fetched@x.com");

    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();

    assert_eq!(user.get("email").unwrap(), Value::from("fetched@x.com"));
    assert_eq!(context.populate_calls.borrow().as_slice(), &[vec!["email".to_string()]]);
}

#[test]
fn get_value_does_not_fetch_when_auto_populate_disabled() {
    let context = TestContext::new();
    context.serve("email", "fetched@x.com");

    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();

    assert_eq!(user.get("email").unwrap(), NOT_SET);
    assert!(context.populate_calls.borrow().is_empty());
}

#[test]
fn fetched_value_lands_in_remote_slot() {
    let context = TestContext::new();
    context.auto_populate.set(true);
    context.serve("username", "bob");

    let user = Record::reconstruct(user_type(), [("id", Value::from("u1"))], context.handle())
        .unwrap();
    user.get("username").unwrap();

    let username = user.attribute("username").unwrap();
    assert_eq!(username.get_remote_value(&user), Value::from("bob"));
    assert!(!username.is_modified(&user));
}
