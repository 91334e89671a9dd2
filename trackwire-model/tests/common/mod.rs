#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use trackwire_model::{
    Attribute, DefaultValue, Record, RecordContext, RecordState, RecordType, Result, ScalarKind,
    Value,
};
use trackwire_types::Transition;

/// `User` with a generated id, a few scalars, a manager reference and a
/// groups collection.
pub fn user_type() -> Rc<RecordType> {
    Rc::new(
        RecordType::builder("User")
            .attribute(
                Attribute::scalar("id", ScalarKind::String)
                    .with_mutable(false)
                    .with_default(DefaultValue::uid()),
            )
            .attribute(Attribute::scalar("username", ScalarKind::String))
            .attribute(Attribute::scalar("email", ScalarKind::String))
            .attribute(
                Attribute::scalar("is_active", ScalarKind::Boolean)
                    .with_default(DefaultValue::Value(Value::Boolean(true))),
            )
            .attribute(Attribute::reference("manager", "User"))
            .attribute(Attribute::collection("groups", "Group"))
            .primary_key(["id"])
            .build()
            .unwrap(),
    )
}

pub fn group_type() -> Rc<RecordType> {
    Rc::new(
        RecordType::builder("Group")
            .attribute(Attribute::scalar("id", ScalarKind::String))
            .attribute(Attribute::scalar("name", ScalarKind::String))
            .primary_key(["id"])
            .build()
            .unwrap(),
    )
}

pub fn group(id: &str) -> Record {
    Record::reconstruct(group_type(), [("id", Value::from(id))], None).unwrap()
}

pub fn remote_user(id: &str) -> Record {
    Record::reconstruct(user_type(), [("id", Value::from(id))], None).unwrap()
}

/// In-memory stand-in for a session.
#[derive(Default)]
pub struct TestContext {
    pub auto_populate: Cell<bool>,
    pub states: RefCell<Vec<(Record, RecordState)>>,
    pub server: RefCell<HashMap<String, Value>>,
    pub populate_calls: RefCell<Vec<Vec<String>>>,
}

impl TestContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn handle(self: &Rc<Self>) -> Option<Weak<dyn RecordContext>> {
        let weak: Weak<dyn RecordContext> = Rc::downgrade(self) as Weak<dyn RecordContext>;
        Some(weak)
    }

    pub fn serve(&self, attribute: &str, value: impl Into<Value>) {
        self.server
            .borrow_mut()
            .insert(attribute.to_string(), value.into());
    }
}

impl RecordContext for TestContext {
    fn auto_populate(&self) -> bool {
        self.auto_populate.get()
    }

    fn populate(&self, record: &Record, projections: &[&str]) -> Result<()> {
        self.populate_calls
            .borrow_mut()
            .push(projections.iter().map(|p| p.to_string()).collect());
        for name in projections {
            let served = self.server.borrow().get(*name).cloned();
            if let Some(value) = served {
                record.attribute(name)?.set_remote_value(record, value)?;
            }
        }
        Ok(())
    }

    fn transition(&self, record: &Record, target: RecordState) -> Result<()> {
        let current = self.state(record);
        if RecordState::transition(current, target, record)? == Transition::Move {
            let mut states = self.states.borrow_mut();
            states.retain(|(tracked, _)| !tracked.ptr_eq(record));
            states.push((record.clone(), target));
        }
        Ok(())
    }

    fn state(&self, record: &Record) -> Option<RecordState> {
        self.states
            .borrow()
            .iter()
            .find(|(tracked, _)| tracked.ptr_eq(record))
            .map(|(_, state)| *state)
    }
}
