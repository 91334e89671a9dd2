//! The session: type registry, identity-map cache, lifecycle tracking and
//! the commit pipeline.

use crate::cache::{self, Cache};
use crate::codec::{self, ENTITY_TYPE_KEY, EncodeStrategy};
use crate::config::SessionConfig;
use crate::instruction::Instruction;
use crate::lifecycle::Buckets;
use crate::query::QueryResult;
use crate::resolver::{SchemaTypeConstructor, TypeConstructor, TypeResolver};
use crate::transport::Transport;
use serde_json::Value as Json;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;
use tracing::{debug, info, warn};
use trackwire_model::{
    Attribute, AttributeKind, Collection, Record, RecordContext, RecordType, Schema, Value,
};
use trackwire_types::{Error, Identity, RecordState, Result};

struct SessionInner {
    config: SessionConfig,
    transport: Box<dyn Transport>,
    types: HashMap<String, Rc<RecordType>>,
    cache: RefCell<Cache>,
    buckets: RefCell<Buckets>,
    auto_populate: Cell<bool>,
    this: Weak<SessionInner>,
}

/// An isolated unit of interaction with a server.
///
/// Cheap to clone; clones share the same cache and pending state. A session
/// is single-threaded and every remote call blocks the caller.
#[derive(Clone)]
pub struct Session(Rc<SessionInner>);

/// Restores the previous auto-populate setting when dropped.
#[must_use = "the previous setting is restored as soon as the guard is dropped"]
pub struct AutoPopulateGuard<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for AutoPopulateGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

impl Session {
    /// Starts a session, building one record type per server schema.
    pub fn new(config: SessionConfig, transport: impl Transport + 'static) -> Result<Session> {
        let constructors: Vec<Box<dyn TypeConstructor>> = vec![Box::new(SchemaTypeConstructor)];
        Self::with_constructors(config, transport, constructors)
    }

    /// Starts a session using custom type constructors.
    ///
    /// Every schema must be claimed by exactly one constructor.
    pub fn with_constructors(
        config: SessionConfig,
        transport: impl Transport + 'static,
        constructors: Vec<Box<dyn TypeConstructor>>,
    ) -> Result<Session> {
        let transport: Box<dyn Transport> = Box::new(transport);

        let results = dispatch(transport.as_ref(), &[Instruction::QuerySchemas])?;
        let schemas: Vec<Schema> = match results.into_iter().next() {
            Some(schemas) => serde_json::from_value(schemas)?,
            None => Vec::new(),
        };
        let types = TypeResolver::new(constructors).resolve(&schemas)?;

        info!(
            server = %config.server_url,
            types = types.len(),
            "Session started"
        );

        let auto_populate = config.auto_populate;
        let inner = Rc::new_cyclic(|this| SessionInner {
            config,
            transport,
            types,
            cache: RefCell::new(Cache::new()),
            buckets: RefCell::new(Buckets::default()),
            auto_populate: Cell::new(auto_populate),
            this: this.clone(),
        });
        Ok(Session(inner))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.0.config
    }

    /// Names of every known record type.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.types.keys().map(String::as_str)
    }

    /// Looks up a record type by name.
    pub fn record_type(&self, entity_type: &str) -> Result<Rc<RecordType>> {
        self.0
            .types
            .get(entity_type)
            .cloned()
            .ok_or_else(|| Error::UnrecognisedEntityType {
                entity_type: entity_type.to_string(),
            })
    }

    // ── Auto-populate ───────────────────────────────────────────

    pub fn auto_populate(&self) -> bool {
        self.0.auto_populate.get()
    }

    pub fn set_auto_populate(&self, auto_populate: bool) {
        self.0.auto_populate.set(auto_populate);
    }

    /// Temporarily sets auto-populate, restoring the previous value when the
    /// returned guard is dropped.
    pub fn auto_populating(&self, auto_populate: bool) -> AutoPopulateGuard<'_> {
        let previous = self.0.auto_populate.replace(auto_populate);
        AutoPopulateGuard {
            flag: &self.0.auto_populate,
            previous,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Records created since the last commit, in creation order.
    pub fn created(&self) -> Vec<Record> {
        self.0.buckets.borrow().created().to_vec()
    }

    pub fn modified(&self) -> Vec<Record> {
        self.0.buckets.borrow().modified().to_vec()
    }

    pub fn deleted(&self) -> Vec<Record> {
        self.0.buckets.borrow().deleted().to_vec()
    }

    pub fn get_state(&self, record: &Record) -> Option<RecordState> {
        self.0.buckets.borrow().state(record)
    }

    /// Moves `record` towards `state`, following the lifecycle rules.
    pub fn set_state(&self, record: &Record, state: RecordState) -> Result<()> {
        self.0.buckets.borrow_mut().transition(record, state)
    }

    /// True if anything is waiting to be committed.
    pub fn has_pending(&self) -> bool {
        !self.0.buckets.borrow().is_empty()
    }

    /// Forgets all pending creations, modifications and deletions.
    ///
    /// Cached records and their local values are kept.
    pub fn reset(&self) {
        let mut buckets = self.0.buckets.borrow_mut();
        if !buckets.created().is_empty() {
            warn!(
                count = buckets.created().len(),
                "Resetting session with pending creations not persisted"
            );
        }
        if !buckets.modified().is_empty() {
            warn!(
                count = buckets.modified().len(),
                "Resetting session with pending modifications not persisted"
            );
        }
        if !buckets.deleted().is_empty() {
            warn!(
                count = buckets.deleted().len(),
                "Resetting session with pending deletions not persisted"
            );
        }
        buckets.clear();
    }

    // ── Records ─────────────────────────────────────────────────

    /// Creates a new record of `entity_type` from `data`.
    ///
    /// The record is registered as created and merged into the cache. If a
    /// record with the same identity is already cached, the cached instance
    /// is returned while the new instance is the one committed.
    pub fn create<I, K>(&self, entity_type: &str, data: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let record_type = self.record_type(entity_type)?;
        let record = Record::new(record_type, data, Some(self.context()))?;
        self.merge(record)
    }

    /// Marks `record` for deletion at the next commit.
    pub fn delete(&self, record: &Record) -> Result<()> {
        self.set_state(record, RecordState::Deleted)
    }

    /// Fetches the record of `entity_type` whose primary key is `key`.
    pub fn get(&self, entity_type: &str, key: impl Into<Value>) -> Result<Option<Record>> {
        let record_type = self.record_type(entity_type)?;
        let key_name = single_key(&record_type)?;

        let key = key.into();
        let key = key.key_string().ok_or_else(|| Error::InvalidValue {
            attribute: key_name.to_string(),
            reason: format!("a {} cannot be used as a primary key", key.type_name()),
        })?;

        let expression = format!("{entity_type} where {key_name} is {}", quote(&key));
        self.query(expression)?.first()
    }

    /// Prepares a query. Nothing is sent until the result is read.
    ///
    /// Expressions that do not start with `select` are prefixed with the
    /// default projections of the type they name.
    pub fn query(&self, expression: impl Into<String>) -> Result<QueryResult> {
        let expression = expression.into();
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(Error::Parse("query expression is empty".to_string()));
        }

        let expression = if expression.starts_with("select") {
            expression.to_string()
        } else {
            let entity_type = expression.split_whitespace().next().unwrap_or(expression);
            let record_type = self.record_type(entity_type)?;
            format!(
                "select {} from {expression}",
                record_type.default_projections().join(", ")
            )
        };

        Ok(QueryResult::new(self.clone(), expression))
    }

    /// Fetches `projections` for every record in `records` in one query.
    ///
    /// Records created but not yet committed have nothing to fetch and are
    /// skipped. All records are expected to share the first record's type.
    pub fn populate(&self, records: &[Record], projections: &[&str]) -> Result<()> {
        let pending: Vec<&Record> = records
            .iter()
            .filter(|record| self.get_state(record) != Some(RecordState::Created))
            .collect();
        let Some(reference) = pending.first() else {
            return Ok(());
        };

        let record_type = reference.type_info();
        let key_name = single_key(record_type)?;
        let keys = pending
            .iter()
            .map(|record| {
                let key = record.primary_key()?;
                Ok(quote(key.get(key_name).unwrap_or_default()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut expression = format!(
            "select {} from {}",
            projections.join(", "),
            record_type.name()
        );
        if let [key] = keys.as_slice() {
            expression.push_str(&format!(" where {key_name} is {key}"));
        } else {
            expression.push_str(&format!(" where {key_name} in ({})", keys.join(", ")));
        }

        debug!(%expression, records = pending.len(), "Populating");
        self.query(expression)?.all()?;
        Ok(())
    }

    pub(crate) fn execute_query(&self, expression: &str) -> Result<Vec<Record>> {
        let instruction = Instruction::Query {
            expression: expression.to_string(),
        };
        let results = self.dispatch(&[instruction])?;

        let rows = results
            .first()
            .and_then(|result| result.get("data"))
            .and_then(Json::as_array)
            .ok_or_else(|| Error::Server(format!("query {expression:?} returned no data")))?;

        rows.iter()
            .map(|row| {
                let record = self.decode_record(row)?;
                self.merge(record)
            })
            .collect()
    }

    // ── Cache ───────────────────────────────────────────────────

    /// Folds `record` into the cache, returning the canonical instance.
    ///
    /// If an instance with the same identity is cached, the remote values
    /// `record` carries are copied onto it; local values of the cached
    /// instance are never touched. Referenced records and collection members
    /// are merged recursively, and replaced by their canonical instances.
    pub fn merge(&self, record: Record) -> Result<Record> {
        let _guard = self.auto_populating(false);
        let mut seen = HashSet::new();
        self.merge_recursive(record, &mut seen)
    }

    fn merge_recursive(&self, record: Record, seen: &mut HashSet<Identity>) -> Result<Record> {
        let key = cache::key(&record)?;
        let existing = self.0.cache.borrow().get(&key);

        let merged = match existing {
            None => self.0.cache.borrow_mut().insert(key.clone(), record.clone()),
            Some(existing) if existing.ptr_eq(&record) => existing,
            Some(existing) => {
                for attribute in record.attributes() {
                    let value = attribute.get_remote_value(&record);
                    if value.is_not_set() {
                        continue;
                    }
                    if let Some(target) = existing.attributes().get(attribute.name()) {
                        target.set_remote_value(&existing, value)?;
                    }
                }
                existing
            }
        };

        if !seen.insert(key) {
            return Ok(merged);
        }

        for attribute in record.attributes() {
            if attribute.get_remote_value(&record).is_not_set() {
                continue;
            }
            let Some(target) = merged.attributes().get(attribute.name()) else {
                continue;
            };
            match target.get_remote_value(&merged) {
                Value::Record(nested) => {
                    let nested = self.merge_recursive(nested, seen)?;
                    target.set_remote_value(&merged, Value::Record(nested))?;
                }
                Value::Collection(collection) => {
                    let collection = self.merge_members(collection, seen)?;
                    target.set_remote_value(&merged, Value::Collection(collection))?;
                }
                _ => {}
            }
        }

        Ok(merged)
    }

    fn merge_members(
        &self,
        mut collection: Collection,
        seen: &mut HashSet<Identity>,
    ) -> Result<Collection> {
        let mutable = collection.is_mutable();
        collection.set_mutable(true);

        let result = (0..collection.len()).try_for_each(|index| {
            let Some(member) = collection.get(index).cloned() else {
                return Ok(());
            };
            let member = self.merge_recursive(member, seen)?;
            collection.set(index, member).map(drop)
        });

        collection.set_mutable(mutable);
        result.map(|()| collection)
    }

    /// Drops `record` from the cache if it is the cached instance.
    fn expunge(&self, record: &Record) {
        let Ok(key) = cache::key(record) else {
            return;
        };
        let mut cache = self.0.cache.borrow_mut();
        if cache.get(&key).is_some_and(|cached| cached.ptr_eq(record)) {
            cache.remove(&key);
        }
    }

    /// The cached instance for `identity`, if any.
    pub fn cached(&self, identity: &Identity) -> Option<Record> {
        self.0.cache.borrow().get(identity)
    }

    pub fn cache_len(&self) -> usize {
        self.0.cache.borrow().len()
    }

    // ── Commit ──────────────────────────────────────────────────

    /// Sends all pending deletions, creations and modifications in one batch.
    ///
    /// On failure nothing is cleared, so the caller may retry. On success,
    /// returned records are merged into the cache, deleted records are
    /// dropped from it and local values of committed records are cleared.
    pub fn commit(&self) -> Result<()> {
        let _guard = self.auto_populating(false);

        let (created, modified, deleted, unpersisted) = {
            let buckets = self.0.buckets.borrow();
            let unpersisted: Vec<Record> = buckets
                .deleted()
                .iter()
                .filter(|record| buckets.is_unpersisted(record))
                .cloned()
                .collect();
            (
                buckets.created().to_vec(),
                buckets.modified().to_vec(),
                buckets.deleted().to_vec(),
                unpersisted,
            )
        };

        let mut batch = Vec::new();

        for record in &deleted {
            if unpersisted.iter().any(|dropped| dropped.ptr_eq(record)) {
                debug!(%record, "Dropping entity created and deleted before commit");
                continue;
            }
            batch.push(Instruction::Delete {
                entity_type: record.record_type().to_string(),
                entity_key: record.primary_key()?.values(),
            });
        }

        for record in &created {
            batch.push(Instruction::Create {
                entity_type: record.record_type().to_string(),
                entity_data: codec::encode_record(record, EncodeStrategy::SetOnly)?,
            });
        }

        for record in &modified {
            if !record.is_modified() {
                debug!(%record, "Skipping update with no modified attributes");
                continue;
            }
            batch.push(Instruction::Update {
                entity_type: record.record_type().to_string(),
                entity_key: record.primary_key()?.values(),
                entity_data: codec::encode_record(record, EncodeStrategy::ModifiedOnly)?,
            });
        }

        if batch.is_empty() {
            debug!("Nothing to commit");
        } else {
            let results = self.dispatch(&batch)?;
            self.apply_results(&batch, &results)?;
        }

        for record in created.iter().chain(&modified) {
            record.clear();
        }
        for record in &unpersisted {
            self.expunge(record);
        }
        self.0.buckets.borrow_mut().clear();
        Ok(())
    }

    fn apply_results(&self, batch: &[Instruction], results: &[Json]) -> Result<()> {
        for (instruction, result) in batch.iter().zip(results) {
            match instruction {
                Instruction::Create { .. } | Instruction::Update { .. } => {
                    let data = result.get("data").unwrap_or(result);
                    if codec::is_entity(data) {
                        let record = self.decode_record(data)?;
                        self.merge(record)?;
                    }
                }
                Instruction::Delete {
                    entity_type,
                    entity_key,
                } => {
                    let identity = Identity::new(entity_type.clone(), entity_key.clone());
                    if self.0.cache.borrow_mut().remove(&identity).is_some() {
                        debug!(%identity, "Expunged deleted entity from cache");
                    }
                }
                Instruction::Query { .. } | Instruction::QuerySchemas => {}
            }
        }
        Ok(())
    }

    // ── Encoding ────────────────────────────────────────────────

    /// Encodes `value` as JSON.
    ///
    /// Only [`EncodeStrategy::All`] may fetch unset attributes.
    pub fn encode(&self, value: &Value, strategy: EncodeStrategy) -> Result<Json> {
        let _guard = self.auto_populating(strategy == EncodeStrategy::All);
        codec::encode_value(value, strategy)
    }

    /// Decodes server JSON, reconstructing any encoded record.
    ///
    /// Decoded records are not merged into the cache.
    pub fn decode(&self, json: &Json) -> Result<Value> {
        if codec::is_entity(json) {
            self.decode_record(json).map(Value::Record)
        } else {
            Ok(Value::from_json(json))
        }
    }

    fn decode_record(&self, json: &Json) -> Result<Record> {
        let Some(map) = json.as_object() else {
            return Err(Error::Server(format!("malformed entity payload: {json}")));
        };
        let entity_type = map
            .get(ENTITY_TYPE_KEY)
            .and_then(Json::as_str)
            .ok_or_else(|| Error::Server(format!("entity payload without type: {json}")))?;
        let record_type = self.record_type(entity_type)?;

        let mut data = Vec::with_capacity(map.len());
        for (name, raw) in map {
            if name == ENTITY_TYPE_KEY {
                continue;
            }
            let value = match record_type.attributes().get(name) {
                Some(attribute) => self.decode_attribute(attribute, raw)?,
                None => Value::from_json(raw),
            };
            data.push((name.clone(), value));
        }

        Record::reconstruct(record_type, data, Some(self.context()))
    }

    fn decode_attribute(&self, attribute: &Attribute, raw: &Json) -> Result<Value> {
        match (attribute.kind(), raw) {
            (AttributeKind::Reference { .. }, raw) if codec::is_entity(raw) => {
                self.decode_record(raw).map(Value::Record)
            }
            (AttributeKind::Collection { .. }, Json::Array(items)) => {
                let members = items
                    .iter()
                    .map(|item| self.decode_record(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Collection(Collection::new(
                    attribute.name(),
                    attribute.is_mutable(),
                    members,
                )))
            }
            (_, raw) => Ok(Value::from_json(raw)),
        }
    }

    // ── Transport ───────────────────────────────────────────────

    fn dispatch(&self, batch: &[Instruction]) -> Result<Vec<Json>> {
        dispatch(self.0.transport.as_ref(), batch)
    }

    fn context(&self) -> Weak<dyn RecordContext> {
        let this: Weak<dyn RecordContext> = self.0.this.clone();
        this
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("server_url", &self.0.config.server_url)
            .field("types", &self.0.types.len())
            .field("cached", &self.cache_len())
            .field("auto_populate", &self.auto_populate())
            .finish()
    }
}

impl RecordContext for SessionInner {
    fn auto_populate(&self) -> bool {
        self.auto_populate.get()
    }

    fn populate(&self, record: &Record, projections: &[&str]) -> Result<()> {
        match self.this.upgrade() {
            Some(inner) => Session(inner).populate(std::slice::from_ref(record), projections),
            None => Ok(()),
        }
    }

    fn transition(&self, record: &Record, target: RecordState) -> Result<()> {
        self.buckets.borrow_mut().transition(record, target)
    }

    fn state(&self, record: &Record) -> Option<RecordState> {
        self.buckets.borrow().state(record)
    }
}

/// Sends `batch` and checks the response for a server-reported exception.
fn dispatch(transport: &dyn Transport, batch: &[Instruction]) -> Result<Vec<Json>> {
    let payload = serde_json::to_value(batch)?;
    let actions: Vec<&str> = batch.iter().map(Instruction::action).collect();

    debug!(?actions, "Calling server");
    let started = Instant::now();
    let response = transport.call(&payload)?;
    debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Call completed"
    );

    if let Some(exception) = response.get("exception") {
        let content = response
            .get("content")
            .and_then(Json::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| exception.to_string());
        return Err(Error::Server(content));
    }

    match response {
        Json::Array(results) => Ok(results),
        other => Err(Error::Server(format!("unexpected response: {other}"))),
    }
}

fn single_key(record_type: &RecordType) -> Result<&str> {
    match record_type.primary_key() {
        [key] => Ok(key),
        _ => Err(Error::CompositePrimaryKey {
            record_type: record_type.name().to_string(),
        }),
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}
