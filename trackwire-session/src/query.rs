use crate::Session;
use std::cell::RefCell;
use std::fmt;
use trackwire_model::Record;
use trackwire_types::{Error, Result};

/// A query that runs on first access.
///
/// Results are merged into the session cache when fetched and kept, so
/// repeated access does not call the server again.
pub struct QueryResult {
    session: Session,
    expression: String,
    records: RefCell<Option<Vec<Record>>>,
}

impl QueryResult {
    pub(crate) fn new(session: Session, expression: String) -> Self {
        Self {
            session,
            expression,
            records: RefCell::new(None),
        }
    }

    /// The expression sent to the server, projections included.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// True once the query has run.
    pub fn is_fetched(&self) -> bool {
        self.records.borrow().is_some()
    }

    /// All matching records.
    pub fn all(&self) -> Result<Vec<Record>> {
        if let Some(records) = self.records.borrow().as_ref() {
            return Ok(records.clone());
        }

        let records = self.session.execute_query(&self.expression)?;
        *self.records.borrow_mut() = Some(records.clone());
        Ok(records)
    }

    /// The first matching record, if any.
    pub fn first(&self) -> Result<Option<Record>> {
        Ok(self.all()?.into_iter().next())
    }

    /// Exactly one matching record.
    pub fn one(&self) -> Result<Record> {
        let mut records = self.all()?;
        match records.len() {
            1 => Ok(records.remove(0)),
            0 => Err(Error::NotFound(format!(
                "expected 1 result from {:?}, got none",
                self.expression
            ))),
            count => Err(Error::NotUnique(format!(
                "expected 1 result from {:?}, got {count}",
                self.expression
            ))),
        }
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("expression", &self.expression)
            .field("fetched", &self.is_fetched())
            .finish()
    }
}
