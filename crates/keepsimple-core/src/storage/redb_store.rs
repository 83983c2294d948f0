//! redb-backed content store.
//!
//! Tables:
//! - `routes`: route name -> postcard(Route)
//! - `nodes`: node id -> postcard(NodeRecord), values embedded
//! - `value_types`: value type id -> postcard(ValueType)
//! - `meta`: id counters

use super::{ContentStore, NodeQuery, check_value_types};
use crate::error::{CmsError, Result};
use crate::model::{NewNode, NodeRecord, Route, ValueType};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

const ROUTES: TableDefinition<&str, &[u8]> = TableDefinition::new("routes");
const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");
const VALUE_TYPES: TableDefinition<u64, &[u8]> = TableDefinition::new("value_types");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_NODE_ID: &str = "next_node_id";
const NEXT_VALUE_TYPE_ID: &str = "next_value_type_id";

/// Content store persisted in a single redb file.
///
/// Clones share the same open database.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open the database at `path`, creating the file and tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())?;

        let txn = db.begin_write()?;
        {
            txn.open_table(ROUTES)?;
            txn.open_table(NODES)?;
            txn.open_table(VALUE_TYPES)?;
            txn.open_table(META)?;
        }
        txn.commit()?;

        tracing::debug!(path = %path.as_ref().display(), "opened content database");
        Ok(Self { db: Arc::new(db) })
    }

    fn read_all<K, T>(&self, table: TableDefinition<'_, K, &'static [u8]>) -> Result<Vec<T>>
    where
        K: redb::Key + 'static,
        T: DeserializeOwned,
    {
        let txn = self.db.begin_read()?;
        decode_all(&txn.open_table(table)?)
    }
}

/// Take the next value of the counter `key`, starting at 1.
fn next_id(txn: &WriteTransaction, key: &str) -> Result<u64> {
    let mut meta = txn.open_table(META)?;
    let id = meta.get(key)?.map(|guard| guard.value()).unwrap_or(1);
    meta.insert(key, id.saturating_add(1))?;
    Ok(id)
}

fn decode_all<K, T>(table: &impl ReadableTable<K, &'static [u8]>) -> Result<Vec<T>>
where
    K: redb::Key + 'static,
    T: DeserializeOwned,
{
    let mut out = Vec::new();
    for entry in table.iter()? {
        let (_, bytes) = entry?;
        out.push(postcard::from_bytes(bytes.value())?);
    }
    Ok(out)
}

impl ContentStore for RedbStore {
    fn routes(&self) -> Result<Vec<Route>> {
        self.read_all(ROUTES)
    }

    fn route(&self, name: &str) -> Result<Option<Route>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ROUTES)?;
        match table.get(name)? {
            Some(bytes) => Ok(Some(postcard::from_bytes(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn nodes(&self, query: &NodeQuery) -> Result<Vec<NodeRecord>> {
        let records: Vec<NodeRecord> = self.read_all(NODES)?;
        Ok(records
            .into_iter()
            .filter(|record| query.matches(record))
            .collect())
    }

    fn value_types(&self) -> Result<Vec<ValueType>> {
        self.read_all(VALUE_TYPES)
    }

    fn insert_value_type(&mut self, name: &str) -> Result<u64> {
        let txn = self.db.begin_write()?;
        let id = {
            let existing: Vec<ValueType> = decode_all(&txn.open_table(VALUE_TYPES)?)?;
            if let Some(found) = existing.into_iter().find(|vt| vt.name == name) {
                return Ok(found.id);
            }

            let id = next_id(&txn, NEXT_VALUE_TYPE_ID)?;
            let bytes = postcard::to_allocvec(&ValueType {
                id,
                name: name.to_string(),
            })?;
            txn.open_table(VALUE_TYPES)?.insert(id, bytes.as_slice())?;
            id
        };
        txn.commit()?;
        Ok(id)
    }

    fn insert_route(&mut self, route: Route) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ROUTES)?;
            if table.get(route.name.as_str())?.is_some() {
                return Err(CmsError::DuplicateRoute(route.name));
            }
            let bytes = postcard::to_allocvec(&route)?;
            table.insert(route.name.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn insert_node(&mut self, node: NewNode) -> Result<u64> {
        let txn = self.db.begin_write()?;
        let id = {
            let value_types: Vec<ValueType> = decode_all(&txn.open_table(VALUE_TYPES)?)?;
            check_value_types(&node, &value_types)?;

            let existing: Vec<NodeRecord> = decode_all(&txn.open_table(NODES)?)?;
            if existing.iter().any(|record| record.name == node.name) {
                return Err(CmsError::DuplicateNode(node.name));
            }

            let id = next_id(&txn, NEXT_NODE_ID)?;
            let bytes = postcard::to_allocvec(&node.into_record(id))?;
            txn.open_table(NODES)?.insert(id, bytes.as_slice())?;
            id
        };
        txn.commit()?;
        Ok(id)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NODE_VALUE_TYPE, TEXT_VALUE_TYPE};

    fn temp_store() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("cms.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn empty_database_has_no_rows() {
        let (_dir, store) = temp_store();
        assert!(store.routes().unwrap().is_empty());
        assert!(store.nodes(&NodeQuery::new()).unwrap().is_empty());
        assert!(store.value_types().unwrap().is_empty());
    }

    #[test]
    fn node_with_values_roundtrips() {
        let (_dir, mut store) = temp_store();
        let text = store.insert_value_type(TEXT_VALUE_TYPE).unwrap();
        let node = store.insert_value_type(NODE_VALUE_TYPE).unwrap();

        let id = store
            .insert_node(
                NewNode::new("Home", "View")
                    .with_template("views/home.html")
                    .with_value("title", "Welcome", text)
                    .with_value("header", "Header", node),
            )
            .unwrap();
        assert_eq!(id, 1);

        let record = store.node_by_name("Home").unwrap().unwrap();
        assert_eq!(record.template.as_deref(), Some("views/home.html"));
        assert_eq!(record.values.len(), 2);
        assert_eq!(record.values[1].value_type_id, node);
    }

    #[test]
    fn ids_are_monotonic() {
        let (_dir, mut store) = temp_store();
        let a = store.insert_node(NewNode::new("A", "Node")).unwrap();
        let b = store.insert_node(NewNode::new("B", "Node")).unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn duplicates_are_rejected() {
        let (_dir, mut store) = temp_store();
        store.insert_route(Route::new("home", "/", "Home")).unwrap();
        store.insert_node(NewNode::new("Home", "View")).unwrap();

        assert!(matches!(
            store.insert_route(Route::new("home", "/x", "X")),
            Err(CmsError::DuplicateRoute(_))
        ));
        assert!(matches!(
            store.insert_node(NewNode::new("Home", "View")),
            Err(CmsError::DuplicateNode(_))
        ));
        assert_eq!(store.nodes(&NodeQuery::new()).unwrap().len(), 1);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cms.redb");
        {
            let mut store = RedbStore::open(&path).unwrap();
            store.insert_route(Route::new("home", "/", "Home")).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        let route = store.route("home").unwrap();
        assert_eq!(route.map(|r| r.view), Some("Home".to_string()));
    }
}
