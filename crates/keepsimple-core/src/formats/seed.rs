use crate::error::{CmsError, Result};
use crate::model::{NODE_VALUE_TYPE, NewNode, Route, TEXT_VALUE_TYPE};
use crate::storage::ContentStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A whole site description, as written by an administrator.
///
/// ```json
/// {
///   "routes": [{ "name": "home", "pattern": "/", "view": "Home" }],
///   "nodes": [{
///     "name": "Home", "type": "Home", "template": "views/home.html",
///     "values": [{ "key": "header", "value": "Header", "type": "node" }]
///   }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedDocument {
    /// Extra value types beyond `text` and `node`.
    #[serde(default)]
    pub value_types: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub nodes: Vec<SeedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub values: Vec<SeedValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedValue {
    pub key: String,
    pub value: String,
    /// Value type name; `text` when omitted.
    #[serde(rename = "type", default = "default_value_type")]
    pub value_type: String,
}

fn default_value_type() -> String {
    TEXT_VALUE_TYPE.to_string()
}

/// What a seed inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub value_types: usize,
    pub nodes: usize,
    pub routes: usize,
}

/// Install the `text` and `node` value types.
pub fn install_default_types<S: ContentStore + ?Sized>(store: &mut S) -> Result<()> {
    store.insert_value_type(TEXT_VALUE_TYPE)?;
    store.insert_value_type(NODE_VALUE_TYPE)?;
    Ok(())
}

impl SeedDocument {
    /// Check the document against `store` without writing anything.
    ///
    /// Every value type must be built in, declared by the document or already
    /// stored; every route must name a node of the document or of the store;
    /// node and route names must be new.
    pub fn validate<S: ContentStore + ?Sized>(&self, store: &S) -> Result<()> {
        let mut value_types: BTreeSet<String> = store
            .value_types()?
            .into_iter()
            .map(|value_type| value_type.name)
            .collect();
        value_types.insert(TEXT_VALUE_TYPE.to_string());
        value_types.insert(NODE_VALUE_TYPE.to_string());
        value_types.extend(self.value_types.iter().cloned());

        let mut nodes = BTreeSet::new();
        for seed in &self.nodes {
            if !nodes.insert(seed.name.as_str()) || store.node_by_name(&seed.name)?.is_some() {
                return Err(CmsError::DuplicateNode(seed.name.clone()));
            }
            if let Some(value) = seed.values.iter().find(|v| !value_types.contains(&v.value_type)) {
                return Err(CmsError::Seed(format!(
                    "node `{}` uses unknown value type `{}`",
                    seed.name, value.value_type
                )));
            }
        }

        let mut routes = BTreeSet::new();
        for route in &self.routes {
            if !routes.insert(route.name.as_str()) || store.route(&route.name)?.is_some() {
                return Err(CmsError::DuplicateRoute(route.name.clone()));
            }
            if !nodes.contains(route.view.as_str()) && store.node_by_name(&route.view)?.is_none() {
                return Err(CmsError::Seed(format!(
                    "route `{}` points at unknown view `{}`",
                    route.name, route.view
                )));
            }
        }
        Ok(())
    }

    /// Insert every value type, node and route of the document.
    ///
    /// The whole document is validated first, so a rejected seed leaves the
    /// store untouched.
    pub fn apply<S: ContentStore + ?Sized>(&self, store: &mut S) -> Result<SeedSummary> {
        self.validate(store)?;
        install_default_types(store)?;
        for name in &self.value_types {
            store.insert_value_type(name)?;
        }

        for seed in &self.nodes {
            let mut node = NewNode::new(&seed.name, &seed.node_type);
            node.template = seed.template.clone();
            node.reference = seed.reference.clone();
            for value in &seed.values {
                let value_type = store.value_type_by_name(&value.value_type)?.ok_or_else(|| {
                    CmsError::Seed(format!(
                        "node `{}` uses unknown value type `{}`",
                        seed.name, value.value_type
                    ))
                })?;
                node = node.with_value(&value.key, &value.value, value_type.id);
            }
            store.insert_node(node)?;
        }

        for route in &self.routes {
            if store.node_by_name(&route.view)?.is_none() {
                return Err(CmsError::Seed(format!(
                    "route `{}` points at unknown view `{}`",
                    route.name, route.view
                )));
            }
            store.insert_route(route.clone())?;
        }

        let summary = SeedSummary {
            value_types: store.value_types()?.len(),
            nodes: self.nodes.len(),
            routes: self.routes.len(),
        };
        tracing::info!(
            value_types = summary.value_types,
            nodes = summary.nodes,
            routes = summary.routes,
            "seed applied"
        );
        Ok(summary)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueKind;
    use crate::storage::{MemoryStore, NodeQuery};

    fn document() -> SeedDocument {
        SeedDocument {
            value_types: vec!["markdown".to_string()],
            routes: vec![Route::new("home", "/", "Home")],
            nodes: vec![
                SeedNode {
                    name: "Home".to_string(),
                    node_type: "View".to_string(),
                    template: Some("views/home.html".to_string()),
                    reference: None,
                    values: vec![
                        SeedValue {
                            key: "header".to_string(),
                            value: "Header".to_string(),
                            value_type: "node".to_string(),
                        },
                        SeedValue {
                            key: "intro".to_string(),
                            value: "*hi*".to_string(),
                            value_type: "markdown".to_string(),
                        },
                    ],
                },
                SeedNode {
                    name: "Header".to_string(),
                    node_type: "Node".to_string(),
                    template: Some("nodes/header.html".to_string()),
                    reference: None,
                    values: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn apply_populates_store() {
        let mut store = MemoryStore::new();
        let summary = document().apply(&mut store).unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                value_types: 3,
                nodes: 2,
                routes: 1
            }
        );
        assert!(store.route("home").unwrap().is_some());

        let home = store.node_by_name("Home").unwrap().unwrap();
        let types = store.value_types().unwrap();
        let header_type = types
            .iter()
            .find(|vt| vt.id == home.values[0].value_type_id)
            .unwrap();
        assert_eq!(header_type.kind(), ValueKind::Node);
    }

    #[test]
    fn unknown_value_type_is_rejected() {
        let mut doc = document();
        doc.value_types.clear();
        let result = doc.apply(&mut MemoryStore::new());
        assert!(matches!(result, Err(CmsError::Seed(_))));
    }

    #[test]
    fn route_to_missing_view_is_rejected() {
        let mut doc = document();
        doc.routes.push(Route::new("about", "/about", "About"));
        let result = doc.apply(&mut MemoryStore::new());
        assert!(matches!(result, Err(CmsError::Seed(msg)) if msg.contains("About")));
    }

    #[test]
    fn rejected_seed_writes_nothing() {
        let mut doc = document();
        doc.routes.push(Route::new("about", "/about", "About"));
        let mut store = MemoryStore::new();

        assert!(doc.apply(&mut store).is_err());
        assert!(store.value_types().unwrap().is_empty());
        assert!(store.nodes(&NodeQuery::new()).unwrap().is_empty());
        assert!(store.routes().unwrap().is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected_up_front() {
        let mut doc = document();
        doc.nodes.push(doc.nodes[1].clone());
        let result = doc.apply(&mut MemoryStore::new());
        assert!(matches!(result, Err(CmsError::DuplicateNode(name)) if name == "Header"));

        let mut store = MemoryStore::new();
        document().apply(&mut store).unwrap();
        let result = SeedDocument {
            routes: vec![Route::new("home", "/home", "Home")],
            ..SeedDocument::default()
        }
        .apply(&mut store);
        assert!(matches!(result, Err(CmsError::DuplicateRoute(name)) if name == "home"));
    }

    #[test]
    fn seed_may_build_on_stored_content() {
        let mut store = MemoryStore::new();
        document().apply(&mut store).unwrap();
        let extra = SeedDocument {
            routes: vec![Route::new("intro", "/intro", "Header")],
            nodes: vec![SeedNode {
                name: "Footer".to_string(),
                node_type: "Node".to_string(),
                template: None,
                reference: None,
                values: vec![SeedValue {
                    key: "body".to_string(),
                    value: "md".to_string(),
                    value_type: "markdown".to_string(),
                }],
            }],
            ..SeedDocument::default()
        };
        assert!(extra.apply(&mut store).is_ok());
    }
}
