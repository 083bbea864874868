//! Name-keyed connector registry.

use crate::connector::{Connector, ConnectorDecl, ConnectorError, ExportFn, FnConnector, ImportFn};
use crate::properties::Properties;
use crate::table::Table;
use indexmap::IndexMap;

/// Connectors keyed by exact, case-sensitive format name.
///
/// Hosts build one registry at startup (each backend crate exposes a
/// `register_all`) and share it, typically behind an `Arc`.
#[derive(Default)]
pub struct Registry {
    connectors: IndexMap<String, Box<dyn Connector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector under its declared name.
    ///
    /// A second registration under the same name replaces the first.
    pub fn register<C: Connector + 'static>(&mut self, connector: C) {
        let name = connector.decl().name.clone();
        if self.connectors.insert(name.clone(), Box::new(connector)).is_some() {
            tracing::debug!(format = %name, "replaced existing connector");
        }
    }

    /// Register a plain import/export function pair.
    pub fn register_fns(&mut self, name: &str, import: ImportFn, export: ExportFn) {
        self.register(FnConnector::new(ConnectorDecl::new(name), import, export));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connectors.contains_key(name)
    }

    /// Registered format names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connectors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Connector> {
        self.connectors.values().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Dispatch an import to the connector registered as `format`.
    pub fn import(
        &self,
        format: &str,
        table: &mut dyn Table,
        options: &Properties,
    ) -> Result<(), ConnectorError> {
        self.lookup(format)?.import(table, options)
    }

    /// Dispatch an export to the connector registered as `format`.
    pub fn export(
        &self,
        format: &str,
        table: &dyn Table,
        options: &Properties,
    ) -> Result<(), ConnectorError> {
        self.lookup(format)?.export(table, options)
    }

    fn lookup(&self, format: &str) -> Result<&dyn Connector, ConnectorError> {
        self.get(format)
            .ok_or_else(|| ConnectorError::UnknownFormat(format.to_string()))
    }
}
