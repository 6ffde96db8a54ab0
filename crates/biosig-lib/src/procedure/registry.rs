use super::{Procedure, ProcedureModule};
use crate::error::{Error, Result};
use crate::procedures;
use log::info;
use std::collections::BTreeMap;

/// Builds the description of one procedure.
pub type ProcedureFactory = fn() -> ProcedureModule;

/// Name → factory table, filled once at start-up.
#[derive(Debug, Clone, Default)]
pub struct ProcedureRegistry {
    factories: BTreeMap<String, ProcedureFactory>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every procedure shipped with the crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, factory) in procedures::BUILTINS {
            registry.register(*name, *factory);
        }
        registry
    }

    /// Add a factory, returning the one previously registered under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: ProcedureFactory,
    ) -> Option<ProcedureFactory> {
        self.factories.insert(name.into(), factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Resolve `name` and validate the module it yields.
    ///
    /// Any contract problem surfaces here, before a dataset is touched.
    pub fn import_procedure(&self, name: &str) -> Result<Procedure> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::contract(name, "no procedure registered under this name"))?;
        let mut module = factory();
        if module.name.is_empty() {
            module.name = name.to_string();
        }
        let procedure = Procedure::from_module(module)?;
        info!(
            "imported procedure '{}' ({}) with {} default arguments",
            procedure.name(),
            procedure.kind(),
            procedure.default_arguments().len()
        );
        Ok(procedure)
    }
}
