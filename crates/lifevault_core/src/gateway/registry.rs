//! In-process gateway registry keyed by entity kind.

use super::{
    EntityGateway, SqliteBudgetGateway, SqliteGoalGateway, SqliteNoteGateway, SqliteTaskGateway,
    SqliteTransactionGateway,
};
use crate::model::kind::EntityKind;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Gateway registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateKind(EntityKind),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKind(kind) => write!(f, "gateway already registered for kind: {kind}"),
        }
    }
}

impl Error for RegistryError {}

/// Runtime gateway registry. A kind without a gateway is unsupported.
#[derive(Default)]
pub struct GatewayRegistry {
    gateways: BTreeMap<EntityKind, Arc<dyn EntityGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry wired with the SQLite gateway of every built-in kind.
    pub fn with_builtin() -> Self {
        let mut gateways: BTreeMap<EntityKind, Arc<dyn EntityGateway>> = BTreeMap::new();
        gateways.insert(EntityKind::Note, Arc::new(SqliteNoteGateway));
        gateways.insert(EntityKind::Task, Arc::new(SqliteTaskGateway));
        gateways.insert(EntityKind::Transaction, Arc::new(SqliteTransactionGateway));
        gateways.insert(EntityKind::Budget, Arc::new(SqliteBudgetGateway));
        gateways.insert(EntityKind::Goal, Arc::new(SqliteGoalGateway));
        Self { gateways }
    }

    /// Registers one gateway under the kind it reports.
    pub fn register(&mut self, gateway: Arc<dyn EntityGateway>) -> Result<(), RegistryError> {
        let kind = gateway.kind();
        if self.gateways.contains_key(&kind) {
            return Err(RegistryError::DuplicateKind(kind));
        }
        self.gateways.insert(kind, gateway);
        Ok(())
    }

    pub fn get(&self, kind: EntityKind) -> Option<&dyn EntityGateway> {
        self.gateways.get(&kind).map(|gateway| gateway.as_ref())
    }

    /// Returns registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<EntityKind> {
        self.gateways.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &dyn EntityGateway)> {
        self.gateways
            .iter()
            .map(|(kind, gateway)| (*kind, gateway.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}
