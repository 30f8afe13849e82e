//! Read-only views of what a dispatcher currently resolves.
//!
//! Every view answers from the pinned configuration version. An unpinned
//! dispatcher, an unknown operation or an out-of-range page yields an empty
//! list or the sentinel; nothing here fails. Blacklisted operations are still
//! listed; use [`Resolver::is_blacklisted`](crate::registry::Resolver::is_blacklisted)
//! to check suppression.

use super::Dispatcher;
use crate::registry::{ConfigurationSnapshot, Implementation};
use pivot_core::{ModuleHandle, OperationId, Page, Storage};
use std::sync::Arc;

impl<S: Storage> Dispatcher<S> {
    fn pinned(&self) -> Option<Arc<ConfigurationSnapshot>> {
        let info = self.config_info()?;
        info.resolver
            .configuration(&info.configuration_id, info.configuration_version)
    }

    /// Operations the pinned configuration can serve, in module order.
    pub fn resolvable_operations(&self, page: Page) -> Vec<OperationId> {
        self.pinned()
            .map(|snapshot| page.collect(snapshot.operations().cloned()))
            .unwrap_or_default()
    }

    /// Number of operations the pinned configuration can serve.
    pub fn count_resolvable_operations(&self) -> usize {
        self.pinned()
            .map_or(0, |snapshot| snapshot.operation_count())
    }

    /// Where `operation` is served from, or the sentinel.
    pub fn operation_implementation(&self, operation: &OperationId) -> Implementation {
        self.pinned()
            .and_then(|snapshot| snapshot.owner(operation).map(Implementation::from))
            .unwrap_or_default()
    }

    /// Operations `handle` serves under the pinned configuration.
    pub fn implementation_operations(&self, handle: &ModuleHandle) -> Vec<OperationId> {
        self.pinned()
            .map(|snapshot| snapshot.operations_of(handle))
            .unwrap_or_default()
    }

    /// Handle serving `operation`, or the sentinel.
    pub fn implementation_for_operation(&self, operation: &OperationId) -> ModuleHandle {
        self.operation_implementation(operation).handle
    }

    /// Modules of the pinned configuration.
    pub fn implementations(&self, page: Page) -> Vec<Implementation> {
        self.pinned()
            .map(|snapshot| {
                page.slice(snapshot.modules())
                    .iter()
                    .map(Implementation::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of modules in the pinned configuration.
    pub fn count_implementations(&self) -> usize {
        self.pinned().map_or(0, |snapshot| snapshot.modules().len())
    }

    /// Whether the pinned configuration assigns `operation` to a module.
    pub fn supports_operation(&self, operation: &OperationId) -> bool {
        self.pinned()
            .is_some_and(|snapshot| snapshot.owner(operation).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::Resolver, testing::EchoModule};
    use pivot_core::{CallerId, ConfigurationId, ModuleKey};

    fn fixture() -> (Arc<Resolver>, ModuleHandle, ModuleHandle) {
        let admin = CallerId::new("admin");
        let resolver = Arc::new(Resolver::default());
        let transfers = ModuleHandle::new(EchoModule::new("transfers", ["transfer", "approve"]));
        let issuance = ModuleHandle::new(EchoModule::new("issuance", ["issue"]));
        resolver
            .register_modules(
                &admin,
                vec![
                    (ModuleKey::new("k1"), transfers.clone()),
                    (ModuleKey::new("k2"), issuance.clone()),
                ],
            )
            .unwrap();
        resolver
            .create_configuration_batch(
                &admin,
                &ConfigurationId::new("Equity"),
                vec![(ModuleKey::new("k1"), 1), (ModuleKey::new("k2"), 1)],
                true,
            )
            .unwrap();
        (resolver, transfers, issuance)
    }

    #[test]
    fn test_views_of_pinned_configuration() {
        let (resolver, transfers, issuance) = fixture();
        let dispatcher = Dispatcher::default();
        dispatcher
            .initialize(&CallerId::new("admin"), resolver, "Equity", 1)
            .unwrap();

        let transfer = OperationId::new("transfer");
        assert_eq!(dispatcher.count_resolvable_operations(), 3);
        assert_eq!(
            dispatcher.resolvable_operations(Page::all()),
            vec![
                OperationId::new("transfer"),
                OperationId::new("approve"),
                OperationId::new("issue"),
            ]
        );
        assert_eq!(
            dispatcher.resolvable_operations(Page::new(1, 2)),
            vec![OperationId::new("issue")]
        );

        let target = dispatcher.operation_implementation(&transfer);
        assert_eq!(target.key, ModuleKey::new("k1"));
        assert_eq!(target.index, 1);
        assert_eq!(target.handle, transfers);
        assert_eq!(dispatcher.implementation_for_operation(&transfer), transfers);
        assert_eq!(
            dispatcher.implementation_operations(&issuance),
            vec![OperationId::new("issue")]
        );

        assert_eq!(dispatcher.count_implementations(), 2);
        let modules = dispatcher.implementations(Page::all());
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[1].handle, issuance);

        assert!(dispatcher.supports_operation(&transfer));
        assert!(!dispatcher.supports_operation(&OperationId::new("burn")));
    }

    #[test]
    fn test_unknowns_yield_sentinels() {
        let (resolver, _, _) = fixture();
        let dispatcher = Dispatcher::default();

        assert!(dispatcher.resolvable_operations(Page::all()).is_empty());
        assert_eq!(dispatcher.count_implementations(), 0);
        assert!(dispatcher
            .operation_implementation(&OperationId::new("transfer"))
            .is_none());

        dispatcher
            .initialize(&CallerId::new("admin"), resolver, "Equity", 1)
            .unwrap();
        let burn = OperationId::new("burn");
        assert!(dispatcher.operation_implementation(&burn).is_none());
        assert!(dispatcher.implementation_for_operation(&burn).is_none());
        assert!(dispatcher
            .implementation_operations(&ModuleHandle::none())
            .is_empty());
        assert!(dispatcher.resolvable_operations(Page::new(0, 0)).is_empty());
        assert!(dispatcher.implementations(Page::new(5, 10)).is_empty());
    }

    #[test]
    fn test_blacklist_is_not_reflected() {
        let (resolver, _, _) = fixture();
        let dispatcher = Dispatcher::default();
        let admin = CallerId::new("admin");
        dispatcher
            .initialize(&admin, resolver.clone(), "Equity", 1)
            .unwrap();
        resolver
            .add_to_blacklist(
                &admin,
                &ConfigurationId::new("Equity"),
                vec![OperationId::new("transfer")],
            )
            .unwrap();
        assert!(dispatcher.supports_operation(&OperationId::new("transfer")));
        assert_eq!(dispatcher.count_resolvable_operations(), 3);
    }
}
