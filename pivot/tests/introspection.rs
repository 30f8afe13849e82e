//! Read-only views over registries and pinned dispatchers.

mod common;

use common::{admin, deployment, equity, key, op};
use pivot::{ConfigurationId, Dispatcher, Page};

#[test]
fn test_dispatcher_views_follow_the_pin() {
    let deployment = deployment();
    let token = Dispatcher::default();
    token
        .initialize(&admin(), deployment.resolver.clone(), "Equity", 1)
        .unwrap();

    assert_eq!(token.count_resolvable_operations(), 3);
    assert_eq!(token.count_implementations(), 1);
    assert!(!token.supports_operation(&op("freeze")));
    assert!(token.implementation_operations(&deployment.compliance).is_empty());

    token.update_config_version(&admin(), 2).unwrap();

    assert_eq!(token.count_resolvable_operations(), 5);
    assert_eq!(
        token.resolvable_operations(Page::new(1, 3)),
        vec![op("freeze"), op("isFrozen")]
    );
    assert_eq!(
        token.implementation_operations(&deployment.compliance),
        vec![op("freeze"), op("isFrozen")]
    );
    assert!(token.implementation_operations(&deployment.ledger_v1).is_empty());

    let target = token.operation_implementation(&op("transfer"));
    assert_eq!(target.key, key("ledger"));
    assert_eq!(target.index, 2);
    assert_eq!(target.handle, deployment.ledger_v2);

    let modules = token.implementations(Page::all());
    let handles: Vec<_> = modules.into_iter().map(|module| module.handle).collect();
    assert_eq!(handles, vec![deployment.ledger_v2.clone(), deployment.compliance.clone()]);
}

#[test]
fn test_registry_views() {
    let deployment = deployment();
    let resolver = &deployment.resolver;

    assert_eq!(resolver.latest_version(), 2);
    assert_eq!(resolver.count_modules(), 2);
    assert_eq!(
        resolver.list_module_keys(Page::all()),
        vec![key("ledger"), key("compliance")]
    );
    assert_eq!(resolver.list_module_keys(Page::new(1, 1)), vec![key("compliance")]);
    assert_eq!(resolver.count_implementations(&key("ledger")), 2);
    assert_eq!(
        resolver.module_implementations(&key("ledger"), Page::new(1, 1)),
        vec![deployment.ledger_v2.clone()]
    );

    assert_eq!(resolver.count_configurations(), 1);
    assert_eq!(resolver.latest_version_by_configuration(&equity()), 2);
    let snapshot = resolver.configuration(&equity(), 2).unwrap();
    assert_eq!(snapshot.version(), 2);
    assert_eq!(snapshot.operation_count(), 5);
    assert_eq!(snapshot.owner(&op("freeze")).unwrap().key, key("compliance"));
    assert!(resolver.configuration(&equity(), 3).is_none());
}

#[test]
fn test_empty_pages_and_unknowns() {
    let deployment = deployment();
    let resolver = &deployment.resolver;
    let unknown = ConfigurationId::new("Unknown");

    assert!(resolver.list_module_keys(Page::new(0, 0)).is_empty());
    assert!(resolver.list_module_keys(Page::new(usize::MAX, 2)).is_empty());
    assert!(resolver.configuration_modules(&unknown, 1, Page::all()).is_empty());
    assert!(resolver.list_configuration_ids(Page::new(4, 4)).is_empty());
    assert!(!resolver.is_blacklisted(&unknown, &op("transfer")));

    let token = Dispatcher::default();
    assert!(token.implementations(Page::all()).is_empty());
    assert!(!token.supports_operation(&op("transfer")));
    assert!(token.implementation_for_operation(&op("transfer")).is_none());
    assert_eq!(resolver.count_blacklist(&equity()), 0);
}
