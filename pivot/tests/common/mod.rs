#![allow(dead_code)]

use pivot::{
    BoxError, Calldata, CallerId, ConfigurationId, Module, ModuleHandle, ModuleKey, OperationId,
    Resolver, Storage, testing::operation_ids,
};
use std::sync::Arc;

// ============================================================================
// Identifiers
// ============================================================================

pub fn admin() -> CallerId {
    CallerId::new("admin")
}

pub fn key(name: &str) -> ModuleKey {
    ModuleKey::new(name)
}

pub fn op(name: &str) -> OperationId {
    OperationId::new(name)
}

pub fn equity() -> ConfigurationId {
    ConfigurationId::new("Equity")
}

// ============================================================================
// Test Modules
// ============================================================================

/// A ledger of balances keyed by holder, as written by "v1" of a token.
///
/// `transfer` takes `"from:to:amount"` and replies with the sender's new
/// balance; `mint` takes `"to:amount"`.
pub struct LedgerModule {
    pub name: &'static str,
    /// Fee deducted on every transfer; `0` for the first release.
    pub fee: u64,
}

impl LedgerModule {
    fn balance(storage: &dyn Storage, holder: &str) -> u64 {
        storage
            .load(&format!("balance/{holder}"))
            .and_then(|bytes| Calldata::new(bytes).to_u64())
            .unwrap_or(0)
    }

    fn set_balance(storage: &dyn Storage, holder: &str, value: u64) {
        storage.store(&format!("balance/{holder}"), Calldata::from_u64(value).into_inner());
    }
}

impl Module for LedgerModule {
    fn name(&self) -> &str {
        self.name
    }

    fn operations(&self) -> Vec<OperationId> {
        operation_ids(["transfer", "mint", "balanceOf"])
    }

    async fn invoke(
        &self,
        storage: &dyn Storage,
        operation: &OperationId,
        args: Calldata,
    ) -> Result<Calldata, BoxError> {
        let text = args.as_utf8().ok_or("arguments must be utf-8")?;
        let parts: Vec<&str> = text.split(':').collect();
        match (operation.as_str(), parts.as_slice()) {
            ("mint", [to, amount]) => {
                let amount: u64 = amount.parse()?;
                let next = Self::balance(storage, to) + amount;
                Self::set_balance(storage, to, next);
                Ok(Calldata::from_u64(next))
            }
            ("transfer", [from, to, amount]) => {
                let amount: u64 = amount.parse()?;
                let debit = amount + self.fee;
                let balance = Self::balance(storage, from);
                if balance < debit {
                    return Err("insufficient balance".into());
                }
                Self::set_balance(storage, from, balance - debit);
                Self::set_balance(storage, to, Self::balance(storage, to) + amount);
                Ok(Calldata::from_u64(balance - debit))
            }
            ("balanceOf", [holder]) => Ok(Calldata::from_u64(Self::balance(storage, holder))),
            _ => Err(format!("bad call to {operation}: {text}").into()),
        }
    }
}

/// Compliance checks that only exist from the second release on.
pub struct ComplianceModule;

impl Module for ComplianceModule {
    fn name(&self) -> &str {
        "compliance"
    }

    fn operations(&self) -> Vec<OperationId> {
        operation_ids(["freeze", "isFrozen"])
    }

    async fn invoke(
        &self,
        storage: &dyn Storage,
        operation: &OperationId,
        args: Calldata,
    ) -> Result<Calldata, BoxError> {
        let holder = args.as_utf8().ok_or("arguments must be utf-8")?;
        let slot = format!("frozen/{holder}");
        match operation.as_str() {
            "freeze" => {
                storage.store(&slot, vec![1]);
                Ok(Calldata::empty())
            }
            _ => Ok(Calldata::from_u64(u64::from(storage.load(&slot).is_some()))),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub struct Deployment {
    pub resolver: Arc<Resolver>,
    pub ledger_v1: ModuleHandle,
    pub ledger_v2: ModuleHandle,
    pub compliance: ModuleHandle,
}

/// Two global versions and two versions of "Equity":
///
/// - global v1: `ledger` -> ledger v1
/// - global v2: `ledger` -> ledger v2 (fee 1), `compliance` -> compliance
/// - Equity v1: ledger@1
/// - Equity v2: ledger@2, compliance@2
pub fn deployment() -> Deployment {
    let resolver = Arc::new(Resolver::default());
    let ledger_v1 = ModuleHandle::new(LedgerModule {
        name: "ledger-v1",
        fee: 0,
    });
    let ledger_v2 = ModuleHandle::new(LedgerModule {
        name: "ledger-v2",
        fee: 1,
    });
    let compliance = ModuleHandle::new(ComplianceModule);

    resolver
        .register_modules(&admin(), vec![(key("ledger"), ledger_v1.clone())])
        .unwrap();
    resolver
        .register_modules(
            &admin(),
            vec![
                (key("ledger"), ledger_v2.clone()),
                (key("compliance"), compliance.clone()),
            ],
        )
        .unwrap();
    resolver
        .create_configuration_batch(&admin(), &equity(), vec![(key("ledger"), 1)], true)
        .unwrap();
    resolver
        .create_configuration_batch(
            &admin(),
            &equity(),
            vec![(key("ledger"), 2), (key("compliance"), 2)],
            true,
        )
        .unwrap();

    Deployment {
        resolver,
        ledger_v1,
        ledger_v2,
        compliance,
    }
}
