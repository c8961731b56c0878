//! Contract-vs-account classification for the internal transaction listing.
//!
//! Externally-owned accounts get a `value > 0` predicate added to their trace
//! listing (zero-value calls are noise for them); contracts see every call.
//! The classification is a single existence check against the address store,
//! and a failed lookup degrades to the contract treatment with a warning.

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::warn;

use crate::utils::checksum;

/// Existence lookup against the externally maintained address/bytecode store.
/// Empty or missing bytecode means an externally-owned account.
#[async_trait]
pub trait BytecodeSource: Send + Sync {
    async fn has_bytecode(&self, address: Address) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Account,
    Contract,
}

pub async fn classify_address<S>(source: &S, address: Address) -> AddressKind
where
    S: BytecodeSource + ?Sized,
{
    match source.has_bytecode(address).await {
        Ok(true) => AddressKind::Contract,
        Ok(false) => AddressKind::Account,
        Err(e) => {
            warn!(
                "Bytecode lookup failed for {}: {:#}. Treating as contract.",
                checksum(&address),
                e
            );
            AddressKind::Contract
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    struct Fixed(Option<bool>);

    #[async_trait]
    impl BytecodeSource for Fixed {
        async fn has_bytecode(&self, _address: Address) -> anyhow::Result<bool> {
            self.0.ok_or_else(|| anyhow::anyhow!("store unreachable"))
        }
    }

    #[tokio::test]
    async fn classifies_by_bytecode_presence() {
        let addr = address!("52908400098527886E0F7030069857D2E4169EE7");
        assert_eq!(classify_address(&Fixed(Some(true)), addr).await, AddressKind::Contract);
        assert_eq!(classify_address(&Fixed(Some(false)), addr).await, AddressKind::Account);
    }

    #[tokio::test]
    async fn lookup_failure_fails_open_to_contract() {
        let addr = address!("52908400098527886E0F7030069857D2E4169EE7");
        assert_eq!(classify_address(&Fixed(None), addr).await, AddressKind::Contract);
    }
}
