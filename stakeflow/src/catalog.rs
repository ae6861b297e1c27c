//! Purchasable packages, read once per session.

use tracing::{info, warn};

use crate::contracts::SaleContract;
use crate::error::{FlowError, Result};
use crate::types::Package;

/// Ordered package list of one session.
///
/// Index order is the sale contract's lookup key, so `packages[i].id == i`.
/// Contents never change after `load`; a new session loads a new catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageCatalog {
    packages: Vec<Package>,
    epoch: u64,
}

impl PackageCatalog {
    /// An empty catalog not tied to any session.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read `packageCount` and then every package in index order.
    ///
    /// A zero count is not an error: the catalog is simply empty and
    /// [`ensure_available`](Self::ensure_available) reports
    /// `NoPackagesAvailable`.
    pub async fn load<S: SaleContract>(sale: &S, epoch: u64) -> Result<Self> {
        let count = sale.package_count().await?;
        if count == 0 {
            warn!("sale contract has no packages");
            return Ok(Self {
                packages: Vec::new(),
                epoch,
            });
        }

        let mut packages = Vec::new();
        for index in 0..count {
            let terms = sale.package(index).await?;
            packages.push(Package::from_terms(index, terms));
        }

        info!(
            count,
            active = packages.iter().filter(|p| p.active).count(),
            "packages loaded"
        );
        Ok(Self { packages, epoch })
    }

    /// Session epoch this catalog was loaded for.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn ensure_available(&self) -> Result<()> {
        if self.packages.is_empty() {
            Err(FlowError::NoPackagesAvailable)
        } else {
            Ok(())
        }
    }

    /// First active package, else package 0.
    ///
    /// The fallback may be inactive; purchase validation still refuses it.
    pub fn select_default(&self) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.active)
            .or_else(|| self.packages.first())
    }

    pub fn get(&self, id: u64) -> Option<&Package> {
        usize::try_from(id).ok().and_then(|i| self.packages.get(i))
    }
}
