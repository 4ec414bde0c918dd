//! Ban and operator lists.
//!
//! The session engine only sees the [`BanStore`] and [`OperatorStore`]
//! traits. The in-memory lists here back them for the standalone server.

use log::info;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{PoisonError, RwLock};

pub trait BanStore: Send + Sync {
    fn contains_name(&self, name: &str) -> bool;
    fn contains_address(&self, addr: IpAddr) -> bool;
}

pub trait OperatorStore: Send + Sync {
    fn contains(&self, name: &str) -> bool;
}

/// Case-insensitive set of player names.
#[derive(Debug, Default)]
pub struct NameList {
    names: RwLock<HashSet<String>>,
}

impl NameList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = Self::new();
        for name in names {
            list.add(name.as_ref());
        }
        list
    }

    /// Returns false if the name was already present.
    pub fn add(&self, name: &str) -> bool {
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_ascii_lowercase())
    }

    /// Returns false if the name was not present.
    pub fn remove(&self, name: &str) -> bool {
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OperatorStore for NameList {
    fn contains(&self, name: &str) -> bool {
        NameList::contains(self, name)
    }
}

#[derive(Debug, Default)]
pub struct AddressList {
    addresses: RwLock<HashSet<IpAddr>>,
}

impl AddressList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, addr: IpAddr) -> bool {
        self.addresses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(addr)
    }

    pub fn remove(&self, addr: IpAddr) -> bool {
        self.addresses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&addr)
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        self.addresses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&addr)
    }
}

/// Name and address bans together.
#[derive(Debug, Default)]
pub struct BanList {
    pub names: NameList,
    pub addresses: AddressList,
}

impl BanList {
    pub fn new(names: &[String], addresses: &[IpAddr]) -> Self {
        let list = BanList {
            names: NameList::with_names(names),
            addresses: AddressList::new(),
        };
        for addr in addresses {
            list.addresses.add(*addr);
        }
        info!(
            "Loaded {} name ban(s) and {} address ban(s)",
            names.len(),
            addresses.len()
        );
        list
    }
}

impl BanStore for BanList {
    fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn contains_address(&self, addr: IpAddr) -> bool {
        self.addresses.contains(addr)
    }
}
