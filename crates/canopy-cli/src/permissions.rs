//! Permission checks backed by the `[permissions]` config table

use canopy_core::storage::PermissionChecker;
use canopy_core::types::UserId;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

/// Grants read from configuration: user ID to permission keys.
/// A granted key of `*` allows everything.
#[derive(Debug, Clone, Default)]
pub struct ConfigPermissions {
    grants: HashMap<UserId, HashSet<String>>,
}

impl ConfigPermissions {
    pub fn from_config(table: &BTreeMap<String, Vec<String>>) -> Self {
        let mut grants = HashMap::new();
        for (user, keys) in table {
            match user.trim().parse::<i64>() {
                Ok(id) => {
                    grants.insert(UserId(id), keys.iter().cloned().collect());
                }
                Err(_) => warn!(user = %user, "Ignoring permissions for a non-numeric user ID"),
            }
        }
        Self { grants }
    }
}

impl PermissionChecker for ConfigPermissions {
    fn check(&self, permission: &str, user: UserId) -> bool {
        self.grants
            .get(&user)
            .map_or(false, |keys| keys.contains(permission) || keys.contains("*"))
    }
}
