//! Which roles may request which sources.
//!
//! Authorization happens before a batch is built; the orchestrator itself
//! scrapes whatever it is handed.

use crate::config::ScrapeConfig;
use crate::models::SourceSite;
use std::collections::BTreeMap;
use tracing::debug;

pub const SUPER_ADMIN: &str = "super_admin";

pub trait SourcePolicy {
    fn is_permitted(&self, role: &str, source: &str) -> bool;

    /// Keep only the sites `role` may request.
    fn permitted_sources(&self, role: &str, sites: &[SourceSite]) -> Vec<SourceSite> {
        sites
            .iter()
            .filter(|site| {
                let ok = self.is_permitted(role, &site.name);
                if !ok {
                    debug!(%role, source = %site.name, "Source not permitted for role");
                }
                ok
            })
            .cloned()
            .collect()
    }
}

/// Role → source → permitted table. `super_admin` is always permitted;
/// pairs missing from the table are denied.
#[derive(Debug, Clone, Default)]
pub struct RolePermissions {
    table: BTreeMap<String, BTreeMap<String, bool>>,
}

impl RolePermissions {
    pub fn new(table: BTreeMap<String, BTreeMap<String, bool>>) -> Self {
        Self { table }
    }

    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(config.permissions.clone())
    }

    pub fn grant(&mut self, role: &str, source: &str, permitted: bool) {
        self.table
            .entry(role.to_string())
            .or_default()
            .insert(source.to_string(), permitted);
    }
}

impl SourcePolicy for RolePermissions {
    fn is_permitted(&self, role: &str, source: &str) -> bool {
        if role == SUPER_ADMIN {
            return true;
        }
        self.table
            .get(role)
            .and_then(|sources| sources.get(source))
            .copied()
            .unwrap_or(false)
    }
}
