//! The caller registry: who may touch which paths and services.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use nestfs::path;

use crate::error::Result;
use crate::grant::{AccessMode, Grant};

struct CallerScope {
    grants: Vec<Grant>,
    services: HashSet<String>,
}

/// Path-prefix and service-name access control keyed by caller identity.
///
/// A caller's grant set is registered atomically and fully revoked at
/// deregistration; re-registering replaces the previous set. Grants are
/// evaluated in registration order and the first match authorizes — there
/// is no deny rule, so overlapping grants with conflicting modes resolve
/// to whichever matching grant comes first.
#[derive(Default)]
pub struct PermissionChecker {
    callers: Mutex<HashMap<String, CallerScope>>,
}

impl PermissionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a caller's grants and service list.
    ///
    /// Grant prefixes are normalized here; a malformed prefix rejects the
    /// whole registration, leaving any previous scope in place.
    pub fn register_caller(
        &self,
        caller_id: &str,
        grants: Vec<Grant>,
        services: Vec<String>,
    ) -> Result<()> {
        let mut normalized = Vec::with_capacity(grants.len());
        for grant in grants {
            normalized.push(Grant {
                path_prefix: path::normalize(&grant.path_prefix)?,
                mode: grant.mode,
            });
        }
        let grant_count = normalized.len();

        let scope = CallerScope {
            grants: normalized,
            services: services.into_iter().collect(),
        };
        self.lock().insert(caller_id.to_string(), scope);
        diagnostics::log_debug!(
            "registered caller {caller} with {grants} grants",
            caller: caller_id,
            grants: grant_count
        );
        Ok(())
    }

    /// Revoke everything the caller was granted.
    pub fn unregister_caller(&self, caller_id: &str) {
        self.lock().remove(caller_id);
        diagnostics::log_debug!("unregistered caller {caller}", caller: caller_id);
    }

    pub fn is_registered(&self, caller_id: &str) -> bool {
        self.lock().contains_key(caller_id)
    }

    /// First-match-wins prefix check. Unregistered callers have no access.
    pub fn can_access_path(&self, caller_id: &str, raw_path: &str, mode: AccessMode) -> bool {
        let Ok(target) = path::normalize(raw_path) else {
            return false;
        };
        let callers = self.lock();
        let Some(scope) = callers.get(caller_id) else {
            return false;
        };
        scope
            .grants
            .iter()
            .any(|g| path::is_prefix_of(&g.path_prefix, &target) && g.mode.allows(mode))
    }

    /// Exact membership in the caller's declared service list.
    pub fn can_use_service(&self, caller_id: &str, service: &str) -> bool {
        self.lock()
            .get(caller_id)
            .is_some_and(|scope| scope.services.contains(service))
    }

    // Grant maps stay coherent even if a holder panicked.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CallerScope>> {
        self.callers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
