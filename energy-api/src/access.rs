//! Role-based access to building-scoped data.
//!
//! Admins see every building; owners see only the buildings whose
//! `owner_id` is their own user id. Decisions are resolved against the
//! directory on every call.

use crate::directory::Directory;
use crate::errors::{Error, Result};
use crate::model::{Role, User};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct AccessControl {
    directory: Arc<dyn Directory>,
}

impl AccessControl {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    async fn resolve_user(&self, username: &str) -> Result<User> {
        self.directory
            .find_user(username)
            .await?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))
    }

    /// Fails with [`Error::UserNotFound`] for an unknown user and, for
    /// owners only, [`Error::BuildingNotFound`] for an unknown building.
    pub async fn can_access(&self, username: &str, building_id: i64) -> Result<bool> {
        let user = self.resolve_user(username).await?;

        match user.role {
            Role::Admin => {
                debug!("Admin user {} has access to building {}", username, building_id);
                Ok(true)
            }
            Role::Owner => {
                let building = self
                    .directory
                    .find_building(building_id)
                    .await?
                    .ok_or(Error::BuildingNotFound(building_id))?;
                let allowed = building.owner_id == user.id;
                debug!(
                    "Owner user {} access to building {}: {}",
                    username, building_id, allowed
                );
                Ok(allowed)
            }
        }
    }

    pub async fn accessible_building_ids(&self, username: &str) -> Result<BTreeSet<i64>> {
        let user = self.resolve_user(username).await?;

        let buildings = match user.role {
            Role::Admin => self.directory.list_buildings().await?,
            Role::Owner => self.directory.buildings_owned_by(user.id).await?,
        };
        Ok(buildings.into_iter().map(|b| b.id).collect())
    }
}
