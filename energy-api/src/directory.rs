use crate::errors::Result;
use crate::model::{Building, User};
use async_trait::async_trait;

/// Read-only lookup of users and buildings.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    async fn find_building(&self, id: i64) -> Result<Option<Building>>;

    async fn list_buildings(&self) -> Result<Vec<Building>>;

    async fn buildings_owned_by(&self, owner_id: i64) -> Result<Vec<Building>>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    users: Vec<User>,
    buildings: Vec<Building>,
}

impl MemoryDirectory {
    pub fn new(users: Vec<User>, buildings: Vec<Building>) -> Self {
        Self { users, buildings }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_building(&self, id: i64) -> Result<Option<Building>> {
        Ok(self.buildings.iter().find(|b| b.id == id).cloned())
    }

    async fn list_buildings(&self) -> Result<Vec<Building>> {
        Ok(self.buildings.clone())
    }

    async fn buildings_owned_by(&self, owner_id: i64) -> Result<Vec<Building>> {
        Ok(self
            .buildings
            .iter()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
