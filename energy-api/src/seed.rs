//! Default users and buildings loaded at startup.

use crate::directory::MemoryDirectory;
use crate::errors::Result;
use crate::model::{Building, Role, User};
use sqlx::PgPool;
use tracing::info;

pub const DEFAULT_USERS: [(&str, Role); 3] = [
    ("admin", Role::Admin),
    ("owner1", Role::Owner),
    ("owner2", Role::Owner),
];

/// (name, owner username, address)
pub const DEFAULT_BUILDINGS: [(&str, &str, &str); 3] = [
    ("Building A", "owner1", "123 Main St"),
    ("Building B", "owner1", "456 Oak Ave"),
    ("Building C", "owner2", "789 Pine Rd"),
];

/// In-memory directory holding the default fixture, with ids assigned in
/// declaration order starting at 1.
pub fn default_directory() -> MemoryDirectory {
    let users: Vec<User> = DEFAULT_USERS
        .iter()
        .zip(1..)
        .map(|(&(username, role), id)| User {
            id,
            username: username.to_string(),
            role,
        })
        .collect();

    let buildings = DEFAULT_BUILDINGS
        .iter()
        .zip(1..)
        .filter_map(|(&(name, owner, address), id)| {
            let owner = users.iter().find(|u| u.username == owner)?;
            Some(Building {
                id,
                name: name.to_string(),
                owner_id: owner.id,
                address: Some(address.to_string()),
            })
        })
        .collect();

    MemoryDirectory::new(users, buildings)
}

/// Inserts the default fixture. Users are keyed by username; buildings are
/// only created when the table is empty.
pub async fn seed_postgres(pool: &PgPool) -> Result<()> {
    info!("Loading initial data...");

    for (username, role) in DEFAULT_USERS {
        let inserted = sqlx::query(
            "INSERT INTO users (username, role) VALUES ($1, $2) ON CONFLICT (username) DO NOTHING",
        )
        .bind(username)
        .bind(role.as_str())
        .execute(pool)
        .await?
        .rows_affected();
        if inserted > 0 {
            info!("Created user {} ({})", username, role);
        }
    }

    let (buildings,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM buildings")
        .fetch_one(pool)
        .await?;
    if buildings == 0 {
        for (name, owner, address) in DEFAULT_BUILDINGS {
            sqlx::query(
                "INSERT INTO buildings (name, owner_id, address)
                 SELECT $1, id, $3 FROM users WHERE username = $2",
            )
            .bind(name)
            .bind(owner)
            .bind(address)
            .execute(pool)
            .await?;
            info!("Created {}", name);
        }
    }

    info!("Initial data loading completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;

    #[test]
    fn test_default_directory_split() {
        tokio_test::block_on(async {
            let dir = default_directory();
            let owner1 = dir.find_user("owner1").await.unwrap().unwrap();
            let owner2 = dir.find_user("owner2").await.unwrap().unwrap();

            assert_eq!(dir.list_buildings().await.unwrap().len(), 3);
            assert_eq!(dir.buildings_owned_by(owner1.id).await.unwrap().len(), 2);
            assert_eq!(dir.buildings_owned_by(owner2.id).await.unwrap().len(), 1);
            assert_eq!(
                dir.find_user("admin").await.unwrap().map(|u| u.role),
                Some(Role::Admin)
            );
        });
    }
}
