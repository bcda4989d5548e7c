//! Default admin account and baseline settings.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use tracing::{info, warn};

use crate::config::{AdminConfig, SettingConfig};
use crate::error::{MigrateError, Result};
use crate::model::{AdminAccount, Setting};
use crate::store::{DestinationStore, EnsuredAdmin};

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MigrateError::PasswordHash(e.to_string()))
}

/// Create the admin account if it does not exist yet.
pub async fn ensure_admin(
    store: &dyn DestinationStore,
    admin: &AdminConfig,
) -> Result<EnsuredAdmin> {
    let account = AdminAccount {
        email: admin.email.clone(),
        password_hash: hash_password(&admin.password)?,
        name: admin.name.clone(),
    };

    let ensured = store.ensure_admin(&account).await?;
    if ensured.created {
        info!("Created admin account {}", admin.email);
        warn!("Change the password of {} after first login", admin.email);
    } else {
        info!("Admin account {} already exists, left unchanged", admin.email);
    }
    Ok(ensured)
}

/// Create or update each setting by key. Returns how many were written.
pub async fn ensure_settings(
    store: &dyn DestinationStore,
    settings: &[SettingConfig],
) -> Result<usize> {
    for setting in settings {
        store
            .upsert_setting(&Setting {
                key: setting.key.clone(),
                value: setting.value.clone(),
                kind: setting.kind.as_str(),
            })
            .await?;
    }
    info!("Ensured {} site settings", settings.len());
    Ok(settings.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_settings;
    use crate::store::MemoryStore;
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    fn admin() -> AdminConfig {
        AdminConfig {
            email: "admin@example.com".to_string(),
            password: "admin123".to_string(),
            name: "Administrator".to_string(),
        }
    }

    #[test]
    fn test_hash_password_verifies() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"admin123", &parsed)
            .is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }

    #[tokio::test]
    async fn test_ensure_admin_twice() {
        let store = MemoryStore::new();
        let first = ensure_admin(&store, &admin()).await.unwrap();
        let hash = store.password_hash("admin@example.com").unwrap();
        let second = ensure_admin(&store, &admin()).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.password_hash("admin@example.com").unwrap(), hash);
        assert_eq!(store.admin_emails().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_settings_updates_by_key() {
        let store = MemoryStore::new();
        let mut settings = default_settings();
        assert_eq!(ensure_settings(&store, &settings).await.unwrap(), 5);

        settings[0].value = "Renamed".to_string();
        ensure_settings(&store, &settings).await.unwrap();

        let stored = store.settings();
        assert_eq!(stored.len(), 5);
        let site_name = stored.iter().find(|s| s.key == "site_name").unwrap();
        assert_eq!(site_name.value, "Renamed");
        let per_page = stored.iter().find(|s| s.key == "posts_per_page").unwrap();
        assert_eq!(per_page.kind, "number");
    }
}
