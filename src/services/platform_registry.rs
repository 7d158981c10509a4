// src/services/platform_registry.rs
//
// Platform Registry - source platforms
//
// CRITICAL RULES:
// - Platform ids never change
// - Platforms are deactivated, never deleted

use std::sync::Arc;

use crate::config::PlatformConfig;
use crate::domain::{validate_platform, Platform, PlatformKind};
use crate::error::{AppError, AppResult};
use crate::repositories::PlatformRepository;

pub struct PlatformRegistry {
    platform_repo: Arc<dyn PlatformRepository>,
}

impl PlatformRegistry {
    pub fn new(platform_repo: Arc<dyn PlatformRepository>) -> Self {
        Self { platform_repo }
    }

    /// Create a platform, or update name/kind of an existing one (keeps is_active).
    pub fn register(&self, id: &str, name: &str, kind: PlatformKind) -> AppResult<Platform> {
        let platform = match self.platform_repo.get_by_id(id)? {
            Some(mut existing) => {
                existing.update(Some(name.to_string()), Some(kind));
                existing
            }
            None => Platform::new(id, name, kind),
        };

        validate_platform(&platform)?;
        self.platform_repo.save(&platform)?;

        log::debug!("Registered platform {} ({})", platform.id, platform.kind);
        Ok(platform)
    }

    pub fn deactivate(&self, id: &str) -> AppResult<Platform> {
        self.set_active(id, false)
    }

    pub fn activate(&self, id: &str) -> AppResult<Platform> {
        self.set_active(id, true)
    }

    fn set_active(&self, id: &str, active: bool) -> AppResult<Platform> {
        let mut platform = self
            .platform_repo
            .get_by_id(id)?
            .ok_or(AppError::NotFound)?;

        if platform.is_active != active {
            platform.set_active(active);
            self.platform_repo.save(&platform)?;
            log::info!(
                "Platform {} {}",
                id,
                if active { "activated" } else { "deactivated" }
            );
        }
        Ok(platform)
    }

    pub fn get(&self, id: &str) -> AppResult<Option<Platform>> {
        self.platform_repo.get_by_id(id)
    }

    pub fn list_all(&self) -> AppResult<Vec<Platform>> {
        self.platform_repo.list_all()
    }

    /// The platforms a scheduler should crawl
    pub fn list_active(&self) -> AppResult<Vec<Platform>> {
        self.platform_repo.list_active()
    }

    /// Register every configured platform. Platforms missing from the config are left as they are.
    pub fn sync_from_config(&self, platforms: &[PlatformConfig]) -> AppResult<usize> {
        for p in platforms {
            self.register(&p.id, &p.name, p.kind)?;
        }
        log::info!("Synced {} platforms from configuration", platforms.len());
        Ok(platforms.len())
    }
}
