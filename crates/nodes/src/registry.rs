//! Static platform registry.
//!
//! Maps each [`PlatformId`] to its profile, validation rules, posting windows
//! and (optionally) a [`Deliverer`]. Resolved once at startup; lookups never construct anything.

use std::collections::HashMap;
use std::sync::Arc;

use pipeline::{
    CrosspostError, Deliverer, PlatformId, PlatformProfile, RuleSet, TimingProfile,
    ValidationEngine,
};

use crate::catalog::{self, PlatformDefinition};

struct RegisteredPlatform {
    profile: PlatformProfile,
    rules: RuleSet,
    timing: TimingProfile,
    deliverer: Option<Arc<dyn Deliverer>>,
}

/// Every platform the pipeline can target, in catalog order.
#[derive(Default)]
pub struct PlatformRegistry {
    platforms: Vec<RegisteredPlatform>,
    index: HashMap<PlatformId, usize>,
}

impl std::fmt::Debug for PlatformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.platforms.iter().map(|p| p.profile.id.as_str()))
            .finish()
    }
}

impl PlatformRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalog, without deliverers.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for definition in catalog::builtin() {
            registry.register(definition);
        }
        registry
    }

    /// Adds a platform, replacing any earlier definition with the same id.
    pub fn register(&mut self, definition: PlatformDefinition) {
        let entry = RegisteredPlatform {
            profile: definition.profile,
            rules: definition.rules,
            timing: definition.timing,
            deliverer: None,
        };
        match self.index.get(&entry.profile.id) {
            Some(&position) => {
                let deliverer = self.platforms[position].deliverer.take();
                self.platforms[position] = RegisteredPlatform { deliverer, ..entry };
            }
            None => {
                self.index
                    .insert(entry.profile.id.clone(), self.platforms.len());
                self.platforms.push(entry);
            }
        }
    }

    /// Attaches the deliverer used to publish to `platform`.
    pub fn set_deliverer(
        &mut self,
        platform: &PlatformId,
        deliverer: Arc<dyn Deliverer>,
    ) -> Result<(), CrosspostError> {
        let position = self.position(platform)?;
        self.platforms[position].deliverer = Some(deliverer);
        Ok(())
    }

    pub fn contains(&self, platform: &PlatformId) -> bool {
        self.index.contains_key(platform)
    }

    pub fn profile(&self, platform: &PlatformId) -> Option<&PlatformProfile> {
        self.index
            .get(platform)
            .map(|&position| &self.platforms[position].profile)
    }

    /// All profiles in catalog order.
    pub fn profiles(&self) -> Vec<PlatformProfile> {
        self.platforms.iter().map(|p| p.profile.clone()).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PlatformId> {
        self.platforms.iter().map(|p| &p.profile.id)
    }

    /// Posting windows for `platform`; the generic default when unregistered.
    pub fn timing(&self, platform: &PlatformId) -> TimingProfile {
        self.index
            .get(platform)
            .map(|&position| self.platforms[position].timing.clone())
            .unwrap_or_default()
    }

    /// Every platform's posting windows, in catalog order.
    pub fn timings(&self) -> Vec<(PlatformId, TimingProfile)> {
        self.platforms
            .iter()
            .map(|p| (p.profile.id.clone(), p.timing.clone()))
            .collect()
    }

    pub fn deliverer(&self, platform: &PlatformId) -> Option<Arc<dyn Deliverer>> {
        self.index
            .get(platform)
            .and_then(|&position| self.platforms[position].deliverer.clone())
    }

    /// Builds a validation engine holding every registered rule set.
    pub fn validation_engine(&self) -> ValidationEngine {
        let mut engine = ValidationEngine::new();
        for platform in &self.platforms {
            engine.set_rules(platform.profile.id.clone(), platform.rules.clone());
        }
        engine
    }

    /// Checks that every id names a registered platform.
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<PlatformId>, CrosspostError> {
        ids.iter()
            .map(|raw| {
                PlatformId::new(raw.trim().to_ascii_lowercase())
                    .filter(|id| self.contains(id))
                    .ok_or_else(|| CrosspostError::UnknownPlatform {
                        platform: raw.clone(),
                    })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    fn position(&self, platform: &PlatformId) -> Result<usize, CrosspostError> {
        self.index
            .get(platform)
            .copied()
            .ok_or_else(|| CrosspostError::UnknownPlatform {
                platform: platform.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pipeline::{DeliveryError, PlatformArtifact, PublishReceipt};

    #[derive(Debug)]
    struct NullDeliverer;

    #[async_trait]
    impl Deliverer for NullDeliverer {
        async fn publish(
            &self,
            _artifact: &PlatformArtifact,
        ) -> Result<PublishReceipt, DeliveryError> {
            Ok(PublishReceipt { url: None })
        }
    }

    fn id(s: &str) -> PlatformId {
        PlatformId::new(s).unwrap()
    }

    #[test]
    fn builtin_registry_preserves_catalog_order() {
        let registry = PlatformRegistry::builtin();
        assert_eq!(registry.len(), 12);
        assert_eq!(registry.ids().next().unwrap().as_str(), "hackernews");
        assert!(registry.profile(&id("devto")).is_some());
    }

    #[test]
    fn resolve_normalizes_and_rejects_unknown_names() {
        let registry = PlatformRegistry::builtin();
        let ids = registry.resolve(&[" DevTo ".to_string()]).unwrap();
        assert_eq!(ids, vec![id("devto")]);

        let err = registry.resolve(&["myspace".to_string()]).unwrap_err();
        assert!(matches!(err, CrosspostError::UnknownPlatform { platform } if platform == "myspace"));
    }

    #[test]
    fn unregistered_platforms_get_default_timing() {
        let registry = PlatformRegistry::builtin();
        assert_eq!(registry.timing(&id("myspace")), TimingProfile::default());
        assert_eq!(registry.timing(&id("producthunt")).best_hours_utc, vec![8]);
        assert_eq!(registry.timings().len(), 12);
    }

    #[test]
    fn deliverers_attach_only_to_known_platforms() {
        let mut registry = PlatformRegistry::builtin();
        registry.set_deliverer(&id("devto"), Arc::new(NullDeliverer)).unwrap();
        assert!(registry.deliverer(&id("devto")).is_some());
        assert!(registry.deliverer(&id("medium")).is_none());
        assert!(registry
            .set_deliverer(&id("myspace"), Arc::new(NullDeliverer))
            .is_err());
    }

    #[test]
    fn reregistering_keeps_position_and_deliverer() {
        let mut registry = PlatformRegistry::builtin();
        registry.set_deliverer(&id("devto"), Arc::new(NullDeliverer)).unwrap();

        let mut replacement = catalog::builtin()
            .into_iter()
            .find(|d| d.profile.id == id("devto"))
            .unwrap();
        replacement.rules = RuleSet::new();
        replacement.timing = TimingProfile::new(&[pipeline::Weekday::Sat], &[9], &[], "");
        registry.register(replacement);

        assert_eq!(registry.len(), 12);
        assert_eq!(registry.timing(&id("devto")).best_hours_utc, vec![9]);
        assert!(registry.deliverer(&id("devto")).is_some());
        let engine = registry.validation_engine();
        assert!(engine.rules_for(&id("devto")).unwrap().is_empty());
    }
}
