//! Personality composition: base + ordered extensions -> reference personality.

use std::collections::BTreeMap;

use super::profile::{
    BasePersonality, MemoryFact, PersonalityExtension, PersonalityProfile, ReferencePersonality,
};
use crate::error::{HarnessError, Result};

// ============================================================================
// Composer
// ============================================================================

/// Holds the loaded bases and the extensions registered for each of them.
///
/// Loaded once per run and read-only afterwards; [`compose`](Self::compose)
/// never mutates it.
#[derive(Debug, Clone, Default)]
pub struct PersonalityComposer {
    bases: BTreeMap<String, BasePersonality>,
    extensions: BTreeMap<String, BTreeMap<String, PersonalityExtension>>,
}

impl PersonalityComposer {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a base personality under its `name`.
    pub fn register_base(&mut self, base: BasePersonality) -> Result<()> {
        if self.bases.contains_key(&base.name) {
            return Err(HarnessError::Config(format!(
                "duplicate personality '{}'",
                base.name
            )));
        }
        self.extensions.entry(base.name.clone()).or_default();
        self.bases.insert(base.name.clone(), base);
        Ok(())
    }

    /// Register an extension for `personality` under its `test_name`.
    pub fn register_extension(
        &mut self,
        personality: &str,
        extension: PersonalityExtension,
    ) -> Result<()> {
        let key = extension.test_name.clone();
        self.register_extension_as(personality, &key, extension)
    }

    /// Register an extension for `personality` under an explicit key.
    ///
    /// Re-registering a key replaces the previous extension.
    pub fn register_extension_as(
        &mut self,
        personality: &str,
        key: &str,
        extension: PersonalityExtension,
    ) -> Result<()> {
        let slot = self
            .extensions
            .get_mut(personality)
            .ok_or_else(|| HarnessError::PersonalityNotFound(personality.to_string()))?;
        if slot.insert(key.to_string(), extension).is_some() {
            log::debug!("Replaced extension '{}' for '{}'", key, personality);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn base(&self, name: &str) -> Option<&BasePersonality> {
        self.bases.get(name)
    }

    /// Base names in sorted order.
    pub fn base_names(&self) -> impl Iterator<Item = &str> {
        self.bases.keys().map(String::as_str)
    }

    /// Extension keys registered for `personality`, sorted.
    pub fn extension_names(&self, personality: &str) -> Vec<&str> {
        self.extensions
            .get(personality)
            .map(|exts| exts.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_extension(&self, personality: &str, extension: &str) -> bool {
        self.extensions
            .get(personality)
            .is_some_and(|exts| exts.contains_key(extension))
    }

    pub fn extension(&self, personality: &str, extension: &str) -> Option<&PersonalityExtension> {
        self.extensions.get(personality)?.get(extension)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    // -----------------------------------------------------------------------
    // Composition
    // -----------------------------------------------------------------------

    /// Materialize `base_name` with `extensions` applied in order.
    pub fn compose<S: AsRef<str>>(
        &self,
        base_name: &str,
        extensions: &[S],
    ) -> Result<ReferencePersonality> {
        let base = self
            .bases
            .get(base_name)
            .ok_or_else(|| HarnessError::PersonalityNotFound(base_name.to_string()))?;

        let resolved = extensions
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.extension(base_name, name)
                    .map(|ext| (name, ext))
                    .ok_or_else(|| HarnessError::ExtensionNotFound {
                        personality: base_name.to_string(),
                        extension: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(materialize(base, &resolved))
    }

    /// Derive a new base personality from an existing one.
    ///
    /// The variant is returned, not registered.
    pub fn create_variant(
        &self,
        base_name: &str,
        variant_name: &str,
        overrides: &PersonalityProfile,
        extra_facts: Vec<MemoryFact>,
    ) -> Result<BasePersonality> {
        let base = self
            .bases
            .get(base_name)
            .ok_or_else(|| HarnessError::PersonalityNotFound(base_name.to_string()))?;

        let mut variant = base.clone();
        variant.name = format!("{}_{}", base.name, variant_name);
        variant.description = format!("{} (variant: {})", base.description, variant_name);
        variant.profile.merge(overrides);
        variant.memory_facts.extend(extra_facts);
        Ok(variant)
    }
}

/// Apply `extensions` (registry key, extension) to `base` in order.
pub fn materialize(
    base: &BasePersonality,
    extensions: &[(&str, &PersonalityExtension)],
) -> ReferencePersonality {
    let mut out = ReferencePersonality {
        name: base.name.clone(),
        description: base.description.clone(),
        profile: base.profile.clone(),
        memory_facts: base.memory_facts.clone(),
        conversations: base.conversations.clone(),
        plans: base.plans.clone(),
        expected_behaviors: Vec::new(),
        base_name: base.name.clone(),
        extension_names: Vec::with_capacity(extensions.len()),
    };

    for (key, ext) in extensions {
        out.name.push('_');
        out.name.push_str(&ext.test_name);
        if let Some(overrides) = &ext.profile_overrides {
            out.profile.merge(overrides);
        }
        out.memory_facts.extend(ext.additional_facts.iter().cloned());
        out.plans.extend(ext.additional_plans.iter().cloned());
        out.expected_behaviors
            .extend(ext.expected_behaviors.iter().cloned());
        out.extension_names.push(key.to_string());
    }

    if !extensions.is_empty() {
        let descriptions: Vec<&str> = extensions
            .iter()
            .map(|(_, ext)| ext.description.as_str())
            .collect();
        out.description = format!("{} - {}", out.description, descriptions.join("; "));
    }

    out
}

// ============================================================================
// Tests
// ============================================================================
