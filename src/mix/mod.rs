//! Stem recombination
//!
//! Combines subsets of the four stems into named variants. Each variant is
//! aligned independently: its stems are padded with trailing silence to the
//! longest stem *of that variant*, then summed sample by sample.
//!
//! Stems are decoded once per track into a [`StemSet`]; a stem that failed to
//! load only takes down the variants that need it.

use crate::audio::{self, resample};
use crate::error::{Result, StemmixError};
use crate::types::{AudioBuffer, StemPaths, StemRole, Variant, VariantFlags};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One row of the variant table
#[derive(Debug, Clone, Copy)]
pub struct VariantSpec {
    pub variant: Variant,
    /// Stems summed for this variant, in overlay order
    pub roles: &'static [StemRole],
}

/// Every variant the mixer can produce, in production order
pub const VARIANT_TABLE: [VariantSpec; 5] = [
    VariantSpec {
        variant: Variant::NoBass,
        roles: &[StemRole::Drums, StemRole::Vocals, StemRole::Other],
    },
    VariantSpec {
        variant: Variant::BassOnly,
        roles: &[StemRole::Bass],
    },
    VariantSpec {
        variant: Variant::NoVocals,
        roles: &[StemRole::Bass, StemRole::Drums, StemRole::Other],
    },
    VariantSpec {
        variant: Variant::NoDrums,
        roles: &[StemRole::Bass, StemRole::Vocals, StemRole::Other],
    },
    VariantSpec {
        variant: Variant::NoOther,
        roles: &[StemRole::Bass, StemRole::Vocals, StemRole::Drums],
    },
];

/// Table row for a variant
pub fn variant_spec(variant: Variant) -> &'static VariantSpec {
    VARIANT_TABLE
        .iter()
        .find(|spec| spec.variant == variant)
        .unwrap_or(&VARIANT_TABLE[0])
}

/// Variants requested by a set of flags, in table order (`NOBASS` first)
pub fn requested_variants(flags: VariantFlags) -> Vec<Variant> {
    VARIANT_TABLE
        .iter()
        .map(|spec| spec.variant)
        .filter(|v| flags.requests(*v))
        .collect()
}

// =============================================================================
// Loaded stems
// =============================================================================

/// Decoded stems of one track; a role is either loaded or carries the load failure
#[derive(Debug, Default)]
pub struct StemSet {
    stems: BTreeMap<StemRole, std::result::Result<AudioBuffer, String>>,
}

impl StemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode all four stems, recording per-role failures instead of failing
    pub fn load(paths: &StemPaths) -> Self {
        let mut set = Self::new();
        for role in StemRole::ALL {
            let path = paths.get(role);
            match audio::decode(path) {
                Ok(buffer) => {
                    debug!("Loaded {} stem: {:.2}s", role, buffer.duration);
                    set.insert(role, buffer);
                }
                Err(e) => {
                    warn!("Could not load {} stem from {}: {}", role, path.display(), e);
                    set.mark_missing(role, e.to_string());
                }
            }
        }
        set
    }

    pub fn insert(&mut self, role: StemRole, buffer: AudioBuffer) {
        self.stems.insert(role, Ok(buffer));
    }

    pub fn mark_missing(&mut self, role: StemRole, reason: impl Into<String>) {
        self.stems.insert(role, Err(reason.into()));
    }

    pub fn get(&self, role: StemRole) -> std::result::Result<&AudioBuffer, String> {
        match self.stems.get(&role) {
            Some(Ok(buffer)) => Ok(buffer),
            Some(Err(reason)) => Err(reason.clone()),
            None => Err("stem not provided".to_string()),
        }
    }

    /// Number of roles that loaded successfully
    pub fn loaded_count(&self) -> usize {
        self.stems.values().filter(|s| s.is_ok()).count()
    }
}

// =============================================================================
// Buffer operations
// =============================================================================

/// Pad with trailing silence up to `frames`; never truncates
pub fn pad(buffer: &AudioBuffer, frames: usize) -> AudioBuffer {
    let current = buffer.frames();
    if frames <= current {
        return buffer.clone();
    }
    let mut samples = Vec::with_capacity(frames * buffer.channels as usize);
    samples.extend_from_slice(&buffer.samples);
    samples.resize(frames * buffer.channels as usize, 0.0);
    AudioBuffer::new(samples, buffer.sample_rate, buffer.channels)
}

/// Sample-wise sum of two buffers of the same format
///
/// The result is as long as the longer input; the shorter one contributes
/// silence past its end.
pub fn overlay(base: &AudioBuffer, top: &AudioBuffer) -> AudioBuffer {
    let len = base.samples.len().max(top.samples.len());
    let samples = (0..len)
        .map(|i| base.samples.get(i).copied().unwrap_or(0.0) + top.samples.get(i).copied().unwrap_or(0.0))
        .collect();
    AudioBuffer::new(samples, base.sample_rate, base.channels)
}

/// Mix one variant from loaded stems
pub fn mix_variant(stems: &StemSet, variant: Variant) -> Result<AudioBuffer> {
    let spec = variant_spec(variant);

    let mut selected = Vec::with_capacity(spec.roles.len());
    let mut missing: Vec<(StemRole, String)> = Vec::new();
    for role in spec.roles {
        match stems.get(*role) {
            Ok(buffer) => selected.push(buffer),
            Err(reason) => missing.push((*role, reason)),
        }
    }

    // Every missing role is named, not just the first
    if !missing.is_empty() {
        return Err(StemmixError::MissingStem {
            roles: missing.iter().map(|(role, _)| *role).collect(),
            variants: vec![variant],
            reason: missing
                .iter()
                .map(|(role, reason)| format!("{}: {}", role, reason))
                .collect::<Vec<_>>()
                .join("; "),
        });
    }

    // Common format: first stem's rate, widest channel layout
    let sample_rate = selected[0].sample_rate;
    let channels = selected.iter().map(|b| b.channels).max().unwrap_or(1);
    let conformed: Vec<AudioBuffer> = selected
        .iter()
        .map(|b| resample::conform(b, sample_rate, channels))
        .collect();

    let max_len = conformed.iter().map(AudioBuffer::frames).max().unwrap_or(0);

    let mut padded = conformed.iter().map(|b| pad(b, max_len));
    let first = padded
        .next()
        .unwrap_or_else(|| AudioBuffer::silent(max_len, sample_rate, channels));
    let mixed = padded.fold(first, |acc, stem| overlay(&acc, &stem));

    debug!(
        "Mixed {} from {} stems: {} frames ({:.2}s)",
        variant,
        spec.roles.len(),
        mixed.frames(),
        mixed.duration
    );

    Ok(mixed)
}

// =============================================================================
// Whole-track mixing
// =============================================================================

/// Per-variant results of one mixing pass
#[derive(Debug, Default)]
pub struct MixOutcome {
    pub variants: BTreeMap<Variant, Result<AudioBuffer>>,
    /// Load failure of each stem a requested variant needed
    stem_failures: BTreeMap<StemRole, String>,
}

impl MixOutcome {
    /// Successfully mixed variants, in table order
    pub fn produced(&self) -> impl Iterator<Item = (Variant, &AudioBuffer)> {
        self.variants
            .iter()
            .filter_map(|(v, r)| r.as_ref().ok().map(|b| (*v, b)))
    }

    /// Variants that could not be mixed, with the reason
    pub fn failed(&self) -> impl Iterator<Item = (Variant, &StemmixError)> {
        self.variants
            .iter()
            .filter_map(|(v, r)| r.as_ref().err().map(|e| (*v, e)))
    }

    pub fn produced_count(&self) -> usize {
        self.produced().count()
    }

    /// One `MissingStem` per missing role, naming every variant it blocked
    pub fn missing_stems(&self) -> Vec<StemmixError> {
        let mut by_role: BTreeMap<StemRole, (Vec<Variant>, String)> = BTreeMap::new();
        for (variant, err) in self.failed() {
            if let StemmixError::MissingStem { roles, reason, .. } = err {
                for role in roles {
                    let role_reason = self
                        .stem_failures
                        .get(role)
                        .cloned()
                        .unwrap_or_else(|| reason.clone());
                    by_role
                        .entry(*role)
                        .or_insert_with(|| (Vec::new(), role_reason))
                        .0
                        .push(variant);
                }
            }
        }
        by_role
            .into_iter()
            .map(|(role, (variants, reason))| StemmixError::MissingStem {
                roles: vec![role],
                variants,
                reason,
            })
            .collect()
    }
}

/// Mix every variant requested by `flags` in one pass over shared stems
pub fn mix(stems: &StemSet, flags: VariantFlags) -> MixOutcome {
    let mut outcome = MixOutcome::default();
    for variant in requested_variants(flags) {
        for role in variant_spec(variant).roles {
            if let Err(reason) = stems.get(*role) {
                outcome.stem_failures.insert(*role, reason);
            }
        }
        outcome.variants.insert(variant, mix_variant(stems, variant));
    }
    outcome
}
