//! Which products a run generates and which it stores.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::RunConfig;

/// A product of a nowcast run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Artifact {
    Ensemble,
    Unperturbed,
    Deterministic,
    /// The base optical-flow field.
    Motion,
    /// Regenerated per-member motion fields.
    PerturbedMotion,
}

impl Artifact {
    pub const ALL: [Artifact; 5] = [
        Artifact::Ensemble,
        Artifact::Unperturbed,
        Artifact::Deterministic,
        Artifact::Motion,
        Artifact::PerturbedMotion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ensemble => "ensemble",
            Self::Unperturbed => "unperturbed",
            Self::Deterministic => "deterministic",
            Self::Motion => "motion",
            Self::PerturbedMotion => "perturbed-motion",
        }
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The generate/store flags of a [`RunConfig`] resolved into two sets.
///
/// Motion is always generated since every forecast needs it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestedArtifacts {
    generate: BTreeSet<Artifact>,
    store: BTreeSet<Artifact>,
}

impl RequestedArtifacts {
    pub fn from_config(config: &RunConfig) -> Self {
        let mut generate = BTreeSet::new();
        generate.insert(Artifact::Motion);
        for (flag, artifact) in [
            (config.generate_ensemble, Artifact::Ensemble),
            (config.generate_unperturbed, Artifact::Unperturbed),
            (config.generate_deterministic, Artifact::Deterministic),
            (config.regenerate_perturbed_motion, Artifact::PerturbedMotion),
        ] {
            if flag {
                generate.insert(artifact);
            }
        }

        let store = [
            (config.store_ensemble, Artifact::Ensemble),
            (config.store_unperturbed, Artifact::Unperturbed),
            (config.store_deterministic, Artifact::Deterministic),
            (config.store_motion, Artifact::Motion),
            (config.store_perturbed_motion, Artifact::PerturbedMotion),
        ]
        .into_iter()
        .filter_map(|(flag, artifact)| flag.then_some(artifact))
        .collect();

        Self { generate, store }
    }

    /// Build directly from sets.
    pub fn new(
        generate: impl IntoIterator<Item = Artifact>,
        store: impl IntoIterator<Item = Artifact>,
    ) -> Self {
        Self {
            generate: generate.into_iter().collect(),
            store: store.into_iter().collect(),
        }
    }

    pub fn generates(&self, artifact: Artifact) -> bool {
        self.generate.contains(&artifact)
    }

    pub fn stores(&self, artifact: Artifact) -> bool {
        self.store.contains(&artifact)
    }

    pub fn generated(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.generate.iter().copied()
    }

    pub fn stored(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.store.iter().copied()
    }

    /// Store requests that can be honoured because the product is generated.
    pub fn storable(&self) -> impl Iterator<Item = Artifact> + '_ {
        self.store.intersection(&self.generate).copied()
    }
}
