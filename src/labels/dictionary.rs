//! Label dictionary loaded from TOML
//!
//! A dictionary knows three kinds of names:
//! - canonical motion names shared by all fighters (`attack_air_n`)
//! - per-fighter user labels grouped into layers (`nair` in layer `notation`)
//! - status names, global or per fighter
//!
//! ```toml
//! [motions]
//! attack_air_n = 0x0a1b2c3d4e
//!
//! [statuses]
//! attack_air = 0x22
//!
//! [[fighter]]
//! id = 8
//! name = "pikachu"
//!
//! [[fighter.label]]
//! motion = "attack_air_n"
//! label = "nair"
//! layer = "notation"
//! ```

use crate::error::{Error, Result};
use crate::state::{FighterId, Motion, Status};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Layer assigned to labels that do not name one
pub const DEFAULT_LAYER: &str = "user";

#[derive(Debug, Deserialize)]
struct DictionaryFile {
    #[serde(default)]
    motions: HashMap<String, u64>,
    #[serde(default)]
    statuses: HashMap<String, Status>,
    #[serde(default, rename = "fighter")]
    fighters: Vec<FighterFile>,
}

#[derive(Debug, Deserialize)]
struct FighterFile {
    id: FighterId,
    name: String,
    #[serde(default)]
    statuses: HashMap<String, Status>,
    #[serde(default, rename = "label")]
    labels: Vec<LabelFile>,
}

#[derive(Debug, Deserialize)]
struct LabelFile {
    motion: String,
    label: String,
    layer: Option<String>,
}

/// One user label attached to a motion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub motion: Motion,
    pub label: String,
    pub layer: String,
}

#[derive(Debug, Clone, Default)]
struct FighterLabels {
    name: String,
    statuses: HashMap<String, Status>,
    entries: Vec<LabelEntry>,
}

/// Motion/status name lookup, constructed explicitly and passed by reference.
#[derive(Debug, Clone, Default)]
pub struct LabelDictionary {
    canonical: HashMap<String, Motion>,
    canonical_names: HashMap<Motion, String>,
    statuses: HashMap<String, Status>,
    fighters: HashMap<FighterId, FighterLabels>,
}

impl LabelDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dictionary from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            Error::labels(format!("Failed to read dictionary {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&contents)
            .map_err(|e| Error::labels(format!("Failed to load dictionary {:?}: {}", path, e)))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: DictionaryFile =
            toml::from_str(contents).map_err(|e| Error::labels(e.to_string()))?;

        let mut dict = Self::new();
        for (name, hash) in file.motions {
            dict.add_canonical(&name, Motion::new(hash));
        }
        for (name, status) in file.statuses {
            dict.statuses.insert(name.to_lowercase(), status);
        }

        for fighter in file.fighters {
            if dict.fighters.contains_key(&fighter.id) {
                return Err(Error::labels(format!(
                    "fighter id {} is defined twice",
                    fighter.id
                )));
            }
            dict.add_fighter(fighter.id, &fighter.name);
            for (name, status) in fighter.statuses {
                dict.add_fighter_status(fighter.id, &name, status);
            }
            for label in fighter.labels {
                let motion = dict
                    .resolve_canonical_label(&label.motion)
                    .or_else(|| Motion::parse_hex(&label.motion))
                    .ok_or_else(|| {
                        Error::labels(format!(
                            "label \"{}\" of fighter {} refers to unknown motion \"{}\"",
                            label.label, fighter.name, label.motion
                        ))
                    })?;
                dict.add_user_label(
                    fighter.id,
                    motion,
                    &label.label,
                    label.layer.as_deref().unwrap_or(DEFAULT_LAYER),
                );
            }
        }

        tracing::debug!(
            "Loaded label dictionary: {} motions, {} fighters",
            dict.canonical.len(),
            dict.fighters.len()
        );
        Ok(dict)
    }

    pub fn add_canonical(&mut self, name: &str, motion: Motion) {
        self.canonical.insert(name.to_lowercase(), motion);
        self.canonical_names.insert(motion, name.to_string());
    }

    pub fn add_status(&mut self, name: &str, status: Status) {
        self.statuses.insert(name.to_lowercase(), status);
    }

    pub fn add_fighter(&mut self, fighter: FighterId, name: &str) {
        self.fighters.entry(fighter).or_default().name = name.to_string();
    }

    pub fn add_fighter_status(&mut self, fighter: FighterId, name: &str, status: Status) {
        self.fighters
            .entry(fighter)
            .or_default()
            .statuses
            .insert(name.to_lowercase(), status);
    }

    pub fn add_user_label(&mut self, fighter: FighterId, motion: Motion, label: &str, layer: &str) {
        self.fighters
            .entry(fighter)
            .or_default()
            .entries
            .push(LabelEntry {
                motion,
                label: label.to_string(),
                layer: layer.to_string(),
            });
    }

    pub fn fighter_name(&self, fighter: FighterId) -> Option<&str> {
        self.fighters.get(&fighter).map(|f| f.name.as_str())
    }

    /// Fighters with a dictionary entry, sorted by id
    pub fn fighter_ids(&self) -> Vec<FighterId> {
        let mut ids: Vec<FighterId> = self.fighters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All user labels of a fighter, in definition order
    pub fn user_labels(&self, fighter: FighterId) -> &[LabelEntry] {
        self.fighters
            .get(&fighter)
            .map(|f| f.entries.as_slice())
            .unwrap_or(&[])
    }

    /// Known layer names, sorted
    pub fn layers(&self) -> Vec<String> {
        self.fighters
            .values()
            .flat_map(|f| f.entries.iter().map(|e| e.layer.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every motion carrying the user label `text` (any layer, case-insensitive)
    pub fn resolve_user_label(&self, fighter: FighterId, text: &str) -> Vec<Motion> {
        let mut motions = Vec::new();
        for entry in self.user_labels(fighter) {
            if entry.label.eq_ignore_ascii_case(text) && !motions.contains(&entry.motion) {
                motions.push(entry.motion);
            }
        }
        motions
    }

    pub fn resolve_canonical_label(&self, text: &str) -> Option<Motion> {
        self.canonical.get(&text.to_lowercase()).copied()
    }

    /// Status name lookup, fighter-specific names first
    pub fn resolve_status(&self, fighter: FighterId, text: &str) -> Option<Status> {
        let key = text.to_lowercase();
        self.fighters
            .get(&fighter)
            .and_then(|f| f.statuses.get(&key))
            .or_else(|| self.statuses.get(&key))
            .copied()
    }

    pub fn canonical_name(&self, motion: Motion) -> Option<&str> {
        self.canonical_names.get(&motion).map(String::as_str)
    }

    /// The user label shown for a motion, preferring `layer` when given
    pub fn user_label(
        &self,
        fighter: FighterId,
        motion: Motion,
        layer: Option<&str>,
    ) -> Option<&str> {
        let entries = self.user_labels(fighter);
        let preferred = layer.and_then(|layer| {
            entries
                .iter()
                .find(|e| e.motion == motion && e.layer == layer)
        });
        preferred
            .or_else(|| entries.iter().find(|e| e.motion == motion))
            .map(|e| e.label.as_str())
    }

    /// Preferred-layer label, any user label, canonical name, then hex.
    pub fn motion_to_display_string(
        &self,
        fighter: FighterId,
        motion: Motion,
        layer: Option<&str>,
    ) -> String {
        self.user_label(fighter, motion, layer)
            .or_else(|| self.canonical_name(motion))
            .map(str::to_string)
            .unwrap_or_else(|| motion.to_string())
    }

    /// Smallest motion id sharing this motion's user label.
    ///
    /// Motions without a user label are their own representative.
    pub fn representative_motion(
        &self,
        fighter: FighterId,
        motion: Motion,
        layer: Option<&str>,
    ) -> Motion {
        match self.user_label(fighter, motion, layer) {
            Some(label) => self
                .user_labels(fighter)
                .iter()
                .filter(|e| e.label.eq_ignore_ascii_case(label))
                .map(|e| e.motion)
                .min()
                .unwrap_or(motion),
            None => motion,
        }
    }
}
