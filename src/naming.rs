//! Derives (day, sample, dilution) from plate photo file and folder names.
//!
//! Understood layouts, with `_` as delimiter:
//!
//! * `<sample>_<ordinal>[_dilution]` inside a `Day <N>` folder
//! * `<day>_<sample>_<ordinal>[_dilution]`, day falling back to the folder
//!
//! Stems ending in `label` are plate label shots and carry no record.

use log::{info, warn};
use std::path::Path;

use crate::model::{Dilution, Timepoint};
use crate::params::ResolverConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub display_name: String,
    pub day: Option<i64>,
    pub sample: Option<u32>,
    pub dilution: Option<Dilution>,
}

impl ResolvedName {
    fn raw(basename: &str) -> Self {
        Self {
            display_name: basename.to_string(),
            day: None,
            sample: None,
            dilution: None,
        }
    }

    /// Report record for `count` colonies; `None` unless all three fields resolved.
    pub fn timepoint(&self, count: usize) -> Option<Timepoint> {
        Some(Timepoint {
            day: self.day?,
            sample_number: self.sample?,
            dilution: self.dilution?,
            num_keypoints: count,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    config: ResolverConfig,
}

impl NameResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(&self, path: &Path) -> ResolvedName {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let folder = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        self.resolve_name(&basename, folder.as_deref())
    }

    pub fn resolve_name(&self, basename: &str, folder: Option<&str>) -> ResolvedName {
        let cfg = &self.config;
        let stem = match basename.rfind('.') {
            Some(dot) if dot > 0 => &basename[..dot],
            _ => basename,
        };
        if stem
            .to_ascii_lowercase()
            .ends_with(&cfg.label_suffix.to_ascii_lowercase())
        {
            info!("skipping label image {basename}");
            return ResolvedName::raw(basename);
        }

        let parts: Vec<&str> = stem.split(cfg.delimiter).collect();
        let marked = |i: usize| {
            parts.get(i).is_some_and(|p| {
                p.to_ascii_lowercase()
                    .contains(&cfg.dilution_marker.to_ascii_lowercase())
            })
        };
        let folder_day = || folder.and_then(day_from_folder);

        let (day, sample_part, dilution_part) = match parts.len() {
            n if n == 2 || (n == 3 && marked(2)) => (folder_day(), parts[0], parts[1]),
            n if n == 3 || (n == 4 && marked(3)) => {
                let inline = parts[0].parse::<i64>().ok();
                (inline.or_else(folder_day), parts[1], parts[2])
            }
            _ => {
                warn!("unable to parse image name {basename}, using file name");
                return ResolvedName::raw(basename);
            }
        };

        let day = if cfg.use_day { day } else { None };
        let sample = first_numeric_token(sample_part);
        if sample.is_none() {
            warn!("no sample number in {basename}");
        }
        let dilution = if cfg.use_dilution {
            self.dilution(dilution_part)
        } else {
            None
        };

        let mut pieces = Vec::new();
        if let Some(day) = day {
            pieces.push(format!("Day {day}"));
        }
        if let Some(sample) = sample {
            pieces.push(format!("Sample {sample}"));
        }
        if let Some(dilution) = dilution {
            pieces.push(format!("{dilution} dilution"));
        }
        let display_name = if pieces.is_empty() {
            basename.to_string()
        } else {
            pieces.join(" - ")
        };

        ResolvedName {
            display_name,
            day,
            sample,
            dilution,
        }
    }

    /// One retry with the configured default ordinal, no further.
    fn dilution(&self, text: &str) -> Option<Dilution> {
        Dilution::from_ordinal(text).or_else(|| {
            let fallback = Dilution::from_ordinal(&self.config.default_ordinal);
            if fallback.is_none() {
                warn!(
                    "default dilution {:?} has no ordinal marker",
                    self.config.default_ordinal
                );
            }
            fallback
        })
    }
}

/// `"Day 12"` anywhere in the folder name; the number is its leading digits.
fn day_from_folder(folder: &str) -> Option<i64> {
    let lower = folder.to_ascii_lowercase();
    let mut rest = &lower[..];
    while let Some(at) = rest.find("day ") {
        let after = &rest[at + 4..];
        let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            return digits.parse().ok();
        }
        rest = after;
    }
    None
}

fn first_numeric_token(part: &str) -> Option<u32> {
    part.split(|c: char| !c.is_ascii_alphanumeric())
        .find(|tok| !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit()))
        .and_then(|tok| tok.parse().ok())
}
