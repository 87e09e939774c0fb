//! Per-item recording duration policy

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::PolicyError;

/// Target used when an item has no table entry (seconds)
pub const DEFAULT_TARGET_SECONDS: f64 = 6.0;

/// Tolerance used when an item has no table entry (milliseconds)
pub const DEFAULT_TOLERANCE_MS: u32 = 500;

/// Longest accepted target (seconds)
pub const MAX_TARGET_SECONDS: f64 = 3600.0;

/// Built-in practice phrases: (item id, target seconds)
const BUILTIN_TARGETS: [(u32, f64); 14] = [
    (1, 6.0),
    (2, 8.0),
    (3, 8.0),
    (4, 9.0),
    (5, 7.0),
    (6, 7.0),
    (7, 8.0),
    (8, 8.0),
    (9, 8.0),
    (10, 8.0),
    (11, 6.0),
    (12, 6.0),
    (13, 6.0),
    (14, 8.0),
];

/// Duration requirement for a single practice item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationSpec {
    pub item_id: u32,
    pub target_seconds: f64,
    #[serde(default = "default_tolerance_ms")]
    pub tolerance_ms: u32,
}

fn default_tolerance_ms() -> u32 {
    DEFAULT_TOLERANCE_MS
}

impl DurationSpec {
    /// Create a spec with the default tolerance
    pub const fn new(item_id: u32, target_seconds: f64) -> Self {
        Self {
            item_id,
            target_seconds,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
        }
    }

    /// Override the tolerance
    pub const fn with_tolerance_ms(mut self, tolerance_ms: u32) -> Self {
        self.tolerance_ms = tolerance_ms;
        self
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if !is_valid_target(self.target_seconds) {
            return Err(PolicyError::InvalidTarget {
                item_id: self.item_id,
                target_seconds: self.target_seconds,
            });
        }
        Ok(())
    }
}

fn is_valid_target(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0 && seconds <= MAX_TARGET_SECONDS
}

/// Accepted duration window derived from a target and tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingTiming {
    pub target_duration: f64,
    pub tolerance_ms: u32,
    pub min_duration: f64,
    pub max_duration: f64,
}

impl RecordingTiming {
    /// Build the window around `target_duration`
    pub fn new(target_duration: f64, tolerance_ms: u32) -> Self {
        let tolerance = tolerance_ms as f64 / 1000.0;
        Self {
            target_duration,
            tolerance_ms,
            min_duration: (target_duration - tolerance).max(0.0),
            max_duration: target_duration + tolerance,
        }
    }

    /// Target as a std duration
    pub fn target(&self) -> Result<std::time::Duration, PolicyError> {
        if !is_valid_target(self.target_duration) {
            return Err(PolicyError::TargetOutOfRange(self.target_duration));
        }
        std::time::Duration::try_from_secs_f64(self.target_duration)
            .map_err(|_| PolicyError::TargetOutOfRange(self.target_duration))
    }

    /// Whether `observed` lies inside the window (inclusive)
    pub fn contains(&self, observed: f64) -> bool {
        observed.is_finite() && observed >= self.min_duration && observed <= self.max_duration
    }

    /// Keep `observed` when inside the window, otherwise snap to the target
    pub fn correct(&self, observed: f64) -> f64 {
        if self.contains(observed) {
            observed
        } else {
            self.target_duration
        }
    }

    /// Classify `observed` against the window
    pub fn assess(&self, observed: f64) -> DurationVerdict {
        if self.contains(observed) {
            DurationVerdict::Acceptable
        } else if observed.is_finite() && observed < self.min_duration {
            DurationVerdict::TooShort
        } else {
            DurationVerdict::TooLong
        }
    }

    /// Feedback line such as "Perfect! 0:06 (Target: 0:06)"
    pub fn message(&self, observed: f64) -> String {
        format!(
            "{} {} (Target: {})",
            self.assess(observed).label(),
            format_clock(observed),
            format_clock(self.target_duration)
        )
    }
}

/// Outcome of comparing an observed duration with its window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationVerdict {
    Acceptable,
    TooShort,
    TooLong,
}

impl DurationVerdict {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Acceptable => "Perfect!",
            Self::TooShort => "Too short!",
            Self::TooLong => "Too long!",
        }
    }
}

impl fmt::Display for DurationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Format seconds as `m:ss`
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Table of duration requirements keyed by item id.
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct DurationPolicy {
    specs: BTreeMap<u32, DurationSpec>,
}

impl DurationPolicy {
    /// Policy with the built-in phrase table
    pub fn builtin() -> Self {
        let specs = BUILTIN_TARGETS
            .iter()
            .map(|&(id, target)| (id, DurationSpec::new(id, target)))
            .collect();
        Self { specs }
    }

    /// Build a policy from explicit entries. Each item id may appear once.
    pub fn from_specs<I>(specs: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = DurationSpec>,
    {
        let mut table = BTreeMap::new();
        for spec in specs {
            spec.validate()?;
            if table.insert(spec.item_id, spec).is_some() {
                return Err(PolicyError::DuplicateItem(spec.item_id));
            }
        }
        Ok(Self { specs: table })
    }

    /// Replace or add entries. Overrides must be unique among themselves.
    pub fn with_overrides<I>(mut self, overrides: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = DurationSpec>,
    {
        let overrides = Self::from_specs(overrides)?;
        self.specs.extend(overrides.specs);
        Ok(self)
    }

    /// Entry for `item_id`, if present
    pub fn spec(&self, item_id: u32) -> Option<&DurationSpec> {
        self.specs.get(&item_id)
    }

    /// All entries ordered by item id
    pub fn specs(&self) -> impl Iterator<Item = &DurationSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Target seconds for `item_id`, or the default
    pub fn target_duration(&self, item_id: u32) -> f64 {
        self.spec(item_id)
            .map(|s| s.target_seconds)
            .unwrap_or(DEFAULT_TARGET_SECONDS)
    }

    /// Tolerance in milliseconds for `item_id`, or the default
    pub fn tolerance(&self, item_id: u32) -> u32 {
        self.spec(item_id)
            .map(|s| s.tolerance_ms)
            .unwrap_or(DEFAULT_TOLERANCE_MS)
    }

    /// Timing window for `item_id`.
    ///
    /// When the item is unknown, `fallback_seconds` (if given) replaces the
    /// default target.
    pub fn compute_timing(&self, item_id: u32, fallback_seconds: Option<f64>) -> RecordingTiming {
        match self.spec(item_id) {
            Some(spec) => RecordingTiming::new(spec.target_seconds, spec.tolerance_ms),
            None => {
                let target = fallback_seconds
                    .filter(|s| is_valid_target(*s))
                    .unwrap_or(DEFAULT_TARGET_SECONDS);
                RecordingTiming::new(target, DEFAULT_TOLERANCE_MS)
            }
        }
    }

    /// Whether `observed` is within tolerance for `item_id`
    pub fn is_within_tolerance(&self, item_id: u32, observed: f64) -> bool {
        self.compute_timing(item_id, None).contains(observed)
    }

    /// Keep `observed` if within tolerance, otherwise snap to the target
    pub fn validate_and_correct(&self, item_id: u32, observed: f64) -> f64 {
        self.compute_timing(item_id, None).correct(observed)
    }

    /// Classify `observed` for `item_id`
    pub fn assess(&self, item_id: u32, observed: f64) -> DurationVerdict {
        self.compute_timing(item_id, None).assess(observed)
    }
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self::builtin()
    }
}
