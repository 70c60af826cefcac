//! Version specifications: what each named version of an image looks like.
//!
//! A version table maps identifiers (`thumbnail`, `large`, ...) to a
//! [`VersionSpec`]. Tables are read from the `[versions.<id>]` sections of the
//! config file and validated once at load time; at runtime they are read-only.
//!
//! ```toml
//! [versions.thumbnail]
//! verbose_name = "Thumbnail (60x60)"
//! width = 60
//! height = 60
//! opts = ["crop"]
//!
//! [versions.large]
//! verbose_name = "Large (680px)"
//! width = 680
//!
//! [versions.large.extra]   # naming-only options
//! rev = 2
//! ```

use crate::imaging::{ScaleOption, ScaleOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form option value carried only for naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<OptionValue>),
}

impl OptionValue {
    /// `false`, `0`, `""` and `[]` are left out of option-encoded names.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Integer(i) => *i != 0,
            OptionValue::Float(f) => *f != 0.0,
            OptionValue::Text(s) => !s.is_empty(),
            OptionValue::List(items) => !items.is_empty(),
        }
    }
}

impl fmt::Display for OptionValue {
    /// Lists render as their items joined by `x`, so `[2, 3]` reads `2x3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Integer(i) => write!(f, "{i}"),
            OptionValue::Float(v) => write!(f, "{v}"),
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str("x")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Extra keys that never reach option-encoded names.
pub const NON_NAMING_KEYS: &[&str] = &[
    "size",
    "width",
    "height",
    "quality",
    "subsampling",
    "verbose_name",
];

/// One named version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionSpec {
    /// Human readable label.
    #[serde(default)]
    pub verbose_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opts: Vec<ScaleOption>,
    /// Options that only affect naming (cache busting with the options namer).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, OptionValue>,
}

impl VersionSpec {
    /// A fit-into-box version without options.
    pub fn sized(verbose_name: &str, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            verbose_name: verbose_name.to_string(),
            width,
            height,
            ..Self::default()
        }
    }

    /// A fill-and-crop version.
    pub fn cropped(verbose_name: &str, width: u32, height: u32) -> Self {
        Self {
            opts: vec![ScaleOption::Crop],
            ..Self::sized(verbose_name, Some(width), Some(height))
        }
    }

    /// Width with `0` treated as unset.
    pub fn target_width(&self) -> Option<u32> {
        self.width.filter(|&w| w > 0)
    }

    /// Height with `0` treated as unset.
    pub fn target_height(&self) -> Option<u32> {
        self.height.filter(|&h| h > 0)
    }

    pub fn scale_options(&self) -> ScaleOptions {
        ScaleOptions::from_opts(&self.opts)
    }

    pub fn has(&self, opt: ScaleOption) -> bool {
        self.opts.contains(&opt)
    }

    /// Copy of this spec with `overrides` merged into its extra options.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, OptionValue>) -> Self {
        let mut spec = self.clone();
        spec.extra
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        spec
    }

    /// Check the spec can be executed.
    ///
    /// At least one dimension is required, `crop` needs both, and extra keys
    /// must be non-empty names that do not shadow a real field.
    pub fn validate(&self, id: &str) -> Result<(), String> {
        if self.target_width().is_none() && self.target_height().is_none() {
            return Err(format!("version '{id}' needs a width or a height"));
        }
        if self.has(ScaleOption::Crop)
            && (self.target_width().is_none() || self.target_height().is_none())
        {
            return Err(format!(
                "version '{id}' uses crop and needs both width and height"
            ));
        }
        for key in self.extra.keys() {
            if key.is_empty() || matches!(key.as_str(), "width" | "height" | "opts") {
                return Err(format!("version '{id}' has invalid extra option '{key}'"));
            }
        }
        Ok(())
    }
}

/// Identifier → spec, sorted by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTable(BTreeMap<String, VersionSpec>);

impl VersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, spec: VersionSpec) {
        self.0.insert(id.into(), spec);
    }

    pub fn get(&self, id: &str) -> Option<&VersionSpec> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionSpec)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate every spec; identifiers must be non-empty and free of `/`.
    pub fn validate(&self) -> Result<(), String> {
        for (id, spec) in self.iter() {
            if id.is_empty() || id.contains('/') || id.chars().any(char::is_whitespace) {
                return Err(format!("invalid version identifier '{id}'"));
            }
            spec.validate(id)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, VersionSpec)> for VersionTable {
    fn from_iter<T: IntoIterator<Item = (String, VersionSpec)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The stock version set.
pub fn default_versions() -> VersionTable {
    [
        ("admin_thumbnail", VersionSpec::cropped("Admin Thumbnail", 60, 60)),
        ("thumbnail", VersionSpec::cropped("Thumbnail (1 col)", 60, 60)),
        ("small", VersionSpec::sized("Small (2 col)", Some(140), None)),
        ("medium", VersionSpec::sized("Medium (4 col)", Some(300), None)),
        ("big", VersionSpec::sized("Big (6 col)", Some(460), None)),
        ("large", VersionSpec::sized("Large (8 col)", Some(680), None)),
    ]
    .into_iter()
    .map(|(id, spec)| (id.to_string(), spec))
    .collect()
}
