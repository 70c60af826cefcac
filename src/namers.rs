//! Version file naming.
//!
//! A [`VersionNamer`] turns an original filename plus a version into the
//! derived filename, and recovers the original filename from a derived one.
//! The association between a version file and its original lives only in the
//! name, so both directions must agree:
//!
//! | Namer | `photo.jpg` + `thumbnail {60x60 crop}` |
//! |---|---|
//! | [`SuffixNamer`] | `photo_thumbnail.jpg` |
//! | [`OptionsNamer`] | `photo_thumbnail--60x60--crop.jpg` |
//!
//! The options namer encodes the resolved options, so changing a version's
//! size or options produces a new file name instead of silently reusing a
//! stale file.

use crate::versions::{NON_NAMING_KEYS, OptionValue, VersionSpec, VersionTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything a namer needs to name one version of one file.
#[derive(Debug, Clone, Copy)]
pub struct NamingContext<'a> {
    /// Original filename without extension.
    pub root: &'a str,
    /// Original extension with leading dot (may be empty).
    pub extension: &'a str,
    pub version_id: &'a str,
    /// Fully resolved spec, caller overrides included.
    pub spec: &'a VersionSpec,
}

pub trait VersionNamer: Send + Sync {
    /// Derived filename for `ctx`.
    fn version_name(&self, ctx: &NamingContext<'_>) -> String;

    /// Identifier of the version `root` names, if it names one from `versions`.
    fn version_id(&self, root: &str, versions: &VersionTable) -> Option<String>;

    /// Original filename for a derived `root` + `extension`.
    ///
    /// Names that are not versions come back unchanged.
    fn original_name(&self, root: &str, extension: &str, versions: &VersionTable) -> String;
}

/// `{root}_{id}{ext}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixNamer;

impl VersionNamer for SuffixNamer {
    fn version_name(&self, ctx: &NamingContext<'_>) -> String {
        format!("{}_{}{}", ctx.root, ctx.version_id, ctx.extension)
    }

    fn version_id(&self, root: &str, versions: &VersionTable) -> Option<String> {
        // Longest match, so `photo_admin_thumbnail` is `admin_thumbnail`
        // rather than `thumbnail` of `photo_admin`.
        versions
            .ids()
            .filter(|id| {
                root.strip_suffix(id)
                    .and_then(|rest| rest.strip_suffix('_'))
                    .is_some_and(|original| !original.is_empty())
            })
            .max_by_key(|id| id.len())
            .map(str::to_string)
    }

    fn original_name(&self, root: &str, extension: &str, versions: &VersionTable) -> String {
        match self.version_id(root, versions) {
            Some(id) => {
                let original = &root[..root.len() - id.len() - 1];
                format!("{original}{extension}")
            }
            None => format!("{root}{extension}"),
        }
    }
}

/// `{root}_{id}--{w}x{h}--{options}{ext}`.
///
/// The options part never contains `_`, so the original is everything before
/// the last `_` of the root. Originals that themselves contain `_` and are
/// not versions cannot be told apart by name alone; such names are only
/// inverted after [`version_id`](VersionNamer::version_id) has matched.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionsNamer;

impl OptionsNamer {
    /// Tokens before sanitizing: identifier, size, then sorted truthy options.
    pub fn tokens(version_id: &str, spec: &VersionSpec) -> Vec<String> {
        let mut tokens = vec![version_id.to_string()];

        if spec.width.is_some() || spec.height.is_some() {
            tokens.push(format!(
                "{}x{}",
                spec.width.unwrap_or(0),
                spec.height.unwrap_or(0)
            ));
        }

        let mut options: Vec<(String, String)> = spec
            .opts
            .iter()
            .map(|opt| (opt.as_str().to_string(), opt.as_str().to_string()))
            .collect();
        for (key, value) in &spec.extra {
            if !value.is_truthy() || NON_NAMING_KEYS.contains(&key.as_str()) {
                continue;
            }
            let token = match value {
                OptionValue::Bool(true) => key.clone(),
                other => format!("{key}-{other}"),
            };
            options.push((key.clone(), token));
        }
        options.sort();
        options.dedup_by(|a, b| a.0 == b.0);
        tokens.extend(options.into_iter().map(|(_, token)| token));
        tokens
    }

    /// Joined and sanitized options part of a version name.
    pub fn options_string(version_id: &str, spec: &VersionSpec) -> String {
        sanitize(&Self::tokens(version_id, spec).join("--"))
    }
}

/// Commas become `x`, underscores and whitespace become `-`, anything else
/// that is not alphanumeric or `-` is dropped.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            ',' => Some('x'),
            '_' => Some('-'),
            c if c.is_whitespace() => Some('-'),
            c if c.is_alphanumeric() || c == '-' => Some(c),
            _ => None,
        })
        .collect()
}

impl VersionNamer for OptionsNamer {
    fn version_name(&self, ctx: &NamingContext<'_>) -> String {
        format!(
            "{}_{}{}",
            ctx.root,
            Self::options_string(ctx.version_id, ctx.spec),
            ctx.extension
        )
    }

    fn version_id(&self, root: &str, versions: &VersionTable) -> Option<String> {
        let (original, options) = root.rsplit_once('_')?;
        if original.is_empty() {
            return None;
        }
        let first = options.split("--").next()?;
        versions
            .ids()
            .find(|id| sanitize(id) == first)
            .map(str::to_string)
    }

    fn original_name(&self, root: &str, extension: &str, _versions: &VersionTable) -> String {
        match root.rsplit_once('_') {
            Some((original, _)) => format!("{original}{extension}"),
            None => format!("{root}{extension}"),
        }
    }
}

/// Namer selected by the `namer` config key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamerKind {
    #[default]
    Suffix,
    Options,
}

impl NamerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NamerKind::Suffix => "suffix",
            NamerKind::Options => "options",
        }
    }

    pub fn build(self) -> Arc<dyn VersionNamer> {
        match self {
            NamerKind::Suffix => Arc::new(SuffixNamer),
            NamerKind::Options => Arc::new(OptionsNamer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versions::default_versions;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn name_with(namer: &dyn VersionNamer, root: &str, ext: &str, id: &str) -> String {
        let table = default_versions();
        let spec = table.get(id).unwrap();
        namer.version_name(&NamingContext {
            root,
            extension: ext,
            version_id: id,
            spec,
        })
    }

    // =========================================================================
    // Suffix namer
    // =========================================================================

    #[test]
    fn suffix_version_name() {
        assert_eq!(
            name_with(&SuffixNamer, "testimage", ".jpg", "large"),
            "testimage_large.jpg"
        );
    }

    #[test]
    fn suffix_original_name() {
        let table = default_versions();
        assert_eq!(
            SuffixNamer.original_name("testimage_large", ".jpg", &table),
            "testimage.jpg"
        );
        assert_eq!(
            SuffixNamer.original_name("testimage_unknown", ".jpg", &table),
            "testimage_unknown.jpg"
        );
    }

    #[test]
    fn suffix_prefers_longest_identifier() {
        let table = default_versions();
        assert_eq!(
            SuffixNamer.version_id("photo_admin_thumbnail", &table).as_deref(),
            Some("admin_thumbnail")
        );
        assert_eq!(
            SuffixNamer.original_name("photo_admin_thumbnail", ".png", &table),
            "photo.png"
        );
    }

    #[test]
    fn suffix_bare_identifier_is_not_a_version() {
        let table = default_versions();
        assert_eq!(SuffixNamer.version_id("_large", &table), None);
        assert_eq!(SuffixNamer.version_id("large", &table), None);
    }

    // =========================================================================
    // Options namer
    // =========================================================================

    #[test]
    fn options_name_for_width_only() {
        assert_eq!(
            name_with(&OptionsNamer, "testimage", ".jpg", "small"),
            "testimage_small--140x0.jpg"
        );
    }

    #[test]
    fn options_name_for_crop() {
        assert_eq!(
            name_with(&OptionsNamer, "testimage", ".jpg", "admin_thumbnail"),
            "testimage_admin-thumbnail--60x60--crop.jpg"
        );
    }

    #[test]
    fn options_name_includes_sorted_extras() {
        let mut spec = VersionSpec::sized("", Some(100), Some(50));
        spec.extra = BTreeMap::from([
            ("zoom".to_string(), OptionValue::Text("1,5".to_string())),
            ("bw".to_string(), OptionValue::Bool(true)),
            ("off".to_string(), OptionValue::Bool(false)),
            ("quality".to_string(), OptionValue::Integer(80)),
            (
                "box".to_string(),
                OptionValue::List(vec![OptionValue::Integer(2), OptionValue::Integer(3)]),
            ),
        ]);
        assert_eq!(
            OptionsNamer::options_string("v", &spec),
            "v--100x50--box-2x3--bw--zoom-1x5"
        );
    }

    #[test]
    fn options_sanitize_strips_unsafe_characters() {
        let mut spec = VersionSpec::sized("", Some(10), None);
        spec.extra
            .insert("note".to_string(), OptionValue::Text("a b/c_d!".to_string()));
        assert_eq!(
            OptionsNamer::options_string("v", &spec),
            "v--10x0--note-a-bc-d"
        );
    }

    #[test]
    fn options_original_name_strips_last_block() {
        let table = default_versions();
        assert_eq!(
            OptionsNamer.original_name("testimage_admin-thumbnail--60x60--crop", ".jpg", &table),
            "testimage.jpg"
        );
        assert_eq!(
            OptionsNamer.version_id("testimage_admin-thumbnail--60x60--crop", &table).as_deref(),
            Some("admin_thumbnail")
        );
        assert_eq!(OptionsNamer.version_id("my_holiday", &table), None);
    }

    #[test]
    fn namer_kind_parses_lowercase() {
        #[derive(Deserialize)]
        struct W {
            namer: NamerKind,
        }
        let w: W = toml::from_str("namer = \"options\"").unwrap();
        assert_eq!(w.namer, NamerKind::Options);
        assert_eq!(NamerKind::default(), NamerKind::Suffix);
    }

    // =========================================================================
    // Round trip
    // =========================================================================

    fn collides(root: &str, id: &str, table: &VersionTable) -> bool {
        let name = format!("{root}_{id}");
        table
            .ids()
            .any(|other| other.len() > id.len() && name.ends_with(&format!("_{other}")))
    }

    proptest! {
        #[test]
        fn suffix_round_trip(
            root in "[a-zA-Z0-9_ -]{1,16}",
            ext in "(\\.[a-zA-Z]{1,4})?",
            idx in 0usize..6,
        ) {
            let table = default_versions();
            let id = table.ids().nth(idx).unwrap().to_string();
            prop_assume!(!collides(&root, &id, &table));

            let spec = table.get(&id).unwrap();
            let name = SuffixNamer.version_name(&NamingContext {
                root: &root, extension: &ext, version_id: &id, spec,
            });
            let parsed = crate::paths::parse_path(&name);
            prop_assert_eq!(SuffixNamer.version_id(&parsed.root, &table), Some(id));
            prop_assert_eq!(
                SuffixNamer.original_name(&parsed.root, &parsed.extension, &table),
                format!("{root}{ext}")
            );
        }

        #[test]
        fn options_round_trip(
            root in "[a-zA-Z0-9_-]{1,16}",
            ext in "(\\.[a-zA-Z]{1,4})?",
            idx in 0usize..6,
            rev in 0i64..5,
        ) {
            let table = default_versions();
            let id = table.ids().nth(idx).unwrap().to_string();
            let spec = table
                .get(&id)
                .unwrap()
                .with_overrides(&BTreeMap::from([("rev".to_string(), OptionValue::Integer(rev))]));
            let name = OptionsNamer.version_name(&NamingContext {
                root: &root, extension: &ext, version_id: &id, spec: &spec,
            });
            let parsed = crate::paths::parse_path(&name);
            prop_assert_eq!(OptionsNamer.version_id(&parsed.root, &table), Some(id));
            prop_assert_eq!(
                OptionsNamer.original_name(&parsed.root, &parsed.extension, &table),
                format!("{root}{ext}")
            );
        }
    }
}
