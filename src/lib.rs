//! # Media Versions
//!
//! Derived image versions for a media library. An original such as
//! `uploads/dawn.jpg` has a set of named versions (`thumbnail`, `small`,
//! `large`, ...), each a resized or cropped copy whose location follows from
//! the original's path and the version name alone. Versions are created on
//! first request and recreated whenever the original is newer.
//!
//! # Lifecycle of a version
//!
//! ```text
//! Absent ──▶ Generating ──▶ Fresh ──(original touched)──▶ Stale ──▶ Generating
//! ```
//!
//! Staleness is a comparison of modification times, so a fresh version costs
//! two metadata reads. There is no database and no manifest: the filename is
//! the only link between a version and its original, which is why naming is
//! a reversible, pluggable strategy ([`namers`]).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `media-versions.toml` loading, stock defaults, merging, validation |
//! | [`paths`] | Storage path parsing: head, filename, root, extension, joining |
//! | [`storage`] | [`Storage`](storage::Storage) port and the filesystem implementation |
//! | [`versions`] | Version specs and the version table |
//! | [`namers`] | Version filename strategies and their inverses |
//! | [`site`] | The bundle of storage, config, namer, backend and processors |
//! | [`file_object`] | A file in the library: metadata, version paths, originals |
//! | [`generator`] | Resolve a version: reuse when fresh, regenerate otherwise |
//! | [`imaging`] | Scale/crop math, codec backend, post-processors |
//! | [`process`] | Batch generation and removal across a directory tree |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Storage Behind a Trait
//!
//! All reads, writes and metadata go through [`storage::Storage`]. Paths are
//! `/`-separated strings relative to the media root, never `PathBuf`s, so
//! the same naming rules hold for any backend. The filesystem implementation
//! never overwrites on `save`; it picks a free name and the generator moves
//! the result onto the exact version path.
//!
//! ## Two Namers
//!
//! [`namers::SuffixNamer`] produces `dawn_small.jpg`. [`namers::OptionsNamer`]
//! produces `dawn_small--140x0.jpg`, encoding the size and options, so editing
//! a version spec changes the filename and old files are never mistaken for
//! current ones.
//!
//! ## Small Originals Are Not Enlarged
//!
//! A version wider than its original is stored as an unscaled copy of the
//! original. Forced generation upscales instead.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! resampling and encoding. No ImageMagick, no system libraries.
//!
//! ## No Locking
//!
//! Two callers regenerating the same stale version both write it; the last
//! writer wins. Batch commands parallelize across files, never within one.

pub mod config;
pub mod file_object;
pub mod generator;
pub mod imaging;
pub mod namers;
pub mod output;
pub mod paths;
pub mod process;
pub mod site;
pub mod storage;
pub mod versions;

#[cfg(test)]
pub(crate) mod test_helpers;
