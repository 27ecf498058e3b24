//! Data-driven scene loading for carryall.
//!
//! A scene file (RON, TOML or JSON, chosen by extension) names the anchors,
//! stacks, collectors, stations and loose items of a level. [`load_scene`]
//! resolves those names and returns a ready-to-run engine together with the
//! name tables.

pub mod loader;
pub mod scene;

pub use loader::{DataLoadError, Format};
pub use scene::{build_scene, load_scene, load_scene_str, Scene, SceneData};
