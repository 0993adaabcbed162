//! JSON catalog manifest.
//!
//! The CLI does not know how to query store registries or config files, so
//! its catalog is a declarative JSON document: marker files, a fixed
//! executable path, and optionally a *hint path* which quick discovery
//! treats as a self-reported location (still verified before anything is
//! emitted).

// -- std imports
use std::{path::PathBuf, sync::Arc};

// -- crate imports
use anyhow::{Context, Result, bail};
use serde::Deserialize;

// -- module imports
use crate::catalog::{
    FixedPathProvider, GameDescriptor, IconMode, PathProvider, ToolDescriptor, fixed_executable,
};

/// Top-level manifest document.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub games: Vec<GameManifest>,
}

/// One game entry in the manifest.
#[derive(Debug, Deserialize)]
pub struct GameManifest {
    pub id: String,
    pub name: String,

    /// Relative marker paths proving an install.
    #[serde(default)]
    pub required_files: Vec<String>,

    /// Launch executable, relative to the install root.
    pub executable: PathBuf,

    /// Optional self-reported install location.
    #[serde(default)]
    pub hint_path: Option<PathBuf>,

    #[serde(default)]
    pub icon_mode: IconMode,

    #[serde(default)]
    pub tools: Vec<ToolManifest>,
}

/// One support tool entry nested under a game.
#[derive(Debug, Deserialize)]
pub struct ToolManifest {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub required_files: Vec<String>,

    pub executable: PathBuf,

    #[serde(default)]
    pub hint_path: Option<PathBuf>,

    /// True when the tool always lives inside the game's install root.
    #[serde(default)]
    pub relative: bool,

    #[serde(default)]
    pub parameters: Vec<String>,

    /// Hide the tool from launch surfaces.
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub icon_mode: IconMode,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    ///
    /// # Errors
    /// - [`anyhow::Error`] on malformed JSON or duplicate game ids.
    pub fn from_json(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(content).context("Failed to parse catalog manifest")?;

        let mut seen = std::collections::HashSet::new();
        for game in &manifest.games {
            if !seen.insert(game.id.as_str()) {
                bail!("Duplicate game id in catalog: {}", game.id);
            }
        }
        Ok(manifest)
    }

    /// Convert into engine descriptors.
    pub fn into_descriptors(self) -> Vec<GameDescriptor> {
        self.games.into_iter().map(GameManifest::into_descriptor).collect()
    }
}

impl GameManifest {
    fn into_descriptor(self) -> GameDescriptor {
        GameDescriptor {
            id: self.id,
            name: self.name,
            required_files: self.required_files,
            executable: fixed_executable(self.executable),
            self_report: hint_provider(self.hint_path),
            icon_mode: self.icon_mode,
            tools: self.tools.into_iter().map(ToolManifest::into_descriptor).collect(),
        }
    }
}

impl ToolManifest {
    fn into_descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            id: self.id,
            name: self.name,
            required_files: self.required_files,
            executable: fixed_executable(self.executable),
            self_report: hint_provider(self.hint_path),
            relative: self.relative,
            parameters: self.parameters,
            hidden: self.hidden,
            icon_mode: self.icon_mode,
        }
    }
}

fn hint_provider(hint: Option<PathBuf>) -> Option<Arc<dyn PathProvider>> {
    hint.map(|path| Arc::new(FixedPathProvider(path)) as Arc<dyn PathProvider>)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "games": [
            {
                "id": "foo",
                "name": "Foo",
                "required_files": ["foo.exe", "data/core.pak"],
                "executable": "foo.exe",
                "hint_path": "/opt/foo",
                "icon_mode": "executable",
                "tools": [
                    {
                        "id": "foo-editor",
                        "name": "Foo Editor",
                        "required_files": ["tools/editor.exe"],
                        "executable": "tools/editor.exe",
                        "relative": true,
                        "parameters": ["--edit"],
                        "hidden": true
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_and_converts() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let games = manifest.into_descriptors();
        assert_eq!(games.len(), 1);

        let game = &games[0];
        assert_eq!(game.id, "foo");
        assert_eq!(game.required_files, vec!["foo.exe", "data/core.pak"]);
        assert_eq!(game.icon_mode, IconMode::Executable);
        assert!(game.self_report.is_some());

        let tool = &game.tools[0];
        assert!(tool.relative);
        assert!(tool.hidden);
        assert_eq!(tool.parameters, vec!["--edit"]);
        assert_eq!(
            (tool.executable)(None).unwrap(),
            PathBuf::from("tools/editor.exe")
        );
    }

    #[test]
    fn defaults_are_lenient() {
        let manifest = Manifest::from_json(
            r#"{"games": [{"id": "g", "name": "G", "executable": "g.exe"}]}"#,
        )
        .unwrap();
        let games = manifest.into_descriptors();
        assert!(games[0].required_files.is_empty());
        assert!(games[0].tools.is_empty());
        assert_eq!(games[0].icon_mode, IconMode::None);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Manifest::from_json(
            r#"{"games": [
                {"id": "g", "name": "A", "executable": "a.exe"},
                {"id": "g", "name": "B", "executable": "b.exe"}
            ]}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Manifest::from_json("{not json").is_err());
    }
}
