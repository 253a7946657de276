//! Prompt Library for the extraction calls
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/shuma/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! This allows appraisers to tune prompts without modifying the source,
//! while automatically getting new default prompts on upgrade.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::ExtractionKind;

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const LAND_REGISTRY: &str = include_str!("../../../prompts/land_registry.md");
    pub const BUILDING_PERMIT: &str = include_str!("../../../prompts/building_permit.md");
    pub const SHARED_BUILDING: &str = include_str!("../../../prompts/shared_building.md");
    pub const INTERIOR_ANALYSIS: &str = include_str!("../../../prompts/interior_analysis.md");
    pub const EXTERIOR_ANALYSIS: &str = include_str!("../../../prompts/exterior_analysis.md");
}

fn default_content(kind: ExtractionKind) -> &'static str {
    match kind {
        ExtractionKind::LandRegistry => defaults::LAND_REGISTRY,
        ExtractionKind::BuildingPermit => defaults::BUILDING_PERMIT,
        ExtractionKind::SharedBuilding => defaults::SHARED_BUILDING,
        ExtractionKind::InteriorImages => defaults::INTERIOR_ANALYSIS,
        ExtractionKind::ExteriorImages => defaults::EXTERIOR_ANALYSIS,
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Extraction kind this prompt drives
    pub kind: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
}

impl Prompt {
    /// Get the system section of the prompt
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the user section with `{{var}}` placeholders replaced
    pub fn render_user(&self, vars: &HashMap<&str, String>) -> String {
        let mut result = self.user_section().unwrap_or(&self.content).to_string();
        for (key, value) in vars {
            let pattern = format!("{{{{{}}}}}", key);
            result = result.replace(&pattern, value);
        }
        result
    }
}

/// Prompt library for loading and caching prompts
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<ExtractionKind, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt, caching it for later calls
    pub fn get(&mut self, kind: ExtractionKind) -> Result<&Prompt> {
        match self.cache.entry(kind) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let prompt = load_prompt(self.override_dir.as_deref(), kind)?;
                Ok(entry.insert(prompt))
            }
        }
    }

    /// Load a prompt without caching (override first, then default)
    pub fn load(&self, kind: ExtractionKind) -> Result<Prompt> {
        if let Some(prompt) = self.cache.get(&kind) {
            return Ok(prompt.clone());
        }
        load_prompt(self.override_dir.as_deref(), kind)
    }

    /// Check if a prompt has an override file
    pub fn has_override(&self, kind: ExtractionKind) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|dir| dir.join(format!("{}.md", kind.as_str())).exists())
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("shuma").join("prompts").join("overrides"))
}

fn load_prompt(override_dir: Option<&Path>, kind: ExtractionKind) -> Result<Prompt> {
    if let Some(dir) = override_dir {
        let path = dir.join(format!("{}.md", kind.as_str()));
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::InvalidData(format!("Failed to read prompt override: {}", e))
            })?;
            let (metadata, body) = parse_prompt(&content)?;
            return Ok(Prompt {
                metadata,
                content: body,
                is_override: true,
            });
        }
    }

    let (metadata, body) = parse_prompt(default_content(kind))?;
    Ok(Prompt {
        metadata,
        content: body,
        is_override: false,
    })
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts_parse() {
        for kind in ExtractionKind::all() {
            let (metadata, body) = parse_prompt(default_content(*kind)).unwrap();
            assert_eq!(metadata.id, kind.as_str());
            assert_eq!(metadata.kind, kind.as_str());
            assert!(body.contains("# System"), "{} has no system section", kind);
            assert!(body.contains("# User"), "{} has no user section", kind);
        }
    }

    #[test]
    fn test_render_user() {
        let lib = PromptLibrary::embedded_only();
        let prompt = lib.load(ExtractionKind::LandRegistry).unwrap();
        let mut vars = HashMap::new();
        vars.insert("document_names", "tabu.pdf".to_string());
        let rendered = prompt.render_user(&vars);
        assert!(rendered.contains("(tabu.pdf)"));
        assert!(!rendered.contains("# System"));
    }

    #[test]
    fn test_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("building_permit.md"),
            "---\nid: building_permit\nversion: 7\nkind: building_permit\n---\n\n# System\nS\n\n# User\nU",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(ExtractionKind::BuildingPermit));
        assert!(!lib.has_override(ExtractionKind::LandRegistry));

        let prompt = lib.get(ExtractionKind::BuildingPermit).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 7);
        assert_eq!(prompt.user_section(), Some("U"));

        let fallback = lib.get(ExtractionKind::LandRegistry).unwrap();
        assert!(!fallback.is_override);
    }

    #[test]
    fn test_rejects_missing_frontmatter() {
        assert!(parse_prompt("# System\nno frontmatter").is_err());
        assert!(parse_prompt("---\nid: x\n# System").is_err());
    }
}
