use ab_glyph::FontVec;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;
use tracing::debug;

use crate::FontConfig;
use crate::watermark::RenderError;

/// Resolves (family, weight) pairs to font files and caches parsed fonts.
///
/// The lookup tries `<family>-<weight>.{ttf,otf}` then `<family>.{ttf,otf}`
/// in each configured directory, falling back to the configured default font.
pub struct FontLibrary {
    config: FontConfig,
    cache: HashMap<PathBuf, FontVec>,
}

impl FontLibrary {
    pub fn new(config: FontConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, family: &str, weight: &str) -> Result<&FontVec, RenderError> {
        let path = self
            .locate(family, weight)
            .ok_or_else(|| RenderError::FontNotFound {
                family: family.to_string(),
                weight: weight.to_string(),
            })?;

        match self.cache.entry(path.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                debug!("Loading font from {:?}", path);
                let data = std::fs::read(&path)?;
                let font = FontVec::try_from_vec(data)
                    .map_err(|_| RenderError::FontParse(path.display().to_string()))?;
                Ok(entry.insert(font))
            }
        }
    }

    /// Find a font file for the given family and weight without parsing it.
    pub fn locate(&self, family: &str, weight: &str) -> Option<PathBuf> {
        let weight = normalize_weight(weight);
        let mut names = Vec::new();

        // Regular weights resolve to the bare family file first
        if weight == "regular" {
            names.push(family.to_string());
        }
        names.push(format!("{}-{}", family, capitalize(&weight)));
        names.push(format!("{}-{}", family, weight));
        if weight != "regular" {
            names.push(family.to_string());
        }

        for directory in &self.config.directories {
            for name in &names {
                for extension in ["ttf", "otf"] {
                    let candidate = directory.join(format!("{}.{}", name, extension));
                    if candidate.exists() {
                        return Some(candidate);
                    }
                }
            }
        }

        self.config
            .default_font
            .as_ref()
            .filter(|path| path.exists())
            .cloned()
    }
}

/// Map numeric CSS-style weights onto conventional font file suffixes.
fn normalize_weight(weight: &str) -> String {
    match weight.trim() {
        "100" => "thin".to_string(),
        "200" => "extralight".to_string(),
        "300" => "light".to_string(),
        "400" | "normal" | "" => "regular".to_string(),
        "500" => "medium".to_string(),
        "600" => "semibold".to_string(),
        "700" => "bold".to_string(),
        "800" => "extrabold".to_string(),
        "900" => "black".to_string(),
        other => other.to_lowercase(),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// A font usable for pixel-level tests, or `None` when the host has none of
/// the well-known ones installed.
#[cfg(test)]
pub(crate) fn system_test_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library_with_dir(dir: PathBuf) -> FontLibrary {
        FontLibrary::new(FontConfig {
            directories: vec![dir],
            default_font: None,
        })
    }

    #[test]
    fn test_normalize_weight() {
        assert_eq!(normalize_weight("400"), "regular");
        assert_eq!(normalize_weight("normal"), "regular");
        assert_eq!(normalize_weight("700"), "bold");
        assert_eq!(normalize_weight("800"), "extrabold");
        assert_eq!(normalize_weight("Bold"), "bold");
    }

    #[test]
    fn test_locate_weighted_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("Inter-Bold.ttf"), b"stub").unwrap();

        let library = library_with_dir(temp_dir.path().to_path_buf());
        let found = library.locate("Inter", "700").unwrap();
        assert_eq!(found.file_name().unwrap(), "Inter-Bold.ttf");
    }

    #[test]
    fn test_locate_falls_back_to_bare_family() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("Inter.ttf"), b"stub").unwrap();

        let library = library_with_dir(temp_dir.path().to_path_buf());
        let found = library.locate("Inter", "800").unwrap();
        assert_eq!(found.file_name().unwrap(), "Inter.ttf");
    }

    #[test]
    fn test_locate_missing_family() {
        let temp_dir = TempDir::new().unwrap();
        let library = library_with_dir(temp_dir.path().to_path_buf());
        assert!(library.locate("Nonexistent", "regular").is_none());
    }

    #[test]
    fn test_locate_uses_default_font_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let fallback = temp_dir.path().join("Fallback.ttf");
        std::fs::write(&fallback, b"stub").unwrap();

        let library = FontLibrary::new(FontConfig {
            directories: vec![temp_dir.path().join("empty")],
            default_font: Some(fallback.clone()),
        });
        assert_eq!(library.locate("Missing", "regular"), Some(fallback));
    }

    #[test]
    fn test_resolve_parses_and_caches_real_font() {
        let Some(font_path) = system_test_font() else {
            return;
        };

        let mut library = FontLibrary::new(FontConfig {
            directories: Vec::new(),
            default_font: Some(font_path),
        });
        assert!(library.resolve("Anything", "regular").is_ok());
        assert_eq!(library.cache.len(), 1);
        assert!(library.resolve("Anything", "bold").is_ok());
        assert_eq!(library.cache.len(), 1);
    }

    #[test]
    fn test_resolve_unparseable_font_fails() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("Broken.ttf"), b"not a font").unwrap();

        let mut library = library_with_dir(temp_dir.path().to_path_buf());
        let result = library.resolve("Broken", "regular");
        assert!(matches!(result, Err(RenderError::FontParse(_))));
    }
}
