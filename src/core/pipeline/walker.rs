//! Input enumeration with extension-based filtering.
//!
//! Traverses the input directory and classifies files by extension
//! into symbolic or audio inputs. Separation stems that sit next to an
//! audio file (`song.vocals.wav`) are companions of that file, not
//! inputs of their own, and are skipped. Walk errors (permission
//! denied, etc.) are logged without aborting the enumeration.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::config::PipelineConfig;
use crate::core::error::{CadenzaError, Result};
use crate::core::types::Domain;

/// One candidate input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Full path to the file
    pub path: PathBuf,

    /// Path relative to the input directory, used for ordering
    pub relative: PathBuf,

    pub domain: Domain,
}

impl InputFile {
    /// Basename of the file
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// File system walker with extension-based classification
pub struct FileWalker {
    /// `*.<ext>` for each symbolic extension
    symbolic_patterns: Vec<Pattern>,

    /// `*.<ext>` for each audio extension
    audio_patterns: Vec<Pattern>,

    /// `*.<stem>.<ext>` for each stem suffix and audio extension
    stem_patterns: Vec<Pattern>,

    recursive: bool,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

impl FileWalker {
    /// Create a new file walker
    ///
    /// # Arguments
    ///
    /// * `symbolic_extensions` - Extensions (without dot) of symbolic inputs
    /// * `audio_extensions` - Extensions (without dot) of audio inputs
    /// * `stem_suffixes` - Second-to-last name components marking stems
    /// * `recursive` - Descend into subdirectories
    ///
    /// # Returns
    ///
    /// A new `FileWalker` instance or an error if an extension does not
    /// form a valid pattern
    pub fn new(
        symbolic_extensions: &[String],
        audio_extensions: &[String],
        stem_suffixes: &[String],
        recursive: bool,
    ) -> Result<Self> {
        let symbolic = symbolic_extensions
            .iter()
            .map(|ext| compile(&format!("*.{ext}")))
            .collect::<Result<Vec<_>>>()?;

        let audio = audio_extensions
            .iter()
            .map(|ext| compile(&format!("*.{ext}")))
            .collect::<Result<Vec<_>>>()?;

        let stems = stem_suffixes
            .iter()
            .flat_map(|stem| {
                audio_extensions
                    .iter()
                    .map(move |ext| compile(&format!("*.{stem}.{ext}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            symbolic_patterns: symbolic,
            audio_patterns: audio,
            stem_patterns: stems,
            recursive,
        })
    }

    /// Create a walker from the pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            &config.symbolic_extensions,
            &config.audio_extensions,
            &config.stem_suffixes,
            config.recursive,
        )
    }

    /// Collect all input files from a directory
    ///
    /// # Arguments
    ///
    /// * `root` - Input directory
    ///
    /// # Returns
    ///
    /// Input files sorted by relative path, or `InvalidPath` when
    /// `root` is not a directory
    pub fn collect_files(&self, root: &Path) -> Result<Vec<InputFile>> {
        if !root.is_dir() {
            return Err(CadenzaError::InvalidPath(format!(
                "Input directory does not exist: {}",
                root.display()
            )));
        }

        let mut walk = WalkDir::new(root).follow_links(false);
        if !self.recursive {
            walk = walk.max_depth(1);
        }

        let mut files = Vec::new();

        for entry in walk
            .into_iter()
            .filter_entry(|e| Self::should_process_entry(e, root))
        {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }

                    let path = entry.path();
                    let Some(domain) = self.classify(path) else {
                        tracing::debug!("Skipping non-input file: {:?}", path);
                        continue;
                    };

                    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
                    files.push(InputFile {
                        path: path.to_path_buf(),
                        relative,
                        domain,
                    });
                }
                Err(e) => {
                    tracing::warn!("Walk error: {}", e);
                }
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }

    /// Domain of a file by its name, `None` for non-inputs and stems
    pub fn classify(&self, path: &Path) -> Option<Domain> {
        let name = path.file_name()?.to_str()?;

        if self.stem_patterns.iter().any(|p| p.matches_with(name, MATCH_OPTIONS)) {
            return None;
        }

        if self.symbolic_patterns.iter().any(|p| p.matches_with(name, MATCH_OPTIONS)) {
            Some(Domain::Symbolic)
        } else if self.audio_patterns.iter().any(|p| p.matches_with(name, MATCH_OPTIONS)) {
            Some(Domain::Audio)
        } else {
            None
        }
    }

    /// Skip hidden entries; never filter the root itself
    fn should_process_entry(entry: &DirEntry, root: &Path) -> bool {
        if entry.path() == root {
            return true;
        }

        !entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern)
        .map_err(|e| CadenzaError::ConfigError(format!("Invalid extension pattern '{pattern}': {e}")))
}
