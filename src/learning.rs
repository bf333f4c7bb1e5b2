//! Learning examples
//!
//! Previously generated or uploaded `.docx` files kept as structural
//! templates. Each example is reduced to a [`StructureProfile`]
//! (paragraph/table counts and the shape of the first table) which the
//! generators use to match the layout of documents people actually sent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use office_types::TemplateType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::docx::{analyze_docx, DocumentStructure};
use crate::error::OfficeResult;

/// Shape of one example document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureProfile {
    pub source_file: String,
    /// `None` when neither the file name nor the content gave it away
    pub template_type: Option<TemplateType>,
    pub paragraph_count: usize,
    pub table_count: usize,
    /// Header row of the first table
    pub table_headers: Vec<String>,
    /// Data rows of the first table, header excluded
    pub table_rows: usize,
    pub added_at: DateTime<Utc>,
}

impl StructureProfile {
    pub fn from_structure(
        source_file: impl Into<String>,
        template_type: Option<TemplateType>,
        structure: &DocumentStructure,
        added_at: DateTime<Utc>,
    ) -> Self {
        let first_table = structure.tables.first();
        Self {
            source_file: source_file.into(),
            template_type,
            paragraph_count: structure.paragraph_count,
            table_count: structure.table_count,
            table_headers: first_table
                .and_then(|t| t.header())
                .map(|h| h.iter().map(|c| c.trim().to_string()).collect())
                .unwrap_or_default(),
            table_rows: first_table.map(|t| t.rows.saturating_sub(1)).unwrap_or(0),
            added_at,
        }
    }
}

pub struct LearningLibrary {
    dir: PathBuf,
    profiles: RwLock<Vec<StructureProfile>>,
}

impl LearningLibrary {
    /// Empty library writing new examples to `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            profiles: RwLock::new(Vec::new()),
        }
    }

    /// Index every `.docx` under `dir`. A missing directory yields an empty
    /// library; unreadable or malformed files are skipped.
    pub fn load_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let library = Self::new(dir);
        let dir = library.dir.as_path();

        if !dir.exists() {
            warn!("Learning examples directory does not exist: {:?}", dir);
            return Ok(library);
        }

        let mut profiles = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read learning examples directory: {:?}", dir))?
        {
            let path = entry?.path();
            if !is_docx(&path) {
                continue;
            }
            match load_profile(&path) {
                Ok(profile) => {
                    debug!(
                        file = %profile.source_file,
                        template_type = ?profile.template_type,
                        "Indexed learning example"
                    );
                    profiles.push(profile);
                }
                Err(e) => warn!("Skipping learning example {:?}: {:#}", path, e),
            }
        }
        profiles.sort_by_key(|p| p.added_at);

        info!("Loaded {} learning examples from {:?}", profiles.len(), dir);
        *library.write_profiles() = profiles;
        Ok(library)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` as a new example and index it. Invalid documents are
    /// rejected before anything is written.
    pub fn add_example(&self, name: &str, bytes: &[u8]) -> OfficeResult<StructureProfile> {
        let structure = analyze_docx(bytes)?;
        let file_name = example_file_name(name);

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(&file_name), bytes)?;

        let template_type = classify_file_name(&file_name).or(structure.detected_type);
        let profile =
            StructureProfile::from_structure(file_name, template_type, &structure, Utc::now());
        info!(
            file = %profile.source_file,
            template_type = ?profile.template_type,
            tables = profile.table_count,
            "Added learning example"
        );

        let mut profiles = self.write_profiles();
        profiles.retain(|p| p.source_file != profile.source_file);
        profiles.push(profile.clone());
        Ok(profile)
    }

    /// Most recent example of the given type
    pub fn profile_for(&self, template_type: TemplateType) -> Option<StructureProfile> {
        self.read_profiles()
            .iter()
            .filter(|p| p.template_type == Some(template_type))
            .max_by_key(|p| p.added_at)
            .cloned()
    }

    pub fn list(&self) -> Vec<StructureProfile> {
        self.read_profiles().clone()
    }

    pub fn len(&self) -> usize {
        self.read_profiles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_profiles(&self) -> std::sync::RwLockReadGuard<'_, Vec<StructureProfile>> {
        self.profiles.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_profiles(&self) -> std::sync::RwLockWriteGuard<'_, Vec<StructureProfile>> {
        self.profiles.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn is_docx(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
}

fn load_profile(path: &Path) -> Result<StructureProfile> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let structure =
        analyze_docx(&bytes).with_context(|| format!("Failed to analyze {:?}", path))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let added_at = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let template_type = classify_file_name(&file_name).or(structure.detected_type);
    Ok(StructureProfile::from_structure(file_name, template_type, &structure, added_at))
}

/// Template type from a file name like `defect_report_kv12.docx` or
/// `акт-приема-передачи.docx`
pub fn classify_file_name(file_name: &str) -> Option<TemplateType> {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
        .to_lowercase()
        .replace(['-', ' '], "_");

    if let Some(t) = TemplateType::all()
        .iter()
        .copied()
        .find(|t| stem.contains(t.name()))
    {
        return Some(t);
    }

    // Longer aliases first so "акт_осмотра" is not taken for a plain "акт"
    let tokens: Vec<&str> = stem.split('_').filter(|t| !t.is_empty()).collect();
    for window in [2usize, 1] {
        for pair in tokens.windows(window) {
            if let Some(t) = TemplateType::parse(&pair.concat()) {
                return Some(t);
            }
        }
    }
    None
}

/// Safe file name with a `.docx` extension
fn example_file_name(name: &str) -> String {
    let stem = name
        .trim()
        .trim_end_matches(".docx")
        .trim_end_matches(".DOCX");
    let mut safe: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if safe.trim_matches(['_', '.']).is_empty() {
        safe = format!("example_{}", Utc::now().format("%Y%m%d%H%M%S"));
    }
    format!("{}.docx", safe)
}
