use std::{
    collections::BTreeMap,
    path::Path,
    sync::{Arc, RwLock},
};

use crate::{
    models::FieldConfig,
    suggest::{Candidate, PhraseIndex},
};

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("unknown field: {0}")]
    Unknown(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One input field: its candidate list and the phrase index built from it.
///
/// The index is built on first use and then only replaced wholesale by
/// `rebuild()`.
#[derive(Debug)]
pub struct Field {
    pub name: String,
    cfg: FieldConfig,
    index: RwLock<Option<Arc<PhraseIndex>>>,
}

impl Field {
    pub fn new(name: impl Into<String>, cfg: FieldConfig) -> Self {
        Self {
            name: name.into(),
            cfg,
            index: RwLock::new(None),
        }
    }

    /// Field with an inline candidate list and no CSV file.
    pub fn from_values(name: impl Into<String>, values: &[&str]) -> Self {
        let cfg = FieldConfig {
            values: values.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        Self::new(name, cfg)
    }

    pub fn max_results(&self) -> usize {
        self.cfg.max_results
    }

    /// Whether the index has been built.
    pub fn is_indexed(&self) -> bool {
        self.index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Get the field's index, building it if this is the first use.
    pub fn index(&self) -> Result<Arc<PhraseIndex>, FieldError> {
        if let Some(idx) = self.index.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(idx.clone());
        }

        let mut slot = self.index.write().unwrap_or_else(|e| e.into_inner());

        // Another caller may have built it while we waited for the lock.
        if let Some(idx) = slot.as_ref() {
            return Ok(idx.clone());
        }

        let idx = Arc::new(self.build()?);
        *slot = Some(idx.clone());
        Ok(idx)
    }

    /// Re-read the candidate list and replace the index.
    pub fn rebuild(&self) -> Result<Arc<PhraseIndex>, FieldError> {
        let idx = Arc::new(self.build()?);
        *self.index.write().unwrap_or_else(|e| e.into_inner()) = Some(idx.clone());
        Ok(idx)
    }

    fn build(&self) -> Result<PhraseIndex, FieldError> {
        let mut candidates = if self.cfg.candidates.is_empty() {
            Vec::new()
        } else {
            load_candidates(Path::new(&self.cfg.candidates))?
        };
        candidates.extend(
            self.cfg
                .values
                .iter()
                .filter(|v| !v.trim().is_empty())
                .map(|v| Candidate::new(v.trim())),
        );

        let idx = PhraseIndex::build(candidates, &self.cfg.default_category);
        log::info!(
            "indexed field '{}': {} candidates, {} phrases",
            self.name,
            idx.len(),
            idx.num_phrases()
        );

        Ok(idx)
    }
}

/// Load candidates from a CSV file of `text[,category]` rows (no header).
/// Rows with an empty text column are skipped.
pub fn load_candidates(path: &Path) -> Result<Vec<Candidate>, FieldError> {
    log::info!("loading candidates from {}", path.display());

    let file = std::fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result?;

        let text = record.get(0).unwrap_or_default();
        if text.is_empty() {
            continue;
        }

        let category = record
            .get(1)
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string());

        out.push(Candidate {
            text: text.to_string(),
            category,
        });
    }

    Ok(out)
}

/// All configured fields by name.
#[derive(Debug, Default)]
pub struct Fields(BTreeMap<String, Arc<Field>>);

impl Fields {
    pub fn new(cfg: &BTreeMap<String, FieldConfig>) -> Self {
        let fields = cfg
            .iter()
            .map(|(name, c)| (name.clone(), Arc::new(Field::new(name, c.clone()))))
            .collect();
        Self(fields)
    }

    pub fn insert(&mut self, field: Field) {
        self.0.insert(field.name.clone(), Arc::new(field));
    }

    pub fn get(&self, name: &str) -> Result<Arc<Field>, FieldError> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| FieldError::Unknown(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Field>> {
        self.0.values()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
