use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::models::PartnerRecord;

/// Message shown when the session cannot start without data.
pub const DATA_MISSING_MSG: &str = "⚠️ Data not found! Please run the churn predictor first.";

/// The churn table, loaded once per process and only ever lent out.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    records: Vec<PartnerRecord>,
}

impl Dataset {
    /// Load the table; an empty result halts the session.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let records = load_partners(path);
        if records.is_empty() {
            bail!("{} (looked for {})", DATA_MISSING_MSG, path.display());
        }
        Ok(Self { path: path.to_path_buf(), records })
    }

    #[cfg(test)]
    pub fn from_records(path: impl Into<PathBuf>, records: Vec<PartnerRecord>) -> Self {
        Self { path: path.into(), records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[PartnerRecord] {
        &self.records
    }

    /// First record with this partner id (ids are matched exactly after trimming).
    pub fn find_partner(&self, partner_id: &str) -> Option<&PartnerRecord> {
        let wanted = partner_id.trim();
        self.records.iter().find(|r| r.partner_id == wanted)
    }

    /// Distinct partner ids in file order.
    pub fn partner_ids(&self) -> Vec<&str> {
        use itertools::Itertools;
        self.records.iter().map(|r| r.partner_id.as_str()).unique().collect()
    }
}

/// Read the dataset, returning an empty table on any failure.
pub fn load_partners(path: impl AsRef<Path>) -> Vec<PartnerRecord> {
    let path = path.as_ref();
    match read_partners(path) {
        Ok(records) => records,
        Err(e) => {
            warn!("Dataset load failed - path={}, error={:#}", path.display(), e);
            Vec::new()
        }
    }
}

/// Strict reader: any bad row fails the whole file.
pub fn read_partners(path: &Path) -> Result<Vec<PartnerRecord>> {
    let start = std::time::Instant::now();
    debug!("Reading dataset - path={}", path.display());

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Opening {}", path.display()))?;

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<PartnerRecord>().enumerate() {
        // header is line 1
        let line = i + 2;
        let rec = row.with_context(|| format!("Parsing row at line {} of {}", line, path.display()))?;
        let p = rec.churn_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            bail!(
                "churn_probability {} for partner {} at line {} is outside [0, 1]",
                p,
                rec.partner_id,
                line
            );
        }
        records.push(rec);
    }

    let records = normalize_records(records);
    info!(
        "Dataset loaded - path={}, rows={}, duration={:.3}s",
        path.display(),
        records.len(),
        start.elapsed().as_secs_f32()
    );
    Ok(records)
}

/// NFC-normalize the categorical labels so grouping keys compare equal.
pub fn normalize_records(mut records: Vec<PartnerRecord>) -> Vec<PartnerRecord> {
    for r in records.iter_mut() {
        r.region = r.region.nfc().collect();
        r.partner_tier = r.partner_tier.nfc().collect();
    }
    records
}
