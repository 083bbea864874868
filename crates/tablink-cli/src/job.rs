//! Job files: a conversion described in TOML.
//!
//! ```toml
//! [source]
//! format = "sqlite"
//! path = "people.db"
//! query = "SELECT * FROM people"
//!
//! [dest]
//! format = "csv"
//! path = "people.csv"
//! row_labels = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tablink_core::Properties;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    #[serde(default)]
    pub source: JobSide,
    #[serde(default)]
    pub dest: JobSide,
}

/// One side of a job: an optional format plus connector options.
#[derive(Debug, Default, Deserialize)]
pub struct JobSide {
    pub format: Option<String>,
    #[serde(flatten)]
    pub options: toml::Table,
}

impl JobSide {
    pub fn properties(&self) -> Result<Properties> {
        self.options
            .iter()
            .map(|(key, value)| {
                let value = serde_json::to_value(value)
                    .with_context(|| format!("option `{key}` has no JSON equivalent"))?;
                Ok((key.clone(), value))
            })
            .collect()
    }
}

pub fn load(path: &Path) -> Result<Job> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read job file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid job file {}", path.display()))
}
