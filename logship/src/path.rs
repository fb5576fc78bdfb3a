use chrono::{DateTime, Utc};
use logship_core::Error;
use std::str::FromStr;

/// Layout of object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathFormat {
    /// `{retention}/{org}/[{subdir}/]{log}.json`
    #[default]
    V1,
    /// `{retention}/{org}/{slug}/{YYYY}/{MM}/{DD}/{HH}/[{subdir}/]{log}.json`
    V2,
}

impl FromStr for PathFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(PathFormat::V1),
            "v2" => Ok(PathFormat::V2),
            _ => Err(Error::config_invalid(format!("unknown path format: {s}"))
                .with_context("hint: expected v1 or v2")),
        }
    }
}

/// The parts an object key is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    retention_days: u32,
    org_id: String,
    log_id: String,
    workspace_slug: Option<String>,
    subdirectory: Option<String>,
    created_at: DateTime<Utc>,
}

impl ObjectKey {
    /// Key for log `log_id` of `org_id`, kept for `retention_days`.
    pub fn new(retention_days: u32, org_id: impl Into<String>, log_id: impl Into<String>) -> Self {
        Self {
            retention_days,
            org_id: org_id.into(),
            log_id: log_id.into(),
            workspace_slug: None,
            subdirectory: None,
            created_at: Utc::now(),
        }
    }

    /// Set the workspace slug. Only `v2` keys carry it.
    pub fn with_workspace_slug(mut self, slug: impl Into<String>) -> Self {
        self.workspace_slug = Some(slug.into());
        self
    }

    /// Set the subdirectory placed right before the file name.
    pub fn with_subdirectory(mut self, subdirectory: impl Into<String>) -> Self {
        self.subdirectory = Some(subdirectory.into());
        self
    }

    /// Set the time the hourly `v2` partition is derived from.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Render the key in `format`.
    pub fn format(&self, format: PathFormat) -> String {
        let mut segments = vec![self.retention_days.to_string(), self.org_id.clone()];

        if format == PathFormat::V2 {
            if let Some(slug) = non_empty(&self.workspace_slug) {
                segments.push(slug.to_string());
            }
            segments.push(self.created_at.format("%Y/%m/%d/%H").to_string());
        }

        if let Some(subdirectory) = non_empty(&self.subdirectory) {
            segments.push(subdirectory.to_string());
        }

        segments.push(format!("{}.json", self.log_id));
        segments.join("/")
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref()
        .map(|v| v.trim_matches('/'))
        .filter(|v| !v.is_empty())
}
