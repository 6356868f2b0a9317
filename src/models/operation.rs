use std::path::PathBuf;

use serde::Serialize;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Overwrite,
    ExportTo(PathBuf),
    Suffix(String),
}

impl OutputMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Overwrite => "Overwrite",
            Self::ExportTo(_) => "ExportTo",
            Self::Suffix(_) => "Suffix",
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Suffix(String::from("_geo"))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct WriteOutcome {
    pub name: String,
    pub output_path: Option<PathBuf>,
    pub success: bool,
    pub error: Option<String>,
}

impl WriteOutcome {
    pub fn success(name: impl Into<String>, output_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            output_path: Some(output_path),
            success: true,
            error: None,
        }
    }

    pub fn failure(
        name: impl Into<String>,
        output_path: Option<PathBuf>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            output_path,
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn is_skipped(&self) -> bool {
        !self.success && self.output_path.is_none()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct WriteSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl WriteSummary {
    pub fn from_outcomes(outcomes: &[WriteOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.success).count();
        let skipped = outcomes.iter().filter(|outcome| outcome.is_skipped()).count();
        let failed = outcomes
            .len()
            .saturating_sub(succeeded)
            .saturating_sub(skipped);

        Self {
            total: outcomes.len(),
            succeeded,
            failed,
            skipped,
        }
    }
}
