//! Ground truth derived from a graph export: language, defect category and
//! the per-graph target in one of three shapes

use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Defect categories (CWE ids) in class-id order
const CWE_CLASSES: [u32; 38] = [
    15, 194, 195, 319, 476, 563, 643, 80, 98, 415, 126, 690, 457, 606, 127, 124, 401, 91, 590,
    601, 90, 36, 23, 113, 789, 121, 762, 400, 122, 134, 78, 369, 197, 129, 191, 190, 89, 79,
];

/// Class id of safe samples, one past the last defect category
pub const SAFE_CLASS: u32 = CWE_CLASSES.len() as u32;

/// Width of one-hot targets
pub const NUM_CLASSES: usize = CWE_CLASSES.len() + 1;

/// Class id for a CWE, if it is a known defect category
pub fn cwe_class(cwe: u32) -> Option<u32> {
    CWE_CLASSES
        .iter()
        .position(|&c| c == cwe)
        .map(|i| i as u32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Php,
    CSharp,
    Java,
    C,
    Cpp,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "php" => Some(Language::Php),
            "cs" => Some(Language::CSharp),
            "java" => Some(Language::Java),
            "c" => Some(Language::C),
            "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Result<Self> {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| DatasetError::UnknownLanguage(path.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Php => "PHP",
            Language::CSharp => "C#",
            Language::Java => "Java",
            Language::C => "C",
            Language::Cpp => "C++",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target shape requested by the task head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    /// Single class id, `SAFE_CLASS` for safe samples
    ClassId,
    /// `NUM_CLASSES`-wide one-hot vector
    #[default]
    OneHot,
    /// 1.0 for unsafe, 0.0 for safe
    Binary,
}

/// Per-graph ground truth, copied verbatim into batches
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TargetValue {
    ClassId(u32),
    OneHot(Vec<f32>),
    Binary(f32),
}

impl TargetValue {
    /// Build the target for a sample. Class-based targets need the CWE of
    /// unsafe samples to be a known defect category.
    pub fn encode(kind: LabelKind, is_safe: bool, cwe: Option<u32>, path: &Path) -> Result<Self> {
        if kind == LabelKind::Binary {
            return Ok(TargetValue::Binary(if is_safe { 0.0 } else { 1.0 }));
        }

        let class = if is_safe {
            SAFE_CLASS
        } else {
            let cwe = cwe.ok_or_else(|| DatasetError::MissingCwe(path.to_path_buf()))?;
            cwe_class(cwe).ok_or_else(|| DatasetError::UnknownCwe {
                cwe,
                path: path.to_path_buf(),
            })?
        };

        Ok(match kind {
            LabelKind::ClassId => TargetValue::ClassId(class),
            _ => {
                let mut one_hot = vec![0.0; NUM_CLASSES];
                one_hot[class as usize] = 1.0;
                TargetValue::OneHot(one_hot)
            }
        })
    }

    /// Class id behind a class-based target
    pub fn class_id(&self) -> Option<u32> {
        match self {
            TargetValue::ClassId(c) => Some(*c),
            TargetValue::OneHot(v) => v.iter().position(|&x| x == 1.0).map(|i| i as u32),
            TargetValue::Binary(_) => None,
        }
    }
}
