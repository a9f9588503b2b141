//! Codebase metrics and size classes.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::core::ingest::language::detect_language;
use crate::core::types::{CandidatePath, FileRecord};

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Histogram of file sizes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SizeDistribution {
    pub under_1kb: usize,
    pub under_10kb: usize,
    pub under_100kb: usize,
    pub under_1mb: usize,
    pub over_1mb: usize,
    pub largest: u64,
}

impl SizeDistribution {
    fn record(&mut self, size: u64) {
        match size {
            s if s < KB => self.under_1kb += 1,
            s if s < 10 * KB => self.under_10kb += 1,
            s if s < 100 * KB => self.under_100kb += 1,
            s if s < MB => self.under_1mb += 1,
            _ => self.over_1mb += 1,
        }
        self.largest = self.largest.max(size);
    }
}

/// Summary of a file set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodebaseMetrics {
    pub total_files: usize,
    pub total_size: u64,
    pub size_distribution: SizeDistribution,
    /// Lowercased extension (or `(none)`) to file count
    pub extension_counts: BTreeMap<String, usize>,
    pub language_counts: BTreeMap<String, usize>,
}

impl CodebaseMetrics {
    /// Summarise `(path, size)` pairs
    pub fn analyze<'a, I>(files: I) -> Self
    where
        I: IntoIterator<Item = (&'a CandidatePath, u64)>,
    {
        let mut metrics = Self::default();
        for (path, size) in files {
            metrics.add(path, size);
        }
        metrics
    }

    /// Summarise accepted records
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut metrics = Self::default();
        for record in records {
            metrics.add(&CandidatePath::new(&record.path), record.size);
        }
        metrics
    }

    fn add(&mut self, path: &CandidatePath, size: u64) {
        self.total_files += 1;
        self.total_size += size;
        self.size_distribution.record(size);

        let extension = path.extension();
        let key = extension.clone().unwrap_or_else(|| "(none)".to_string());
        *self.extension_counts.entry(key).or_insert(0) += 1;

        if let Some(language) = extension.as_deref().and_then(detect_language) {
            *self.language_counts.entry(language.to_string()).or_insert(0) += 1;
        }
    }

    pub fn average_file_size(&self) -> u64 {
        if self.total_files == 0 {
            0
        } else {
            self.total_size / self.total_files as u64
        }
    }

    /// Most common extensions, most frequent first
    pub fn top_extensions(&self, limit: usize) -> Vec<(String, usize)> {
        let mut extensions: Vec<(String, usize)> = self
            .extension_counts
            .iter()
            .map(|(ext, count)| (ext.clone(), *count))
            .collect();
        extensions.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        extensions.truncate(limit);
        extensions
    }
}

/// Discrete codebase scale, smallest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    Huge,
}

impl SizeClass {
    /// The larger of the class by file count and the class by bytes
    pub fn classify(metrics: &CodebaseMetrics) -> Self {
        Self::by_count(metrics.total_files).max(Self::by_bytes(metrics.total_size))
    }

    fn by_count(files: usize) -> Self {
        match files {
            n if n < 1_000 => SizeClass::Small,
            n if n < 10_000 => SizeClass::Medium,
            n if n < 50_000 => SizeClass::Large,
            _ => SizeClass::Huge,
        }
    }

    fn by_bytes(bytes: u64) -> Self {
        match bytes {
            b if b < 50 * MB => SizeClass::Small,
            b if b < 500 * MB => SizeClass::Medium,
            b if b < 2 * GB => SizeClass::Large,
            _ => SizeClass::Huge,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeClass::Small => "Small",
            SizeClass::Medium => "Medium",
            SizeClass::Large => "Large",
            SizeClass::Huge => "Huge",
        };
        f.write_str(name)
    }
}

/// Format bytes as human-readable size
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format a count with thousands separators
pub fn format_count(count: usize) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
