use std::ops::AddAssign;

/// Outcome of transforming a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionResult {
    pub modified: bool,
    pub converted: usize,
}

impl ConversionResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn converted(count: usize) -> Self {
        Self {
            modified: count > 0,
            converted: count,
        }
    }
}

/// Totals across every document of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    pub documents: usize,
    pub documents_changed: usize,
    pub nodes_converted: usize,
}

impl AddAssign<ConversionResult> for PipelineSummary {
    fn add_assign(&mut self, result: ConversionResult) {
        self.documents += 1;
        if result.modified {
            self.documents_changed += 1;
        }
        self.nodes_converted += result.converted;
    }
}

impl FromIterator<ConversionResult> for PipelineSummary {
    fn from_iter<I: IntoIterator<Item = ConversionResult>>(iter: I) -> Self {
        let mut summary = Self::default();
        for result in iter {
            summary += result;
        }
        summary
    }
}
