//! Aggregated outcome of a bootstrap run.

use crate::materializer::MaterializeReport;

/// Reports of every materialized server, in bootstrap order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapSummary {
    pub reports: Vec<MaterializeReport>,
}

impl BootstrapSummary {
    pub(crate) fn push(&mut self, report: MaterializeReport) {
        self.reports.push(report);
    }

    /// Number of servers materialized.
    pub fn servers(&self) -> usize {
        self.reports.len()
    }

    /// Placeholder files created across all servers.
    pub fn total_files(&self) -> usize {
        self.reports
            .iter()
            .map(|r| r.dmv_files.len() + r.custom_query_files.len())
            .sum()
    }

    /// Non-fatal problems across all servers.
    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(MaterializeReport::warning_count).sum()
    }

    /// The report for one server.
    pub fn report(&self, server: &str) -> Option<&MaterializeReport> {
        self.reports.iter().find(|r| r.server == server)
    }
}
