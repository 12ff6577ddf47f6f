//! Bootstrap implementation.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use super::summary::BootstrapSummary;
use crate::catalog::CatalogClient;
use crate::config::{ProvenanceBackend, Settings};
use crate::fatal::{escalate, FatalError};
use crate::materializer::{MaterializeReport, TreeMaterializer};
use crate::paths::DumpRoot;
use crate::provenance::{ManifestTagger, ProvenanceTagger, XattrTagger};
use crate::registry::ServerRegistry;

/// DBFS startup state.
///
/// Construction creates the dump root; [`bootstrap`](Self::bootstrap)
/// materializes each configured server sequentially, in name order.
pub struct DbfsApp {
    settings: Settings,
    registry: ServerRegistry,
    dump: DumpRoot,
    tagger: Box<dyn ProvenanceTagger>,
}

impl DbfsApp {
    /// Prepare the dump root and the configured provenance backend.
    ///
    /// # Errors
    ///
    /// Fatal if the dump root cannot be created or the manifest cannot be
    /// opened.
    pub fn new(settings: Settings, registry: ServerRegistry) -> Result<Self, FatalError> {
        create_dump_root(&settings.dump_dir)?;

        let tagger: Box<dyn ProvenanceTagger> = match settings.provenance {
            ProvenanceBackend::Xattr => Box::new(XattrTagger::new()),
            ProvenanceBackend::Manifest => {
                let tagger = ManifestTagger::in_dir(&settings.dump_dir).map_err(|source| {
                    escalate(FatalError::Attribute {
                        path: settings.dump_dir.join(ManifestTagger::FILE_NAME),
                        source,
                    })
                })?;
                Box::new(tagger)
            }
        };

        Ok(Self::assemble(settings, registry, tagger))
    }

    /// Prepare the dump root with a caller supplied tagger.
    pub fn with_tagger(
        settings: Settings,
        registry: ServerRegistry,
        tagger: Box<dyn ProvenanceTagger>,
    ) -> Result<Self, FatalError> {
        create_dump_root(&settings.dump_dir)?;
        Ok(Self::assemble(settings, registry, tagger))
    }

    fn assemble(
        settings: Settings,
        registry: ServerRegistry,
        tagger: Box<dyn ProvenanceTagger>,
    ) -> Self {
        let dump = DumpRoot::new(&settings.dump_dir);
        Self {
            settings,
            registry,
            dump,
            tagger,
        }
    }

    /// Materialize every configured server.
    pub fn bootstrap(&self, client: &dyn CatalogClient) -> Result<BootstrapSummary, FatalError> {
        info!(
            servers = self.registry.len(),
            dump_dir = %self.settings.dump_dir.display(),
            "Bootstrapping dump tree"
        );

        let mut summary = BootstrapSummary::default();
        for record in self.registry.iter() {
            summary.push(self.bootstrap_server(&record.name, client)?);
        }

        let warnings = summary.warning_count();
        if warnings > 0 {
            warn!(
                warnings,
                servers = summary.servers(),
                "Dump tree built with missing items"
            );
        } else {
            info!(
                files = summary.total_files(),
                servers = summary.servers(),
                "Dump tree built"
            );
        }
        Ok(summary)
    }

    /// Materialize one server by name.
    pub fn bootstrap_server(
        &self,
        server_name: &str,
        client: &dyn CatalogClient,
    ) -> Result<MaterializeReport, FatalError> {
        let record = self.registry.lookup_or_fatal(server_name)?;
        TreeMaterializer::new(&self.dump, self.tagger.as_ref())
            .materialize_server(server_name, record, client)
    }

    /// Whether the file behind a mount-relative path is a placeholder.
    pub fn is_synthesized(&self, virtual_path: &str) -> bool {
        self.tagger.is_tagged(&self.dump.to_dump_path(virtual_path))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn dump_root(&self) -> &DumpRoot {
        &self.dump
    }

    pub fn tagger(&self) -> &dyn ProvenanceTagger {
        self.tagger.as_ref()
    }
}

fn create_dump_root(path: &Path) -> Result<(), FatalError> {
    fs::create_dir_all(path).map_err(|source| {
        escalate(FatalError::Structural {
            path: path.to_path_buf(),
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::registry::{ServerRecord, ServerRegistry};
    use std::fs::File;
    use tempfile::TempDir;

    struct FixedClient;

    impl CatalogClient for FixedClient {
        fn query(&self, server: &ServerRecord, _query: &str) -> Result<String, CatalogError> {
            if server.name == "offline" {
                return Err(CatalogError::QueryFailed {
                    code: 18456,
                    message: "login failed".to_string(),
                });
            }
            Ok("name\ndm_exec_requests\ndm_os_sys_info\n".to_string())
        }
    }

    fn registry() -> ServerRegistry {
        let mut builder = ServerRegistry::builder();
        builder
            .insert(ServerRecord::new("prod", "10.0.0.4", "sa", "p", 16))
            .unwrap();
        builder
            .insert(ServerRecord::new("offline", "10.0.0.9", "sa", "p", 14))
            .unwrap();
        builder.seal()
    }

    fn manifest_app(dir: &TempDir) -> DbfsApp {
        let settings = Settings::new(dir.path().join("dump"))
            .with_provenance(ProvenanceBackend::Manifest);
        DbfsApp::new(settings, registry()).unwrap()
    }

    #[test]
    fn test_bootstrap_all_servers() {
        let dir = TempDir::new().unwrap();
        let app = manifest_app(&dir);

        let summary = app.bootstrap(&FixedClient).unwrap();

        assert_eq!(summary.servers(), 2);
        assert_eq!(summary.report("prod").unwrap().dmv_files.len(), 4);
        assert!(summary.report("offline").unwrap().dmv_files.is_empty());
        assert_eq!(summary.warning_count(), 1);
        assert_eq!(summary.total_files(), 4);
    }

    #[test]
    fn test_is_synthesized() {
        let dir = TempDir::new().unwrap();
        let app = manifest_app(&dir);
        app.bootstrap(&FixedClient).unwrap();

        assert!(app.is_synthesized("/prod/dm_exec_requests"));
        assert!(app.is_synthesized("/prod/dm_exec_requests.json"));
        assert!(!app.is_synthesized("/prod/not_a_dmv"));

        let external = dir.path().join("dump").join("prod").join("report.tsv");
        fs::write(&external, "real data").unwrap();
        assert!(!app.is_synthesized("/prod/report.tsv"));
    }

    #[test]
    fn test_bootstrap_unknown_server_is_fatal() {
        let dir = TempDir::new().unwrap();
        let app = manifest_app(&dir);

        let err = app.bootstrap_server("ghost", &FixedClient).unwrap_err();
        assert!(matches!(err, FatalError::UnknownServer { .. }));
    }

    #[test]
    fn test_with_tagger() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("dump");
        fs::create_dir(&dump).unwrap();
        let tagger = ManifestTagger::open(dir.path().join("elsewhere.manifest")).unwrap();

        let app = DbfsApp::with_tagger(Settings::new(&dump), registry(), Box::new(tagger)).unwrap();
        app.bootstrap_server("prod", &FixedClient).unwrap();

        assert!(app.is_synthesized("prod/dm_os_sys_info"));
        assert!(dir.path().join("elsewhere.manifest").is_file());
        assert!(!dump.join(ManifestTagger::FILE_NAME).exists());
    }

    #[test]
    fn test_unusable_dump_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("dump");
        File::create(&blocker).unwrap();

        let result = DbfsApp::new(Settings::new(blocker.join("inner")), registry());
        assert!(matches!(result, Err(FatalError::Structural { .. })));
    }
}
