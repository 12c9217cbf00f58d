//! The read service over a catalog written by a separate indexer

use anyhow::Result;
use dossier_catalog::{
    config::CatalogConfig,
    indexing::{IndexingEngine, IndexingEngineConfig},
    retrieval::{Origin, Resolution},
    service::{NO_INDEXED_CONTENT, ReadService},
    storage::sqlite_store::SqliteCatalog,
};
use dossier_extract::{DocumentFormat, ExtractorRegistry, formats::CadExtractor};
use std::sync::Arc;
use tempfile::tempdir;

fn config_for(root: &std::path::Path) -> CatalogConfig {
    CatalogConfig::default()
        .with_root_dir(root.join("documents"))
        .with_database_path(root.join("data/index.db"))
}

#[tokio::test]
async fn test_service_reads_what_the_indexer_wrote() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_for(temp_dir.path());
    tokio::fs::create_dir_all(config.root_dir.join("plans")).await?;
    let drawing = config.root_dir.join("plans/Hallenplan.dxf");
    tokio::fs::write(&drawing, b"0\nSECTION").await?;
    let notes = config.root_dir.join("notes.txt");
    tokio::fs::write(&notes, b"not catalogued").await?;

    {
        let catalog = Arc::new(SqliteCatalog::open(&config.database_path).await?);
        let extractors =
            ExtractorRegistry::empty().register(DocumentFormat::Cad, Arc::new(CadExtractor));
        let engine_config = IndexingEngineConfig::new(config.root_dir.clone());
        let report = IndexingEngine::new(engine_config, catalog)
            .with_extractors(extractors)
            .run()
            .await?;
        assert_eq!(report.processed, 1);
        assert_eq!(report.ineligible, 1);
    }

    let service = ReadService::open(&config).await;
    assert!(service.is_available());

    let hits = service.search("hallen").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].filename, "Hallenplan.dxf");

    let drawing_path = drawing.to_string_lossy().into_owned();
    assert_eq!(service.content(&drawing_path).await, "Hallenplan.dxf");
    assert_eq!(
        service.content(&notes.to_string_lossy()).await,
        NO_INDEXED_CONTENT
    );

    // no object store configured
    assert_eq!(
        service.resolve(&drawing_path).await?,
        Resolution::Local {
            path: drawing.clone()
        }
    );
    let stream = service.file(&drawing_path).await?;
    assert_eq!(stream.origin, Origin::Local { path: drawing });
    assert_eq!(stream.into_bytes().await?, b"0\nSECTION");

    let stats = service.stats().await?.expect("stats");
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.searchable_files, 1);
    assert_eq!(stats.local_only_files, 1);
    assert!(stats.database_size_bytes.is_some_and(|size| size > 0));
    Ok(())
}

#[tokio::test]
async fn test_unavailable_catalog_degrades_every_operation() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_for(temp_dir.path());
    tokio::fs::create_dir_all(&config.root_dir).await?;
    let local = config.root_dir.join("a.pdf");
    tokio::fs::write(&local, b"%PDF-1.4").await?;

    let service = ReadService::open(&config).await;
    assert!(!service.is_available());

    assert!(service.search("anything").await.is_empty());
    assert_eq!(service.content(&local.to_string_lossy()).await, "");
    assert!(service.stats().await?.is_none());
    assert_eq!(
        service.resolve(&local.to_string_lossy()).await?,
        Resolution::Local { path: local }
    );
    assert!(service.resolve("/nonexistent/b.pdf").await.is_err());
    // the read path never creates the catalog
    assert!(!config.database_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_tree_defaults_to_root() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = config_for(temp_dir.path());
    let root = &config.root_dir;
    tokio::fs::create_dir_all(root.join("2024")).await?;
    tokio::fs::write(root.join("Angebot.PDF"), b"x").await?;
    tokio::fs::write(root.join("2024/inner.docx"), b"x").await?;

    let service = ReadService::new(&config, None, None);

    let top = service.tree(None).await;
    let names: Vec<_> = top.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["2024", "Angebot.PDF"]);
    assert_eq!(top[1].extension.as_deref(), Some(".pdf"));

    let inner = service.tree(Some(&root.join("2024"))).await;
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].path, root.join("2024/inner.docx"));

    assert!(service.tree(Some(&root.join("missing"))).await.is_empty());
    Ok(())
}
