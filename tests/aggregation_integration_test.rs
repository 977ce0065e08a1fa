use httpmock::prelude::*;
use reqwest::Client;
use site_geo::core::report::{render_text, ZoningInfo};
use site_geo::{
    CoordinateResolver, LocalStorage, MultiSourceAggregator, RegistryConfig, ReportEngine,
    SourceOutcome,
};
use std::sync::Arc;
use tempfile::TempDir;

fn registry_for(server: &MockServer) -> RegistryConfig {
    let mut config = RegistryConfig::default();
    config.backend.base_url = server.base_url();
    config.backend.timeout_seconds = Some(2);
    config
}

#[tokio::test]
async fn test_default_registry_against_partially_failing_backend() {
    let server = MockServer::start();

    let cadastre = server.mock(|when, then| {
        when.method(GET)
            .path("/sheet/by-point")
            .query_param("lat", "43.3204")
            .query_param("lon", "3.2202");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "download_url": "https://data.geopf.fr/wfs/ows?request=GetFeature",
                "source": "IGN — Parcellaire Express (feuille)"
            }));
    });

    let zoning = server.mock(|when, then| {
        when.method(GET).path("/plu/by-point");
        then.status(500)
            .json_body(serde_json::json!({"detail": "GPU WFS non configuré"}));
    });

    let heritage = server.mock(|when, then| {
        when.method(GET).path("/heritage/by-point");
        then.status(200).json_body(serde_json::json!({
            "any_found": false,
            "total": 0,
            "layers": {}
        }));
    });

    let airport = server.mock(|when, then| {
        when.method(GET)
            .path("/airport/check")
            .query_param("buffer_m", "1000");
        then.status(200).json_body(serde_json::json!({
            "status": "OK",
            "distance_m": 4210.55,
            "closest_airport_lonlat": [3.3528, 43.3235],
            "buffer_m": 1000
        }));
    });

    // /du/by-point and /parcel/by-point are not mocked: the backend answers 404

    let point = CoordinateResolver::new()
        .parse("43.3204, 3.2202")
        .unwrap();
    let sources = registry_for(&server).build_registry(&Client::new());
    let aggregator = MultiSourceAggregator::new(sources);

    let result = aggregator.run(point).await;

    cadastre.assert();
    zoning.assert();
    heritage.assert();
    airport.assert();

    assert_eq!(result.len(), 6);
    let statuses: Vec<(&str, &str)> = result
        .entries()
        .iter()
        .map(|e| (e.id.as_str(), e.outcome.status_label()))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("cadastre", "success"),
            ("zoning", "failure"),
            ("urban_planning", "unavailable"),
            ("heritage", "success"),
            ("parcel", "unavailable"),
            ("airport", "success"),
        ]
    );

    // only the required zoning source reaches the error log
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].source_id, "zoning");
    assert_eq!(
        result.errors()[0].message,
        "HTTP 500 Internal Server Error: GPU WFS non configuré"
    );

    let text = render_text(&result);
    assert!(text.contains("== Cadastral sheet =="));
    assert!(text.contains("status: OK"));
    assert!(text.contains("== Parcel reference ==\nnot available"));
    assert!(text.contains("[zoning] HTTP 500 Internal Server Error: GPU WFS non configuré"));
}

#[tokio::test]
async fn test_every_source_down_still_settles() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET);
        then.status(503);
    });

    let point = CoordinateResolver::new().submit_fields("48,8566", "2,3522").unwrap();
    let aggregator = MultiSourceAggregator::new(registry_for(&server).build_registry(&Client::new()));

    let result = aggregator.run(point).await;

    assert_eq!(result.len(), 6);
    assert_eq!(result.success_count(), 0);
    // four required sources fail loudly, two are silently unavailable
    assert_eq!(result.errors().len(), 4);
    assert!(matches!(
        result.outcome("parcel"),
        Some(SourceOutcome::Unavailable { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_backend_is_contained() {
    let mut config = RegistryConfig::default();
    // nothing listens on the discard port
    config.backend.base_url = "http://127.0.0.1:9".to_string();
    config.backend.timeout_seconds = Some(2);

    let point = CoordinateResolver::new().parse("43.5; 3.25").unwrap();
    let aggregator = MultiSourceAggregator::new(config.build_registry(&Client::new()));

    let result = aggregator.run(point).await;

    assert_eq!(result.len(), 6);
    assert_eq!(result.errors().len(), 4);
    for entry in result.entries() {
        assert!(!entry.outcome.is_success(), "{} should not succeed", entry.id);
    }
}

#[tokio::test]
async fn test_zoning_payload_without_documents_renders_empty() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/plu/by-point");
        then.status(200)
            .json_body(serde_json::json!({"zone_code": "UA", "atom_links": []}));
    });

    let mut config = registry_for(&server);
    config.sources.retain(|s| s.id == "zoning");

    let point = CoordinateResolver::new().parse("43.5 3.25").unwrap();
    let aggregator = MultiSourceAggregator::new(config.build_registry(&Client::new()));
    let result = aggregator.run(point).await;

    let payload = result.outcome("zoning").unwrap().payload().unwrap();
    let zoning = ZoningInfo::from_payload(payload);
    assert_eq!(zoning.zone_code.as_deref(), Some("UA"));
    assert!(zoning.regulation_urls.is_empty());
    assert!(zoning.documents.is_empty());

    let text = render_text(&result);
    assert!(text.contains("regulation: no data"));
    assert!(text.contains("documents: no data"));
}

#[tokio::test]
async fn test_engine_exports_archive_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/sheet/by-point");
        then.status(200)
            .json_body(serde_json::json!({"source": "IGN", "download_url": "https://x/a.zip"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/plu/by-point");
        then.status(500);
    });

    let mut config = registry_for(&server);
    config.sources.retain(|s| s.id == "cadastre" || s.id == "zoning");

    let aggregator = Arc::new(MultiSourceAggregator::new(config.build_registry(&Client::new())));
    let mut engine = ReportEngine::new(aggregator)
        .with_export(LocalStorage::new(output_path.clone()), Some("report.zip"));

    let point = CoordinateResolver::new().parse("43.5, 3.25").unwrap();
    let output = engine.run(point).await.unwrap();

    assert_eq!(output.archive_path.as_deref(), Some("report.zip"));

    let full_path = std::path::Path::new(&output_path).join("report.zip");
    assert!(full_path.exists());

    let zip_data = std::fs::read(&full_path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();

    let mut file_names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    file_names.sort();
    assert_eq!(
        file_names,
        vec!["errors.txt", "report.json", "report.txt", "sources.csv"]
    );

    let mut errors = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("errors.txt").unwrap(), &mut errors)
        .unwrap();
    assert_eq!(errors, "[zoning] HTTP 500 Internal Server Error");
}

#[tokio::test]
async fn test_renamed_source_renders_by_kind() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/plu/by-point");
        then.status(200)
            .json_body(serde_json::json!({"zone_code": "1AU", "regulation_urls": ["https://gpu/reglement.pdf"]}));
    });

    let config = RegistryConfig::from_toml_str(&format!(
        r#"
[backend]
base_url = "{}"

[[sources]]
id = "plu"
kind = "zoning"
label = "Local plan"
path = "/plu/by-point"
"#,
        server.base_url()
    ))
    .unwrap();

    let point = CoordinateResolver::new().parse("43.5, 3.25").unwrap();
    let aggregator = MultiSourceAggregator::new(config.build_registry(&Client::new()));
    let result = aggregator.run(point).await;

    assert_eq!(result.entries()[0].kind, "zoning");
    let text = render_text(&result);
    assert!(text.contains("== Local plan ==\nzone: 1AU"));
    assert!(text.contains("  - https://gpu/reglement.pdf"));
}
