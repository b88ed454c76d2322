use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use config_engine::AuditCareConfig;
use ops_cli::{execute, Cli, Engine, EvaluateArgs, ReferenceArgs, ReferenceData};
use tempfile::TempDir;

const PROCEDURES: &str = "890201,CONSULTA DE PRIMERA VEZ POR MEDICINA GENERAL,Z,Z,N,S\n";
const REGISTRY: &str =
    "EPS001,CC,1032456789,PEREZ,GOMEZ,ANA,MARIA,1985-06-01,F,11,001,AC,2020-01-01,,1,900555111\n";
const ROSTER: &str = r#"[{"id": "aud-1", "role": "medical", "dailyCapacity": 5}]"#;
const CLAIM: &str = r#"{
    "numDocumentoIdObligado": "900123456",
    "numFactura": "INV-001",
    "usuarios": [{
        "tipoDocumentoIdentificacion": "CC",
        "numDocumentoIdentificacion": "1032456789",
        "codSexo": "F",
        "servicios": {
            "consultas": [
                {"codPrestador": "110010001", "fechaInicioAtencion": "2024-03-01",
                 "codConsulta": "890201", "codDiagnosticoPrincipal": "J069", "vrServicio": 45000},
                {"codPrestador": "110010001", "fechaInicioAtencion": "2024-03-02",
                 "codConsulta": "999999", "codDiagnosticoPrincipal": "J069", "vrServicio": 38000}
            ]
        }
    }]
}"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "procedures.csv", PROCEDURES);
    write(dir.path(), "registry.csv", REGISTRY);
    write(dir.path(), "roster.json", ROSTER);
    write(dir.path(), "inv-001.json", CLAIM);
    write(dir.path(), "broken.json", "{ \"numFactura\": ");
    dir
}

fn path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).display().to_string()
}

#[tokio::test]
async fn test_run_with_approval_succeeds() {
    let dir = workspace();
    let cli = Cli::try_parse_from([
        "auditcare".to_string(),
        "run".to_string(),
        path(&dir, "inv-001.json"),
        "--procedures".to_string(),
        path(&dir, "procedures.csv"),
        "--registry".to_string(),
        path(&dir, "registry.csv"),
        "--roster".to_string(),
        path(&dir, "roster.json"),
        "--decision".to_string(),
        "approve".to_string(),
        "--json".to_string(),
    ])
    .unwrap();

    execute(cli.command, AuditCareConfig::default()).await.unwrap();
}

#[tokio::test]
async fn test_failed_document_fails_the_command() {
    let dir = workspace();
    let cli = Cli::try_parse_from([
        "auditcare".to_string(),
        "normalize".to_string(),
        path(&dir, "inv-001.json"),
        path(&dir, "broken.json"),
    ])
    .unwrap();

    let error = execute(cli.command, AuditCareConfig::default())
        .await
        .unwrap_err();

    assert!(error.to_string().contains("1 of 2"));
}

#[tokio::test]
async fn test_missing_reference_file_is_reported() {
    let args = ReferenceArgs {
        procedures: Some(PathBuf::from("/nonexistent/procedures.csv")),
        ..ReferenceArgs::default()
    };

    let error = ReferenceData::load(&args, &AuditCareConfig::default())
        .err()
        .unwrap();

    assert!(format!("{error:#}").contains("procedures.csv"));
}

#[tokio::test]
async fn test_engine_flags_unknown_consultation() {
    let dir = workspace();
    let args = EvaluateArgs {
        claims: vec![dir.path().join("inv-001.json")],
        reference: ReferenceArgs {
            procedures: Some(dir.path().join("procedures.csv")),
            registry: Some(dir.path().join("registry.csv")),
            ..ReferenceArgs::default()
        },
        workers: 2,
        json: true,
    };
    let config = AuditCareConfig::default();
    let engine = Engine::new(
        config.clone(),
        ReferenceData::load(&args.reference, &config).unwrap(),
        args.workers,
    );

    let documents = ops_cli::context::read_documents(&args.claims).unwrap();
    let results = engine.pipeline.process_all(documents).await;

    let report = results[0].as_ref().unwrap();
    assert_eq!(report.evaluation.deductions.len(), 1);
    assert_eq!(report.evaluation.deductions[0].causal_code, "FA5701");
}
