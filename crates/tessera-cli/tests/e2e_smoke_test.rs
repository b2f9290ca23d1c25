use std::{
    fs,
    path::{Path, PathBuf},
};

use log::LevelFilter;
use tempfile::tempdir;

use tessera::ErrorKind;
use tessera_cli::{Args, run};

/// Fixtures shared with the library crate
fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tessera/tests/fixtures")
}

fn schemas() -> Vec<String> {
    ["dc", "di", "dmn", "dmndi"]
        .iter()
        .map(|name| {
            fixtures()
                .join(format!("schema/{name}.json"))
                .to_string_lossy()
                .to_string()
        })
        .collect()
}

fn args(input: &Path, output: &Path) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        schemas: schemas(),
        root: Some("dmn:Definitions".to_string()),
        fragment: false,
        strict: false,
        output: output.to_string_lossy().to_string(),
        config: None,
        log_level: LevelFilter::Off,
    }
}

/// Collects the complete documents from a fixture directory
fn collect_documents(dir: PathBuf) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
                path.is_file()
                    && name.ends_with(".dmn")
                    && !name.ends_with(".part.dmn")
                    && name != "dangling.dmn"
            })
            .collect()
    } else {
        Vec::new()
    };

    files.sort();
    files
}

#[test]
fn e2e_smoke_test_documents() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let documents: Vec<PathBuf> = ["dmn", "dmndi"]
        .into_iter()
        .flat_map(|dir| collect_documents(fixtures().join(dir)))
        .collect();
    assert!(!documents.is_empty(), "No documents found in fixtures");

    let mut failed = Vec::new();
    for (index, document) in documents.iter().enumerate() {
        let output = temp_dir.path().join(format!("{index}.xml"));

        match run(&args(document, &output)) {
            Ok(()) => {
                let written = fs::read_to_string(&output).unwrap();
                assert!(
                    written.starts_with("<?xml"),
                    "{} was not written as a document",
                    document.display()
                );
            }
            Err(e) => failed.push((document.clone(), e)),
        }
    }

    if !failed.is_empty() {
        eprintln!("\nDocuments that failed:");
        for (path, err) in &failed {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} document(s) failed unexpectedly", failed.len());
    }
}

#[test]
fn e2e_dangling_reference_fails() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("out.xml");

    let err = run(&args(&fixtures().join("dmn/dangling.dmn"), &output)).unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::DanglingReference));
    assert!(!output.exists());
}

#[test]
fn e2e_fragment_read() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("out.xml");

    let mut args = args(&fixtures().join("dmn/dangling.dmn"), &output);
    args.fragment = true;
    run(&args).unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains(r##"href="#InputData_missing""##));
}

#[test]
fn e2e_strict_rejects_extensions() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("out.xml");

    let mut args = args(&fixtures().join("dmn/extension-elements.dmn"), &output);
    args.strict = true;
    let err = run(&args).unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Validation));
}

#[test]
fn e2e_config_supplies_schemas_and_write_settings() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("out.xml");
    let config = temp_dir.path().join("config.toml");

    let fixtures = fixtures();
    let list = ["dc", "di", "dmn", "dmndi"]
        .map(|name| format!("{:?}", fixtures.join(format!("schema/{name}.json")).to_string_lossy()))
        .join(", ");
    fs::write(&config, format!("schemas = [{list}]\n\n[write]\nxml_declaration = false\n")).unwrap();

    let mut args = args(&fixtures.join("dmn/decision.dmn"), &output);
    args.schemas.clear();
    args.config = Some(config.to_string_lossy().to_string());
    run(&args).unwrap();

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("<dmn:definitions "));
}

#[test]
fn e2e_missing_schemas() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "").unwrap();

    let mut args = args(&fixtures().join("dmn/decision.dmn"), &temp_dir.path().join("out.xml"));
    args.schemas.clear();
    args.config = Some(config.to_string_lossy().to_string());
    let err = run(&args).unwrap_err();

    assert!(err.to_string().contains("no descriptor files given"));
}
