// tests/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;
use provider_host::config::load_and_validate;
use provider_host::dag::ServiceGraph;
use provider_host::errors::ProviderHostError;

fn project_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn loads_full_project() {
    let file = project_file(
        r#"
name = "shop"

[config]
plugin_dirs = ["/opt/plugins"]
desktop_integration = false
context = "desktop-linux"
cancel_grace = "250ms"

[service.db.provider]
type = "model"
options = { model = "ai/smollm2", context-size = "1024" }

[service.web]
depends_on = ["db"]
environment = { PORT = "8080" }
"#,
    );

    let project = load_and_validate(file.path()).unwrap();
    assert_eq!(project.name, "shop");
    assert!(!project.config.desktop_integration);
    assert_eq!(project.config.context, "desktop-linux");
    assert_eq!(project.config.cancel_grace().as_millis(), 250);

    let provider = project.service["db"].provider.as_ref().unwrap();
    assert_eq!(provider.kind, "model");
    assert_eq!(provider.options["context-size"], "1024");
    assert_eq!(project.provider_services().collect::<Vec<_>>(), vec!["db"]);

    let graph = ServiceGraph::from_project(&project);
    assert_eq!(graph.dependents_of("db"), &["web".to_string()]);
}

#[test]
fn defaults_apply_when_config_section_missing() {
    let file = project_file(
        r#"
name = "shop"

[service.db.provider]
type = "model"
"#,
    );

    let project = load_and_validate(file.path()).unwrap();
    assert!(project.config.desktop_integration);
    assert_eq!(project.config.context, "default");
    assert_eq!(project.config.cancel_grace().as_secs(), 10);
}

#[test]
fn dependency_cycle_returns_structured_error() {
    let file = project_file(
        r#"
name = "shop"

[service.a]
depends_on = ["b"]

[service.b]
depends_on = ["a"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProviderHostError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('a') || msg.contains('b'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_dependency_returns_config_error() {
    let file = project_file(
        r#"
name = "shop"

[service.web]
depends_on = ["nonexistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(ProviderHostError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("nonexistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn missing_name_is_taken_from_directory() {
    let dir = tempfile::Builder::new().prefix("shop").tempdir().unwrap();
    let path = dir.path().join("provider-host.toml");
    std::fs::write(&path, "[service.db.provider]\ntype = \"model\"\n").unwrap();

    let project = load_and_validate(&path).unwrap();
    assert!(project.name.starts_with("shop"), "got {}", project.name);
}

#[test]
fn malformed_toml_is_toml_error() {
    let file = project_file("[service.db\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ProviderHostError::TomlError(_))
    ));
}
