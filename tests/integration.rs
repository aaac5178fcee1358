use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mh_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mh");
    path
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("project");

    write(
        &project,
        "base/kustomization.yaml",
        "apiVersion: kustomize.config.k8s.io/v1beta1\nkind: Kustomization\nresources:\n  - app.yaml\n",
    );
    write(
        &project,
        "base/app.yaml",
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n  namespace: shop\n\
         ---\nbroken: yaml: here\n\
         ---\napiVersion: v1\nkind: Service\nmetadata:\n  name: web-svc\n  namespace: shop\n",
    );
    write(&project, "chart/Chart.yaml", "apiVersion: v2\nname: storefront\n");
    write(&project, "chart/values.yaml", "replicaCount: 3\n");
    write(
        &project,
        "chart/templates/notes.tpl",
        "replicas {{ .Values.replicaCount }}\n",
    );

    let config_path = tmp.path().join("mh.toml");
    fs::write(
        &config_path,
        format!(
            "[project]\nroot = \"{}\"\n\n[extraction]\nids = \"content\"\n",
            project.display()
        ),
    )
    .unwrap();

    (tmp, config_path, project)
}

fn run_mh(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mh_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--diagnostics")
        .arg("json")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mh binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_scan_summary() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_mh(&config_path, &["scan"]);
    assert!(success, "scan failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("folders:     3"), "{}", stdout);
    assert!(stdout.contains("files:       5"), "{}", stdout);
    assert!(stdout.contains("helm charts: 1"), "{}", stdout);
    assert!(stdout.contains("kustomization"), "{}", stdout);
}

#[test]
fn test_resources_table() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_mh(&config_path, &["resources"]);
    assert!(success, "resources failed: stderr={}", stderr);
    assert!(stdout.contains("KIND"));
    assert!(stdout.contains("Deployment"));
    assert!(stdout.contains("web-svc"));
    assert!(stdout.contains("base/app.yaml"));
    assert!(stdout.contains("HelmChart"));
}

#[test]
fn test_resources_kind_filter() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, _, success) = run_mh(&config_path, &["resources", "--kind", "service"]);
    assert!(success);
    assert!(stdout.contains("web-svc"));
    assert!(!stdout.contains("Deployment"));
}

#[test]
fn test_resources_json_ids_are_stable_with_content_ids() {
    let (_tmp, config_path, _) = setup_test_env();

    let (first, _, ok1) = run_mh(&config_path, &["resources", "--json"]);
    let (second, _, ok2) = run_mh(&config_path, &["resources", "--json"]);
    assert!(ok1 && ok2);

    let a: serde_json::Value = serde_json::from_str(&first).unwrap();
    let b: serde_json::Value = serde_json::from_str(&second).unwrap();
    let keys_a: Vec<&String> = a.as_object().unwrap().keys().collect();
    let keys_b: Vec<&String> = b.as_object().unwrap().keys().collect();
    assert_eq!(keys_a, keys_b);

    let kustomization = a
        .as_object()
        .unwrap()
        .values()
        .find(|r| r["type"] == "kustomization")
        .expect("kustomization resource");
    assert_eq!(kustomization["name"], "base");
}

#[test]
fn test_malformed_document_reported_as_json_diagnostic() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, stderr, success) = run_mh(&config_path, &["resources"]);
    assert!(success, "malformed YAML must not fail the pass");
    assert!(stdout.contains("web"));

    let skipped: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v["event"] == "document_skipped")
        .collect();
    assert_eq!(skipped.len(), 1, "stderr={}", stderr);
    assert_eq!(skipped[0]["file_name"], "app");
    assert_eq!(skipped[0]["document_index"], 1);
}

#[test]
fn test_tree_json() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, _, success) = run_mh(&config_path, &["tree"]);
    assert!(success);
    let map: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(map.get("<root>").is_some());
    assert_eq!(map["/base/app.yaml"]["isSupported"], true);
    assert_eq!(map["/chart/templates/notes.tpl"]["isSupported"], false);
}

#[test]
fn test_files_lists_helm_hints() {
    let (_tmp, config_path, _) = setup_test_env();

    let (stdout, _, success) = run_mh(&config_path, &["files"]);
    assert!(success);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines[0].contains("EXTENSION"));
    assert!(lines.iter().any(|l| l.contains("values") && l.ends_with("chart/values.yaml")));
    assert!(lines.iter().any(|l| l.contains("tpl") && l.ends_with("chart/templates/notes.tpl")));
}

#[test]
fn test_explicit_root_overrides_config() {
    let (_tmp, config_path, project) = setup_test_env();
    let base = project.join("base");

    let (stdout, _, success) = run_mh(&config_path, &["scan", base.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("files:       2"), "{}", stdout);
    assert!(stdout.contains("helm charts: 0"), "{}", stdout);
}

#[test]
fn test_missing_root_fails() {
    let (_tmp, config_path, _) = setup_test_env();

    let (_, stderr, success) = run_mh(&config_path, &["scan", "/definitely/not/here"]);
    assert!(!success);
    assert!(stderr.contains("root path does not exist"), "{}", stderr);
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[remote]\ntimeout_secs = 0\n").unwrap();

    let (_, stderr, success) = run_mh(&config_path, &["scan", tmp.path().to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("timeout_secs"));
}
