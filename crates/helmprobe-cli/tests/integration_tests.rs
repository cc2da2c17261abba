//! Integration tests for CLI commands

use std::process::Command;
use tempfile::TempDir;

/// Helper to run helmprobe without inheriting helmprobe settings
fn helmprobe(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_helmprobe"))
        .args(args)
        .env_remove("HELMPROBE_HELM")
        .env_remove("HELMPROBE_TIMEOUT_SECS")
        .env_remove("HELMPROBE_STAGING_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute helmprobe")
}

/// Get the fixtures path
fn fixtures_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures")
}

fn my_app() -> String {
    format!("{}/my-app", fixtures_path())
}

#[cfg(unix)]
fn fake_helm() -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = format!("{}/bin/fake-helm", fixtures_path());
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    if mode & 0o111 == 0 {
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

fn write_values(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

mod values_command {
    use super::*;

    #[test]
    fn test_values_from_templates() {
        let output = helmprobe(&["values", &my_app()]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("18 value path(s) referenced by templates"));
        assert!(stdout.contains("image.pullPolicy"));
        assert!(!stdout.contains("notesOnly"));
    }

    #[test]
    fn test_values_from_schema() {
        let output = helmprobe(&["values", &my_app(), "--source", "schema"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("18 value path(s) declared by the schema"));
    }

    #[test]
    fn test_values_missing_chart() {
        let output = helmprobe(&["values", "/definitely/not/a/chart"]);

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("does not exist"));
    }
}

mod parity_command {
    use super::*;

    #[test]
    fn test_parity_consistent_chart() {
        let output = helmprobe(&["parity", &my_app()]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Templates and values schema agree"));
    }

    #[test]
    fn test_parity_mismatch() {
        let chart = TempDir::new().unwrap();
        std::fs::create_dir(chart.path().join("templates")).unwrap();
        std::fs::write(
            chart.path().join("templates/deployment.yaml"),
            "replicas: {{ .Values.replicas }}\nimage: {{ .Values.image.tag }}\n",
        )
        .unwrap();
        std::fs::write(
            chart.path().join("values.schema.json"),
            r#"{"properties": {"replicas": {"type": "integer"}, "debug": {"type": "boolean"}}}"#,
        )
        .unwrap();

        let output = helmprobe(&["parity", &chart.path().to_string_lossy()]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("image.tag"));
        assert!(stdout.contains("debug"));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("2 value path(s) differ"));
    }

    #[test]
    fn test_parity_without_schema() {
        let chart = TempDir::new().unwrap();

        let output = helmprobe(&["parity", &chart.path().to_string_lossy()]);

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("non-existent schema file"));
    }
}

#[cfg(unix)]
mod version_command {
    use super::*;

    #[test]
    fn test_version() {
        let output = helmprobe(&["version", "--helm", &fake_helm()]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("3.19.4"));
        assert!(stdout.contains("version.BuildInfo"));
    }

    #[test]
    fn test_missing_helm() {
        let output = helmprobe(&["version", "--helm", "/definitely/not/here/helm"]);

        assert_eq!(output.status.code(), Some(64));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("does not exist"));
    }

    #[test]
    fn test_no_helm_configured() {
        let output = helmprobe(&["version"]);

        assert_eq!(output.status.code(), Some(64));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("No helm executable configured"));
    }
}

#[cfg(unix)]
mod template_command {
    use super::*;

    #[test]
    fn test_template_lists_objects() {
        let output = helmprobe(&["template", &my_app(), "--helm", &fake_helm()]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Rendered 3 object(s)"));
        assert!(stdout.contains("my-app-secret"));
        assert!(stdout.contains("my-app-config"));
        assert!(stdout.contains("apps/v1"));
    }

    #[test]
    fn test_template_render_failure() {
        let dir = TempDir::new().unwrap();
        let values = write_values(&dir, "bad.yaml", "image:\n  pullPolicy: VeryBad\n");

        let output = helmprobe(&["template", &my_app(), "-f", &values, "--helm", &fake_helm()]);

        assert_eq!(output.status.code(), Some(3));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Don't use the VeryBad image pull policy!"));
    }

    #[test]
    fn test_template_expected_failure() {
        let dir = TempDir::new().unwrap();
        let values = write_values(&dir, "bad.yaml", "image:\n  pullPolicy: VeryBad\n");

        let output = helmprobe(&[
            "template",
            &my_app(),
            "-f",
            &values,
            "--expect-error",
            "--helm",
            &fake_helm(),
        ]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Rendering failed as expected"));
        assert!(stdout.contains("VeryBad"));
    }

    #[test]
    fn test_template_missing_values_file() {
        let output = helmprobe(&[
            "template",
            &my_app(),
            "-f",
            "/definitely/not/here.yaml",
            "--helm",
            &fake_helm(),
        ]);

        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_template_timeout() {
        let dir = TempDir::new().unwrap();
        let values = write_values(&dir, "slow.yaml", "sleep: 30\n");

        let output = helmprobe(&[
            "template",
            &my_app(),
            "-f",
            &values,
            "--timeout",
            "1",
            "--helm",
            &fake_helm(),
        ]);

        assert_eq!(output.status.code(), Some(3));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("timed out"));
    }
}

#[cfg(unix)]
mod verify_command {
    use super::*;

    #[test]
    fn test_verify_passes() {
        let output = helmprobe(&["verify", &my_app(), "--helm", &fake_helm()]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("1 workload(s)"));
        assert!(stdout.contains("All checksum annotations are consistent"));
    }

    #[test]
    fn test_verify_reports_findings() {
        let dir = TempDir::new().unwrap();
        let values = write_values(&dir, "skip.yaml", "skipChecksums: true\n");

        let output = helmprobe(&["verify", &my_app(), "-f", &values, "--helm", &fake_helm()]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains(
            "Workload 'my-app' is missing checksum annotation for referenced Secret 'my-app-secret'."
        ));
        assert!(stdout.contains("my-app-config"));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("2 checksum annotation problem(s) found"));
    }
}
