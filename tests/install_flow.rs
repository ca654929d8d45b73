//! End-to-end lifecycle tests over mock registry and raw-content servers.

use httpmock::prelude::*;
use tempfile::TempDir;

use sk::app::AppContext;
use sk::audit::{DriftStatus, audit_pack};
use sk::config::Config;
use sk::error::SkError;
use sk::installer::{InstallOptions, UpdateStrategy};

struct Harness {
    _state: TempDir,
    ctx: AppContext,
    raw: MockServer,
    registry: MockServer,
}

impl Harness {
    fn new() -> Self {
        let state = TempDir::new().unwrap();
        let raw = MockServer::start();
        let registry = MockServer::start();
        let config = Config {
            state_root: state.path().to_path_buf(),
            registry_url: registry.base_url(),
            raw_content_url: raw.base_url(),
            backup_keep: 3,
            lock_wait_ms: 2_000,
            lock_stale_ms: 30_000,
            lock_poll_ms: 10,
        };
        let ctx = AppContext::with_config(config).unwrap();
        Self {
            _state: state,
            ctx,
            raw,
            registry,
        }
    }

    fn serve_skill(&self, path: &str, body: &str) {
        let url_path = format!("/alice/skills/main/{path}/SKILL.md");
        let body = body.to_string();
        self.raw.mock(|when, then| {
            when.method(GET).path(url_path);
            then.status(200).body(body);
        });
        self.raw.mock(|when, then| {
            when.any_request();
            then.status(404);
        });
    }
}

fn body(name: &str, version: &str) -> String {
    format!(
        "---\nname: {name}\nversion: {version}\n---\n\n# {name}\n\nLong-form \
         guidance for the {name} skill, covering setup, conventions, and the \
         failure modes that trip people up in practice.\n"
    )
}

const DIRECT_URL: &str = "https://github.com/alice/skills/tree/main/rust-testing";

#[test]
fn registry_install_resolves_through_lookup() {
    let harness = Harness::new();
    harness.registry.mock(|when, then| {
        when.method(GET).path("/api/v1/skills/alice/rust-testing");
        then.status(200).json_body(serde_json::json!({
            "skill": {
                "display_name": "Rust Testing",
                "source_url": DIRECT_URL,
                "trust": "verified"
            }
        }));
    });
    harness.serve_skill("rust-testing", &body("rust-testing", "1.2.0"));

    let installer = harness.ctx.installer().unwrap();
    let report = installer
        .install("alice/rust-testing", &InstallOptions::default())
        .unwrap();
    assert_eq!(report.version, "1.2.0");
    assert_eq!(report.trust.to_string(), "verified");

    let manifest = installer.manifest().load().unwrap();
    assert_eq!(manifest.installed_skills["rust-testing"].id, "alice/rust-testing");
}

#[test]
fn full_update_cycle_with_local_edits() {
    let harness = Harness::new();
    let v1 = body("rust-testing", "1.0.0");
    harness.serve_skill("rust-testing", &v1);

    let installer = harness.ctx.installer().unwrap();
    installer.install(DIRECT_URL, &InstallOptions::default()).unwrap();

    // User rewords a line in place.
    let primary = harness
        .ctx
        .config
        .skills_dir()
        .join("rust-testing/SKILL.md");
    let local = v1.replace("failure modes", "sharp edges");
    assert_ne!(local, v1);
    std::fs::write(&primary, &local).unwrap();

    // Upstream publishes 1.1.0 with a new section.
    harness.raw.reset();
    let v2 = format!(
        "{}\n## Property Testing\n\nReach for proptest on parser-shaped code.\n",
        body("rust-testing", "1.1.0")
    );
    harness.serve_skill("rust-testing", &v2);

    let report = installer
        .update("rust-testing", UpdateStrategy::Merge, &InstallOptions::default())
        .unwrap();
    assert!(report.applied);
    assert!(report.locally_modified);
    assert!(report.conflicts.is_empty());
    assert_eq!(report.version, "1.1.0");

    let merged = std::fs::read_to_string(&primary).unwrap();
    assert!(merged.contains("sharp edges"));
    assert!(merged.contains("## Property Testing"));
    assert!(merged.contains("version: 1.1.0"));

    // Two versions recorded, newest first.
    let versions = harness.ctx.history.versions_for("rust-testing").unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].semver, "1.1.0");
}

#[test]
fn audit_reports_drift_after_upstream_release() {
    let harness = Harness::new();
    harness.serve_skill("rust-testing", &body("rust-testing", "1.0.0"));

    let installer = harness.ctx.installer().unwrap();
    installer.install(DIRECT_URL, &InstallOptions::default()).unwrap();

    let entries = audit_pack(&harness.ctx.config.skills_dir(), &harness.ctx.history).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, DriftStatus::Current);

    // A newer version lands in history (seen via another machine's update).
    harness
        .ctx
        .history
        .record_version(&sk::history::VersionRecord {
            skill_id: "rust-testing".to_string(),
            content_hash: "ffff".to_string(),
            semver: "2.0.0".to_string(),
            recorded_at: chrono::Utc::now(),
        })
        .unwrap();

    let entries = audit_pack(&harness.ctx.config.skills_dir(), &harness.ctx.history).unwrap();
    assert_eq!(entries[0].status, DriftStatus::Outdated);
    assert_eq!(entries[0].registry_version.as_deref(), Some("2.0.0"));
}

#[test]
fn discovery_only_registry_entry_fails_with_guidance() {
    let harness = Harness::new();
    harness.registry.mock(|when, then| {
        when.method(GET).path("/api/v1/skills/alice/stub");
        then.status(200)
            .json_body(serde_json::json!({ "skill": { "display_name": "Stub" } }));
    });

    let installer = harness.ctx.installer().unwrap();
    let err = installer
        .install("alice/stub", &InstallOptions::default())
        .unwrap_err();
    assert!(matches!(err, SkError::DiscoveryOnly(_)));
    assert!(err.remediation().is_some());
}

#[test]
fn remove_then_restore_from_backup() {
    let harness = Harness::new();
    harness.serve_skill("rust-testing", &body("rust-testing", "1.0.0"));

    let installer = harness.ctx.installer().unwrap();
    installer.install(DIRECT_URL, &InstallOptions::default()).unwrap();
    let install_dir = harness.ctx.config.skills_dir().join("rust-testing");

    installer.remove("rust-testing").unwrap();
    assert!(!install_dir.exists());

    let backups = installer.backups().list("rust-testing").unwrap();
    assert_eq!(backups[0].reason, "remove");
    installer
        .backups()
        .restore("rust-testing", &backups[0].name, &install_dir)
        .unwrap();
    assert!(install_dir.join("SKILL.md").exists());
}
