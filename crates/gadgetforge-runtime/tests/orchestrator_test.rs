//! Integration tests for full generation runs

use gadgetforge_core::{Classification, ClassificationSource, GadgetRegistry, Verb};
use gadgetforge_runtime::{
    GadgetConstructionError, JobStatus, Orchestrator, Payload, PayloadLibrary, RunOptions,
    TransformerChainLibrary,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CONFIG: &str = r#"
Gadgets:
  CommonsBeanutils1:
    template: true
  Jdk8u20:
    template: true
  URLDNS:
    ref-fun: dnslog
  FindClassByBomb:
    ref-fun: class
"#;

/// Deterministic library: bytes are a function of gadget and command
struct Fixture;

impl PayloadLibrary for Fixture {
    fn materialize(
        &self,
        gadget: &str,
        command: Option<&str>,
    ) -> Result<Payload, GadgetConstructionError> {
        match gadget {
            "Jdk8u20" => Ok(Payload::Raw(vec![0xAC, 0xED, 0x00, 0x05, 0x01])),
            "Clojure" => Err(GadgetConstructionError::Construction {
                gadget: gadget.to_string(),
                message: "boom".to_string(),
            }),
            _ => Ok(Payload::Raw(
                format!("{gadget}::{}", command.unwrap_or("<none>")).into_bytes(),
            )),
        }
    }
}

/// Library that stalls on one gadget
struct Stalling;

impl PayloadLibrary for Stalling {
    fn materialize(
        &self,
        gadget: &str,
        _command: Option<&str>,
    ) -> Result<Payload, GadgetConstructionError> {
        if gadget == "AspectJWeaver" {
            std::thread::sleep(Duration::from_millis(500));
        }
        Ok(Payload::Raw(b"ok".to_vec()))
    }
}

fn classification() -> Classification {
    Classification::parse(CONFIG, ClassificationSource::BuiltinDefault)
}

fn orchestrator(library: Arc<dyn PayloadLibrary>, dir: &Path) -> Orchestrator {
    Orchestrator::new(
        Arc::new(GadgetRegistry::builtin()),
        library,
        RunOptions {
            output_dir: dir.to_path_buf(),
            workers: 4,
            task_timeout: Duration::from_secs(10),
        },
    )
}

fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().to_string_lossy().into_owned(),
                std::fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_run_writes_every_category() {
    let dir = TempDir::new().unwrap();
    let report = orchestrator(Arc::new(Fixture), dir.path())
        .run(&classification())
        .await
        .unwrap();

    let files = snapshot(dir.path());
    assert_eq!(files["AspectJWeaver.ser"], b"AspectJWeaver::{{param0}};{{param1}}");
    assert_eq!(files["SimplePrincipalCollection.ser"], b"SimplePrincipalCollection::<none>");
    assert_eq!(files["URLDNS.ser"], b"URLDNS::http://{{param0}}");
    assert_eq!(files["FindClassByBomb.ser"], b"FindClassByBomb::{{param0}}|28");
    assert_eq!(files["FindAllClassesByDNS.ser"], b"FindAllClassesByDNS::{{param0}}");
    assert_eq!(files["CommonsBeanutils3.ser"], b"CommonsBeanutils3::jndi:{{param0}}");
    assert_eq!(
        files["template_CommonsBeanutils1.ser"],
        b"CommonsBeanutils1::class_base64:"
    );
    assert_eq!(
        files["transform_script_CommonsCollections6.ser"],
        b"CommonsCollections6::script_base64:e3twYXJhbTB9fQ=="
    );

    assert_eq!(report.succeeded(), files.len());
    assert_eq!(report.disabled, vec!["CommonsBeanutils3_183".to_string()]);
    assert_eq!(report.output_dir, dir.path());
}

#[tokio::test]
async fn test_single_shots_written_without_ref_fun_tags() {
    let dir = TempDir::new().unwrap();
    let classification = Classification::parse(
        "Gadgets:\n  CommonsBeanutils1:\n    template: true\n",
        ClassificationSource::BuiltinDefault,
    );
    let report = orchestrator(Arc::new(Fixture), dir.path())
        .run(&classification)
        .await
        .unwrap();

    let files = snapshot(dir.path());
    assert_eq!(files["URLDNS.ser"], b"URLDNS::http://{{param0}}");
    assert_eq!(files["FindClassByDNS.ser"], b"FindClassByDNS::http://{{param0}}|{{param1}}");
    assert!(files.contains_key("template_CommonsBeanutils1.ser"));
    assert_eq!(
        report
            .outcomes
            .iter()
            .filter(|o| o.filename == "URLDNS.ser")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_raw_template_bytes_written_verbatim() {
    let dir = TempDir::new().unwrap();
    orchestrator(Arc::new(Fixture), dir.path())
        .run(&classification())
        .await
        .unwrap();

    let bytes = std::fs::read(dir.path().join("template_Jdk8u20.ser")).unwrap();
    assert_eq!(bytes, vec![0xAC, 0xED, 0x00, 0x05, 0x01]);
}

#[tokio::test]
async fn test_excluded_pairs_produce_no_files() {
    let dir = TempDir::new().unwrap();
    orchestrator(Arc::new(Fixture), dir.path())
        .run(&classification())
        .await
        .unwrap();

    let registry = GadgetRegistry::builtin();
    let files = snapshot(dir.path());
    for rule in registry.exclusions() {
        let name = format!("transform_{}_{}.ser", rule.verb.file_label(), rule.gadget);
        assert!(!files.contains_key(&name), "{name} should not exist");
    }
    for gadget in ["JRMPClient", "Wicket1", "FileUpload1"] {
        for verb in Verb::TRANSFORM {
            let name = format!("transform_{}_{gadget}.ser", verb.file_label());
            assert!(!files.contains_key(&name), "{name} should not exist");
        }
    }
    assert!(files.contains_key("transform_mozilla_defining_class_loader_CommonsCollections6.ser"));
}

#[tokio::test]
async fn test_failures_are_counted_not_fatal() {
    let dir = TempDir::new().unwrap();
    let report = orchestrator(Arc::new(Fixture), dir.path())
        .run(&classification())
        .await
        .unwrap();

    let clojure: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.gadget == "Clojure")
        .collect();
    assert!(!clojure.is_empty());
    assert!(clojure.iter().all(|o| !o.is_success()));
    assert_eq!(report.failed(), clojure.len());
    assert!(!dir.path().join("transform_raw_cmd_Clojure.ser").exists());
    assert!(dir.path().join("transform_raw_cmd_CommonsCollections5.ser").exists());
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(Arc::new(TransformerChainLibrary::default()), dir.path());

    let first_report = orchestrator.run(&classification()).await.unwrap();
    let first = snapshot(dir.path());
    let second_report = orchestrator.run(&classification()).await.unwrap();
    let second = snapshot(dir.path());

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first_report.outcomes, second_report.outcomes);
}

#[tokio::test]
async fn test_builtin_library_writes_object_streams() {
    let dir = TempDir::new().unwrap();
    let report = orchestrator(Arc::new(TransformerChainLibrary::default()), dir.path())
        .run(&classification())
        .await
        .unwrap();

    let bytes = std::fs::read(dir.path().join("transform_raw_cmd_CommonsCollections6.ser")).unwrap();
    assert_eq!(&bytes[..4], &[0xAC, 0xED, 0x00, 0x05]);

    // template and single-shot gadgets need a full library
    let template = report.outcome("template_CommonsBeanutils1.ser").unwrap();
    assert!(matches!(template.status, JobStatus::Failed { .. }));
}

#[tokio::test]
async fn test_builtin_library_only_writes_transformer_gadgets() {
    let dir = TempDir::new().unwrap();
    let report = orchestrator(Arc::new(TransformerChainLibrary::default()), dir.path())
        .run(&classification())
        .await
        .unwrap();

    for outcome in &report.outcomes {
        if outcome.is_success() {
            assert!(
                TransformerChainLibrary::schema_for(&outcome.gadget).is_some(),
                "{} written for a gadget the library cannot build",
                outcome.filename
            );
        }
    }

    for filename in [
        "transform_raw_cmd_C3P0.ser",
        "transform_raw_cmd_Groovy1.ser",
        "transform_raw_cmd_BeanShell1.ser",
        "CommonsBeanutils3.ser",
        "URLDNS.ser",
    ] {
        assert!(!dir.path().join(filename).exists(), "{filename} should not exist");
        let outcome = report.outcome(filename).unwrap();
        let JobStatus::Failed { error } = &outcome.status else {
            panic!("{filename} should be a failure");
        };
        assert!(error.contains("no implementation"), "{filename}: {error}");
    }

    assert!(dir.path().join("transform_jndi_CommonsCollections6.ser").exists());
    assert!(dir.path().join("transform_raw_cmd_CommonsCollectionsK4.ser").exists());
    assert_eq!(report.succeeded() + report.failed(), report.outcomes.len());
}

#[tokio::test]
async fn test_slow_job_times_out() {
    let dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(
        Arc::new(GadgetRegistry::builtin()),
        Arc::new(Stalling),
        RunOptions {
            output_dir: dir.path().to_path_buf(),
            workers: 2,
            task_timeout: Duration::from_millis(50),
        },
    );
    let report = orchestrator.run(&classification()).await.unwrap();

    let outcome = report.outcome("AspectJWeaver.ser").unwrap();
    let JobStatus::Failed { error } = &outcome.status else {
        panic!("expected timeout failure");
    };
    assert!(error.contains("timed out"));
    assert!(!dir.path().join("AspectJWeaver.ser").exists());
    assert!(dir.path().join("SimplePrincipalCollection.ser").exists());
}
