//! Generation job planning
//!
//! A run is planned up front into an ordered list of jobs, one per
//! artifact. Planning is pure: it only looks at the registry and the
//! classification, never at the payload library or the file system.

use gadgetforge_core::registry::{TEMPLATE_COMMAND, ref_fun_command};
use gadgetforge_core::{Category, Classification, GadgetRegistry, Verb};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which code path produced a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    /// Fixed single-shot gadget
    OneOff,
    /// Config-tagged single-shot gadget
    RefFun {
        /// Ref-fun tag from the config
        tag: String,
    },
    /// Self-contained template gadget
    Template,
    /// One (gadget, verb) pair
    Transform {
        /// Verb compiled into the command
        verb: Verb,
    },
}

/// One artifact to generate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Gadget name
    pub gadget: String,

    /// Code path
    #[serde(flatten)]
    pub kind: JobKind,

    /// Command handed to the library, if the gadget takes one
    pub command: Option<String>,

    /// Artifact file name
    pub filename: String,
}

impl GenerationJob {
    /// A fixed single-shot job
    pub fn one_off(gadget: impl Into<String>, argument: Option<String>) -> Self {
        let gadget = gadget.into();
        Self {
            filename: format!("{gadget}.ser"),
            gadget,
            kind: JobKind::OneOff,
            command: argument,
        }
    }

    /// A ref-fun job; unknown tags plan a job with no command
    pub fn ref_fun(gadget: impl Into<String>, tag: impl Into<String>) -> Self {
        let gadget = gadget.into();
        let tag = tag.into();
        Self {
            filename: format!("{gadget}.ser"),
            command: ref_fun_command(&tag).map(str::to_string),
            gadget,
            kind: JobKind::RefFun { tag },
        }
    }

    /// A template job
    pub fn template(gadget: impl Into<String>) -> Self {
        let gadget = gadget.into();
        Self {
            filename: format!("{}_{gadget}.ser", Category::Template),
            gadget,
            kind: JobKind::Template,
            command: Some(TEMPLATE_COMMAND.to_string()),
        }
    }

    /// A transform job for one verb
    pub fn transform(gadget: impl Into<String>, verb: Verb) -> Self {
        let gadget = gadget.into();
        Self {
            filename: format!(
                "{}_{}_{gadget}.ser",
                Category::Transform,
                verb.file_label()
            ),
            gadget,
            kind: JobKind::Transform { verb },
            command: Some(verb.placeholder_command()),
        }
    }

    /// Verb for transform jobs
    pub fn verb(&self) -> Option<Verb> {
        match &self.kind {
            JobKind::Transform { verb } => Some(*verb),
            _ => None,
        }
    }

    /// Short label for logs and reports: the verb or the category
    pub fn label(&self) -> String {
        match &self.kind {
            JobKind::OneOff => "one-off".to_string(),
            JobKind::RefFun { tag } => format!("ref-fun:{tag}"),
            JobKind::Template => Category::Template.to_string(),
            JobKind::Transform { verb } => verb.to_string(),
        }
    }
}

/// Plan every job for a run: one-offs, ref-fun, templates, transforms.
///
/// Transform gadgets with a registry incompatibility and excluded
/// (gadget, verb) pairs are left out entirely. Each file name is planned
/// once; a config ref-fun tag on a fixed one-off gadget only keeps that
/// gadget out of the template and transform buckets.
pub fn plan(registry: &GadgetRegistry, classification: &Classification) -> Vec<GenerationJob> {
    let partition = registry.partition(classification);

    let one_offs = registry
        .one_offs()
        .iter()
        .map(|one_off| GenerationJob::one_off(one_off.gadget.as_str(), one_off.argument.clone()));

    let ref_funs = partition.ref_funs.iter().filter_map(|gadget| {
        let tag = gadget.ref_fun_kind.as_deref()?;
        Some(GenerationJob::ref_fun(gadget.name.as_str(), tag))
    });

    let templates = partition
        .templates
        .iter()
        .map(|gadget| GenerationJob::template(gadget.name.as_str()));

    let transforms = registry
        .transform_pairs(&partition)
        .map(|(gadget, verb)| GenerationJob::transform(gadget.name.as_str(), verb));

    let mut seen = HashSet::new();
    one_offs
        .chain(ref_funs)
        .chain(templates)
        .chain(transforms)
        .filter(|job| {
            let fresh = seen.insert(job.filename.clone());
            if !fresh {
                tracing::debug!(
                    gadget = %job.gadget,
                    label = %job.label(),
                    "{} already planned",
                    job.filename
                );
            }
            fresh
        })
        .collect()
}

/// Number of transform pairs the exclusion table removed
pub fn excluded_pairs(registry: &GadgetRegistry, classification: &Classification) -> usize {
    let partition = registry.partition(classification);
    partition
        .transforms
        .iter()
        .flat_map(|gadget| {
            registry
                .transform_verbs()
                .iter()
                .filter(move |verb| registry.is_excluded(&gadget.name, **verb))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgetforge_core::ClassificationSource;
    use rstest::rstest;

    #[rstest]
    #[case(GenerationJob::transform("CommonsCollections6", Verb::RawCmd), "transform_raw_cmd_CommonsCollections6.ser")]
    #[case(GenerationJob::transform("CommonsCollections6", Verb::ScriptBase64), "transform_script_CommonsCollections6.ser")]
    #[case(GenerationJob::template("Jdk8u20"), "template_Jdk8u20.ser")]
    #[case(GenerationJob::ref_fun("URLDNS", "dnslog"), "URLDNS.ser")]
    #[case(GenerationJob::one_off("AspectJWeaver", None), "AspectJWeaver.ser")]
    fn test_filenames(#[case] job: GenerationJob, #[case] expected: &str) {
        assert_eq!(job.filename, expected);
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            GenerationJob::transform("X", Verb::Loadjar).command.as_deref(),
            Some("loadjar:http://{{param0}}|{{param1}}")
        );
        assert_eq!(
            GenerationJob::template("X").command.as_deref(),
            Some("class_base64:")
        );
        assert_eq!(
            GenerationJob::ref_fun("FindClassByBomb", "class").command.as_deref(),
            Some("{{param0}}|28")
        );
        assert_eq!(GenerationJob::ref_fun("X", "mystery").command, None);
    }

    #[rstest]
    #[case("CommonsBeanutils3", Some("jndi:{{param0}}"))]
    #[case("FindClassByBomb", Some("{{param0}}|28"))]
    #[case("FindClassByDNS", Some("http://{{param0}}|{{param1}}"))]
    #[case("AspectJWeaver", Some("{{param0}};{{param1}}"))]
    #[case("FindAllClassesByDNS", Some("{{param0}}"))]
    #[case("URLDNS", Some("http://{{param0}}"))]
    #[case("SimplePrincipalCollection", None)]
    fn test_single_shot_commands(#[case] gadget: &str, #[case] command: Option<&str>) {
        let jobs = plan(&GadgetRegistry::builtin(), &Classification::builtin_default());
        let filename = format!("{gadget}.ser");
        let planned: Vec<&GenerationJob> = jobs.iter().filter(|j| j.filename == filename).collect();

        assert_eq!(planned.len(), 1, "{filename}");
        assert_eq!(planned[0].kind, JobKind::OneOff);
        assert_eq!(planned[0].command.as_deref(), command);
    }

    #[test]
    fn test_single_shots_without_ref_fun_tags() {
        let text = "Gadgets:\n  CommonsBeanutils1:\n    template: true\n";
        let classification = Classification::parse(text, ClassificationSource::BuiltinDefault);
        let jobs = plan(&GadgetRegistry::builtin(), &classification);

        for filename in ["URLDNS.ser", "FindClassByBomb.ser", "CommonsBeanutils3.ser"] {
            assert!(jobs.iter().any(|j| j.filename == filename), "{filename}");
        }
        // untagged, so they stay in the transform loop as well
        assert!(jobs.iter().any(|j| j.filename == "transform_raw_cmd_URLDNS.ser"));
    }

    #[test]
    fn test_ref_fun_tag_on_one_off_plans_once() {
        let text = "Gadgets:\n  AspectJWeaver:\n    ref-fun: jndi\n  SimplePrincipalCollection:\n    ref-fun: dnslog\n";
        let classification = Classification::parse(text, ClassificationSource::BuiltinDefault);
        let jobs = plan(&GadgetRegistry::builtin(), &classification);

        for gadget in ["AspectJWeaver", "SimplePrincipalCollection"] {
            let planned: Vec<&GenerationJob> = jobs.iter().filter(|j| j.gadget == gadget).collect();
            assert_eq!(planned.len(), 1, "{gadget}");
            assert_eq!(planned[0].kind, JobKind::OneOff);
        }
    }

    #[test]
    fn test_plan_order_and_uniqueness() {
        let registry = GadgetRegistry::builtin();
        let jobs = plan(&registry, &Classification::builtin_default());

        let rank = |job: &GenerationJob| match job.kind {
            JobKind::OneOff => 0,
            JobKind::RefFun { .. } => 1,
            JobKind::Template => 2,
            JobKind::Transform { .. } => 3,
        };
        assert!(jobs.windows(2).all(|w| rank(&w[0]) <= rank(&w[1])));

        let names: HashSet<&str> = jobs.iter().map(|j| j.filename.as_str()).collect();
        assert_eq!(names.len(), jobs.len(), "filenames must be unique");
    }

    #[test]
    fn test_plan_respects_exclusions() {
        let registry = GadgetRegistry::builtin();
        let classification = Classification::builtin_default();
        let jobs = plan(&registry, &classification);

        for job in &jobs {
            if let Some(verb) = job.verb() {
                assert!(!registry.is_excluded(&job.gadget, verb), "{}", job.filename);
            }
        }
        assert!(!jobs.iter().any(|j| j.filename == "transform_jndi_Groovy1.ser"));
        assert!(jobs.iter().any(|j| j.filename == "transform_raw_cmd_Groovy1.ser"));
        assert!(jobs
            .iter()
            .any(|j| j.filename == "transform_mozilla_defining_class_loader_CommonsCollections6.ser"));
        assert!(excluded_pairs(&registry, &classification) > 0);
    }

    #[test]
    fn test_ref_fun_removed_from_transforms() {
        let text = "Gadgets:\n  CommonsCollections6:\n    ref-fun: jndi\n";
        let classification = Classification::parse(text, ClassificationSource::BuiltinDefault);
        let jobs = plan(&GadgetRegistry::builtin(), &classification);

        let cc6: Vec<&GenerationJob> = jobs
            .iter()
            .filter(|j| j.gadget == "CommonsCollections6")
            .collect();
        assert_eq!(cc6.len(), 1);
        assert_eq!(cc6[0].kind, JobKind::RefFun { tag: "jndi".into() });
    }

    #[test]
    fn test_job_serializes_with_kind_tag() {
        let job = GenerationJob::transform("CommonsCollections5", Verb::Dnslog);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"], "transform");
        assert_eq!(json["verb"], "dnslog");
        assert_eq!(json["filename"], "transform_dnslog_CommonsCollections5.ser");
    }
}
