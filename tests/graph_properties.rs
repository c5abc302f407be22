//! Property tests over random edit sequences
//!
//! After any sequence of public operations:
//! - instance names are pairwise distinct
//! - every stage reference resolves to an instance of the stage's kind
//! - parse(generate(g)) is graph-equal to g

mod common;

use common::builders::test_catalog;
use locol_graph::document;
use locol_graph::{ComponentDefinition, ComponentKind, ConfigGraph, ConfigValue, SchemaCatalog, Stage};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    AddPipeline(usize),
    RemovePipeline(usize),
    Create { definition: usize, alias: usize },
    Attach { instance: usize, pipeline: usize, stage: usize },
    Detach { instance: usize, pipeline: usize, stage: usize },
    Rename { instance: usize, alias: usize },
    SetInt { instance: usize, value: i64 },
    SetDuration { instance: usize, millis: u64 },
    SetText { instance: usize, text: String },
    MoveProcessor { pipeline: usize, from: usize, to: usize },
}

const PIPELINES: [&str; 4] = ["traces", "metrics", "logs", "traces/internal"];
const ALIASES: [&str; 4] = ["", "a", "b", "otlp/a"];

fn definitions() -> Vec<Arc<ComponentDefinition>> {
    let catalog = test_catalog();
    [
        (ComponentKind::Receiver, "otlp"),
        (ComponentKind::Processor, "batch"),
        (ComponentKind::Processor, "memory_limiter"),
        (ComponentKind::Exporter, "debug"),
        (ComponentKind::Exporter, "otlp"),
        (ComponentKind::Extension, "health_check"),
        (ComponentKind::Connector, "spanmetrics"),
    ]
    .into_iter()
    .filter_map(|(kind, name)| catalog.lookup(kind, name))
    .collect()
}

fn op() -> impl Strategy<Value = Op> {
    let idx = || 0usize..16;
    prop_oneof![
        idx().prop_map(Op::AddPipeline),
        idx().prop_map(Op::RemovePipeline),
        (idx(), idx()).prop_map(|(definition, alias)| Op::Create { definition, alias }),
        (idx(), idx(), 0usize..3).prop_map(|(instance, pipeline, stage)| Op::Attach {
            instance,
            pipeline,
            stage
        }),
        (idx(), idx(), 0usize..3).prop_map(|(instance, pipeline, stage)| Op::Detach {
            instance,
            pipeline,
            stage
        }),
        (idx(), idx()).prop_map(|(instance, alias)| Op::Rename { instance, alias }),
        (idx(), -1000i64..100_000).prop_map(|(instance, value)| Op::SetInt { instance, value }),
        (idx(), 0u64..10_000_000).prop_map(|(instance, millis)| Op::SetDuration { instance, millis }),
        (idx(), "v[a-z]{0,6}").prop_map(|(instance, text)| Op::SetText { instance, text }),
        (idx(), 0usize..3, 0usize..3).prop_map(|(pipeline, from, to)| Op::MoveProcessor {
            pipeline,
            from,
            to
        }),
    ]
}

fn pick<T: Copy>(items: &[T], index: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[index % items.len()])
    }
}

/// Apply an operation, ignoring rejected ones
fn apply(graph: &mut ConfigGraph, definitions: &[Arc<ComponentDefinition>], op: &Op) {
    let instances: Vec<_> = graph.instances().map(|i| i.id).collect();
    let pipelines: Vec<_> = graph.pipelines().iter().map(|p| p.id).collect();

    match op {
        Op::AddPipeline(n) => {
            let _ = graph.add_pipeline(PIPELINES[n % PIPELINES.len()]);
        }
        Op::RemovePipeline(n) => {
            if let Some(p) = pick(&pipelines, *n) {
                graph.remove_pipeline(p).unwrap();
            }
        }
        Op::Create { definition, alias } => {
            let def = definitions[definition % definitions.len()].clone();
            graph.create_instance(def, ALIASES[alias % ALIASES.len()]);
        }
        Op::Attach { instance, pipeline, stage } => {
            if let (Some(i), Some(p)) = (pick(&instances, *instance), pick(&pipelines, *pipeline)) {
                let _ = graph.attach(i, p, Stage::ALL[*stage]);
            }
        }
        Op::Detach { instance, pipeline, stage } => {
            if let (Some(i), Some(p)) = (pick(&instances, *instance), pick(&pipelines, *pipeline)) {
                graph.detach(i, p, Stage::ALL[*stage]).unwrap();
            }
        }
        Op::Rename { instance, alias } => {
            if let Some(i) = pick(&instances, *instance) {
                graph.rename_instance(i, ALIASES[alias % ALIASES.len()]).unwrap();
            }
        }
        Op::SetInt { instance, value } => {
            if let Some(i) = pick(&instances, *instance) {
                let key = match graph.instance(i).unwrap().base_name() {
                    "batch" => "send_batch_size",
                    "memory_limiter" => "limit_mib",
                    _ => "extra.count",
                };
                graph.set_value(i, key, ConfigValue::Int(*value)).unwrap();
            }
        }
        Op::SetDuration { instance, millis } => {
            if let Some(i) = pick(&instances, *instance) {
                let key = match graph.instance(i).unwrap().base_name() {
                    "batch" | "otlp" => "timeout",
                    _ => "extra.interval",
                };
                let value = ConfigValue::Duration(Duration::from_millis(*millis));
                graph.set_value(i, key, value).unwrap();
            }
        }
        Op::SetText { instance, text } => {
            if let Some(i) = pick(&instances, *instance) {
                graph.set_value(i, "extra.note", ConfigValue::from(text.as_str())).unwrap();
            }
        }
        Op::MoveProcessor { pipeline, from, to } => {
            if let Some(p) = pick(&pipelines, *pipeline) {
                let _ = graph.move_processor(p, *from, *to);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_invariants_hold_after_every_operation(ops in prop::collection::vec(op(), 1..60)) {
        let definitions = definitions();
        let mut graph = ConfigGraph::new("v0.91.0");

        for op in &ops {
            apply(&mut graph, &definitions, op);

            // Property: names are unique across all kinds
            let names: Vec<_> = graph.instances().map(|i| i.name.clone()).collect();
            let unique: HashSet<_> = names.iter().collect();
            prop_assert_eq!(unique.len(), names.len(), "duplicate names after {:?}", op);

            // Property: every reference resolves in the matching registry
            for pipeline in graph.pipelines() {
                for stage in Stage::ALL {
                    for id in pipeline.stage(stage) {
                        let instance = graph.registry(stage.kind()).get(*id);
                        prop_assert!(instance.is_some(), "dangling reference after {:?}", op);
                    }
                }
            }
            prop_assert!(graph.check_integrity().is_ok());
        }
    }

    #[test]
    fn test_generate_parse_round_trip(ops in prop::collection::vec(op(), 1..60)) {
        let definitions = definitions();
        let catalog = test_catalog();
        let mut graph = ConfigGraph::new("v0.91.0");
        for op in &ops {
            apply(&mut graph, &definitions, op);
        }

        let text = document::to_yaml(&graph).unwrap();
        let reparsed = document::from_yaml(&text, &catalog).unwrap();
        prop_assert_eq!(reparsed.shape(), graph.shape(), "document:\n{}", text);

        // Property: regeneration is byte-for-byte stable
        prop_assert_eq!(document::to_yaml(&reparsed).unwrap(), text);
    }

    #[test]
    fn test_detach_collects_only_orphans(ops in prop::collection::vec(op(), 1..40), pick_index in 0usize..16) {
        let definitions = definitions();
        let mut graph = ConfigGraph::new("");
        for op in &ops {
            apply(&mut graph, &definitions, op);
        }

        let memberships: Vec<_> = graph
            .pipelines()
            .iter()
            .flat_map(|p| p.members().map(move |(stage, id)| (p.id, stage, id)))
            .collect();
        if let Some((pipeline, stage, id)) = pick(&memberships, pick_index) {
            let elsewhere = graph
                .pipelines()
                .iter()
                .any(|p| p.id != pipeline && p.references(id));
            graph.detach(id, pipeline, stage).unwrap();
            prop_assert_eq!(graph.instance(id).is_some(), elsewhere);
        }
    }
}
