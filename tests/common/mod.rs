//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use locol_graph::{ComponentCatalog, ComponentKind, ConfigGraph, SchemaCatalog};
use std::sync::Arc;

/// A small but realistic collector document
pub const SAMPLE_DOCUMENT: &str = "\
receivers:
  otlp:
    protocols:
      grpc:
        endpoint: 0.0.0.0:4317
      http:
        endpoint: 0.0.0.0:4318
processors:
  batch:
    send_batch_size: 512
    timeout: 1s
  memory_limiter:
    check_interval: 1s
    limit_mib: 400
exporters:
  debug:
    verbosity: detailed
  otlp/backend:
    endpoint: backend:4317
    tls:
      insecure: true
extensions:
  health_check: {}
service:
  extensions:
  - health_check
  pipelines:
    metrics:
      receivers:
      - otlp
      processors:
      - memory_limiter
      - batch
      exporters:
      - otlp/backend
    traces:
      receivers:
      - otlp
      processors:
      - batch
      exporters:
      - debug
      - otlp/backend
";

/// Definition from the test catalog, panicking when absent
pub fn definition(catalog: &ComponentCatalog, kind: ComponentKind, name: &str) -> Arc<locol_graph::ComponentDefinition> {
    catalog
        .lookup(kind, name)
        .unwrap_or_else(|| panic!("test catalog has no {} '{}'", kind, name))
}

/// Parse the sample document against the test catalog
pub fn sample_graph() -> ConfigGraph {
    locol_graph::document::from_yaml(SAMPLE_DOCUMENT, &builders::test_catalog())
        .expect("sample document parses")
}
