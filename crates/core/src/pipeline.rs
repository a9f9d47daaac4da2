//! Extraction pipeline entry point.
//!
//! file -> container text -> decoded document -> canonical graph -> sorted,
//! enriched nodes -> parameter summary.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{NodeCatalog, SubgraphDefinition};
use crate::container::{ContainerReader, MediaFile};
use crate::decode::{decode, GraphSchema};
use crate::enrich::{enrich, sort_by_order, ContentEntry, NoteEntry};
use crate::error::CoreError;
use crate::graph::{CanonicalGroup, CanonicalLink, CanonicalNode};
use crate::normalize::normalize;
use crate::parameters::{extract_parameters, ParameterSummary};
use crate::registry::{NodeTypeDefinition, NodeTypeRegistrar};

/// Everything recovered from one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedWorkflow {
    /// Encoding the document was stored in.
    pub schema: GraphSchema,
    pub nodes: Vec<CanonicalNode>,
    pub links: Vec<CanonicalLink>,
    pub groups: Vec<CanonicalGroup>,
    pub node_list: Vec<ContentEntry>,
    pub notes: Vec<NoteEntry>,
    pub parameters: ParameterSummary,
    /// Ids of subgraph definitions that nodes in this graph instantiate.
    pub subgraphs: Vec<String>,
}

/// Outcome of an extraction that did not fail unexpectedly.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found(NormalizedWorkflow),
    /// No recoverable workflow: no embedded text, invalid JSON, or no nodes.
    NotFound,
}

impl Extraction {
    pub fn into_workflow(self) -> Option<NormalizedWorkflow> {
        match self {
            Extraction::Found(workflow) => Some(workflow),
            Extraction::NotFound => None,
        }
    }
}

/// Runs the extraction pipeline against a loaded node catalog.
#[derive(Debug, Clone)]
pub struct WorkflowExtractor {
    catalog: Arc<NodeCatalog>,
    reader: ContainerReader,
}

impl WorkflowExtractor {
    /// The catalog must already be loaded; there is no way to build an
    /// extractor without one.
    pub fn new(catalog: Arc<NodeCatalog>, reader: ContainerReader) -> Self {
        Self { catalog, reader }
    }

    /// Extract the workflow embedded in `file` and register any subgraph
    /// node types it uses.
    pub async fn extract(
        &self,
        file: &MediaFile,
        registrar: &dyn NodeTypeRegistrar,
    ) -> Result<Extraction, CoreError> {
        let Some(raw) = self.reader.extract_raw_text(file).await? else {
            return Ok(Extraction::NotFound);
        };

        let (extraction, subgraphs) = self.extract_from_text(&raw)?;
        for definition in &subgraphs {
            registrar
                .ensure_registered(&definition.id, NodeTypeDefinition::from_subgraph(definition))
                .await;
        }

        if let Extraction::Found(workflow) = &extraction {
            tracing::info!(
                file_name = file.file_name.as_deref().unwrap_or("<unnamed>"),
                schema = ?workflow.schema,
                nodes = workflow.nodes.len(),
                links = workflow.links.len(),
                samplers = workflow.parameters.samplers.len(),
                "Workflow extracted"
            );
        }
        Ok(extraction)
    }

    /// Run the pipeline over already-located workflow text.
    ///
    /// Returns the subgraph definitions the graph instantiates so the caller
    /// can register them.
    pub fn extract_from_text(
        &self,
        raw: &str,
    ) -> Result<(Extraction, Vec<SubgraphDefinition>), CoreError> {
        let document = match decode(raw) {
            Ok(document) => document,
            Err(CoreError::MalformedInput(reason)) => {
                tracing::debug!(%reason, "Embedded text is not a workflow document");
                return Ok((Extraction::NotFound, Vec::new()));
            }
            Err(e) => return Err(e),
        };

        let graph = normalize(&document);
        if graph.nodes.is_empty() {
            tracing::debug!(schema = ?document.schema(), "Workflow document has no nodes");
            return Ok((Extraction::NotFound, Vec::new()));
        }

        let mut nodes = graph.nodes;
        sort_by_order(&mut nodes);
        let enrichment = enrich(&mut nodes, &self.catalog, &document.subgraph_definitions());
        let parameters = extract_parameters(&nodes);

        let workflow = NormalizedWorkflow {
            schema: document.schema(),
            nodes,
            links: graph.links,
            groups: graph.groups,
            node_list: enrichment.node_list,
            notes: enrichment.notes,
            parameters,
            subgraphs: enrichment
                .used_subgraphs
                .iter()
                .map(|def| def.id.clone())
                .collect(),
        };

        Ok((Extraction::Found(workflow), enrichment.used_subgraphs))
    }
}
