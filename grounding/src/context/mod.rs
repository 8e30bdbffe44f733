//! Schema context building.
//!
//! Turns a natural-language query into a token-budgeted slice of the org
//! schema: the handful of relevant objects, their most relevant fields
//! (with the mandatory core set always present), picklist values, and
//! relationships. Per-term search failures are isolated; a query that
//! matches nothing yields an empty context, never an error.

pub mod antipatterns;
pub mod cache;
pub mod draft;
pub mod fields;
pub mod terms;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use log::debug;

use soqlforge_core::types::{
    is_core_field, FieldSchema, ObjectSchema, RelationshipInfo, SchemaContext,
    MAX_PICKLIST_VALUES,
};
use soqlforge_core::{FieldRecord, MetadataGraph};
use soqlforge_rag::ChatProvider;

use crate::config::ContextConfig;
use crate::engine::{GroundingEngine, ObjectMatch};

pub use cache::SchemaContextCache;
pub use fields::{ScopedFieldQuery, ScopedFieldSearch};

/// A built context plus the advisory warnings that rode along.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBuildResult {
    pub context: SchemaContext,
    pub warnings: Vec<String>,
}

/// Builds schema contexts for natural-language queries.
pub struct SchemaContextBuilder {
    graph: Arc<dyn MetadataGraph>,
    engine: Arc<GroundingEngine>,
    chat: Option<Arc<dyn ChatProvider>>,
    config: ContextConfig,
}

impl SchemaContextBuilder {
    pub fn new(
        graph: Arc<dyn MetadataGraph>,
        engine: Arc<GroundingEngine>,
        config: ContextConfig,
    ) -> Self {
        Self {
            graph,
            engine,
            chat: None,
            config,
        }
    }

    /// Attach a chat provider to enable the draft-phase pruning signal.
    pub fn with_chat(mut self, chat: Arc<dyn ChatProvider>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Build the schema context for one query.
    pub async fn build_context(&self, query: &str, org: &str) -> ContextBuildResult {
        let search_terms = terms::extract_search_terms(query);
        if search_terms.is_empty() {
            return ContextBuildResult {
                context: SchemaContext::empty(),
                warnings: Vec::new(),
            };
        }

        let selected = self.select_objects(&search_terms, org).await;
        if selected.is_empty() {
            return ContextBuildResult {
                context: SchemaContext::empty(),
                warnings: Vec::new(),
            };
        }

        // Assemble every selected object concurrently; one object's fetch
        // trouble must not starve the others.
        let assembled = join_all(
            selected
                .iter()
                .map(|m| self.assemble_object(m, &search_terms, org)),
        )
        .await;

        let mut objects: Vec<ObjectSchema> = assembled.into_iter().collect();

        if let Some(chat) = &self.chat {
            self.merge_draft_signal(chat.clone(), query, org, &mut objects)
                .await;
        }

        let names: Vec<String> = objects.iter().map(|o| o.api_name.clone()).collect();
        let warnings = antipatterns::detect_anti_patterns(&names, query);

        ContextBuildResult {
            context: SchemaContext::new(objects),
            warnings,
        }
    }

    /// Per-term object search, merged and ranked across terms.
    async fn select_objects(&self, search_terms: &[String], org: &str) -> Vec<ObjectMatch> {
        let per_term = join_all(
            search_terms
                .iter()
                .map(|term| self.engine.search_objects(term, org)),
        )
        .await;

        let mut best: HashMap<String, ObjectMatch> = HashMap::new();
        for matches in per_term {
            for m in matches {
                match best.get(&m.record.api_name) {
                    Some(existing) if existing.score >= m.score => {}
                    _ => {
                        best.insert(m.record.api_name.clone(), m);
                    }
                }
            }
        }

        let mut ranked: Vec<ObjectMatch> = best.into_values().collect();
        // Rank by score; ties break on name so identical inputs always
        // produce identical contexts.
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.api_name.cmp(&b.record.api_name))
        });
        ranked.truncate(soqlforge_core::types::MAX_OBJECTS);
        ranked
    }

    async fn assemble_object(
        &self,
        object_match: &ObjectMatch,
        search_terms: &[String],
        org: &str,
    ) -> ObjectSchema {
        let api_name = &object_match.record.api_name;
        let mut object = ObjectSchema::from_record(&object_match.record);

        let records = match self.graph.fields_of(org, api_name).await {
            Ok(records) => records,
            Err(e) => {
                debug!("field fetch for {api_name} failed, keeping object bare: {e}");
                Vec::new()
            }
        };
        object.fields = self.prune_fields(&records, search_terms);

        // Attach picklist values to the kept picklist fields.
        for field in &mut object.fields {
            if field.is_picklist() {
                match self
                    .graph
                    .picklist_values(org, api_name, &field.api_name)
                    .await
                {
                    Ok(values) if !values.is_empty() => {
                        let mut values = values;
                        values.truncate(MAX_PICKLIST_VALUES);
                        field.picklist_values = Some(values);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("picklist fetch for {api_name}.{} failed: {e}", field.api_name)
                    }
                }
            }
        }

        match self.graph.parent_relationships(org, api_name).await {
            Ok(records) => {
                object.parent_relationships = records
                    .iter()
                    .map(RelationshipInfo::from_record)
                    .collect();
            }
            Err(e) => debug!("parent relationship fetch for {api_name} failed: {e}"),
        }
        match self.graph.child_relationships(org, api_name).await {
            Ok(records) => {
                object.child_relationships = records
                    .iter()
                    .map(RelationshipInfo::from_record)
                    .collect();
            }
            Err(e) => debug!("child relationship fetch for {api_name} failed: {e}"),
        }

        object
    }

    /// Lexical field ranking: exact name/label match scores 10, substring
    /// 5, description mention 2, with a small boost for reference fields.
    /// Core fields bypass ranking entirely.
    fn prune_fields(&self, records: &[FieldRecord], search_terms: &[String]) -> Vec<FieldSchema> {
        let cap = self.config.max_fields_per_object;

        let mut kept: Vec<FieldSchema> = records
            .iter()
            .filter(|r| is_core_field(&r.api_name))
            .map(FieldSchema::from_record)
            .collect();
        kept.sort_by(|a, b| a.api_name.cmp(&b.api_name));

        let mut scored: Vec<(i32, &FieldRecord)> = records
            .iter()
            .filter(|r| !is_core_field(&r.api_name))
            .map(|r| (score_field(r, search_terms), r))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.api_name.cmp(&b.1.api_name)));

        for (_, record) in scored {
            if kept.len() >= cap {
                break;
            }
            kept.push(FieldSchema::from_record(record));
        }
        kept
    }

    /// Mine a cheap draft for extra fields the model reached for and merge
    /// them into the pruned objects, capacity permitting.
    async fn merge_draft_signal(
        &self,
        chat: Arc<dyn ChatProvider>,
        query: &str,
        org: &str,
        objects: &mut [ObjectSchema],
    ) {
        let mut known_fields = HashMap::new();
        let mut full_records: HashMap<String, Vec<FieldRecord>> = HashMap::new();
        for object in objects.iter() {
            if let Ok(records) = self.graph.fields_of(org, &object.api_name).await {
                known_fields.insert(
                    object.api_name.clone(),
                    records.iter().map(|r| r.api_name.clone()).collect::<Vec<_>>(),
                );
                full_records.insert(object.api_name.clone(), records);
            }
        }

        let Some(extracted) =
            draft::extract_draft_fields(chat, query, &known_fields, self.config.draft_timeout)
                .await
        else {
            return;
        };

        for object in objects.iter_mut() {
            let Some(wanted) = extracted.get(&object.api_name) else {
                continue;
            };
            let Some(records) = full_records.get(&object.api_name) else {
                continue;
            };
            for field_name in wanted {
                if object
                    .fields
                    .iter()
                    .any(|f| f.api_name.eq_ignore_ascii_case(field_name))
                {
                    continue;
                }
                let Some(record) = records.iter().find(|r| &r.api_name == field_name) else {
                    continue;
                };

                // The draft reached for this field, so it outranks the
                // lowest lexically-ranked survivor when at capacity.
                if object.fields.len() >= self.config.max_fields_per_object {
                    let evictable = object.fields.iter().rposition(|f| {
                        !is_core_field(&f.api_name) && !wanted.contains(&f.api_name)
                    });
                    match evictable {
                        Some(index) => {
                            object.fields.remove(index);
                        }
                        None => continue,
                    }
                }
                object.fields.push(FieldSchema::from_record(record));
            }
        }
    }
}

fn score_field(record: &FieldRecord, search_terms: &[String]) -> i32 {
    let api_lower = record.api_name.to_lowercase();
    let label_lower = record.label.to_lowercase();
    let description_lower = record
        .description
        .as_deref()
        .map(|d| d.to_lowercase())
        .unwrap_or_default();

    let mut best = 0;
    for term in search_terms {
        let term_lower = term.to_lowercase();
        let score = if api_lower == term_lower || label_lower == term_lower {
            10
        } else if api_lower.contains(&term_lower) || label_lower.contains(&term_lower) {
            5
        } else if !description_lower.is_empty() && description_lower.contains(&term_lower) {
            2
        } else {
            0
        };
        best = best.max(score);
    }

    if record.field_type.eq_ignore_ascii_case("reference") {
        best += 1;
    }
    best
}
