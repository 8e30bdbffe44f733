//! The pipeline service container.
//!
//! Every backend the pipeline talks to (graph, embeddings, chat, live
//! org, example store) is injected here exactly once at process start and
//! passed by reference to the components that need it. There are no
//! module-level singletons; tests get isolation through [`ServiceContainer::rebuild`]
//! instead of poking at globals. The container is hot-swappable via
//! `ArcSwap`, so a rebuild is visible to all holders without restart.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use soqlforge_core::MetadataGraph;
use soqlforge_rag::{ChatProvider, EmbeddingProvider, ExampleRetriever, ExampleStore};

use crate::config::PipelineConfig;
use crate::context::{SchemaContextBuilder, SchemaContextCache, ScopedFieldSearch};
use crate::engine::GroundingEngine;
use crate::live::LiveOrg;
use crate::resolver::EntityResolver;
use crate::validate::QueryValidator;

/// One coherent set of backends and configuration.
pub struct Services {
    pub graph: Arc<dyn MetadataGraph>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub chat: Option<Arc<dyn ChatProvider>>,
    pub live: Option<Arc<dyn LiveOrg>>,
    pub examples: Option<Arc<dyn ExampleStore>>,
    pub config: PipelineConfig,
    /// Shared context cache. Guarded by a mutex because several in-flight
    /// requests may share one container; the lock is only ever held for
    /// synchronous map access, never across an await.
    pub cache: Mutex<SchemaContextCache>,
}

impl Services {
    pub fn new(
        graph: Arc<dyn MetadataGraph>,
        embeddings: Arc<dyn EmbeddingProvider>,
        config: PipelineConfig,
    ) -> Self {
        let cache = Mutex::new(SchemaContextCache::new(config.cache.clone()));
        Self {
            graph,
            embeddings,
            chat: None,
            live: None,
            examples: None,
            config,
            cache,
        }
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatProvider>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_live(mut self, live: Arc<dyn LiveOrg>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn with_examples(mut self, examples: Arc<dyn ExampleStore>) -> Self {
        self.examples = Some(examples);
        self
    }
}

/// Process-wide handle to the current [`Services`].
pub struct ServiceContainer {
    inner: ArcSwap<Services>,
}

impl ServiceContainer {
    pub fn new(services: Services) -> Self {
        Self {
            inner: ArcSwap::from_pointee(services),
        }
    }

    /// The current service set.
    pub fn services(&self) -> Arc<Services> {
        self.inner.load_full()
    }

    /// Replace the whole service set (new backends, fresh cache). Existing
    /// per-request components keep the set they were built from; new ones
    /// see the replacement.
    pub fn rebuild(&self, services: Services) {
        self.inner.store(Arc::new(services));
    }

    // Per-request component factories. Components are cheap to construct
    // and are discarded with the request.

    pub fn grounding_engine(&self) -> GroundingEngine {
        let services = self.services();
        let engine = GroundingEngine::new(
            services.graph.clone(),
            services.embeddings.clone(),
            services.config.grounding.clone(),
        );
        match &services.live {
            Some(live) => engine.with_live(live.clone()),
            None => engine,
        }
    }

    pub fn entity_resolver(&self) -> EntityResolver {
        EntityResolver::new(self.services().graph.clone())
    }

    pub fn context_builder(&self) -> SchemaContextBuilder {
        let services = self.services();
        let engine = Arc::new(self.grounding_engine());
        let builder = SchemaContextBuilder::new(
            services.graph.clone(),
            engine,
            services.config.context.clone(),
        );
        match &services.chat {
            Some(chat) => builder.with_chat(chat.clone()),
            None => builder,
        }
    }

    pub fn scoped_field_search(&self) -> ScopedFieldSearch {
        let services = self.services();
        ScopedFieldSearch::new(
            services.graph.clone(),
            services.embeddings.clone(),
            services.config.context.clone(),
        )
    }

    pub fn validator(&self) -> QueryValidator {
        let services = self.services();
        let validator =
            QueryValidator::new(services.graph.clone(), services.config.validator.clone());
        match &services.live {
            Some(live) => validator.with_live(live.clone()),
            None => validator,
        }
    }

    /// Example retriever, when an example store is configured.
    pub fn example_retriever(&self) -> Option<ExampleRetriever> {
        let services = self.services();
        services
            .examples
            .as_ref()
            .map(|store| ExampleRetriever::new(store.clone(), services.embeddings.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use soqlforge_core::graph::memory::InMemoryGraph;
    use soqlforge_core::types::SchemaContext;
    use soqlforge_rag::{InMemoryExampleStore, RagError};

    struct NoopProvider;

    #[async_trait]
    impl EmbeddingProvider for NoopProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
            Ok(vec![0.0])
        }

        async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
            Ok(texts.iter().map(|_| vec![0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "noop"
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn container() -> ServiceContainer {
        ServiceContainer::new(Services::new(
            Arc::new(InMemoryGraph::new()),
            Arc::new(NoopProvider),
            PipelineConfig::default(),
        ))
    }

    #[test]
    fn test_factories_construct_components() {
        let container = container();
        let _ = container.grounding_engine();
        let _ = container.entity_resolver();
        let _ = container.context_builder();
        let _ = container.scoped_field_search();
        let _ = container.validator();
        assert!(container.example_retriever().is_none());
    }

    #[test]
    fn test_example_retriever_needs_a_store() {
        let services = Services::new(
            Arc::new(InMemoryGraph::new()),
            Arc::new(NoopProvider),
            PipelineConfig::default(),
        )
        .with_examples(Arc::new(InMemoryExampleStore::new()));

        let container = ServiceContainer::new(services);
        assert!(container.example_retriever().is_some());
    }

    #[test]
    fn test_rebuild_swaps_services_and_resets_cache() {
        let container = container();

        {
            let services = container.services();
            let mut cache = services.cache.lock().unwrap();
            cache.set("accounts in california", SchemaContext::empty(), "org1");
            assert_eq!(cache.len("org1"), 1);
        }

        container.rebuild(Services::new(
            Arc::new(InMemoryGraph::new()),
            Arc::new(NoopProvider),
            PipelineConfig::default(),
        ));

        let services = container.services();
        let cache = services.cache.lock().unwrap();
        assert_eq!(cache.len("org1"), 0);
    }
}
