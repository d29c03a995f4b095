//! End-to-end turn behaviour with in-memory capabilities.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use contextor::{
    AnswerComposer, AnswerRequest, ComposeError, ContextError, ContextResolver, ConversationState,
    Degradation, FALLBACK_ANSWER, ImageInput, Intent, Orchestrator, PipelineConfig,
    ResolutionStrategy, Role, RuleStrategy, Turn, TurnInput, TurnStage,
};
use futures::future::BoxFuture;
use pretty_assertions::assert_eq;
use product_store::{
    Candidate, ProductMetadata, SimilarityIndex, StoreError,
    embed::{EmbedFuture, EmbeddingError, EmbeddingProvider},
};
use reranker::{CandidateReranker, CrossEncoder, RerankError};

// ---------------------------------------------------------------------------
// fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeEmbedder {
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
    fail: bool,
}

impl EmbeddingProvider for FakeEmbedder {
    fn embed_text<'a>(&'a self, _text: &'a str) -> EmbedFuture<'a> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(EmbeddingError::EmptyInput)
            } else {
                Ok(vec![1.0, 0.0])
            }
        })
    }

    fn embed_image<'a>(&'a self, _bytes: &'a [u8]) -> EmbedFuture<'a> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(EmbeddingError::UnsupportedImage)
            } else {
                Ok(vec![0.0, 1.0])
            }
        })
    }
}

struct FakeIndex {
    calls: AtomicUsize,
    last_k: AtomicUsize,
    items: Vec<Candidate>,
    fail: bool,
}

impl FakeIndex {
    fn with(items: Vec<Candidate>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_k: AtomicUsize::new(0),
            items,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with(Vec::new())
        }
    }
}

impl SimilarityIndex for FakeIndex {
    fn query<'a>(
        &'a self,
        _vector: &'a [f32],
        k: usize,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<Candidate>, StoreError>> + Send + 'a>,
    > {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_k.store(k, Ordering::SeqCst);
        Box::pin(async move {
            if self.fail {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            Ok(self.items.iter().take(k).cloned().collect())
        })
    }
}

#[derive(Clone, Copy)]
enum EncoderMode {
    /// Later documents score higher, reversing similarity order.
    Reverse,
    Fail,
    Hang,
}

struct FakeEncoder {
    calls: AtomicUsize,
    last_query: Mutex<Option<String>>,
    mode: EncoderMode,
}

impl FakeEncoder {
    fn new(mode: EncoderMode) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
            mode,
        }
    }
}

impl CrossEncoder for FakeEncoder {
    fn score<'a>(
        &'a self,
        query: &'a str,
        documents: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<f32>, RerankError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.to_string());
        let mode = self.mode;
        Box::pin(async move {
            match mode {
                EncoderMode::Reverse => Ok((0..documents.len()).map(|i| i as f32 - 2.5).collect()),
                EncoderMode::Fail => Err(RerankError::Decode("bad body".into())),
                EncoderMode::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec![0.0; documents.len()])
                }
            }
        })
    }
}

#[derive(Default)]
struct FakeComposer {
    calls: AtomicUsize,
    fail: bool,
    seen: Mutex<Vec<(String, Intent, usize, Vec<String>)>>,
}

impl AnswerComposer for FakeComposer {
    fn compose<'a>(&'a self, req: AnswerRequest<'a>) -> BoxFuture<'a, Result<String, ComposeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((
            req.effective_query.to_string(),
            req.intent,
            req.products.len(),
            req.history.to_vec(),
        ));
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                Err(ComposeError::Empty)
            } else {
                Ok(format!("{} productos", req.products.len()))
            }
        })
    }
}

/// Rule strategy that counts rewrite calls.
#[derive(Default)]
struct CountingRules {
    rewrites: AtomicUsize,
    inner: RuleStrategy,
}

impl ResolutionStrategy for CountingRules {
    fn rewrite<'a>(
        &'a self,
        current: &'a str,
        window: &'a [Turn],
    ) -> BoxFuture<'a, Result<String, ContextError>> {
        self.rewrites.fetch_add(1, Ordering::SeqCst);
        self.inner.rewrite(current, window)
    }

    fn classify<'a>(
        &'a self,
        query: &'a str,
        window: &'a [Turn],
    ) -> BoxFuture<'a, Result<Intent, ContextError>> {
        self.inner.classify(query, window)
    }
}

// ---------------------------------------------------------------------------
// harness
// ---------------------------------------------------------------------------

fn product(id: &str, title: &str, score: f32) -> Candidate {
    Candidate {
        id: id.into(),
        score,
        metadata: ProductMetadata {
            title: title.into(),
            price: Some("$19.99".into()),
            descriptive_text: format!("{title} description"),
            ..Default::default()
        },
    }
}

fn catalog(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| product(&format!("p{i}"), &format!("Item {i}"), 0.9 - i as f32 * 0.05))
        .collect()
}

struct Harness {
    embedder: Arc<FakeEmbedder>,
    index: Arc<FakeIndex>,
    encoder: Arc<FakeEncoder>,
    composer: Arc<FakeComposer>,
    strategy: Arc<CountingRules>,
    orchestrator: Orchestrator,
}

struct Setup {
    embedder: FakeEmbedder,
    index: FakeIndex,
    encoder: FakeEncoder,
    composer: FakeComposer,
    cfg: PipelineConfig,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            embedder: FakeEmbedder::default(),
            index: FakeIndex::with(catalog(12)),
            encoder: FakeEncoder::new(EncoderMode::Reverse),
            composer: FakeComposer::default(),
            cfg: PipelineConfig {
                rerank_timeout: Duration::from_millis(50),
                ..PipelineConfig::default()
            },
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let embedder = Arc::new(self.embedder);
        let index = Arc::new(self.index);
        let encoder = Arc::new(self.encoder);
        let composer = Arc::new(self.composer);
        let strategy = Arc::new(CountingRules::default());

        let resolver = ContextResolver::new(
            strategy.clone(),
            self.cfg.history_window,
            self.cfg.llm_timeout,
        );
        let reranker =
            CandidateReranker::new(encoder.clone()).with_max_desc_chars(self.cfg.max_desc_chars);
        let orchestrator = Orchestrator::new(
            resolver,
            embedder.clone(),
            index.clone(),
            reranker,
            composer.clone(),
            self.cfg,
        );
        Harness {
            embedder,
            index,
            encoder,
            composer,
            strategy,
            orchestrator,
        }
    }
}

impl Harness {
    fn retrieval_calls(&self) -> (usize, usize, usize) {
        (
            self.embedder.text_calls.load(Ordering::SeqCst)
                + self.embedder.image_calls.load(Ordering::SeqCst),
            self.index.calls.load(Ordering::SeqCst),
            self.encoder.calls.load(Ordering::SeqCst),
        )
    }
}

fn ids(products: &[reranker::RankedResult]) -> Vec<&str> {
    products.iter().map(|p| p.candidate.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_turn_oversamples_and_reranks() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;

    assert_eq!(out.query.intent, Intent::Search);
    assert_eq!(h.index.last_k.load(Ordering::SeqCst), 12);
    // Reverse scoring puts the least similar of the 12 candidates first.
    assert_eq!(ids(&out.products), vec!["p11", "p10", "p9"]);
    assert_eq!(
        out.stages,
        vec![
            TurnStage::Init,
            TurnStage::ContextResolved,
            TurnStage::IntentClassified,
            TurnStage::Retrieved,
            TurnStage::Reranked,
            TurnStage::Complete,
        ]
    );
    assert!(out.degradations.is_empty());
    assert_eq!(out.report.as_ref().map(|r| r.rows.len()), Some(3));
    assert_eq!(state.last_products(), out.products.as_slice());

    let turns = state.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].products.len(), 3);
    assert_eq!(turns[1].content.as_deref(), Some("3 productos"));
}

#[tokio::test]
async fn rerank_keeps_similarity_scores_and_orders_by_logit() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap().with_top_k(5))
        .await;

    let source = catalog(12);
    assert_eq!(out.products.len(), 5);
    for p in &out.products {
        let original = source.iter().find(|c| c.id == p.candidate.id).unwrap();
        assert_eq!(p.score, original.score);
    }
    for pair in out.products.windows(2) {
        assert!(pair[0].rerank_score >= pair[1].rerank_score);
    }
}

#[tokio::test]
async fn follow_up_is_resolved_against_history() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    h.orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;
    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("que sea HP").unwrap())
        .await;

    let q = out.query.effective_text().to_lowercase();
    assert!(q.contains("laptop"), "{q}");
    assert!(q.contains("hp"), "{q}");
    assert_eq!(out.query.raw_text, "que sea HP");
    assert_eq!(
        h.encoder.last_query.lock().unwrap().as_deref(),
        Some(out.query.effective_text())
    );
}

#[tokio::test]
async fn chained_follow_ups_keep_the_product_within_the_window() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    for text in ["Busco laptops", "que sea HP"] {
        h.orchestrator
            .run_turn(&mut state, TurnInput::text(text).unwrap())
            .await;
    }
    assert_eq!(state.turns()[2].resolved.as_deref(), Some("laptops HP"));

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("más baratas").unwrap())
        .await;
    assert_eq!(out.query.effective_text(), "laptops HP baratas");
    assert_eq!(state.turns()[4].content.as_deref(), Some("más baratas"));
}

#[tokio::test]
async fn details_reuses_prior_results_without_retrieval() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    let first = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;
    let before = h.retrieval_calls();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("¿Cuál es mejor?").unwrap())
        .await;

    assert_eq!(out.query.intent, Intent::Details);
    assert_eq!(h.retrieval_calls(), before);
    assert_eq!(out.products, first.products);
    assert!(out.stages.contains(&TurnStage::ReusedPrior));
    assert!(!out.stages.contains(&TurnStage::Retrieved));
    assert!(out.report.is_none());

    // last_products untouched, assistant turn carries no products
    assert_eq!(state.last_products(), first.products.as_slice());
    assert_eq!(state.turns().len(), 4);
    assert!(state.turns()[3].products.is_empty());

    let seen = h.composer.seen.lock().unwrap();
    assert_eq!(seen[1].1, Intent::Details);
    assert_eq!(seen[1].2, 3);
}

#[tokio::test]
async fn details_on_first_turn_answers_with_empty_set() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("¿Cuál me recomiendas?").unwrap())
        .await;

    assert_eq!(out.query.intent, Intent::Details);
    assert!(out.products.is_empty());
    assert_eq!(h.retrieval_calls(), (0, 0, 0));
    assert!(out.stages.contains(&TurnStage::ReusedPrior));
    assert_eq!(h.composer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.composer.seen.lock().unwrap()[0].2, 0);
}

#[tokio::test]
async fn index_failure_completes_with_empty_set() {
    let h = Setup {
        index: FakeIndex::failing(),
        ..Setup::default()
    }
    .build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;

    assert!(out.products.is_empty());
    assert_eq!(out.stages.last(), Some(&TurnStage::Complete));
    assert!(matches!(out.degradations.as_slice(), [Degradation::Index(_)]));
    assert_eq!(h.encoder.calls.load(Ordering::SeqCst), 0);
    assert!(out.report.is_none());
    assert_eq!(state.turns().len(), 2);
}

#[tokio::test]
async fn embedding_failure_skips_index_and_rerank() {
    let h = Setup {
        embedder: FakeEmbedder {
            fail: true,
            ..FakeEmbedder::default()
        },
        ..Setup::default()
    }
    .build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;

    assert!(out.products.is_empty());
    assert!(matches!(out.degradations.as_slice(), [Degradation::Embedding(_)]));
    assert_eq!(h.index.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_index_does_not_call_reranker() {
    let h = Setup {
        index: FakeIndex::with(Vec::new()),
        ..Setup::default()
    }
    .build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;

    assert!(out.products.is_empty());
    assert!(out.degradations.is_empty());
    assert_eq!(h.encoder.calls.load(Ordering::SeqCst), 0);
    assert!(out.stages.contains(&TurnStage::Reranked));
}

#[tokio::test]
async fn rerank_failure_falls_back_to_similarity_order() {
    let h = Setup {
        encoder: FakeEncoder::new(EncoderMode::Fail),
        ..Setup::default()
    }
    .build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;

    assert_eq!(ids(&out.products), vec!["p0", "p1", "p2"]);
    assert!(out.products.iter().all(|p| p.rerank_score.is_none()));
    assert!(matches!(out.degradations.as_slice(), [Degradation::Rerank(_)]));
    assert!(out.report.is_none());
}

#[tokio::test]
async fn rerank_timeout_falls_back_to_similarity_order() {
    let h = Setup {
        encoder: FakeEncoder::new(EncoderMode::Hang),
        ..Setup::default()
    }
    .build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap().with_top_k(4))
        .await;

    assert_eq!(ids(&out.products), vec!["p0", "p1", "p2", "p3"]);
    match out.degradations.as_slice() {
        [Degradation::Rerank(msg)] => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("unexpected degradations: {other:?}"),
    }
}

#[tokio::test]
async fn image_turn_skips_rewrite_and_uses_visual_phrase() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    h.orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;
    let rewrites_before = h.strategy.rewrites.load(Ordering::SeqCst);

    let img = ImageInput {
        bytes: vec![0x89, b'P', b'N', b'G'],
        reference: "shoe.png".into(),
    };
    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::new(None, Some(img), None).unwrap())
        .await;

    assert_eq!(out.query.intent, Intent::Search);
    assert_eq!(out.query.image_reference.as_deref(), Some("shoe.png"));
    assert_eq!(h.strategy.rewrites.load(Ordering::SeqCst), rewrites_before);
    assert_eq!(h.embedder.image_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.embedder.text_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.encoder.last_query.lock().unwrap().as_deref(),
        Some("producto similar visualmente")
    );
    assert_eq!(state.turns()[2].image_reference.as_deref(), Some("shoe.png"));
    assert_eq!(state.turns()[2].content, None);
}

#[tokio::test]
async fn image_with_question_text_still_searches() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    let img = ImageInput {
        bytes: vec![0xFF, 0xD8, 0xFF],
        reference: "bag.jpg".into(),
    };

    let out = h
        .orchestrator
        .run_turn(
            &mut state,
            TurnInput::new(Some("¿cuál es este?".into()), Some(img), None).unwrap(),
        )
        .await;

    assert_eq!(out.query.intent, Intent::Search);
    assert_eq!(out.query.resolved_text, None);
    assert_eq!(h.embedder.image_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.embedder.text_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.encoder.last_query.lock().unwrap().as_deref(),
        Some("¿cuál es este?")
    );
}

#[tokio::test]
async fn composer_failure_uses_fallback_answer() {
    let h = Setup {
        composer: FakeComposer {
            fail: true,
            ..FakeComposer::default()
        },
        ..Setup::default()
    }
    .build();
    let mut state = ConversationState::new();

    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap())
        .await;

    assert_eq!(out.answer, FALLBACK_ANSWER);
    assert_eq!(out.products.len(), 3);
    assert!(matches!(out.degradations.as_slice(), [Degradation::Composition(_)]));
    assert_eq!(state.turns()[1].content.as_deref(), Some(FALLBACK_ANSWER));
}

#[tokio::test]
async fn composer_history_is_bounded_and_ends_with_current_turn() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    for q in ["Busco laptops", "Busco mouse", "Busco teclados", "Busco monitores"] {
        h.orchestrator
            .run_turn(&mut state, TurnInput::text(q).unwrap())
            .await;
    }

    let seen = h.composer.seen.lock().unwrap();
    let (_, _, _, history) = seen.last().unwrap();
    assert_eq!(history.len(), 6);
    assert_eq!(history.last().map(String::as_str), Some("user: Busco monitores"));
    assert_eq!(history[0], "assistant: 3 productos");
}

#[tokio::test]
async fn top_k_is_clamped_to_configured_maximum() {
    let h = Setup::default().build();
    let mut state = ConversationState::new();
    let out = h
        .orchestrator
        .run_turn(&mut state, TurnInput::text("Busco laptops").unwrap().with_top_k(50))
        .await;

    assert_eq!(h.index.last_k.load(Ordering::SeqCst), 40);
    assert_eq!(out.products.len(), 10);
}

#[tokio::test]
async fn sessions_are_independent() {
    let h = Setup::default().build();
    let mut a = ConversationState::new();
    let mut b = ConversationState::new();

    h.orchestrator
        .run_turn(&mut a, TurnInput::text("Busco laptops").unwrap())
        .await;
    let out = h
        .orchestrator
        .run_turn(&mut b, TurnInput::text("¿Cuál es mejor?").unwrap())
        .await;

    assert!(out.products.is_empty());
    assert_eq!(a.last_products().len(), 3);
    assert!(b.last_products().is_empty());
}
