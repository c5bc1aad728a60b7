//! Test doubles for the host, model, embedding and store seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_llm_service::{AiLlmError, LlmProvider, ProviderError, ProviderErrorKind};
use futures::future::BoxFuture;
use git_context_engine::{
    AccessToken, CodeHost, GitContextEngineError, GitContextEngineProviderError,
    GitContextEngineResult, ProviderKind, PullRequestDiff, PullRequestRef, RepoFile,
};
use rag_store::{EmbeddingsProvider, InMemoryIndex, RagConfig, RagStore};

use crate::engine::{ReviewEngine, ReviewModel};
use crate::store::MemoryStore;
use crate::workflow::{MemoryJournal, RetryPolicy, WorkflowDeps};

/* ------------------------------------------------------------------------- */
/* Model                                                                     */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub enum ModelMode {
    Ok(&'static str),
    Quota,
    Fatal,
}

pub struct FakeModel {
    mode: ModelMode,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(mode: ModelMode) -> Self {
        Self {
            mode,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn fatal_llm_error() -> AiLlmError {
    ProviderError::new(
        LlmProvider::Gemini,
        ProviderErrorKind::Decode("bad payload".into()),
    )
    .into()
}

impl ReviewModel for FakeModel {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, AiLlmError>> {
        Box::pin(async move {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.mode {
                ModelMode::Ok(text) => Ok(text.to_string()),
                ModelMode::Quota => Err(AiLlmError::quota_exceeded(
                    LlmProvider::Gemini,
                    "RESOURCE_EXHAUSTED",
                )),
                ModelMode::Fatal => Err(fatal_llm_error()),
            }
        })
    }
}

/* ------------------------------------------------------------------------- */
/* Embeddings                                                                */
/* ------------------------------------------------------------------------- */

pub struct FakeEmbedder {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingsProvider for FakeEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, AiLlmError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(fatal_llm_error());
            }
            let mut v = vec![1.0_f32; 4];
            for b in text.bytes() {
                v[(b % 4) as usize] += 1.0;
            }
            Ok(v)
        })
    }
}

/* ------------------------------------------------------------------------- */
/* Code host                                                                 */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub enum HostFailure {
    NotFound,
    Server,
}

impl HostFailure {
    fn error(self) -> GitContextEngineError {
        match self {
            HostFailure::NotFound => GitContextEngineProviderError::NotFound.into(),
            HostFailure::Server => GitContextEngineProviderError::Server(502).into(),
        }
    }
}

pub struct FakeHost {
    pr: PullRequestDiff,
    files: Vec<RepoFile>,
    fetch_failure: Option<HostFailure>,
    flaky_fetches: usize,
    post_failure: Option<HostFailure>,
    fetch_calls: AtomicUsize,
    post_calls: AtomicUsize,
    list_calls: AtomicUsize,
    posted: Mutex<Vec<(String, String)>>,
}

impl FakeHost {
    pub const DIFF: &'static str = "diff --git a/src/lib.rs b/src/lib.rs\n@@ -1 +1 @@\n-pub fn a() {}\n+pub fn b() {}\n";

    pub fn with_pr(title: &str, description: Option<&str>, diff: &str) -> Self {
        Self {
            pr: PullRequestDiff {
                title: title.to_string(),
                description: description.map(str::to_string),
                diff: diff.to_string(),
                web_url: None,
            },
            files: Vec::new(),
            fetch_failure: None,
            flaky_fetches: 0,
            post_failure: None,
            fetch_calls: AtomicUsize::new(0),
            post_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            posted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_fetch(failure: HostFailure) -> Self {
        Self {
            fetch_failure: Some(failure),
            ..Self::with_pr("", None, "")
        }
    }

    /// The first `n` fetches fail with a 502.
    pub fn flaky_fetches(mut self, n: usize) -> Self {
        self.flaky_fetches = n;
        self
    }

    pub fn failing_posts(mut self, failure: HostFailure) -> Self {
        self.post_failure = Some(failure);
        self
    }

    pub fn with_files(mut self, files: &[(&str, &str)]) -> Self {
        self.files = files
            .iter()
            .map(|(path, content)| RepoFile {
                path: path.to_string(),
                content: content.to_string(),
            })
            .collect();
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn post_calls(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// `(pr, body)` of every successful post.
    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }
}

impl CodeHost for FakeHost {
    fn fetch_diff<'a>(
        &'a self,
        _token: &'a AccessToken,
        _pr: &'a PullRequestRef,
    ) -> BoxFuture<'a, GitContextEngineResult<PullRequestDiff>> {
        Box::pin(async move {
            let n = self.fetch_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(f) = self.fetch_failure {
                return Err(f.error());
            }
            if n <= self.flaky_fetches {
                return Err(HostFailure::Server.error());
            }
            Ok(self.pr.clone())
        })
    }

    fn post_comment<'a>(
        &'a self,
        _token: &'a AccessToken,
        pr: &'a PullRequestRef,
        body: &'a str,
    ) -> BoxFuture<'a, GitContextEngineResult<()>> {
        Box::pin(async move {
            self.post_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(f) = self.post_failure {
                return Err(f.error());
            }
            self.posted
                .lock()
                .unwrap()
                .push((pr.to_string(), body.to_string()));
            Ok(())
        })
    }

    fn list_files<'a>(
        &'a self,
        _token: &'a AccessToken,
        _owner: &'a str,
        _repo: &'a str,
        _path: &'a str,
    ) -> BoxFuture<'a, GitContextEngineResult<Vec<RepoFile>>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.files.clone())
        })
    }
}

/* ------------------------------------------------------------------------- */
/* Wiring                                                                    */
/* ------------------------------------------------------------------------- */

/// Fully wired workflow dependencies over fakes. User `u1` has a GitHub token.
pub struct Harness {
    pub deps: WorkflowDeps,
    pub host: Arc<FakeHost>,
    pub model: Arc<FakeModel>,
    pub embedder: Arc<FakeEmbedder>,
    pub store: Arc<MemoryStore>,
    pub journal: Arc<MemoryJournal>,
}

impl Harness {
    pub async fn new(host: FakeHost, mode: ModelMode) -> Self {
        Self::build(host, mode, false).await
    }

    pub async fn with_failing_embeddings(host: FakeHost) -> Self {
        Self::build(host, ModelMode::Ok("ok"), true).await
    }

    async fn build(host: FakeHost, mode: ModelMode, failing_embeddings: bool) -> Self {
        let host = Arc::new(host);
        let model = Arc::new(FakeModel::new(mode));
        let embedder = Arc::new(FakeEmbedder::new(failing_embeddings));
        let store = Arc::new(MemoryStore::new());
        let journal = Arc::new(MemoryJournal::new());
        store.add_credential("u1", "github", "ghp_test").await;

        let mut cfg = RagConfig::in_memory();
        cfg.vector_dim = 4;
        cfg.embed_rps = 1_000.0;
        cfg.embed_burst = 100;
        let rag = RagStore::with_index(cfg, embedder.clone(), Arc::new(InMemoryIndex::new()));

        let deps = WorkflowDeps {
            host: host.clone(),
            provider: ProviderKind::GitHub,
            rag: Arc::new(rag),
            engine: ReviewEngine::new(model.clone()),
            credentials: store.clone(),
            reviews: store.clone(),
            journal: journal.clone(),
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
            web_base: "https://github.com".into(),
        };

        Self {
            deps,
            host,
            model,
            embedder,
            store,
            journal,
        }
    }
}
