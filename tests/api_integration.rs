//! Integration tests for the HTTP API.
//!
//! Each test spins up an Axum server on a random port with a stub
//! generation provider, an in-memory database and a fake mailbox, then
//! exercises the real REST contract with reqwest.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use mail_triage::api::{AppState, router};
use mail_triage::channels::{ImapConfig, MailSource, MailSourceFactory};
use mail_triage::config::ServiceConfig;
use mail_triage::error::{ChannelError, LlmError};
use mail_triage::llm::{GenerationProvider, ResponseFormat};
use mail_triage::pipeline::candidates::ModelCandidates;
use mail_triage::pipeline::types::RawEmail;
use mail_triage::pipeline::{AnalysisPipeline, ClassificationEngine, EngineConfig};
use mail_triage::store::LibSqlBackend;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const OWNER: &str = "me@example.com";

/// Stub provider: always answers with a productive classification.
struct StubLlm;

#[async_trait]
impl GenerationProvider for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _format: ResponseFormat,
    ) -> Result<String, LlmError> {
        Ok(r#"{"classification": "produtivo", "suggested_response": "Confirmado, até amanhã.", "reasoning": "Pede confirmação de reunião"}"#.to_string())
    }
}

/// Fake mailbox that records which mailbox was opened.
#[derive(Default)]
struct FakeMail {
    opened: Mutex<Vec<(String, String, String)>>,
}

struct FakeSource {
    emails: Vec<RawEmail>,
}

#[async_trait]
impl MailSource for FakeSource {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawEmail>, ChannelError> {
        Ok(self.emails.iter().take(limit).cloned().collect())
    }
}

impl MailSourceFactory for FakeMail {
    fn open(&self, config: ImapConfig) -> Box<dyn MailSource> {
        self.opened.lock().unwrap().push((
            config.host.clone(),
            config.user.clone(),
            config.password.expose_secret().to_string(),
        ));
        let emails = (1..=3)
            .rev()
            .map(|i| {
                let mut email = RawEmail::new(format!("Assunto {i}"), "a@b.com", format!("Corpo {i}"));
                email.id = Some(i.to_string());
                email.date = Some("Tue, 14 Oct 2025 09:30:00 +0000".to_string());
                email
            })
            .collect();
        Box::new(FakeSource { emails })
    }
}

struct TestServer {
    base: String,
    mail: Arc<FakeMail>,
    client: reqwest::Client,
}

/// Start an Axum server on a random port.
async fn start_server(configured: bool, config: ServiceConfig) -> TestServer {
    let provider: Option<Arc<dyn GenerationProvider>> = if configured {
        Some(Arc::new(StubLlm))
    } else {
        None
    };
    let engine = ClassificationEngine::new(
        provider,
        EngineConfig {
            candidates: ModelCandidates::from_list(["stub-model"]),
            ..EngineConfig::default()
        },
    );
    let pipeline = Arc::new(AnalysisPipeline::with_engine(engine));
    let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let mail = Arc::new(FakeMail::default());

    let state = AppState::new(pipeline, store, config).with_mail_sources(mail.clone());
    let app = router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        mail,
        client: reqwest::Client::new(),
    }
}

async fn default_server() -> TestServer {
    start_server(true, ServiceConfig::default()).await
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> (u16, Value) {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(self.url("/api/process-file"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

// ── Health ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_and_home() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;

        let (status, body) = server.get_json("/health").await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"status": "healthy"}));

        let (status, body) = server.get_json("/").await;
        assert_eq!(status, 200);
        assert!(body["message"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        let resp = server
            .client
            .get(server.url("/health"))
            .header("Origin", "http://localhost:3000")
            .send()
            .await
            .unwrap();
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    })
    .await
    .expect("test timed out");
}

// ── Analysis ────────────────────────────────────────────────────────────

#[tokio::test]
async fn process_returns_every_stage_and_stores_history() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        let text = "Olá, confirme a reunião de amanhã às 14h. http://x.com joao@x.com";

        let (status, body) = server
            .post_json(
                "/api/process",
                json!({"text": text, "subject": "Reunião", "sender": "joao@x.com", "email_user": OWNER}),
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["original_text"], text);
        assert_eq!(body["cleaned_text"], "ola, confirme a reuniao de amanha as 14h.");
        assert!(!body["text_no_stopwords"].as_str().unwrap().contains(" de "));
        let stemmed = body["stemmed_text"].as_str().unwrap();
        let stems: Vec<&str> = body["stems"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();
        assert_eq!(stems, stemmed.split_whitespace().collect::<Vec<_>>());
        assert_eq!(body["gemini_analysis"]["classification"], "produtivo");
        assert_eq!(body["gemini_analysis"]["model_used"], "stub-model");

        let (status, history) = server
            .get_json(&format!("/api/history?email_user={OWNER}"))
            .await;
        assert_eq!(status, 200);
        let items = history.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["subject"], "Reunião");
        assert_eq!(items[0]["sender"], "joao@x.com");
        assert_eq!(items[0]["analyzed_by"], OWNER);
        assert_eq!(items[0]["classification"], "produtivo");
        assert_eq!(items[0]["original_text"], text);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn process_defaults_subject_and_sender() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        let (status, _) = server
            .post_json("/api/process", json!({"text": "Bom dia", "email_user": OWNER}))
            .await;
        assert_eq!(status, 200);

        let (_, history) = server
            .get_json(&format!("/api/history?email_user={OWNER}"))
            .await;
        assert_eq!(history[0]["subject"], "Manual Input");
        assert_eq!(history[0]["sender"], "User");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn process_rejects_missing_text_or_owner() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;

        let (status, body) = server
            .post_json("/api/process", json!({"email_user": OWNER}))
            .await;
        assert_eq!(status, 400);
        assert!(body["error"].is_string());

        let (status, body) = server.post_json("/api/process", json!({"text": "oi"})).await;
        assert_eq!(status, 400);
        assert!(body["error"].is_string());

        let resp = server
            .client
            .post(server.url("/api/process"))
            .header("content-type", "application/json")
            .body("not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn process_uses_configured_owner_as_fallback() {
    timeout(TEST_TIMEOUT, async {
        let config = ServiceConfig {
            email_user: Some("env@example.com".into()),
            ..ServiceConfig::default()
        };
        let server = start_server(true, config).await;
        let (status, _) = server.post_json("/api/process", json!({"text": "oi"})).await;
        assert_eq!(status, 200);

        // History without a query owner falls back to the same mailbox.
        let (_, history) = server.get_json("/api/history").await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["analyzed_by"], "env@example.com");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unconfigured_classifier_still_returns_analysis() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(false, ServiceConfig::default()).await;
        let (status, body) = server
            .post_json("/api/process", json!({"text": "Confirme o pedido", "email_user": OWNER}))
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["gemini_analysis"]["classification"], "erro");
        assert!(body["gemini_analysis"]["suggested_response"].is_string());
        assert!(!body["stemmed_text"].as_str().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn long_text_is_truncated() {
    timeout(TEST_TIMEOUT, async {
        let config = ServiceConfig {
            max_text_length: 10,
            ..ServiceConfig::default()
        };
        let server = start_server(true, config).await;
        let (status, body) = server
            .post_json(
                "/api/process",
                json!({"text": "reunião marcada para amanhã", "email_user": OWNER}),
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["original_text"], "reunião ma");
    })
    .await
    .expect("test timed out");
}

// ── Documents ───────────────────────────────────────────────────────────

#[tokio::test]
async fn process_file_validates_upload() {
    timeout(TEST_TIMEOUT, async {
        let config = ServiceConfig {
            max_file_size: 1024,
            ..ServiceConfig::default()
        };
        let server = start_server(true, config).await;

        // No `file` field at all
        let form = reqwest::multipart::Form::new().text("other", "value");
        let resp = server
            .client
            .post(server.url("/api/process-file"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);

        let (status, body) = server.upload("notes.txt", b"hello".to_vec()).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Unsupported file format");

        let (status, _) = server.upload("big.pdf", vec![b'x'; 4096]).await;
        assert_eq!(status, 413);

        let (status, body) = server.upload("broken.pdf", b"not really a pdf".to_vec()).await;
        assert_eq!(status, 500);
        assert!(body["error"].is_string());
    })
    .await
    .expect("test timed out");
}

// ── Mailbox ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_emails_requires_credentials() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        let (status, body) = server
            .get_json("/api/fetch-emails?email_user=me@example.com")
            .await;
        assert_eq!(status, 400);
        assert!(body["error"].is_string());
        assert!(server.mail.opened.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn fetch_emails_opens_requested_mailbox() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        let (status, body) = server
            .get_json("/api/fetch-emails?email_user=me@example.com&email_pass=secret&limit=2")
            .await;
        assert_eq!(status, 200);

        let emails = body.as_array().unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0]["id"], "3");
        assert_eq!(emails[0]["subject"], "Assunto 3");
        assert_eq!(emails[0]["text"], "Corpo 3");
        assert!(emails[0]["date"].is_string());

        let opened = server.mail.opened.lock().unwrap().clone();
        assert_eq!(
            opened,
            vec![(
                "imap.gmail.com".to_string(),
                "me@example.com".to_string(),
                "secret".to_string()
            )]
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn fetch_emails_honours_host_override() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        let (status, body) = server
            .get_json("/api/fetch-emails?email_user=u&email_pass=p&imap_host=imap.example.org")
            .await;
        assert_eq!(status, 200);
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert_eq!(server.mail.opened.lock().unwrap()[0].0, "imap.example.org");
    })
    .await
    .expect("test timed out");
}

// ── History ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_without_owner_is_empty() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        let (status, body) = server.get_json("/api/history").await;
        assert_eq!(status, 200);
        assert_eq!(body, json!([]));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        for text in ["primeiro", "segundo", "terceiro"] {
            let (status, _) = server
                .post_json("/api/process", json!({"text": text, "email_user": OWNER}))
                .await;
            assert_eq!(status, 200);
        }

        let (_, history) = server
            .get_json(&format!("/api/history?email_user={OWNER}&limit=2"))
            .await;
        let texts: Vec<&str> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["original_text"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["terceiro", "segundo"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn delete_history_item() {
    timeout(TEST_TIMEOUT, async {
        let server = default_server().await;
        server
            .post_json("/api/process", json!({"text": "apagar", "email_user": OWNER}))
            .await;
        let (_, history) = server
            .get_json(&format!("/api/history?email_user={OWNER}"))
            .await;
        let id = history[0]["id"].as_str().unwrap().to_string();

        let resp = server
            .client
            .delete(server.url(&format!("/api/history/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let body: Value = resp.json().await.unwrap();
        assert!(body["message"].is_string());

        let (_, history) = server
            .get_json(&format!("/api/history?email_user={OWNER}"))
            .await;
        assert_eq!(history, json!([]));

        let resp = server
            .client
            .delete(server.url(&format!("/api/history/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);
    })
    .await
    .expect("test timed out");
}
