//! Send pipeline tests through the public adapter API.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use templated_mail::providers::LocalMailer;
use templated_mail::testing::*;
use templated_mail::{
    AdapterConfig, BodyKind, Identity, IdentityEmail, MailAdapter, MailError, MimeComposer,
    OutgoingMessage, SendOptions, SendRequest, TemplateDescriptor, TemplateLoader, User,
};

// ============================================================================
// Helpers
// ============================================================================

/// Serves template bodies from memory and counts reads.
#[derive(Clone, Default)]
struct CountingLoader {
    files: Arc<HashMap<PathBuf, String>>,
    reads: Arc<AtomicUsize>,
}

impl CountingLoader {
    fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: Arc::new(
                files
                    .iter()
                    .map(|(path, body)| (PathBuf::from(path), body.to_string()))
                    .collect(),
            ),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateLoader for CountingLoader {
    async fn load(&self, path: &Path) -> Result<Vec<u8>, MailError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(path)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| MailError::TemplateLoad {
                path: path.display().to_string(),
                message: "file not found".into(),
            })
    }
}

/// Records every message handed to it and composes a minimal document.
#[derive(Clone, Default)]
struct RecordingComposer {
    seen: Arc<Mutex<Vec<OutgoingMessage>>>,
}

impl RecordingComposer {
    fn last(&self) -> OutgoingMessage {
        self.seen.lock().last().cloned().unwrap()
    }
}

#[async_trait]
impl MimeComposer for RecordingComposer {
    async fn compose(&self, message: &OutgoingMessage) -> Result<String, MailError> {
        self.seen.lock().push(message.clone());
        Ok(format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\n\r\n{}",
            message.from, message.to, message.subject, message.text
        ))
    }
}

struct FailingComposer;

#[async_trait]
impl MimeComposer for FailingComposer {
    async fn compose(&self, _message: &OutgoingMessage) -> Result<String, MailError> {
        Err(MailError::Compose("boom".into()))
    }
}

/// Collects formatted log output from a scoped subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_errors() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::ERROR)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

fn config() -> AdapterConfig {
    AdapterConfig::new("key-test", "mg.example.com", "My App <noreply@example.com>")
        .template(
            "passwordResetEmail",
            TemplateDescriptor::new("Reset your password", "reset.txt"),
        )
        .template(
            "verificationEmail",
            TemplateDescriptor::new("Verify your email", "verify.txt").html("verify.html"),
        )
        .template("customAlert", TemplateDescriptor::new("Alert", "alert.txt"))
}

fn loader() -> CountingLoader {
    CountingLoader::new(&[
        ("reset.txt", "Hello {{username}}, reset at {{{link}}}"),
        ("verify.txt", "Welcome to {{appName}}, {{email}}"),
        ("verify.html", "<p>Welcome to {{appName}}, {{username}}</p>"),
        ("alert.txt", "Host {{host}} is {{state}}"),
        ("greeting.txt", "{{appName}} says hi to {{firstName}}"),
    ])
}

fn reset_email() -> IdentityEmail {
    IdentityEmail::new(
        "https://example.com/reset?token=abc123",
        "My App",
        User::new("alice", "a@b.com"),
    )
}

// ============================================================================
// Identity Mode
// ============================================================================

#[tokio::test]
async fn password_reset_end_to_end() {
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    let delivery = adapter.send_password_reset_email(reset_email()).await;
    assert!(delivery.is_some());

    assert_email_count(&mailer, 1);
    assert_email_to(&mailer, "a@b.com");
    assert_email_from(&mailer, "noreply@example.com");
    assert_email_subject(&mailer, "Reset your password");
    assert_email_body_contains(&mailer, "Hello alice");
    assert_email_body_matches(&mailer, r"https://example\.com/reset\?token=\w+");
}

#[tokio::test]
async fn verification_email_renders_both_bodies() {
    let composer = RecordingComposer::default();
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .composer(composer.clone())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    let email = IdentityEmail::new(
        "https://example.com/verify",
        "Tom & Jerry",
        User::new("bob", "bob@example.com"),
    );
    assert!(adapter.send_verification_email(email).await.is_some());

    let message = composer.last();
    assert_eq!(message.to, "bob@example.com");
    assert_eq!(message.subject, "Verify your email");
    assert_eq!(message.text, "Welcome to Tom &amp; Jerry, bob@example.com");
    assert_eq!(
        message.html.as_deref(),
        Some("<p>Welcome to Tom &amp; Jerry, bob</p>")
    );
}

#[tokio::test]
async fn enricher_keys_override_base_variables() {
    let config = config().template(
        "passwordResetEmail",
        TemplateDescriptor::new("Reset", "greeting.txt").enrich(|user: &dyn Identity| {
            json!({ "appName": "X", "firstName": user.get("firstName") })
        }),
    );
    let composer = RecordingComposer::default();
    let adapter = MailAdapter::builder(config)
        .loader(loader())
        .composer(composer.clone())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    let user = User::new("alice", "a@b.com").field("firstName", "Alice");
    adapter
        .send_password_reset_email(IdentityEmail::new("https://l", "My App", user))
        .await;

    assert_eq!(composer.last().text, "X says hi to Alice");
}

#[tokio::test]
async fn non_object_enrichment_falls_back_to_base_variables() {
    let config = config().template(
        "passwordResetEmail",
        TemplateDescriptor::new("Reset", "greeting.txt")
            .enrich(|_: &dyn Identity| Value::String("not an object".into())),
    );
    let composer = RecordingComposer::default();
    let adapter = MailAdapter::builder(config)
        .loader(loader())
        .composer(composer.clone())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    let delivery = adapter.send_password_reset_email(reset_email()).await;
    assert!(delivery.is_some());
    assert_eq!(composer.last().text, "My App says hi to ");
}

#[tokio::test]
async fn identity_send_without_user_email_is_logged_not_raised() {
    let mailer = Arc::new(LocalMailer::new());
    let loader = loader();
    let adapter = MailAdapter::builder(config())
        .loader(loader.clone())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    let user: HashMap<String, String> = [("username".to_string(), "alice".to_string())].into();
    let result = adapter
        .send_password_reset_email(IdentityEmail::new("https://l", "My App", user))
        .await;

    assert!(result.is_none());
    assert_no_emails_sent(&mailer);
    assert_eq!(loader.reads(), 0);
}

#[tokio::test]
async fn identity_send_with_unknown_template_is_logged_not_raised() {
    let config = AdapterConfig::new("key-test", "mg.example.com", "noreply@example.com")
        .template("customAlert", TemplateDescriptor::new("Alert", "alert.txt"));
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config)
        .loader(loader())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    assert!(adapter.send_verification_email(reset_email()).await.is_none());
    assert_no_emails_sent(&mailer);
}

#[tokio::test]
async fn identity_compose_failure_returns_none() {
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .composer(FailingComposer)
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    assert!(adapter.send_password_reset_email(reset_email()).await.is_none());
    assert_no_emails_sent(&mailer);
}

#[tokio::test]
async fn identity_compose_failure_is_logged() {
    let (logs, _guard) = capture_errors();
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .composer(FailingComposer)
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    assert!(adapter.send_password_reset_email(reset_email()).await.is_none());

    let output = logs.contents();
    assert!(output.contains("ERROR"), "{output}");
    assert!(output.contains("Failed to send templated email"), "{output}");
    assert!(output.contains("passwordResetEmail"), "{output}");
    assert!(output.contains("Compose error: boom"), "{output}");
}

#[tokio::test]
async fn identity_missing_email_is_logged() {
    let (logs, _guard) = capture_errors();
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    let user: HashMap<String, String> = [("username".to_string(), "alice".to_string())].into();
    adapter
        .send_verification_email(IdentityEmail::new("https://l", "My App", user))
        .await;

    let output = logs.contents();
    assert!(
        output.contains("Cannot send email with template verificationEmail without a user email"),
        "{output}"
    );
}

#[tokio::test]
async fn identity_delivery_failure_returns_none() {
    let mailer = Arc::new(LocalMailer::new());
    mailer.set_failure("mailbox unavailable");
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    assert!(adapter.send_password_reset_email(reset_email()).await.is_none());
}

// ============================================================================
// Direct Mode
// ============================================================================

#[tokio::test]
async fn direct_send_uses_only_caller_variables() {
    let composer = RecordingComposer::default();
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .composer(composer.clone())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    adapter
        .send(
            SendOptions::new("customAlert")
                .recipient("ops@example.com")
                .variable("host", "db-1"),
        )
        .await
        .unwrap();

    let message = composer.last();
    assert_eq!(message.to, "ops@example.com");
    assert_eq!(message.from, "My App <noreply@example.com>");
    assert_eq!(message.subject, "Alert");
    assert_eq!(message.text, "Host db-1 is ");
    assert!(message.html.is_none());
}

#[tokio::test]
async fn direct_send_overrides_subject_and_sender() {
    let composer = RecordingComposer::default();
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .composer(composer.clone())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    adapter
        .send(
            SendOptions::new("customAlert")
                .recipient("ops@example.com")
                .subject("Disk almost full")
                .from_address("alerts@example.com"),
        )
        .await
        .unwrap();

    let message = composer.last();
    assert_eq!(message.subject, "Disk almost full");
    assert_eq!(message.from, "alerts@example.com");
}

#[tokio::test]
async fn direct_send_without_recipient_fails_before_loading() {
    let loader = loader();
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config())
        .loader(loader.clone())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    let err = adapter
        .send(SendOptions::new("customAlert").variable("host", "db-1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MailError::MissingField { field: "recipient", .. }
    ));
    assert_eq!(
        err.to_string(),
        "Cannot send email with template customAlert without a recipient"
    );
    assert!(err.is_validation());
    assert_eq!(loader.reads(), 0);
    assert_no_emails_sent(&mailer);
}

#[tokio::test]
async fn direct_send_with_unknown_template_names_it() {
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    let err = adapter
        .send(SendOptions::new("doesNotExist").recipient("ops@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::TemplateNotFound(ref name) if name == "doesNotExist"));
    assert_eq!(err.to_string(), "Could not find template with name doesNotExist");
}

#[tokio::test]
async fn direct_compose_failure_propagates() {
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .composer(FailingComposer)
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    let err = adapter
        .send(SendOptions::new("customAlert").recipient("ops@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::Compose(ref m) if m == "boom"));
    assert_no_emails_sent(&mailer);
}

#[tokio::test]
async fn direct_delivery_failure_propagates() {
    let mailer = Arc::new(LocalMailer::new());
    mailer.set_failure("rate limited");
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    let err = adapter
        .send(SendOptions::new("customAlert").recipient("ops@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::ProviderError { provider: "local", .. }));
}

#[tokio::test]
async fn missing_template_file_is_a_load_error() {
    let config = config().template("broken", TemplateDescriptor::new("Broken", "missing.txt"));
    let adapter = MailAdapter::builder(config)
        .loader(loader())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    let err = adapter
        .send(SendOptions::new("broken").recipient("ops@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::TemplateLoad { .. }));
    assert!(!adapter.cache().contains("broken", BodyKind::Text));
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn template_bodies_are_loaded_once() {
    let loader = loader();
    let adapter = MailAdapter::builder(config())
        .loader(loader.clone())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    for _ in 0..3 {
        adapter.send_password_reset_email(reset_email()).await.unwrap();
    }
    assert_eq!(loader.reads(), 1);

    for _ in 0..2 {
        adapter.send_verification_email(reset_email()).await.unwrap();
    }
    assert_eq!(loader.reads(), 3);

    assert!(adapter.cache().contains("passwordResetEmail", BodyKind::Text));
    assert!(!adapter.cache().contains("passwordResetEmail", BodyKind::Html));
    assert!(adapter.cache().contains("verificationEmail", BodyKind::Html));
}

#[tokio::test]
async fn cached_body_is_rendered_per_send() {
    let composer = RecordingComposer::default();
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .composer(composer.clone())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    for host in ["db-1", "db-2"] {
        adapter
            .send(
                SendOptions::new("customAlert")
                    .recipient("ops@example.com")
                    .variable("host", host)
                    .variable("state", "down"),
            )
            .await
            .unwrap();
    }

    assert_eq!(composer.last().text, "Host db-2 is down");
    assert_eq!(
        adapter.cache().get("customAlert", BodyKind::Text).as_deref(),
        Some("Host {{host}} is {{state}}")
    );
}

#[tokio::test]
async fn templates_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("reset.txt"), "Hi {{username}}").unwrap();
    std::fs::write(dir.path().join("verify.txt"), "Verify {{username}}").unwrap();
    std::fs::write(dir.path().join("verify.html"), "<b>{{username}}</b>").unwrap();
    std::fs::write(dir.path().join("alert.txt"), [0xff, 0xfe, 0x00]).unwrap();

    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config().template_dir(dir.path()))
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    adapter.send_password_reset_email(reset_email()).await.unwrap();
    assert_email_body_contains(&mailer, "Hi alice");

    let err = adapter
        .send(SendOptions::new("customAlert").recipient("ops@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, MailError::TemplateLoad { .. }));
}

#[tokio::test]
async fn non_ascii_content_survives_delivery() {
    let config = config().template(
        "passwordResetEmail",
        TemplateDescriptor::new("Passwort zurücksetzen", "gruss.txt"),
    );
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config)
        .loader(CountingLoader::new(&[("gruss.txt", "Grüße {{username}}")]))
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    let email = IdentityEmail::new("https://l", "My App", User::new("jörg", "jorg@example.com"));
    assert!(adapter.send_password_reset_email(email).await.is_some());

    assert_email_subject(&mailer, "Passwort zurücksetzen");
    assert_email_text_contains(&mailer, "Grüße jörg");
    assert_email_body_contains(&mailer, "Grüße jörg");
}

// ============================================================================
// Extra Fields
// ============================================================================

#[tokio::test]
async fn request_extras_override_template_extras() {
    let config = config().template(
        "customAlert",
        TemplateDescriptor::new("Alert", "alert.txt")
            .extra("replyTo", "support@example.com")
            .extra("o:tag", "alerts"),
    );
    let adapter = MailAdapter::builder(config)
        .loader(loader())
        .mailer(LocalMailer::new())
        .build()
        .unwrap();

    let request = SendRequest::Direct(
        SendOptions::new("customAlert")
            .recipient("ops@example.com")
            .extra("replyTo", "noc@example.com"),
    );
    let message = adapter.prepare(&request).await.unwrap();

    assert_eq!(message.extra_field("replyTo"), Some(&json!("noc@example.com")));
    assert_eq!(message.extra_field("o:tag"), Some(&json!("alerts")));
}

#[tokio::test]
async fn extras_reach_the_mime_document() {
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    adapter
        .send(
            SendOptions::new("customAlert")
                .recipient("ops@example.com")
                .extra("replyTo", "noc@example.com")
                .extra("headers", json!({ "X-Alert-Id": "42" })),
        )
        .await
        .unwrap();

    let stored = get_last_email(&mailer);
    assert!(stored.header("Reply-To").unwrap().contains("noc@example.com"));
    assert_eq!(stored.header("X-Alert-Id").as_deref(), Some("42"));
}

#[tokio::test]
async fn path_attachments_are_read_and_attached() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.csv");
    std::fs::write(&report, "host,state\ndb-1,down\n").unwrap();

    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    adapter
        .send(
            SendOptions::new("customAlert")
                .recipient("ops@example.com")
                .variable("host", "db-1")
                .extra(
                    "attachments",
                    json!([{ "path": report.to_str().unwrap(), "contentType": "text/csv" }]),
                ),
        )
        .await
        .unwrap();

    assert_email_has_attachment(&mailer, "report.csv");
    assert_email_text_contains(&mailer, "Host db-1 is");
}

#[tokio::test]
async fn missing_path_attachment_fails_the_send() {
    let mailer = Arc::new(LocalMailer::new());
    let adapter = MailAdapter::builder(config())
        .loader(loader())
        .mailer(Arc::clone(&mailer))
        .build()
        .unwrap();

    let err = adapter
        .send(
            SendOptions::new("customAlert")
                .recipient("ops@example.com")
                .extra("attachments", json!([{ "path": "/nonexistent/report.csv" }])),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MailError::AttachmentError(_)));
    assert_no_emails_sent(&mailer);
}
