use async_trait::async_trait;
use serde_json::{json, Value};
use sorng_gcf::{
    ApiCall, ApiRequest, BufferedSink, CommandOptions, FileCredentials, GcfErrorKind, GcfResult,
    GoogleProvider, InvokeFunction, RetrieveLogs, ServiceManifest, ServiceRegistry,
};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Records what it was called with and replies with a canned body.
struct Canned {
    reply: Value,
    seen: Mutex<Vec<(String, Value)>>,
}

impl Canned {
    fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ApiCall for Canned {
    async fn call(&self, request: ApiRequest) -> GcfResult<Value> {
        self.seen
            .lock()
            .unwrap()
            .push((request.auth.client_email().to_string(), request.params));
        Ok(self.reply.clone())
    }
}

const MANIFEST: &str = r#"
service: hello-service
provider:
  name: google
  project: p1
  credentials: /placeholder.json
functions:
  hello:
    handler: helloHandler
"#;

fn key_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"client_email": "deployer@p1.iam.gserviceaccount.com","private_key": "wasdqwerty"}"#)
        .unwrap();
    file
}

fn provider(
    manifest: &ServiceManifest,
    region: &str,
    key: &std::path::Path,
    call: Arc<Canned>,
    list: Arc<Canned>,
) -> GoogleProvider {
    let registry = ServiceRegistry::new()
        .with_method("cloudfunctions", &["projects", "locations", "functions"], "call", call)
        .with_method("logging", &["entries"], "list", list);
    let mut config = manifest.provider_config(region).unwrap();
    config.credentials_path = key.to_path_buf();
    GoogleProvider::with_registry(config, registry, Box::new(FileCredentials::new(key)))
}

#[tokio::test]
async fn invoke_prints_result_entry() {
    let manifest = ServiceManifest::from_yaml(MANIFEST).unwrap();
    let options = CommandOptions {
        function: "hello".to_string(),
        data: Some("{\"who\":\"world\"}".to_string()),
        ..Default::default()
    }
    .invoke_options(&manifest);
    assert_eq!(options.region, "us-central1");

    let key = key_file();
    let call = Canned::new(json!({ "executionId": "e-1", "result": "hi" }));
    let list = Canned::new(json!({
        "entries": [
            { "textPayload": "Function execution started" },
            { "textPayload": "hello world" }
        ]
    }));
    let provider = provider(&manifest, &options.region, key.path(), call.clone(), list.clone());
    let sink = BufferedSink::new();

    let line = InvokeFunction::new(
        &provider,
        &provider.config().project_id,
        &manifest.functions,
        &options,
        &sink,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(line, "hello world");
    assert_eq!(sink.lines(), vec!["hello world".to_string()]);

    let calls = call.seen.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "deployer@p1.iam.gserviceaccount.com");
    assert_eq!(
        calls[0].1["name"],
        "projects/p1/locations/us-central1/functions/helloHandler"
    );
    assert_eq!(calls[0].1["resource"]["data"], "{\"who\":\"world\"}");

    let lists = list.seen.lock().unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].1["filter"], "Function execution helloHandler us-central1");
    assert_eq!(lists[0].1["pageSize"], 2);
    assert!(provider.is_authenticated());
}

#[tokio::test]
async fn invoke_without_logs_prints_placeholder() {
    let manifest = ServiceManifest::from_yaml(MANIFEST).unwrap();
    let options = CommandOptions {
        function: "hello".to_string(),
        region: Some("europe-west1".to_string()),
        ..Default::default()
    }
    .invoke_options(&manifest);

    let key = key_file();
    let provider = provider(
        &manifest,
        &options.region,
        key.path(),
        Canned::new(json!({})),
        Canned::new(json!({})),
    );
    let sink = BufferedSink::new();

    let line = InvokeFunction::new(&provider, "p1", &manifest.functions, &options, &sink)
        .run()
        .await
        .unwrap();
    assert_eq!(line, "There is no log data available right now...");
}

#[tokio::test]
async fn missing_credentials_abort_before_output() {
    let manifest = ServiceManifest::from_yaml(MANIFEST).unwrap();
    let options = CommandOptions {
        function: "hello".to_string(),
        ..Default::default()
    }
    .invoke_options(&manifest);

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let call = Canned::new(json!({}));
    let provider = provider(
        &manifest,
        &options.region,
        &missing,
        call.clone(),
        Canned::new(json!({})),
    );
    let sink = BufferedSink::new();

    let err = InvokeFunction::new(&provider, "p1", &manifest.functions, &options, &sink)
        .run()
        .await
        .unwrap_err();
    assert_eq!(err.kind, GcfErrorKind::CredentialNotFound);
    assert!(call.seen.lock().unwrap().is_empty());
    assert!(sink.lines().is_empty());
}

#[tokio::test]
async fn logs_command_lists_recent_lines() {
    let manifest = ServiceManifest::from_yaml(MANIFEST).unwrap();
    let options = CommandOptions {
        function: "hello".to_string(),
        count: Some(1),
        ..Default::default()
    }
    .logs_options(&manifest);

    let key = key_file();
    let list = Canned::new(json!({
        "entries": [{ "timestamp": "2024-05-01T10:00:00Z", "textPayload": "done" }]
    }));
    let provider = provider(&manifest, &options.region, key.path(), Canned::new(json!({})), list.clone());
    let sink = BufferedSink::new();

    let out = RetrieveLogs::new(&provider, "p1", &manifest.functions, &options, &sink)
        .run()
        .await
        .unwrap();
    assert_eq!(
        out,
        "Displaying the 1 most recent log(s):\n\n2024-05-01T10:00:00Z: done"
    );
    assert_eq!(list.seen.lock().unwrap()[0].1["pageSize"], 1);
}
