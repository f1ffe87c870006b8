//! Integration tests for pipeconf

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use serde_json::Value;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn pipeconf() -> Command {
        cargo_bin_cmd!("pipeconf")
    }

    /// Temp workspace with a config pointing storage at it
    struct Workspace {
        dir: TempDir,
        config: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = dir.path().join("config.toml");
            std::fs::write(
                &config,
                format!(
                    "[storage]\ndata_dir = \"{}\"\n",
                    dir.path().join("data").display()
                ),
            )
            .unwrap();
            Self { dir, config }
        }

        fn cmd(&self) -> Command {
            let mut cmd = pipeconf();
            cmd.arg("--config")
                .arg(&self.config)
                .env("PIPECONF_USER", "alice")
                .env_remove("PIPECONF_CONFIG");
            cmd
        }

        fn pipeline(&self, file: &str, body: Value) -> PathBuf {
            let path = self.dir.path().join(file);
            std::fs::write(&path, body.to_string()).unwrap();
            path
        }

        fn data(&self) -> &Path {
            self.dir.path()
        }
    }

    fn json_stdout(output: &[u8]) -> Value {
        serde_json::from_slice(output).unwrap()
    }

    #[test]
    fn help_displays() {
        pipeconf()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("pipeline config admin service"));
    }

    #[test]
    fn version_displays() {
        pipeconf()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pipeconf"));
    }

    #[test]
    fn config_path() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[server]"))
            .stdout(predicate::str::contains("algorithm = \"md5\""));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn show_missing_pipeline() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["show", "ghost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("404"));
    }

    #[test]
    fn create_without_group_fails() {
        let ws = Workspace::new();
        let file = ws.pipeline("p.json", serde_json::json!({"name": "build-1"}));
        ws.cmd()
            .arg("create")
            .arg(&file)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Pipeline group must be specified"));
    }

    #[test]
    fn create_show_update_flow() {
        let ws = Workspace::new();
        let v1_file = ws.pipeline(
            "v1.json",
            serde_json::json!({"name": "build-1", "stages": ["compile"]}),
        );
        let v2_file = ws.pipeline(
            "v2.json",
            serde_json::json!({"name": "build-1", "stages": ["compile", "test"]}),
        );

        let created = ws
            .cmd()
            .args(["create", "--group", "infra", "--format", "json"])
            .arg(&v1_file)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let created = json_stdout(&created);
        assert_eq!(created["status"], 200);
        let v1 = created["etag"].as_str().unwrap().to_string();

        // Same name, other case
        let dup = ws.pipeline("dup.json", serde_json::json!({"name": "Build-1"}));
        ws.cmd()
            .args(["create", "--group", "infra"])
            .arg(&dup)
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        let shown = ws
            .cmd()
            .args(["show", "build-1", "--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let shown = json_stdout(&shown);
        assert_eq!(shown["etag"], v1.as_str());
        assert_eq!(shown["body"]["stages"][0], "compile");

        let cached = ws
            .cmd()
            .args(["show", "build-1", "--format", "json", "--etag", &v1])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        assert_eq!(json_stdout(&cached)["status"], 304);

        let updated = ws
            .cmd()
            .args(["update", "build-1", "--format", "json", "--etag", &v1])
            .arg(&v2_file)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let updated = json_stdout(&updated);
        assert_eq!(updated["status"], 200);
        assert_ne!(updated["etag"], v1.as_str());

        ws.cmd()
            .args(["update", "build-1", "--etag", &v1])
            .arg(&v2_file)
            .assert()
            .failure()
            .stderr(predicate::str::contains("412"))
            .stderr(predicate::str::contains("Hint:"));

        let audit = std::fs::read_to_string(ws.data().join("data").join("audit.log")).unwrap();
        assert!(audit.contains("pipeline.created"));
        assert!(audit.contains("pipeline.paused"));
        assert!(audit.contains("pipeline.updated"));
        assert!(audit.contains("\"user\":\"alice\""));
    }

    #[test]
    fn update_rename_rejected() {
        let ws = Workspace::new();
        let file = ws.pipeline("p.json", serde_json::json!({"name": "build-1"}));
        ws.cmd()
            .args(["create", "--group", "infra"])
            .arg(&file)
            .assert()
            .success();

        let renamed = ws.pipeline("r.json", serde_json::json!({"name": "build-2"}));
        ws.cmd()
            .args(["update", "build-1", "--etag", "anything"])
            .arg(&renamed)
            .assert()
            .failure()
            .stderr(predicate::str::contains("406"));
    }
}

mod protocol_tests {
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use hyper::header::{ETAG, HOST, IF_MATCH, IF_NONE_MATCH};
    use hyper::{Method, Request, Response, StatusCode};
    use pipeconf::api::{dispatch, request::USER_HEADER, AppState};
    use pipeconf::cache::DigestAlgorithm;
    use pipeconf::pipeline::PauseService;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn req(method: Method, uri: &str) -> hyper::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(HOST, "ci.example.com")
    }

    fn with_body(builder: hyper::http::request::Builder, body: Value) -> Request<Bytes> {
        builder.body(Bytes::from(body.to_string())).unwrap()
    }

    fn empty(builder: hyper::http::request::Builder) -> Request<Bytes> {
        builder.body(Bytes::new()).unwrap()
    }

    fn etag(response: &Response<Full<Bytes>>) -> String {
        response
            .headers()
            .get(ETAG)
            .unwrap()
            .to_str()
            .unwrap()
            .trim_matches('"')
            .to_string()
    }

    async fn body(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    async fn json_body(response: Response<Full<Bytes>>) -> Value {
        serde_json::from_slice(&body(response).await).unwrap()
    }

    fn token(validator: &str) -> String {
        format!("\"{}\"", DigestAlgorithm::Md5.hex_digest(validator.as_bytes()))
    }

    async fn create(state: &Arc<AppState>, name: &str, group: &str) -> Response<Full<Bytes>> {
        let request = with_body(
            req(Method::POST, "/api/admin/pipelines").header(USER_HEADER, "alice"),
            json!({ "group": group, "pipeline": { "name": name, "stages": ["compile"] } }),
        );
        dispatch(request, Arc::clone(state)).await
    }

    async fn get(
        state: &Arc<AppState>,
        name: &str,
        validator: Option<&str>,
    ) -> Response<Full<Bytes>> {
        let mut builder = req(Method::GET, &format!("/api/admin/pipelines/{}", name));
        if let Some(v) = validator {
            builder = builder.header(IF_NONE_MATCH, format!("\"{}\"", v));
        }
        dispatch(empty(builder), Arc::clone(state)).await
    }

    async fn put(
        state: &Arc<AppState>,
        path_name: &str,
        payload: Value,
        if_match: Option<String>,
    ) -> Response<Full<Bytes>> {
        let mut builder = req(Method::PUT, &format!("/api/admin/pipelines/{}", path_name));
        if let Some(v) = if_match {
            builder = builder.header(IF_MATCH, v);
        }
        dispatch(with_body(builder, json!({ "pipeline": payload })), Arc::clone(state)).await
    }

    #[tokio::test]
    async fn create_pauses_and_rejects_duplicates() {
        let state = Arc::new(AppState::in_memory());

        let response = create(&state, "build-1", "infra").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(ETAG));

        let pause = state.pause.pause_info("build-1").await.unwrap().unwrap();
        assert_eq!(pause.cause, "Under construction");
        assert_eq!(pause.paused_by, "alice");

        let response = create(&state, "Build-1", "infra").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["message_key"], "CANNOT_CREATE_PIPELINE_ALREADY_EXISTS");
        assert_eq!(body["data"]["name"], "Build-1");

        let response = create(&state, "build-2", "").await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json_body(response).await["message_key"],
            "PIPELINE_GROUP_MANDATORY_FOR_PIPELINE_CREATE"
        );
    }

    #[tokio::test]
    async fn conditional_read() {
        let state = Arc::new(AppState::in_memory());
        create(&state, "build-1", "infra").await;

        let response = get(&state, "build-1", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let v1 = etag(&response);
        let rendered = json_body(response).await;
        assert_eq!(
            rendered["_links"]["self"]["href"],
            "http://ci.example.com/api/admin/pipelines/build-1"
        );

        for _ in 0..2 {
            let response = get(&state, "BUILD-1", Some(&v1)).await;
            assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
            assert_eq!(etag(&response), v1);
            assert!(body(response).await.is_empty());
        }

        let response = get(&state, "build-1", Some("something-else")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn validator_ignores_request_host() {
        let state = Arc::new(AppState::in_memory());
        create(&state, "build-1", "infra").await;
        let v1 = etag(&get(&state, "build-1", None).await);

        let request = Request::get("/api/admin/pipelines/build-1")
            .header(HOST, "other.example.com:9000")
            .body(Bytes::new())
            .unwrap();
        let response = dispatch(request, Arc::clone(&state)).await;
        assert_eq!(etag(&response), v1);
    }

    #[tokio::test]
    async fn update_requires_current_token() {
        let state = Arc::new(AppState::in_memory());
        create(&state, "build-1", "infra").await;
        let v1 = etag(&get(&state, "build-1", None).await);
        let changed = json!({ "name": "build-1", "stages": ["compile", "test"] });

        let response = put(&state, "build-1", changed.clone(), Some(token(&v1))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let v2 = etag(&response);
        assert_ne!(v1, v2);
        assert_eq!(etag(&get(&state, "build-1", None).await), v2);

        // Same request again, now stale
        let response = put(&state, "build-1", changed.clone(), Some(token(&v1))).await;
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let body = json_body(response).await;
        assert_eq!(body["message_key"], "STALE_PIPELINE_CONFIG");
        assert_eq!(body["data"]["stages"][1], "test");
    }

    #[tokio::test]
    async fn update_token_forms_that_are_stale() {
        let state = Arc::new(AppState::in_memory());
        create(&state, "build-1", "infra").await;
        let v1 = etag(&get(&state, "build-1", None).await);
        let payload = json!({ "name": "build-1" });

        let unquoted = DigestAlgorithm::Md5.hex_digest(v1.as_bytes());
        let raw_validator = format!("\"{}\"", v1);

        for if_match in [None, Some(unquoted), Some(raw_validator)] {
            let response = put(&state, "build-1", payload.clone(), if_match).await;
            assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        }
    }

    #[tokio::test]
    async fn rename_rejected_regardless_of_token() {
        let state = Arc::new(AppState::in_memory());
        create(&state, "build-1", "infra").await;
        let v1 = etag(&get(&state, "build-1", None).await);
        let renamed = json!({ "name": "build-2" });

        for if_match in [Some(token(&v1)), Some("\"stale\"".to_string()), None] {
            let response = put(&state, "build-1", renamed.clone(), if_match).await;
            assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
            assert_eq!(
                json_body(response).await["message_key"],
                "PIPELINE_RENAMING_NOT_ALLOWED"
            );
        }

        // The current token still works afterwards
        let response = put(&state, "build-1", json!({ "name": "BUILD-1" }), Some(token(&v1))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn update_missing_pipeline() {
        let state = Arc::new(AppState::in_memory());
        let response = put(&state, "ghost", json!({ "name": "ghost" }), Some(token("x"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let state = Arc::new(AppState::in_memory());
        let request = req(Method::POST, "/api/admin/pipelines")
            .body(Bytes::from_static(b"{\"group\": "))
            .unwrap();
        let response = dispatch(request, state).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_reads_agree() {
        let state = Arc::new(AppState::in_memory());
        create(&state, "build-1", "infra").await;
        state.guard.on_successful_write("build-1", None);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                tokio::spawn(async move { etag(&get(&state, "build-1", None).await) })
            })
            .collect();

        let mut seen = Vec::new();
        for task in tasks {
            seen.push(task.await.unwrap());
        }
        seen.dedup();
        assert_eq!(seen.len(), 1);
    }
}
