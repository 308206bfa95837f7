// tests/integration_tests.rs
use actix::{Actor, StreamHandler};
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use actix_web_actors::ws;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use judge_ide::client::{HttpReaper, JudgeClient, WsChannel};
use judge_ide::config::{AppConfig, FileConfig};
use judge_ide::controller::RunController;
use judge_ide::errors::IdeError;
use judge_ide::interpreter::TerminalKind;
use judge_ide::language::Language;
use judge_ide::models::RunRequest;
use judge_ide::ui::BufferSink;

/// Scripted judge: replies to `run_code`, feeds `frames` once a filter is registered,
/// and records everything the client sends. Deletes answer `{"success": true}` unless
/// `delete_status` or a raw `delete_reply` body says otherwise.
#[derive(Default)]
struct MockJudge {
    run_status: u16,
    run_reply: Value,
    frames: Vec<String>,
    delete_status: u16,
    delete_reply: Option<String>,
    runs: Mutex<Vec<Value>>,
    filters: Mutex<Vec<Value>>,
    deletes: Mutex<Vec<(String, String)>>,
    gradings: Mutex<Vec<GradingForm>>,
}

#[derive(Deserialize)]
struct DeleteForm {
    id: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
struct GradingForm {
    ide_source: String,
    ide_language: String,
    csrfmiddlewaretoken: String,
}

async fn run_code(judge: web::Data<MockJudge>, body: web::Json<Value>) -> HttpResponse {
    judge.runs.lock().unwrap().push(body.into_inner());
    let status = StatusCode::from_u16(judge.run_status).unwrap_or(StatusCode::OK);
    HttpResponse::build(status).json(&judge.run_reply)
}

async fn delete_submission(
    judge: web::Data<MockJudge>,
    req: HttpRequest,
    form: web::Form<DeleteForm>,
) -> HttpResponse {
    let token = req
        .headers()
        .get("X-CSRFToken")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    judge.deletes.lock().unwrap().push((form.id.clone(), token));
    let status = StatusCode::from_u16(judge.delete_status).unwrap_or(StatusCode::OK);
    let body = judge
        .delete_reply
        .clone()
        .unwrap_or_else(|| json!({"success": true}).to_string());
    HttpResponse::build(status)
        .content_type("application/json")
        .body(body)
}

async fn grade(judge: web::Data<MockJudge>, form: web::Form<GradingForm>) -> HttpResponse {
    judge.gradings.lock().unwrap().push(form.into_inner());
    HttpResponse::Found()
        .insert_header(("Location", "/submission/77"))
        .finish()
}

async fn submission_page() -> HttpResponse {
    HttpResponse::Ok().body("queued")
}

struct EventFeed {
    judge: web::Data<MockJudge>,
}

impl Actor for EventFeed {
    type Context = ws::WebsocketContext<Self>;
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for EventFeed {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                let command: Value = serde_json::from_str(&text).unwrap_or_default();
                self.judge.filters.lock().unwrap().push(command);
                for frame in &self.judge.frames {
                    ctx.text(frame.clone());
                }
            }
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => ctx.close(reason),
            _ => (),
        }
    }
}

async fn events(
    req: HttpRequest,
    stream: web::Payload,
    judge: web::Data<MockJudge>,
) -> Result<HttpResponse, actix_web::Error> {
    ws::start(EventFeed { judge }, &req, stream)
}

fn start(judge: web::Data<MockJudge>) -> SocketAddr {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(judge.clone())
            .route("/", web::get().to(events))
            .route("/problem/run_code", web::post().to(run_code))
            .route("/submission/delete/", web::post().to(delete_submission))
            .route("/problem/aplusb/submit", web::post().to(grade))
            .route("/submission/77", web::get().to(submission_page))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());
    addr
}

fn config_for(addr: SocketAddr) -> AppConfig {
    let base = format!("http://{}", addr);
    let ws = format!("ws://{}/", addr);
    AppConfig::resolve(FileConfig::default(), move |key| match key {
        "JUDGE_BASE_URL" => Some(base.clone()),
        "JUDGE_WS_URL" => Some(ws.clone()),
        "JUDGE_COOKIES" => Some("sessionid=s1; csrftoken=tok-123".to_string()),
        "JUDGE_RESULT_TIMEOUT_SECS" => Some("10".to_string()),
        _ => None,
    })
    .unwrap()
}

/// Run one request through a controller wired to the real HTTP and WebSocket clients.
async fn run_against(judge: web::Data<MockJudge>) -> (judge_ide::controller::RunReport, Vec<bool>) {
    let addr = start(judge);
    let config = config_for(addr);
    let client = JudgeClient::new(&config).unwrap();
    let reaper = HttpReaper::new(client.clone());
    let mut controller = RunController::new(
        client,
        WsChannel::new(config.ws_endpoint()),
        reaper.clone(),
        BufferSink::new(),
    )
    .with_result_timeout(config.result_timeout);

    let report = controller
        .run(RunRequest::new("CPPICPC", "int main() {}", "1 2\n"))
        .await;
    reaper.drain(Duration::from_secs(5)).await;

    (report, controller.sink().submit_toggles())
}

#[actix_rt::test]
async fn test_run_end_to_end() {
    let judge = web::Data::new(MockJudge {
        run_status: 200,
        run_reply: json!({"channel": "ide-abc", "submission_id": "55"}),
        frames: vec![
            json!({"message": {"type": "grading-begin", "result": {}}}).to_string(),
            json!({"message": {
                "type": "on_test_case_ide",
                "result": {"result": {"proc_output": "3", "execution_time": 0.01, "max_memory": 256}}
            }})
            .to_string(),
        ],
        ..Default::default()
    });

    let (report, toggles) = run_against(judge.clone()).await;

    assert_eq!(report.kind, TerminalKind::Success);
    assert_eq!(report.text, "3\nElapsed Time: 0.01s\nMemory Usage: 256 KB");
    assert_eq!(toggles, vec![false, true]);
    assert_eq!(
        *judge.runs.lock().unwrap(),
        vec![json!({"language": "CPPICPC", "source": "int main() {}", "stdin": "1 2\n"})]
    );
    assert_eq!(
        *judge.filters.lock().unwrap(),
        vec![json!({"command": "set-filter", "filter": ["ide-abc"]})]
    );
    assert_eq!(
        *judge.deletes.lock().unwrap(),
        vec![("55".to_string(), "tok-123".to_string())]
    );
}

/// A judge whose run succeeds but whose delete endpoint misbehaves.
fn judge_with_failing_delete(delete_status: u16, delete_reply: &str) -> web::Data<MockJudge> {
    web::Data::new(MockJudge {
        run_status: 200,
        run_reply: json!({"channel": "ide-del", "submission_id": "60"}),
        frames: vec![json!({"message": {
            "type": "on_test_case_ide",
            "result": {"result": {"proc_output": "3", "execution_time": 0.01, "max_memory": 256}}
        }})
        .to_string()],
        delete_status,
        delete_reply: Some(delete_reply.to_string()),
        ..Default::default()
    })
}

#[actix_rt::test]
async fn test_failed_delete_leaves_result_untouched() {
    let cases = [
        (200, json!({"success": false, "error": "not yours"}).to_string()),
        (500, json!({"detail": "boom"}).to_string()),
        (200, "not json".to_string()),
    ];

    for (status, body) in cases {
        let judge = judge_with_failing_delete(status, &body);

        let (report, toggles) = run_against(judge.clone()).await;

        assert_eq!(report.kind, TerminalKind::Success, "delete reply {} {}", status, body);
        assert_eq!(report.text, "3\nElapsed Time: 0.01s\nMemory Usage: 256 KB");
        assert_eq!(report.submission_id.as_deref(), Some("60"));
        assert_eq!(toggles, vec![false, true]);
        assert_eq!(
            *judge.deletes.lock().unwrap(),
            vec![("60".to_string(), "tok-123".to_string())]
        );
    }
}

#[actix_rt::test]
async fn test_delete_failures_are_reported_to_the_caller() {
    let rejected = judge_with_failing_delete(200, &json!({"success": false, "message": "gone"}).to_string());
    let client = JudgeClient::new(&config_for(start(rejected))).unwrap();
    match client.delete_submission("60").await {
        Err(IdeError::Cleanup(reason)) => assert_eq!(reason, "gone"),
        other => panic!("unexpected {:?}", other),
    }

    let server_error = judge_with_failing_delete(503, "{}");
    let client = JudgeClient::new(&config_for(start(server_error))).unwrap();
    assert!(matches!(
        client.delete_submission("60").await,
        Err(IdeError::Cleanup(_))
    ));

    let garbled = judge_with_failing_delete(200, "not json");
    let client = JudgeClient::new(&config_for(start(garbled))).unwrap();
    assert!(client.delete_submission("60").await.is_err());

    let healthy = web::Data::new(MockJudge::default());
    let client = JudgeClient::new(&config_for(start(healthy))).unwrap();
    assert!(client.delete_submission("61").await.is_ok());
}

#[actix_rt::test]
async fn test_compile_error_end_to_end() {
    let judge = web::Data::new(MockJudge {
        run_status: 200,
        run_reply: json!({"channel": "ide-ce", "submission_id": "56"}),
        frames: vec![json!({"message": {
            "type": "ide-compile-error",
            "msg": {"log": "\u{1b}[01;31merror:\u{1b}[0m 'x' was not declared\r\n\n\n"}
        }})
        .to_string()],
        ..Default::default()
    });

    let (report, toggles) = run_against(judge.clone()).await;

    assert_eq!(report.kind, TerminalKind::CompileError);
    assert_eq!(report.text, "Compile Error:\nerror: 'x' was not declared\n");
    assert_eq!(toggles, vec![false, true]);
    assert_eq!(judge.deletes.lock().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_rejected_run_opens_no_channel() {
    let judge = web::Data::new(MockJudge {
        run_status: 200,
        run_reply: json!({"error": "bad language"}),
        ..Default::default()
    });

    let (report, toggles) = run_against(judge.clone()).await;

    assert_eq!(report.kind, TerminalKind::RequestError);
    assert_eq!(report.text, "Error: bad language");
    assert_eq!(toggles, vec![false, true]);
    assert!(judge.filters.lock().unwrap().is_empty());
    assert!(judge.deletes.lock().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_http_error_detail_is_surfaced() {
    let judge = web::Data::new(MockJudge {
        run_status: 422,
        run_reply: json!({"detail": "Source is empty"}),
        ..Default::default()
    });

    let (report, toggles) = run_against(judge.clone()).await;

    assert_eq!(report.kind, TerminalKind::RequestError);
    assert_eq!(report.text, "Error: Source is empty");
    assert_eq!(toggles, vec![false, true]);
    assert!(judge.filters.lock().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_grading_submission() {
    let judge = web::Data::new(MockJudge::default());
    let addr = start(judge.clone());
    let client = JudgeClient::new(&config_for(addr)).unwrap();

    let landed = client
        .submit_for_grading("/problem/aplusb", Language::Cpp, "int main() {}")
        .await
        .unwrap();

    assert!(landed.as_str().ends_with("/submission/77"));
    assert_eq!(
        *judge.gradings.lock().unwrap(),
        vec![GradingForm {
            ide_source: "int main() {}".to_string(),
            ide_language: "4".to_string(),
            csrfmiddlewaretoken: "tok-123".to_string(),
        }]
    );
}
