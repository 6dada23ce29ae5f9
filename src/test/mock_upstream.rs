use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::cores::jobs::fetcher::encode_base64;

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-data";

// Runs an actix app on an ephemeral local port and returns its base URL.
pub fn serve<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig, String) + Send + Clone + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app_base = base.clone();
    let server = HttpServer::new(move || {
        let configure = configure.clone();
        let base = app_base.clone();
        App::new().configure(move |cfg| configure(cfg, base))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    actix_rt::spawn(server);
    base
}

#[derive(Clone, Copy, Debug)]
pub enum BflOutcome {
    ReadyAfter(u32),
    FailAfter(u32),
    NeverReady,
    RejectSubmission,
    StatusError,
    MalformedPoll,
    BrokenImage,
}

#[derive(Clone)]
pub struct BflMock {
    pub outcome: BflOutcome,
    pub polls: Arc<AtomicU32>,
    pub seen_key: Arc<Mutex<Option<String>>>,
    pub seen_payload: Arc<Mutex<Option<Value>>>,
}

impl BflMock {
    pub fn new(outcome: BflOutcome) -> Self {
        BflMock {
            outcome,
            polls: Arc::new(AtomicU32::new(0)),
            seen_key: Arc::new(Mutex::new(None)),
            seen_payload: Arc::new(Mutex::new(None)),
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    // Submit at /v1/flux-kontext-pro, poll at /v1/get_result, image at /cdn/img.png
    pub fn start(&self) -> String {
        let mock = self.clone();
        serve(move |cfg, base| {
            let state = web::Data::new((mock.clone(), base));
            cfg.app_data(state)
                .route("/v1/flux-kontext-pro", web::post().to(bfl_submit))
                .route("/v1/get_result", web::get().to(bfl_result))
                .route("/cdn/img.png", web::get().to(png_image));
        })
    }
}

async fn bfl_submit(
    state: web::Data<(BflMock, String)>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    let (mock, base) = state.get_ref();
    let key = req.headers().get("x-key").and_then(|v| v.to_str().ok()).map(str::to_string);
    *mock.seen_key.lock().unwrap() = key;
    *mock.seen_payload.lock().unwrap() = Some(body.into_inner());

    if let BflOutcome::RejectSubmission = mock.outcome {
        return HttpResponse::Forbidden().json(json!({"detail": "Invalid API key"}));
    }
    HttpResponse::Ok().json(json!({
        "id": "job-1",
        "polling_url": format!("{}/v1/get_result?id=job-1", base),
    }))
}

async fn bfl_result(state: web::Data<(BflMock, String)>) -> HttpResponse {
    let (mock, base) = state.get_ref();
    let attempt = mock.polls.fetch_add(1, Ordering::SeqCst) + 1;
    let body = match mock.outcome {
        BflOutcome::StatusError => {
            return HttpResponse::InternalServerError().json(json!({"detail": "queue unavailable"}));
        }
        BflOutcome::MalformedPoll => return HttpResponse::Ok().content_type("text/plain").body("not json"),
        BflOutcome::BrokenImage => json!({
            "id": "job-1",
            "status": "Ready",
            "result": { "sample": format!("{}/cdn/missing.png", base) },
        }),
        BflOutcome::ReadyAfter(pending) if attempt > pending => json!({
            "id": "job-1",
            "status": "Ready",
            "result": { "sample": format!("{}/cdn/img.png", base) },
        }),
        BflOutcome::FailAfter(pending) if attempt > pending => json!({
            "id": "job-1",
            "status": "Error",
            "details": { "reason": "moderation" },
        }),
        _ => json!({ "id": "job-1", "status": "Pending" }),
    };
    HttpResponse::Ok().json(body)
}

async fn png_image() -> HttpResponse {
    HttpResponse::Ok().content_type("image/png").body(PNG_BYTES)
}

async fn jpg_image() -> HttpResponse {
    HttpResponse::Ok().content_type("image/jpeg").body(PNG_BYTES)
}

async fn runware_generate(base: web::Data<String>, body: web::Json<Value>) -> HttpResponse {
    let task = &body[0];
    HttpResponse::Ok().json(json!({
        "data": [{
            "taskType": "imageInference",
            "taskUUID": task["taskUUID"],
            "imageURL": format!("{}/cdn/pic.JPG?sig=1", base.get_ref()),
        }]
    }))
}

// Runware at /v1/generate, image at /cdn/pic.JPG
pub fn start_runware() -> String {
    serve(|cfg, base| {
        cfg.app_data(web::Data::new(base))
            .route("/v1/generate", web::post().to(runware_generate))
            .route("/cdn/pic.JPG", web::get().to(jpg_image));
    })
}

async fn openai_image() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "created": 1700000000,
        "data": [{ "b64_json": encode_base64(PNG_BYTES) }],
    }))
}

// OpenAI images at /v1/images/generations and /v1/images/edits
pub fn start_openai() -> String {
    serve(|cfg, _base| {
        cfg.route("/v1/images/generations", web::post().to(openai_image))
            .route("/v1/images/edits", web::post().to(openai_image));
    })
}

async fn gemini_generate(body: web::Json<Value>) -> HttpResponse {
    let user = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or_default().to_string();
    let system = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap_or_default().to_string();
    HttpResponse::Ok().json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": system }, { "text": user }] }
        }]
    }))
}

pub fn start_gemini() -> String {
    serve(|cfg, _base| {
        cfg.route("/v1beta/models/gemini-test/generate", web::post().to(gemini_generate));
    })
}
