// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Sender};

use webrouter::{
    Controller, Entity, Exception, HttpMethod, Interrupt, RawRequest, RequestContext, Response,
    ResponseSink, Route, Server,
};

fn get(target: &str) -> RawRequest {
    RawRequest::new(0, HttpMethod::Get, target)
}

fn sleeping_route(path: &str, millis: u64) -> Route {
    Route::get(path, move |_| async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(Response::ok(Entity::text("finished")))
    })
}

/// 请求头中缺少令牌时立即返回 401 的中断
struct RequireToken;

#[async_trait]
impl Interrupt for RequireToken {
    async fn trigger_for(&self, request: Arc<RequestContext>, complete_with: Sender<Response>) {
        if !request.headers().contains("Authorization") {
            let _ = complete_with
                .send(Response::unauthorized(Entity::text("missing token")))
                .await;
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    headers: Vec<(String, String)>,
    status: Option<u16>,
    body: Vec<u8>,
}

impl ResponseSink for RecordingSink {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn write_status(&mut self, status_code: u16) {
        self.status = Some(status_code);
    }

    fn write_body(&mut self, body: &[u8]) {
        self.body = body.to_vec();
    }
}

#[tokio::test]
async fn fast_handler_beats_timeout() {
    let mut controller = Controller::new("Fast", "");
    controller
        .add_route(sleeping_route("/fast", 50))
        .set_timeout(Duration::from_millis(200));
    let mut server = Server::new();
    server.register(controller).unwrap();

    let response = server.into_dispatcher().dispatch(get("/fast")).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.entity().as_text(), Some("finished"));
}

#[tokio::test]
async fn timeout_wins_and_handler_keeps_running() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    let mut controller = Controller::new("Slow", "");
    controller
        .add_route(Route::get("/slow", move |_| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(Response::ok(Entity::empty()))
            }
        }))
        .add_response_listener(|r| r.with_header("X-Controller", "slow"))
        .set_timeout(Duration::from_millis(200));
    let mut server = Server::new();
    server.register(controller).unwrap();

    let response = server.into_dispatcher().dispatch(get("/slow")).await;
    assert_eq!(response.status_code(), 408);
    assert_eq!(response.entity().as_text(), Some("408 - request timed out"));
    assert_eq!(response.headers().get("X-Controller"), Some("slow"));
    assert!(!finished.load(Ordering::SeqCst));

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn earliest_interrupt_wins() {
    let mut controller = Controller::new("Guarded", "");
    controller
        .add_route(sleeping_route("/guarded", 500))
        .set_timeout(Duration::from_millis(200))
        .add_interrupt(RequireToken);
    let mut server = Server::new();
    server.register(controller).unwrap();
    let dispatcher = server.into_dispatcher();

    let response = dispatcher.dispatch(get("/guarded")).await;
    assert_eq!(response.status_code(), 401);

    let with_token = get("/guarded").with_header("Authorization", "Bearer x");
    let response = dispatcher.dispatch(with_token).await;
    assert_eq!(response.status_code(), 408);
}

#[tokio::test]
async fn server_interrupts_apply_to_every_controller() {
    let mut controller = Controller::new("Plain", "");
    controller.add_route(sleeping_route("/plain", 500));
    let mut server = Server::new();
    server.set_timeout(Duration::from_millis(30));
    server.register(controller).unwrap();

    let response = server.into_dispatcher().dispatch(get("/plain")).await;
    assert_eq!(response.status_code(), 408);
}

#[tokio::test]
async fn listeners_run_controller_then_server() {
    let mut controller = Controller::new("Echo", "/echo");
    controller
        .add_route(Route::get("/", |request: Arc<RequestContext>| async move {
            let order = request.headers().get_all("X-Order").join(",");
            Ok(Response::ok(Entity::text(order)))
        }))
        .add_request_listener(|request| request.with_header("X-Order", "controller"))
        .add_response_listener(|r| r.with_header("X-Response", "controller"));

    let mut server = Server::new();
    server
        .add_request_listener(|request| request.with_header("X-Order", "server"))
        .add_response_listener(|r| r.with_header("X-Response", "server"));
    server.register(controller).unwrap();
    let dispatcher = server.into_dispatcher();

    for _ in 0..3 {
        let response = dispatcher.dispatch(get("/echo")).await;
        assert_eq!(response.entity().as_text(), Some("controller,server"));
        assert_eq!(
            response.headers().get_all("X-Response"),
            vec!["controller", "server"]
        );
    }
}

#[tokio::test]
async fn observers_run_on_every_path() {
    let seen = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut controller = Controller::new("Mixed", "");
    controller
        .add_route(Route::get("/ok", |_| async { Ok(Response::ok(Entity::empty())) }))
        .add_route(Route::get("/fail", |_| async {
            Err(Exception::Handler("boom".to_string()))
        }));

    let counter = Arc::clone(&seen);
    let mut server = Server::new();
    server.add_journey_listener(move |request: &RequestContext, response: &Response| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send((request.url().to_string(), response.status_code()));
    });
    server.register(controller).unwrap();
    let dispatcher = server.into_dispatcher();

    dispatcher.dispatch(get("/ok")).await;
    dispatcher.dispatch(get("/fail")).await;
    dispatcher.dispatch(get("/missing")).await;

    let mut journeys = Vec::new();
    for _ in 0..3 {
        journeys.push(rx.recv().await.unwrap());
    }
    journeys.sort();
    assert_eq!(
        journeys,
        vec![
            ("/fail".to_string(), 500),
            ("/missing".to_string(), 404),
            ("/ok".to_string(), 200),
        ]
    );
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn custom_not_found_and_error_handlers() {
    let mut controller = Controller::new("C", "");
    controller.add_route(Route::post("/people", |request: Arc<RequestContext>| async move {
        let value: serde_json::Value = request.body().json_into()?;
        Ok::<_, Exception>(Response::ok(Entity::json(value)))
    }));

    let mut server = Server::new();
    server
        .not_found_handler(|request: Arc<RequestContext>| async move {
            Ok(Response::not_found(Entity::text(format!("nothing at {}", request.url()))))
        })
        .error_handler(|_, cause| {
            let code = if cause.is_parse_error() { 422 } else { 500 };
            Response::new(code, Entity::text("custom"))
        });
    server.register(controller).unwrap();
    let dispatcher = server.into_dispatcher();

    let response = dispatcher.dispatch(get("/nope")).await;
    assert_eq!(response.entity().as_text(), Some("nothing at /nope"));

    let malformed = RawRequest::new(0, HttpMethod::Post, "/people")
        .with_body(bytes::Bytes::from("{not json"));
    let response = dispatcher.dispatch(malformed).await;
    assert_eq!(response.status_code(), 422);
}

#[tokio::test]
async fn first_matching_route_wins() {
    let mut controller = Controller::new("Items", "/items");
    controller
        .add_route(Route::get("/$id:int", |_| async {
            Ok(Response::ok(Entity::text("by id")))
        }))
        .add_route(Route::get("/$name", |_| async {
            Ok(Response::ok(Entity::text("by name")))
        }));
    let mut server = Server::new();
    server.register(controller).unwrap();
    let dispatcher = server.into_dispatcher();

    let response = dispatcher.dispatch(get("/items/12")).await;
    assert_eq!(response.entity().as_text(), Some("by id"));
    let response = dispatcher.dispatch(get("/items/twelve")).await;
    assert_eq!(response.entity().as_text(), Some("by name"));
}

#[tokio::test]
async fn handle_encodes_into_sink() {
    let mut controller = Controller::new("Redirect", "");
    controller.add_route(Route::get("/old", |_| async {
        Ok(Response::moved_permanently("/new"))
    }));
    let mut server = Server::new();
    server.register(controller).unwrap();
    let dispatcher = server.into_dispatcher();

    let mut sink = RecordingSink::default();
    let status = dispatcher.handle(get("/old"), &mut sink).await;
    assert_eq!(status, 301);
    assert_eq!(sink.status, Some(301));
    assert!(sink
        .headers
        .contains(&("Location".to_string(), "/new".to_string())));
    assert!(sink.body.is_empty());
}
