use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use webrouter::request::RawRequest;
use webrouter::{encode, Entity, Response, WireResponse};

fn raw_request_parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_request_parse");

    let requests = [
        (
            "simple",
            "GET /ping HTTP/1.1\r\nHost: localhost:7878\r\n\r\n".to_string(),
        ),
        (
            "queries",
            "GET /users/search?name=john&age=31&tag=a&tag=b HTTP/1.1\r\nHost: localhost\r\nAccept: application/json\r\n\r\n".to_string(),
        ),
        (
            "json_body",
            {
                let body = r#"{"name":"John","age":29,"tags":["a","b","c"]}"#;
                format!(
                    "POST /users HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                )
            },
        ),
    ];

    for (name, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), request, |b, request| {
            b.iter(|| {
                let buffer = black_box(request.as_bytes());
                let _ = RawRequest::try_from(buffer, 0).unwrap();
            });
        });
    }

    group.finish();
}

fn encode_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let responses = [
        ("text", Response::ok(Entity::text("PONG!"))),
        (
            "json",
            Response::ok(Entity::json(vec![("john", 29), ("jane", 31)])),
        ),
        ("redirect", Response::found("/login")),
    ];

    for (name, response) in responses.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), response, |b, response| {
            b.iter(|| {
                let mut wire = WireResponse::new();
                encode(black_box(response), &mut wire, 0);
                black_box(wire.as_bytes());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, raw_request_parse_benchmark, encode_benchmark);
criterion_main!(benches);
