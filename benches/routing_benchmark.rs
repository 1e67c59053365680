use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use webrouter::{
    Controller, Entity, HttpMethod, Queries, Response, Route, RouteTable, RoutePattern,
    TypeRegistry,
};

fn pattern_compile_benchmark(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    c.bench_function("pattern_compile", |b| {
        b.iter(|| {
            RoutePattern::compile(
                black_box("/users/$name:string/purchases/$id:int?age:int"),
                &registry,
            )
            .unwrap()
        });
    });
}

fn route_table(routes: usize) -> RouteTable {
    let mut controller = Controller::new("Bench", "/api");
    for i in 0..routes {
        controller.add_route(Route::get(&format!("/resource{}/$id:int", i), |_| async {
            Ok(Response::ok(Entity::empty()))
        }));
    }
    let mut table = RouteTable::new();
    table.mount(controller, &TypeRegistry::new()).unwrap();
    table
}

fn route_lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_lookup");
    let queries = Queries::new();

    for count in [10, 100, 1000].iter() {
        let table = route_table(*count);
        let last = format!("/api/resource{}/42", count - 1);
        group.bench_with_input(BenchmarkId::new("last_route", count), &last, |b, path| {
            b.iter(|| table.find(&HttpMethod::Get, black_box(path), &queries).is_some());
        });
        group.bench_with_input(BenchmarkId::new("miss", count), count, |b, _| {
            b.iter(|| table.find(&HttpMethod::Get, black_box("/api/none"), &queries).is_none());
        });
    }

    group.finish();
}

criterion_group!(benches, pattern_compile_benchmark, route_lookup_benchmark);
criterion_main!(benches);
