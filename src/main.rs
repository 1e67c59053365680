// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 示例服务
//!
//! 加载日志与运行配置，构建 Tokio 运行时，注册几组示例控制器后开始服务。

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use serde_derive::{Deserialize, Serialize};
use tokio::runtime::Builder;

use webrouter::listener::journey_logger;
use webrouter::{
    Config, Controller, CorsPolicy, Entity, Exception, RequestContext, Response, Route, Server,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Person {
    name: String,
    age: u32,
}

fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    // 2. 从 TOML 文件读取运行参数
    let config = match Config::from_toml("config/development.toml") {
        Ok(config) => config,
        Err(e) => {
            error!("无法载入配置文件：{}，使用默认配置", e);
            Config::new()
        }
    };
    info!("配置文件已载入");

    // 3. 根据配置分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads().max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法构建异步运行时：{}", e);
            return;
        }
    };

    runtime.block_on(async move {
        let server = match build_server(config) {
            Ok(server) => server,
            Err(e) => {
                error!("路由注册失败：{}", e);
                return;
            }
        };
        if let Err(e) = server.serve().await {
            error!("服务异常退出：{}", e);
        }
    });
}

fn build_server(config: Config) -> Result<Server, Exception> {
    let mut server = Server::with_config(config);
    server
        .register_type("slug", "^[a-z0-9]+(?:-[a-z0-9]+)*$")?
        .add_journey_listener_arc(journey_logger())
        .add_response_listener_arc(CorsPolicy::default().into_listener());

    server
        .register(health_controller())?
        .register(users_controller())?
        .register(reports_controller())?;
    Ok(server)
}

fn health_controller() -> Controller {
    let mut controller = Controller::new("Health", "");
    controller.add_route(Route::get("/ping", |_| async {
        Ok(Response::ok(Entity::text("PONG!")))
    }));
    controller
}

fn users_controller() -> Controller {
    let mut controller = Controller::new("Users", "/users");
    controller
        .add_routes(vec![
            Route::get("/$id:int", |request: Arc<RequestContext>| async move {
                let id = request.path_params().get_int("id")?;
                Ok::<_, Exception>(Response::ok(Entity::json(Person {
                    name: format!("user-{}", id),
                    age: 30,
                })))
            }),
            Route::get("/search?name&age:int", |request: Arc<RequestContext>| async move {
                let name = request.query_params().get_one("name").unwrap_or_default();
                let age = request.query_params().get_int("age")?;
                Ok::<_, Exception>(Response::ok(Entity::json(vec![Person {
                    name: name.to_string(),
                    age: age as u32,
                }])))
            }),
            Route::post("/", |request: Arc<RequestContext>| async move {
                let person: Person = request.body().json_into()?;
                Ok::<_, Exception>(Response::created(Entity::xml(person)))
            }),
        ])
        .add_request_listener(|request| request.with_header("X-Controller", "users"));
    controller
}

fn reports_controller() -> Controller {
    let mut controller = Controller::new("Reports", "/reports");
    controller
        .add_route(Route::get("/$name:slug", |request: Arc<RequestContext>| async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let name = request.path_params().get("name").unwrap_or_default().to_string();
            Ok::<_, Exception>(Response::ok(Entity::text(format!("report {} is ready", name))))
        }))
        .set_timeout(Duration::from_secs(1));
    controller
}
