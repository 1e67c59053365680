// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由表
//!
//! 控制器在挂载时被编译：每条路由的完整模式为「控制器前缀 + 路由模式」，
//! 路径部分编译为 [`RoutePattern`]，`?` 之后的部分编译为 [`QueryDeclaration`]。
//! 挂载后路由表只读。
//!
//! 查找规则为首个匹配：按控制器挂载顺序、控制器内路由声明顺序依次尝试，
//! 方法相等、路径正则匹配、查询声明满足三者同时成立即命中。

use std::sync::Arc;

use log::{debug, info};

use crate::context::PathParams;
use crate::controller::Controller;
use crate::exception::Exception;
use crate::interrupt::Interrupt;
use crate::listener::{JourneyListener, RequestListener, ResponseListener};
use crate::param::HttpMethod;
use crate::pattern::{split_query, RoutePattern};
use crate::query::{Queries, QueryDeclaration};
use crate::matcher::TypeRegistry;
use crate::route::Handler;

/// 编译后的单条路由
#[derive(Clone)]
pub struct CompiledRoute {
    method: HttpMethod,
    pattern: RoutePattern,
    queries: QueryDeclaration,
    handler: Handler,
}

impl CompiledRoute {
    pub fn compile(
        method: HttpMethod,
        raw: &str,
        handler: Handler,
        registry: &TypeRegistry,
    ) -> Result<Self, Exception> {
        let pattern = RoutePattern::compile(raw, registry)?;
        let queries = match split_query(raw) {
            (_, Some(declaration)) => QueryDeclaration::parse(raw, declaration, registry)?,
            (_, None) => QueryDeclaration::default(),
        };
        Ok(Self {
            method,
            pattern,
            queries,
            handler,
        })
    }

    /// 方法、路径与查询声明同时满足时返回路径参数
    pub fn accepts(&self, method: &HttpMethod, path: &str, queries: &Queries) -> Option<PathParams> {
        if &self.method != method || !self.queries.accepts(queries) {
            return None;
        }
        self.pattern.matches(path)
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn queries(&self) -> &QueryDeclaration {
        &self.queries
    }

    pub fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }
}

/// 已挂载的控制器：编译后的路由加上控制器级的监听器与中断
pub struct MountedController {
    name: String,
    routes: Vec<CompiledRoute>,
    pub(crate) request_listeners: Vec<RequestListener>,
    pub(crate) response_listeners: Vec<ResponseListener>,
    pub(crate) journey_listeners: Vec<JourneyListener>,
    pub(crate) interrupts: Vec<Arc<dyn Interrupt>>,
}

impl MountedController {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }
}

/// 一次成功的查找
pub struct RouteMatch<'a> {
    pub controller: &'a MountedController,
    pub route: &'a CompiledRoute,
    pub path_params: PathParams,
}

#[derive(Default)]
pub struct RouteTable {
    controllers: Vec<MountedController>,
}

fn join(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 编译并挂载一个控制器。任何一条路由编译失败时整个控制器都不会被挂载。
    pub fn mount(&mut self, controller: Controller, registry: &TypeRegistry) -> Result<(), Exception> {
        let mut routes = Vec::with_capacity(controller.routes().len());
        for route in controller.routes() {
            let raw = join(controller.prefix(), route.path());
            let compiled =
                CompiledRoute::compile(route.method().clone(), &raw, route.handler(), registry)?;
            debug!(
                "{} {} => {}",
                compiled.method(),
                raw,
                compiled.pattern().as_regex().as_str()
            );
            routes.push(compiled);
        }
        info!(
            "挂载控制器 {}，共 {} 条路由",
            controller.name(),
            routes.len()
        );
        self.controllers.push(MountedController {
            name: controller.name().to_string(),
            routes,
            request_listeners: controller.request_listeners().to_vec(),
            response_listeners: controller.response_listeners().to_vec(),
            journey_listeners: controller.journey_listeners().to_vec(),
            interrupts: controller.interrupts().to_vec(),
        });
        Ok(())
    }

    pub fn find(&self, method: &HttpMethod, path: &str, queries: &Queries) -> Option<RouteMatch<'_>> {
        self.controllers.iter().find_map(|controller| {
            controller.routes.iter().find_map(|route| {
                route.accepts(method, path, queries).map(|path_params| RouteMatch {
                    controller,
                    route,
                    path_params,
                })
            })
        })
    }

    pub fn controllers(&self) -> &[MountedController] {
        &self.controllers
    }

    pub fn len(&self) -> usize {
        self.controllers.iter().map(|c| c.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
