// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求分发器
//!
//! 每个请求的处理流程：
//! 1. 在路由表中查找首个匹配的路由，未命中时使用「未找到」处理器与服务器级作用域。
//! 2. 构建请求上下文，依次执行控制器级、服务器级请求监听器，之后上下文不可变。
//! 3. 处理器与所有中断并发运行，最先产生的结果胜出，落后的任务不会被取消。
//! 4. 处理器失败（返回错误或 panic）时交给错误处理器，不再经过响应监听器；
//!    其余情况依次执行控制器级、服务器级响应监听器。
//! 5. 派生旅程观察者，然后返回响应。
//!
//! 监听器与错误处理器中的 panic 同样被捕获：监听器 panic 交给错误处理器，
//! 错误处理器自身 panic 时返回固定的 500 JSON 响应。

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::{mpsc, oneshot};

use crate::context::{PathParams, RequestContext};
use crate::encoder::{encode_body, ResponseSink};
use crate::exception::Exception;
use crate::interrupt::Interrupt;
use crate::listener::{
    apply_request_listeners, apply_response_listeners, notify_journey_listeners, ErrorHandler,
    JourneyListener, RequestListener, ResponseListener,
};
use crate::request::RawRequest;
use crate::response::{Entity, FailureMessage, Response};
use crate::route::{handler, Handler};
use crate::router::{MountedController, RouteTable};

/// 竞争的结果
#[derive(Debug)]
enum Outcome {
    Completed(Response),
    Failed(Exception),
    Interrupted(Response),
}

pub struct Dispatcher {
    routes: RouteTable,
    request_listeners: Vec<RequestListener>,
    response_listeners: Vec<ResponseListener>,
    journey_listeners: Vec<JourneyListener>,
    interrupts: Vec<Arc<dyn Interrupt>>,
    not_found: Handler,
    error_handler: ErrorHandler,
}

impl Dispatcher {
    pub fn new(routes: RouteTable) -> Self {
        Self {
            routes,
            request_listeners: Vec::new(),
            response_listeners: Vec::new(),
            journey_listeners: Vec::new(),
            interrupts: Vec::new(),
            not_found: default_not_found(),
            error_handler: default_error_handler(),
        }
    }

    pub(crate) fn with_scope(
        mut self,
        request_listeners: Vec<RequestListener>,
        response_listeners: Vec<ResponseListener>,
        journey_listeners: Vec<JourneyListener>,
        interrupts: Vec<Arc<dyn Interrupt>>,
    ) -> Self {
        self.request_listeners = request_listeners;
        self.response_listeners = response_listeners;
        self.journey_listeners = journey_listeners;
        self.interrupts = interrupts;
        self
    }

    pub(crate) fn with_handlers(mut self, not_found: Handler, error_handler: ErrorHandler) -> Self {
        self.not_found = not_found;
        self.error_handler = error_handler;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// 分发请求并把响应编码到 `sink`，返回写出的状态码。
    pub async fn handle(&self, raw: RawRequest, sink: &mut (dyn ResponseSink + Send)) -> u16 {
        let id = raw.id();
        let response = self.dispatch(raw).await;
        let body = response.entity().load().await;
        encode_body(&response, body, sink, id)
    }

    /// 分发请求，返回最终响应。
    pub async fn dispatch(&self, raw: RawRequest) -> Response {
        let id = raw.id();
        let (scope, route_handler, path_params) =
            match self.routes.find(raw.method(), raw.path(), raw.queries()) {
                Some(found) => {
                    debug!(
                        "[ID{}]命中路由 {} {}",
                        id,
                        found.route.method(),
                        found.route.pattern().raw()
                    );
                    (
                        Some(found.controller),
                        found.route.handler(),
                        found.path_params,
                    )
                }
                None => {
                    debug!("[ID{}]未找到路由：{} {}", id, raw.method(), raw.path());
                    (None, Arc::clone(&self.not_found), PathParams::default())
                }
            };

        let request = RequestContext::build(raw, path_params);
        let fallback = request.clone();
        let listened = guarded(id, "请求监听器", || {
            apply_request_listeners(
                scoped(scope, |c| &c.request_listeners).chain(&self.request_listeners),
                request,
            )
        });
        let (request, outcome) = match listened {
            Ok(request) => {
                let request = Arc::new(request);
                let interrupts: Vec<Arc<dyn Interrupt>> = scoped(scope, |c| &c.interrupts)
                    .chain(&self.interrupts)
                    .cloned()
                    .collect();
                let outcome = race(route_handler, Arc::clone(&request), interrupts).await;
                (request, outcome)
            }
            Err(cause) => (Arc::new(fallback), Outcome::Failed(cause)),
        };

        let response = match outcome {
            Outcome::Failed(cause) => self.recover(&request, cause),
            Outcome::Completed(response) | Outcome::Interrupted(response) => {
                let listened = guarded(id, "响应监听器", || {
                    apply_response_listeners(
                        scoped(scope, |c| &c.response_listeners).chain(&self.response_listeners),
                        response,
                    )
                });
                match listened {
                    Ok(response) => response,
                    Err(cause) => self.recover(&request, cause),
                }
            }
        };

        let observers: Vec<JourneyListener> = scoped(scope, |c| &c.journey_listeners)
            .chain(&self.journey_listeners)
            .cloned()
            .collect();
        notify_journey_listeners(observers, request, &response);
        response
    }

    /// 失败路径：交给错误处理器，错误处理器 panic 时退回固定的 500 响应
    fn recover(&self, request: &RequestContext, cause: Exception) -> Response {
        warn!("[ID{}]请求处理失败：{}", request.id(), cause);
        guarded(request.id(), "错误处理器", || (self.error_handler)(request, &cause))
            .unwrap_or_else(|_| failure(500, request, "internal server error"))
    }
}

/// 在当前任务中执行同步的用户回调，panic 转换为 `Exception::Panicked`
fn guarded<T>(id: u128, stage: &str, f: impl FnOnce() -> T) -> Result<T, Exception> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        error!("[ID{}]{}发生 panic", id, stage);
        Exception::Panicked(panic_message(payload))
    })
}

/// 控制器级列表的迭代器，未命中路由时为空
fn scoped<'a, T: 'a>(
    scope: Option<&'a MountedController>,
    select: impl Fn(&'a MountedController) -> &'a Vec<T>,
) -> impl Iterator<Item = &'a T> {
    scope.into_iter().flat_map(move |c| select(c).iter())
}

/// 处理器与中断竞争。
///
/// 处理器运行在独立任务中，由一个监督任务等待其结束并把结果分发到成功或失败通道；
/// 每个中断同样运行在独立任务中，共享一个容量足够的中断通道。
async fn race(
    route_handler: Handler,
    request: Arc<RequestContext>,
    interrupts: Vec<Arc<dyn Interrupt>>,
) -> Outcome {
    let id = request.id();
    let (completed_tx, completed_rx) = oneshot::channel();
    let (failed_tx, failed_rx) = oneshot::channel();
    let (interrupt_tx, mut interrupt_rx) = mpsc::channel(interrupts.len().max(1));

    let task_request = Arc::clone(&request);
    tokio::spawn(async move {
        let job = tokio::spawn(route_handler(task_request));
        match job.await {
            Ok(Ok(response)) => {
                let _ = completed_tx.send(response);
            }
            Ok(Err(cause)) => {
                let _ = failed_tx.send(cause);
            }
            Err(join_error) => {
                error!("[ID{}]处理器发生 panic", id);
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    "handler task was cancelled".to_string()
                };
                let _ = failed_tx.send(Exception::Panicked(message));
            }
        }
    });

    for interrupt in interrupts {
        let request = Arc::clone(&request);
        let complete_with = interrupt_tx.clone();
        tokio::spawn(async move {
            interrupt.trigger_for(request, complete_with).await;
        });
    }
    drop(interrupt_tx);

    tokio::select! {
        Ok(response) = completed_rx => Outcome::Completed(response),
        Ok(cause) = failed_rx => Outcome::Failed(cause),
        Some(response) = interrupt_rx.recv() => {
            debug!("[ID{}]中断先于处理器完成", id);
            Outcome::Interrupted(response)
        }
        else => Outcome::Failed(Exception::Handler("handler finished without a result".to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn failure(status_code: u16, request: &RequestContext, message: &str) -> Response {
    Response::new(
        status_code,
        Entity::json(FailureMessage {
            status_code,
            path: request.url().to_string(),
            message: message.to_string(),
            method: request.method().to_string(),
        }),
    )
}

/// 默认的「未找到」处理器：404 JSON
pub fn default_not_found() -> Handler {
    handler(|request: Arc<RequestContext>| async move {
        Ok(failure(404, &request, "route not found"))
    })
}

/// 默认的错误处理器：解析错误返回 400，其余返回 500。失败原因只记录在服务端日志中。
pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|request: &RequestContext, cause: &Exception| {
        if cause.is_parse_error() {
            debug!("[ID{}]请求内容无法解析：{}", request.id(), cause);
            failure(400, request, "bad request")
        } else {
            error!("[ID{}]处理请求时发生错误：{}", request.id(), cause);
            failure(500, request, "internal server error")
        }
    })
}
