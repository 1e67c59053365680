// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 监听器
//!
//! 监听器分三类：
//! - 请求监听器：按注册顺序串行执行，消费一个上下文并返回新的上下文；
//! - 响应监听器：按注册顺序串行执行，消费一个响应并返回新的响应；
//! - 旅程观察者：在响应产生后异步执行，只读，不影响返回给客户端的响应。
//!
//! 执行顺序固定为「控制器级在前，服务器级在后」。

use std::sync::Arc;

use log::info;

use crate::context::RequestContext;
use crate::exception::Exception;
use crate::response::Response;

pub type RequestListener = Arc<dyn Fn(RequestContext) -> RequestContext + Send + Sync>;
pub type ResponseListener = Arc<dyn Fn(Response) -> Response + Send + Sync>;
pub type JourneyListener = Arc<dyn Fn(&RequestContext, &Response) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&RequestContext, &Exception) -> Response + Send + Sync>;

pub fn apply_request_listeners<'a, I>(listeners: I, request: RequestContext) -> RequestContext
where
    I: IntoIterator<Item = &'a RequestListener>,
{
    listeners
        .into_iter()
        .fold(request, |request, listener| listener(request))
}

pub fn apply_response_listeners<'a, I>(listeners: I, response: Response) -> Response
where
    I: IntoIterator<Item = &'a ResponseListener>,
{
    listeners
        .into_iter()
        .fold(response, |response, listener| listener(response))
}

/// 为每个观察者派生一个独立任务，调用方无需等待。
/// 观察者内部的 panic 只会终止它自己的任务。
pub fn notify_journey_listeners(
    listeners: Vec<JourneyListener>,
    request: Arc<RequestContext>,
    response: &Response,
) {
    if listeners.is_empty() {
        return;
    }
    let response = Arc::new(response.clone());
    for listener in listeners {
        let request = Arc::clone(&request);
        let response = Arc::clone(&response);
        tokio::spawn(async move {
            listener(&request, &response);
        });
    }
}

/// 记录每个请求的方法、路径、状态码与耗时
pub fn journey_logger() -> JourneyListener {
    Arc::new(|request: &RequestContext, response: &Response| {
        let elapsed = response.done_at() - request.received_at();
        info!(
            "[ID{}]{} -> {} | {} | {}ms",
            request.id(),
            request.method(),
            request.url(),
            response.status_code(),
            elapsed.num_milliseconds()
        );
    })
}

/// 跨域资源共享策略，转换为一个响应监听器使用。
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub allow_origins: Vec<String>,
    pub allow_credentials: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_methods: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_credentials: Vec::new(),
            allow_headers: Vec::new(),
            allow_methods: Vec::new(),
        }
    }
}

impl CorsPolicy {
    pub fn into_listener(self) -> ResponseListener {
        Arc::new(move |response: Response| {
            let mut response = response;
            for (name, values) in [
                ("Access-Control-Allow-Origin", &self.allow_origins),
                ("Access-Control-Allow-Credentials", &self.allow_credentials),
                ("Access-Control-Allow-Headers", &self.allow_headers),
                ("Access-Control-Allow-Methods", &self.allow_methods),
            ] {
                if !values.is_empty() {
                    response = response.with_header(name, &values.join(", "));
                }
            }
            response
        })
    }
}
