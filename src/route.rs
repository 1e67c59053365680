// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由声明
//!
//! [`Route`] 只保存方法、原始模式与处理器，模式在挂载到路由表时才编译。

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::context::RequestContext;
use crate::exception::Exception;
use crate::param::HttpMethod;
use crate::response::Response;

pub type HandlerFuture = BoxFuture<'static, Result<Response, Exception>>;

/// 请求处理器。返回 `Err` 或发生 panic 都会交给错误处理器。
pub type Handler = Arc<dyn Fn(Arc<RequestContext>) -> HandlerFuture + Send + Sync>;

/// 将异步函数包装为 [`Handler`]。
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
{
    Arc::new(move |request| f(request).boxed())
}

#[derive(Clone)]
pub struct Route {
    method: HttpMethod,
    path: String,
    handler: Handler,
}

impl Route {
    pub fn new<F, Fut>(method: &str, path: &str, f: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self {
            method: HttpMethod::from(method),
            path: path.to_string(),
            handler: handler(f),
        }
    }

    pub fn get<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self::new("GET", path, f)
    }

    pub fn post<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self::new("POST", path, f)
    }

    pub fn put<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self::new("PUT", path, f)
    }

    pub fn delete<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self::new("DELETE", path, f)
    }

    pub fn patch<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self::new("PATCH", path, f)
    }

    pub fn options<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        Self::new("OPTIONS", path, f)
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// 声明时的原始模式（含可选的查询声明）
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PathParams;
    use crate::request::RawRequest;
    use crate::response::Entity;

    #[tokio::test]
    async fn test_route_handler_is_invocable() {
        let route = Route::get("/ping", |_| async { Ok(Response::ok(Entity::text("PONG!"))) });
        assert_eq!(route.method(), &HttpMethod::Get);
        assert_eq!(route.path(), "/ping");

        let ctx = Arc::new(RequestContext::build(
            RawRequest::new(0, HttpMethod::Get, "/ping"),
            PathParams::default(),
        ));
        let response = (route.handler())(ctx).await.unwrap();
        assert_eq!(response.entity().as_text(), Some("PONG!"));
    }

    #[test]
    fn test_custom_method() {
        let route = Route::new("purge", "/cache", |_| async { Ok(Response::no_content()) });
        assert_eq!(route.method(), &HttpMethod::Other("PURGE".to_string()));
    }
}
