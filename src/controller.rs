// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 控制器
//!
//! 控制器是一组共享路径前缀、监听器与中断的路由。

use std::sync::Arc;
use std::time::Duration;

use crate::context::RequestContext;
use crate::interrupt::{Interrupt, TimeoutInterrupt};
use crate::listener::{JourneyListener, RequestListener, ResponseListener};
use crate::pattern::normalize_path;
use crate::response::Response;
use crate::route::Route;

pub struct Controller {
    name: String,
    prefix: String,
    routes: Vec<Route>,
    request_listeners: Vec<RequestListener>,
    response_listeners: Vec<ResponseListener>,
    journey_listeners: Vec<JourneyListener>,
    interrupts: Vec<Arc<dyn Interrupt>>,
}

impl Controller {
    /// 空前缀表示挂载在根路径下。
    pub fn new(name: &str, prefix: &str) -> Self {
        let prefix = match normalize_path(prefix).as_str() {
            "/" => String::new(),
            p => p.to_string(),
        };
        Self {
            name: name.to_string(),
            prefix,
            routes: Vec::new(),
            request_listeners: Vec::new(),
            response_listeners: Vec::new(),
            journey_listeners: Vec::new(),
            interrupts: Vec::new(),
        }
    }

    pub fn add_route(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    pub fn add_routes(&mut self, routes: impl IntoIterator<Item = Route>) -> &mut Self {
        self.routes.extend(routes);
        self
    }

    pub fn add_request_listener<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(RequestContext) -> RequestContext + Send + Sync + 'static,
    {
        self.request_listeners.push(Arc::new(listener));
        self
    }

    pub fn add_response_listener<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.response_listeners.push(Arc::new(listener));
        self
    }

    /// 添加一个已包装好的响应监听器，例如 [`CorsPolicy::into_listener`](crate::listener::CorsPolicy::into_listener)
    pub fn add_response_listener_arc(&mut self, listener: ResponseListener) -> &mut Self {
        self.response_listeners.push(listener);
        self
    }

    pub fn add_journey_listener<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&RequestContext, &Response) + Send + Sync + 'static,
    {
        self.journey_listeners.push(Arc::new(listener));
        self
    }

    pub fn add_interrupt(&mut self, interrupt: impl Interrupt + 'static) -> &mut Self {
        self.interrupts.push(Arc::new(interrupt));
        self
    }

    /// 为该控制器下的所有路由添加超时中断
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.add_interrupt(TimeoutInterrupt::new(timeout))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn request_listeners(&self) -> &[RequestListener] {
        &self.request_listeners
    }

    pub fn response_listeners(&self) -> &[ResponseListener] {
        &self.response_listeners
    }

    pub fn journey_listeners(&self) -> &[JourneyListener] {
        &self.journey_listeners
    }

    pub fn interrupts(&self) -> &[Arc<dyn Interrupt>] {
        &self.interrupts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Entity;

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(Controller::new("TestSuite", "test").prefix(), "/test");
        assert_eq!(Controller::new("Api", "/api/v1/").prefix(), "/api/v1");
        assert_eq!(Controller::new("Root", "").prefix(), "");
        assert_eq!(Controller::new("Root", "/").prefix(), "");
    }

    #[test]
    fn test_registration_keeps_order() {
        let mut controller = Controller::new("Users", "/users");
        controller
            .add_route(Route::get("/a", |_| async { Ok(Response::ok(Entity::empty())) }))
            .add_routes(vec![
                Route::get("/b", |_| async { Ok(Response::ok(Entity::empty())) }),
                Route::post("/c", |_| async { Ok(Response::ok(Entity::empty())) }),
            ])
            .add_request_listener(|ctx| ctx)
            .add_response_listener(|r| r)
            .add_journey_listener(|_, _| {})
            .set_timeout(Duration::from_millis(100));

        let paths: Vec<&str> = controller.routes().iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
        assert_eq!(controller.name(), "Users");
        assert_eq!(controller.request_listeners().len(), 1);
        assert_eq!(controller.response_listeners().len(), 1);
        assert_eq!(controller.journey_listeners().len(), 1);
        assert_eq!(controller.interrupts().len(), 1);
    }
}
