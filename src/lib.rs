// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # webrouter
//!
//! HTTP API 的请求路由与分发引擎：类型化的路由模式、查询声明、首个匹配路由表、
//! 请求与响应监听器链、与处理器竞争的中断，以及响应编码。

pub mod config;
pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod encoder;
pub mod exception;
pub mod headers;
pub mod interrupt;
pub mod listener;
pub mod matcher;
pub mod param;
pub mod pattern;
pub mod query;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod server;

pub use config::Config;
pub use context::{PathParams, RequestBody, RequestContext};
pub use controller::Controller;
pub use dispatcher::Dispatcher;
pub use encoder::{encode, ResponseSink, WireResponse};
pub use exception::Exception;
pub use headers::Headers;
pub use interrupt::{Interrupt, TimeoutInterrupt};
pub use listener::CorsPolicy;
pub use matcher::TypeRegistry;
pub use param::HttpMethod;
pub use pattern::RoutePattern;
pub use query::{Queries, QueryDeclaration};
pub use request::RawRequest;
pub use response::{Cookie, Entity, Response};
pub use route::Route;
pub use router::RouteTable;
pub use server::Server;
