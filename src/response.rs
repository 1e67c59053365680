// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应模块
//!
//! [`Response`] 由状态码、响应实体、响应头、Cookie 与完成时间组成。
//! 响应实体 [`Entity`] 是一个封闭的枚举，所有变体共享同一个序列化契约：
//! 一个 `Content-Type` 和一个可能失败的 `bytes()`。

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_derive::Serialize;

use crate::exception::Exception;
use crate::headers::Headers;
use crate::param::{
    mime_for_extension, reason_phrase, APPLICATION_JSON, APPLICATION_XML, OCTET_STREAM,
    TEXT_PLAIN,
};

/// 延迟执行的序列化器。实体在编码阶段才真正序列化，失败由编码器兜底。
#[derive(Clone)]
pub struct Payload(Arc<dyn Fn() -> Result<Vec<u8>, Exception> + Send + Sync>);

impl Payload {
    fn run(&self) -> Result<Vec<u8>, Exception> {
        (self.0)()
    }
}

/// 响应实体
#[derive(Clone)]
pub enum Entity {
    Json(Payload),
    Xml(Payload),
    Text(String),
    /// 文件内容，`Content-Type` 由扩展名推断
    File(PathBuf),
    Empty,
}

impl Entity {
    pub fn json<T: serde::Serialize + Send + Sync + 'static>(value: T) -> Self {
        Entity::Json(Payload(Arc::new(move || {
            serde_json::to_vec(&value).map_err(|e| Exception::Encoding(e.to_string()))
        })))
    }

    pub fn xml<T: serde::Serialize + Send + Sync + 'static>(value: T) -> Self {
        Entity::Xml(Payload(Arc::new(move || {
            quick_xml::se::to_string(&value)
                .map(String::into_bytes)
                .map_err(|e| Exception::Encoding(e.to_string()))
        })))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Entity::Text(text.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Entity::File(path.into())
    }

    pub fn empty() -> Self {
        Entity::Empty
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Entity::Json(_) => APPLICATION_JSON,
            Entity::Xml(_) => APPLICATION_XML,
            Entity::Text(_) | Entity::Empty => TEXT_PLAIN,
            Entity::File(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(OCTET_STREAM, mime_for_extension),
        }
    }

    pub fn bytes(&self) -> Result<Bytes, Exception> {
        match self {
            Entity::Json(payload) | Entity::Xml(payload) => payload.run().map(Bytes::from),
            Entity::Text(text) => Ok(Bytes::from(text.clone())),
            Entity::File(path) => std::fs::read(path)
                .map(Bytes::from)
                .map_err(|e| file_error(path, e)),
            Entity::Empty => Ok(Bytes::new()),
        }
    }

    /// 与 [`Entity::bytes`] 相同，但文件实体通过 `tokio::fs` 读取，不占用运行时的工作线程。
    pub async fn load(&self) -> Result<Bytes, Exception> {
        match self {
            Entity::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| file_error(path, e)),
            _ => self.bytes(),
        }
    }

    /// 文本实体的内容
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Entity::Text(text) => Some(text),
            _ => None,
        }
    }
}

fn file_error(path: &Path, e: io::Error) -> Exception {
    Exception::Encoding(format!("{}: {}", path.display(), e))
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Json(_) => write!(f, "Json(..)"),
            Entity::Xml(_) => write!(f, "Xml(..)"),
            Entity::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Entity::File(path) => f.debug_tuple("File").field(path).finish(),
            Entity::Empty => write!(f, "Empty"),
        }
    }
}

/// 通过 `Set-Cookie` 下发的 Cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    path: Option<String>,
    max_age: Option<i64>,
    http_only: bool,
    secure: bool,
    same_site: Option<String>,
}

impl Cookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn same_site(mut self, policy: &str) -> Self {
        self.same_site = Some(policy.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 渲染为 `Set-Cookie` 的字段值
    pub fn to_header_value(&self) -> String {
        let mut value = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            value.push_str(&format!("; Path={}", path));
        }
        if let Some(age) = self.max_age {
            value.push_str(&format!("; Max-Age={}", age));
        }
        if self.http_only {
            value.push_str("; HttpOnly");
        }
        if self.secure {
            value.push_str("; Secure");
        }
        if let Some(policy) = &self.same_site {
            value.push_str(&format!("; SameSite={}", policy));
        }
        value
    }
}

/// 默认处理器使用的通用失败消息体
#[derive(Debug, Clone, Serialize)]
pub struct FailureMessage {
    pub status_code: u16,
    pub path: String,
    pub message: String,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    entity: Entity,
    headers: Headers,
    cookies: Vec<Cookie>,
    done_at: DateTime<Utc>,
}

impl Response {
    pub fn new(status_code: u16, entity: Entity) -> Self {
        Self {
            status_code,
            entity,
            headers: Headers::new(),
            cookies: Vec::new(),
            done_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = entity;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_headers(mut self, headers: &Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// 状态码位于 [300, 400) 时，实体内容被视为重定向目标
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &'static str {
        reason_phrase(self.status_code)
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn done_at(&self) -> DateTime<Utc> {
        self.done_at
    }
}

// 2xx
impl Response {
    pub fn ok(entity: Entity) -> Self {
        Self::new(200, entity)
    }

    pub fn created(entity: Entity) -> Self {
        Self::new(201, entity)
    }

    pub fn accepted(entity: Entity) -> Self {
        Self::new(202, entity)
    }

    pub fn no_content() -> Self {
        Self::new(204, Entity::Empty)
    }
}

// 3xx，实体为重定向目标
impl Response {
    pub fn moved_permanently(location: &str) -> Self {
        Self::new(301, Entity::text(location))
    }

    pub fn found(location: &str) -> Self {
        Self::new(302, Entity::text(location))
    }

    pub fn see_other(location: &str) -> Self {
        Self::new(303, Entity::text(location))
    }

    pub fn temporary_redirect(location: &str) -> Self {
        Self::new(307, Entity::text(location))
    }

    pub fn permanent_redirect(location: &str) -> Self {
        Self::new(308, Entity::text(location))
    }
}

// 4xx / 5xx
impl Response {
    pub fn bad_request(entity: Entity) -> Self {
        Self::new(400, entity)
    }

    pub fn unauthorized(entity: Entity) -> Self {
        Self::new(401, entity)
    }

    pub fn forbidden(entity: Entity) -> Self {
        Self::new(403, entity)
    }

    pub fn not_found(entity: Entity) -> Self {
        Self::new(404, entity)
    }

    pub fn method_not_allowed(entity: Entity) -> Self {
        Self::new(405, entity)
    }

    pub fn request_timeout(entity: Entity) -> Self {
        Self::new(408, entity)
    }

    pub fn conflict(entity: Entity) -> Self {
        Self::new(409, entity)
    }

    pub fn internal_server_error(entity: Entity) -> Self {
        Self::new(500, entity)
    }

    pub fn service_unavailable(entity: Entity) -> Self {
        Self::new(503, entity)
    }
}
