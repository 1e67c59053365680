// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求上下文
//!
//! 每个请求只构建一次 [`RequestContext`]：由传输层的 [`RawRequest`] 与路由匹配得到的路径参数组成。
//! 上下文只能在请求监听器阶段通过「消费并返回」的方式修改，之后被放入 `Arc` 中，
//! 处理器、中断与观察者拿到的都是同一份不可变的上下文。

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;

use crate::exception::Exception;
use crate::headers::Headers;
use crate::param::HttpMethod;
use crate::query::Queries;
use crate::request::RawRequest;

/// 路径参数，按模式中的声明顺序保存。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    pairs: Vec<(String, String)>,
}

impl From<Vec<(String, String)>> for PathParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 取出路径参数并转换为整数。
    /// 适用于在模式中声明为 `int` 的参数（例如 `/users/$id:int`）。
    pub fn get_int(&self, name: &str) -> Result<i64, Exception> {
        let value = self.require(name)?;
        value
            .parse::<i64>()
            .map_err(|e| Exception::parse("path", format!("{}={}: {}", name, value, e)))
    }

    pub fn get_float(&self, name: &str) -> Result<f64, Exception> {
        let value = self.require(name)?;
        value
            .parse::<f64>()
            .map_err(|e| Exception::parse("path", format!("{}={}: {}", name, value, e)))
    }

    fn require(&self, name: &str) -> Result<&str, Exception> {
        self.get(name)
            .ok_or_else(|| Exception::parse("path", format!("not found path parameter {}", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// 请求体访问器。传输层已将请求体完整读入内存。
#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    bytes: Bytes,
}

impl RequestBody {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn text(&self) -> Result<&str, Exception> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| Exception::MalformedRequest(format!("body is not UTF-8: {}", e)))
    }

    /// 按 JSON 反序列化请求体，格式错误时返回 `Exception::Parse`。
    pub fn json_into<T: DeserializeOwned>(&self) -> Result<T, Exception> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }

    /// 按 XML 反序列化请求体，格式错误时返回 `Exception::Parse`。
    pub fn xml_into<T: DeserializeOwned>(&self) -> Result<T, Exception> {
        let text = std::str::from_utf8(&self.bytes).map_err(|e| Exception::parse("XML", e))?;
        Ok(quick_xml::de::from_str(text)?)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 单个请求的上下文。
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: u128,
    url: String,
    method: HttpMethod,
    path_params: PathParams,
    queries: Queries,
    headers: Headers,
    body: RequestBody,
    received_at: DateTime<Utc>,
    remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    /// 由原始请求与匹配得到的路径参数构建上下文。
    pub fn build(raw: RawRequest, path_params: PathParams) -> Self {
        let RawRequest {
            id,
            method,
            path,
            queries,
            headers,
            body,
            remote_addr,
        } = raw;
        Self {
            id,
            url: path,
            method,
            path_params,
            queries,
            headers,
            body: RequestBody::new(body),
            received_at: Utc::now(),
            remote_addr,
        }
    }

    /// 追加一个请求头，供请求监听器使用
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.add(name, value);
        self
    }

    /// 追加一个查询参数，供请求监听器使用
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.queries.add(name, value);
        self
    }

    /// 替换某个查询参数的全部取值，供请求监听器使用
    pub fn with_queries(mut self, name: &str, values: Vec<String>) -> Self {
        self.queries.set(name, values);
        self
    }
}

// --- Getter 访问器实现 ---

impl RequestContext {
    /// 请求唯一标识，用于在日志中追踪
    pub fn id(&self) -> u128 {
        self.id
    }

    /// 规范化后的请求路径（不含查询串）
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    pub fn query_params(&self) -> &Queries {
        &self.queries
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn host(&self) -> Option<&str> {
        self.headers.get("Host")
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// 解析 `Cookie` 请求头中的全部键值对
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all("Cookie")
            .iter()
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}
