// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 传输层与路由引擎之间的协作接口。该模块负责将 TCP 流中读取的原始字节
//! 解析为 [`RawRequest`]，它向分发器暴露：
//! 1. 请求方法与规范化后的路径；
//! 2. 查询参数多值映射；
//! 3. 请求头；
//! 4. 完整读取的请求体；
//! 5. 客户端地址。

use bytes::Bytes;
use log::error;
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;

use crate::exception::Exception;
use crate::headers::Headers;
use crate::param::HttpMethod;
use crate::pattern::normalize_path;
use crate::query::Queries;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// 传输层交给分发器的原始请求。
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub(crate) id: u128,
    pub(crate) method: HttpMethod,
    pub(crate) path: String,
    pub(crate) queries: Queries,
    pub(crate) headers: Headers,
    pub(crate) body: Bytes,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl RawRequest {
    /// 由方法与请求目标（路径 + 可选的查询串）构建请求。
    pub fn new(id: u128, method: HttpMethod, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self {
            id,
            method,
            path: normalize_path(&decode_path(path)),
            queries: Queries::parse(query),
            headers: Headers::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// 从原始字节缓冲区尝试构建 `RawRequest`。
    ///
    /// # 逻辑步骤
    /// 1. 定位报文头结束位置，报文头必须是合法的 UTF-8。
    /// 2. 解析请求行：方法、请求目标、协议版本（仅接受 HTTP/1.x）。
    /// 3. 逐行解析请求头。
    /// 4. 根据 `Content-Length` 截取请求体。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let head_end = find_header_end(buffer);
        let head_bytes = &buffer[..head_end.unwrap_or(buffer.len())];
        let head = match std::str::from_utf8(head_bytes) {
            Ok(s) => s,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or("");
        let parts: Vec<&str> = request_line.split(' ').filter(|p| !p.is_empty()).collect();
        if parts.len() != 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        let version = parts[2].to_uppercase();
        if !version.starts_with("HTTP/1.") {
            error!("[ID{}]不支持的HTTP协议版本：{}", id, &version);
            return Err(Exception::UnsupportedHttpVersion);
        }

        let mut request = Self::new(id, HttpMethod::from(parts[0]), parts[1]);
        for line in lines.filter(|l| !l.is_empty()) {
            if let Some((name, value)) = line.split_once(':') {
                request.headers.add(name.trim(), value.trim());
            }
        }

        if let Some(end) = head_end {
            let rest = &buffer[end + HEADER_END.len()..];
            let length = request
                .content_length()
                .unwrap_or(rest.len())
                .min(rest.len());
            request.body = Bytes::copy_from_slice(&rest[..length]);
        }
        Ok(request)
    }

    /// 声明的 `Content-Length`
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .get("Content-Length")
            .and_then(|v| v.trim().parse().ok())
    }
}

/// 逐段解码路径中的百分号转义，非法的 UTF-8 序列以替换字符代替。
fn decode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// 若缓冲区已包含完整的报文头，返回整个请求应有的总字节数（报文头 + 请求体）。
///
/// 报文头尚未读完时返回 `Ok(None)`；声明的长度超出 `usize` 范围时返回
/// `PayloadTooLarge`。
pub fn expected_length(buffer: &[u8]) -> Result<Option<usize>, Exception> {
    let end = match find_header_end(buffer) {
        Some(end) => end,
        None => return Ok(None),
    };
    let head = String::from_utf8_lossy(&buffer[..end]);
    let body_length = head
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    (end + HEADER_END.len())
        .checked_add(body_length)
        .map(Some)
        .ok_or(Exception::PayloadTooLarge)
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(HEADER_END.len())
        .position(|window| window == HEADER_END)
}

// --- Getter 访问器实现 ---

impl RawRequest {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// 规范化后的请求路径（不含查询串）
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}
