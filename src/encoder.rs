// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 响应编码器
//!
//! 将 [`Response`] 写入传输层提供的 [`ResponseSink`]。
//!
//! ## 写入顺序
//! 1. 重定向（3xx）：实体内容作为 `Location`，随后写状态码，响应体为空。
//! 2. 其他响应：先序列化实体。序列化失败时丢弃原响应，改写为固定的 500 JSON 响应，
//!    此时原响应的 Cookie 与响应头不会写出。
//! 3. 序列化成功：写响应头与 `Set-Cookie`，缺失时补充 `Content-Type`，然后写状态码与响应体。
//!
//! 写出的响应头名与值都会去掉其中的 `\r`、`\n`，防止响应拆分。

use std::borrow::Cow;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, error};

use crate::exception::Exception;
use crate::headers::Headers;
use crate::param::{reason_phrase, APPLICATION_JSON, CONTENT_TYPE, CRLF, SERVER_NAME};
use crate::response::Response;

const INTERNAL_ERROR_BODY: &[u8] = br#"{"message":"internal server error"}"#;

/// 传输层的响应写入接口
#[cfg_attr(test, mockall::automock)]
pub trait ResponseSink {
    fn set_header(&mut self, name: &str, value: &str);
    fn write_status(&mut self, status_code: u16);
    fn write_body(&mut self, body: &[u8]);
}

/// 编码响应，返回实际写出的状态码。
pub fn encode(response: &Response, sink: &mut dyn ResponseSink, id: u128) -> u16 {
    encode_body(response, response.entity().bytes(), sink, id)
}

/// 使用已经取得的实体字节编码响应
pub(crate) fn encode_body(
    response: &Response,
    body: Result<Bytes, Exception>,
    sink: &mut dyn ResponseSink,
    id: u128,
) -> u16 {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            error!("[ID{}]响应实体序列化失败：{}", id, e);
            return write_internal_error(sink);
        }
    };

    write_headers(response, sink);
    let status_code = response.status_code();
    if response.is_redirection() {
        let location = String::from_utf8_lossy(&body);
        debug!("[ID{}]重定向至 {}", id, location);
        set_header(sink, "Location", &location);
        sink.write_status(status_code);
        sink.write_body(&[]);
        return status_code;
    }

    if !response.headers().contains(CONTENT_TYPE) {
        set_header(sink, CONTENT_TYPE, response.entity().content_type());
    }
    sink.write_status(status_code);
    sink.write_body(&body);
    status_code
}

fn write_headers(response: &Response, sink: &mut dyn ResponseSink) {
    for (name, value) in response.headers().iter() {
        set_header(sink, name, value);
    }
    for cookie in response.cookies() {
        set_header(sink, "Set-Cookie", &cookie.to_header_value());
    }
}

fn set_header(sink: &mut dyn ResponseSink, name: &str, value: &str) {
    sink.set_header(&strip_line_breaks(name), &strip_line_breaks(value));
}

fn strip_line_breaks(s: &str) -> Cow<'_, str> {
    if s.contains(['\r', '\n']) {
        Cow::Owned(s.chars().filter(|c| !matches!(c, '\r' | '\n')).collect())
    } else {
        Cow::Borrowed(s)
    }
}

fn write_internal_error(sink: &mut dyn ResponseSink) -> u16 {
    sink.set_header(CONTENT_TYPE, APPLICATION_JSON);
    sink.write_status(500);
    sink.write_body(INTERNAL_ERROR_BODY);
    500
}

/// 渲染为 HTTP/1.1 报文的响应写入器，供内置的 TCP 服务使用。
#[derive(Debug, Clone)]
pub struct WireResponse {
    status_code: u16,
    headers: Headers,
    body: Bytes,
    date: DateTime<Utc>,
}

impl Default for WireResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl WireResponse {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: Headers::new(),
            body: Bytes::new(),
            date: Utc::now(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 生成完整的响应报文：状态行、响应头、空行、响应体。
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}{}",
            self.status_code,
            reason_phrase(self.status_code),
            CRLF
        );
        for (name, value) in self.headers.iter() {
            head.push_str(&format!("{}: {}{}", name, value, CRLF));
        }
        head.push_str(&format!("Content-Length: {}{}", self.body.len(), CRLF));
        head.push_str(&format!("Date: {}{}", self.date.to_rfc2822(), CRLF));
        head.push_str(&format!("Server: {}{}", SERVER_NAME, CRLF));
        head.push_str(&format!("Connection: close{}", CRLF));
        head.push_str(CRLF);

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

impl ResponseSink for WireResponse {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.add(name, value);
    }

    fn write_status(&mut self, status_code: u16) {
        self.status_code = status_code;
    }

    fn write_body(&mut self, body: &[u8]) {
        self.body = Bytes::copy_from_slice(body);
    }
}
