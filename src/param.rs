// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了路由引擎使用的 HTTP 协议常量和数据结构，包括：
//! - 常见的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 文件扩展名到 MIME 类型的映射表，用于文件实体的 `Content-Type` 推断。
//! - HTTP 方法的强类型表示。

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "webrouter";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_XML: &str = "application/xml";
pub const TEXT_PLAIN: &str = "text/plain";

/// 无法识别扩展名时使用的兜底类型
pub const OCTET_STREAM: &str = "application/octet-stream";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(100, "Continue");
        map.insert(101, "Switching Protocols");

        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(204, "No Content");
        map.insert(206, "Partial Content");

        map.insert(300, "Multiple Choices");
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(303, "See Other");
        map.insert(304, "Not Modified");
        map.insert(307, "Temporary Redirect");
        map.insert(308, "Permanent Redirect");

        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(406, "Not Acceptable");
        map.insert(408, "Request Timeout");
        map.insert(409, "Conflict");
        map.insert(410, "Gone");
        map.insert(413, "Content Too Large");
        map.insert(414, "URI Too Long");
        map.insert(415, "Unsupported Media Type");
        map.insert(422, "Unprocessable Content");
        map.insert(429, "Too Many Requests");

        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(502, "Bad Gateway");
        map.insert(503, "Service Unavailable");
        map.insert(504, "Gateway Timeout");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件后缀名到 MIME 类型的映射表。
    ///
    /// 文件实体依据该表填写 `Content-Type`，未收录的后缀回退为 [`OCTET_STREAM`]。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("css", "text/css;charset=utf-8");
        map.insert("csv", "text/csv");
        map.insert("gif", "image/gif");
        map.insert("htm", "text/html;charset=utf-8");
        map.insert("html", "text/html;charset=utf-8");
        map.insert("ico", "image/x-icon");
        map.insert("jpeg", "image/jpeg");
        map.insert("jpg", "image/jpeg");
        map.insert("js", "text/javascript;charset=utf-8");
        map.insert("json", "application/json");
        map.insert("mp3", "audio/mpeg");
        map.insert("mp4", "video/mp4");
        map.insert("mpeg", "video/mpeg");
        map.insert("pdf", "application/pdf");
        map.insert("png", "image/png");
        map.insert("ppt", "application/vnd.ms-powerpoint");
        map.insert("rar", "application/vnd.rar");
        map.insert("svg", "image/svg+xml");
        map.insert("txt", "text/plain");
        map.insert("wasm", "application/wasm");
        map.insert("wav", "audio/wav");
        map.insert("webp", "image/webp");
        map.insert("xml", "application/xml");
        map.insert("zip", "application/zip");
        map
    };
}

/// 根据状态码查询原因短语，未收录的状态码返回空串。
pub fn reason_phrase(code: u16) -> &'static str {
    STATUS_CODES.get(&code).copied().unwrap_or("")
}

/// 根据文件扩展名（不区分大小写）推断 MIME 类型。
pub fn mime_for_extension(extension: &str) -> &'static str {
    MIME_TYPES
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(OCTET_STREAM)
}

/// HTTP 请求方法。
///
/// 常用方法有独立的变体，其余方法以大写字符串保存在 `Other` 中。
/// 方法比较是精确的：`Get` 与 `Other("GET")` 不会同时出现，因为 [`HttpMethod::from`] 总会先归一化。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Put,
    Post,
    Delete,
    Patch,
    Options,
    Other(String),
}

impl From<&str> for HttpMethod {
    fn from(token: &str) -> Self {
        match token.to_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "PUT" => HttpMethod::Put,
            "POST" => HttpMethod::Post,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "OPTIONS" => HttpMethod::Options,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Head => write!(f, "HEAD"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Delete => write!(f, "DELETE"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Options => write!(f, "OPTIONS"),
            HttpMethod::Other(m) => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_token() {
        assert_eq!(HttpMethod::from("get"), HttpMethod::Get);
        assert_eq!(HttpMethod::from("PATCH"), HttpMethod::Patch);
        assert_eq!(
            HttpMethod::from("purge"),
            HttpMethod::Other("PURGE".to_string())
        );
    }

    #[test]
    fn test_method_display() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!(HttpMethod::from("link").to_string(), "LINK");
    }

    #[test]
    fn test_reason_phrase() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(408), "Request Timeout");
        assert_eq!(reason_phrase(999), "");
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("html"), "text/html;charset=utf-8");
        assert_eq!(mime_for_extension("PNG"), "image/png");
        assert_eq!(mime_for_extension("unknown_extension"), OCTET_STREAM);
    }
}
