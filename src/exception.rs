// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了路由引擎从注册期到请求处理期可能产生的全部异常。
//!
//! ## 分类
//! - **注册期异常**：模式编译失败、类型注册失败、配置加载失败。这些异常会中止启动。
//! - **请求期异常**：处理器失败、请求体解析失败、实体序列化失败。分发器总会把它们恢复为一个 `Response`，
//!   不会有任何异常逃逸到传输层。
//! - **传输层异常**：原始字节流无法解析为合法的 HTTP 请求，由连接处理器直接回写 400。

use thiserror::Error;

/// 路由引擎处理过程中发生的异常类型。
#[derive(Debug, Clone, Error)]
pub enum Exception {
    /// 路径模式无法编译为匹配器。注册期致命错误。
    #[error("could not compile '{pattern}' as a valid uri pattern: {reason}")]
    PatternCompile { pattern: String, reason: String },
    /// 同一个路径模式中出现了重名的路径参数。
    #[error("path parameter '{name}' is declared more than once in '{pattern}'")]
    DuplicatePathParameter { pattern: String, name: String },
    /// 试图覆盖内置类型（int、float、string、uuid）。
    #[error("type '{0}' is built-in and cannot be overwritten")]
    BuiltinTypeOverwrite(String),
    /// 自定义类型已经注册过，注册表不允许覆盖。
    #[error("type '{0}' is already registered")]
    TypeAlreadyRegistered(String),
    /// 类型名不是合法的标识符。
    #[error("'{0}' is not a valid type name")]
    InvalidTypeName(String),
    /// 自定义类型的原始模式无法编译。
    #[error("could not compile pattern of type '{name}': {reason}")]
    InvalidTypePattern { name: String, reason: String },
    /// 请求体或查询参数无法按照期望的格式解析，默认错误处理器将其映射为 400。
    #[error("malformed {format} context, {details}")]
    Parse { format: String, details: String },
    /// 无法从请求中读取数据。
    #[error("could not read from request, {0}")]
    MalformedRequest(String),
    /// 处理器主动返回的失败。
    #[error("handler failed: {0}")]
    Handler(String),
    /// 处理器在执行过程中 panic。
    #[error("handler panicked: {0}")]
    Panicked(String),
    /// 响应实体无法序列化为字节。
    #[error("could not encode response entity: {0}")]
    Encoding(String),
    /// 配置文件无法读取。
    #[error("configuration error: {0}")]
    Config(String),
    /// 底层 I/O 错误。
    #[error("io error: {0}")]
    Io(String),
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    #[error("Request bytes can't be parsed in UTF-8")]
    RequestIsNotUtf8,
    /// 请求行格式不正确。
    #[error("Malformed request line")]
    MalformedRequestLine,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    #[error("Unsupported HTTP version")]
    UnsupportedHttpVersion,
    /// 请求体超过了配置的上限。
    #[error("Payload too large")]
    PayloadTooLarge,
}

impl Exception {
    /// 构造一个解析错误。
    pub fn parse(format: &str, details: impl ToString) -> Self {
        Exception::Parse {
            format: format.to_string(),
            details: details.to_string(),
        }
    }

    /// 是否属于 400 类的解析错误。
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Exception::Parse { .. } | Exception::MalformedRequest(_))
    }
}

impl From<serde_json::Error> for Exception {
    fn from(e: serde_json::Error) -> Self {
        Exception::parse("JSON", e)
    }
}

impl From<quick_xml::DeError> for Exception {
    fn from(e: quick_xml::DeError) -> Self {
        Exception::parse("XML", e)
    }
}

impl From<std::io::Error> for Exception {
    fn from(e: std::io::Error) -> Self {
        Exception::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_family() {
        assert!(Exception::parse("JSON", "eof").is_parse_error());
        assert!(Exception::MalformedRequest("closed".into()).is_parse_error());
        assert!(!Exception::Handler("boom".into()).is_parse_error());
        assert!(!Exception::Panicked("boom".into()).is_parse_error());
    }

    #[test]
    fn test_display() {
        let e = Exception::parse("JSON", "expected value");
        assert_eq!(e.to_string(), "malformed JSON context, expected value");
        let e = Exception::BuiltinTypeOverwrite("int".into());
        assert_eq!(e.to_string(), "type 'int' is built-in and cannot be overwritten");
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: Exception = err.into();
        assert!(matches!(e, Exception::Parse { ref format, .. } if format == "JSON"));
    }
}
