// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模式编译器
//!
//! 将形如 `/users/$name:string/purchases/$id:int?age:int` 的模式编译为一个整体正则。
//!
//! ## 编译步骤
//! 1. 以第一个 `?` 切分，前半部分为路径模式，后半部分交给 [`QueryDeclaration`](crate::query::QueryDeclaration)。
//! 2. 规范化路径并按 `/` 切分为段。
//! 3. 字面量段做正则转义；`$name` 或 `$name:type` 段从注册表查找类型，嵌入为命名捕获组。
//!    未知类型静默回退为 `string`。
//! 4. 以 `/` 拼接各段片段，首尾锚定，并追加一个可选的「忽略尾部查询串」分组。
//!
//! 编译失败只会发生在注册期，不会出现在请求期。

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::context::PathParams;
use crate::exception::Exception;
use crate::matcher::{TypeMatcher, TypeRegistry, STRING};

const GROUP_PREFIX: &str = "__p";
const IGNORE_QUERY: &str = r"(?:\?.*)?";

lazy_static! {
    static ref PARAM_TOKEN: Regex =
        Regex::new(r"^\$([A-Za-z0-9_-]+)(?::([A-Za-z][A-Za-z0-9_]*))?$").unwrap();
}

/// 规范化路径：保证以 `/` 开头，合并连续的 `/`，去掉末尾的 `/`（根路径除外）。
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// 以第一个 `?` 切分模式，返回（路径部分，查询声明部分）。
pub fn split_query(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    }
}

/// 路径参数声明
#[derive(Debug, Clone)]
pub struct PathParameter {
    name: String,
    type_name: String,
    matcher: Arc<TypeMatcher>,
}

impl PathParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// 实际生效的匹配器（未知类型时为 `string`）
    pub fn matcher(&self) -> &TypeMatcher {
        &self.matcher
    }
}

/// 编译后的路由模式
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    path: String,
    regex: Regex,
    params: Vec<PathParameter>,
}

impl RoutePattern {
    /// 编译模式，匹配时忽略尾部查询串。
    pub fn compile(raw: &str, registry: &TypeRegistry) -> Result<Self, Exception> {
        Self::compile_with(raw, registry, true)
    }

    pub fn compile_with(
        raw: &str,
        registry: &TypeRegistry,
        ignore_trailing_query: bool,
    ) -> Result<Self, Exception> {
        let (path, _) = split_query(raw);
        let path = normalize_path(path);
        let mut fragments = Vec::new();
        let mut params: Vec<PathParameter> = Vec::new();

        for segment in path.split('/') {
            if !segment.starts_with('$') {
                fragments.push(regex::escape(segment));
                continue;
            }
            let caps = PARAM_TOKEN
                .captures(segment)
                .ok_or_else(|| Exception::PatternCompile {
                    pattern: raw.to_string(),
                    reason: format!("malformed parameter token '{}'", segment),
                })?;
            let name = &caps[1];
            let type_name = caps.get(2).map_or(STRING, |m| m.as_str());
            if params.iter().any(|p| p.name == name) {
                return Err(Exception::DuplicatePathParameter {
                    pattern: raw.to_string(),
                    name: name.to_string(),
                });
            }
            let matcher = registry.resolve(type_name);
            fragments.push(format!(
                "(?P<{}{}>{})",
                GROUP_PREFIX,
                params.len(),
                matcher.fragment()
            ));
            params.push(PathParameter {
                name: name.to_string(),
                type_name: type_name.to_string(),
                matcher,
            });
        }

        let suffix = if ignore_trailing_query { IGNORE_QUERY } else { "" };
        let source = format!("^{}{}$", fragments.join("/"), suffix);
        let regex = Regex::new(&source).map_err(|e| Exception::PatternCompile {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            raw: raw.to_string(),
            path,
            regex,
            params,
        })
    }

    /// 完整匹配 URI，成功时返回按声明顺序排列的路径参数。
    pub fn matches(&self, uri: &str) -> Option<PathParams> {
        let caps = self.regex.captures(uri)?;
        let mut pairs = Vec::with_capacity(self.params.len());
        for (i, param) in self.params.iter().enumerate() {
            let group = format!("{}{}", GROUP_PREFIX, i);
            let value = caps.name(&group).map_or("", |m| m.as_str());
            pairs.push((param.name.clone(), value.to_string()));
        }
        Some(PathParams::from(pairs))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 规范化后的路径部分
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &[PathParameter] {
        &self.params
    }

    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }
}
