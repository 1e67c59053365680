// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 类型匹配器注册表
//!
//! 路径参数与查询参数都通过「类型名」约束取值，例如 `$id:int` 或 `?age:int`。
//! 每个类型名对应一个 [`TypeMatcher`]，它同时提供：
//! 1. 一个整串锚定的校验器，用于校验查询参数的取值；
//! 2. 一个去掉锚点的正则片段，用于嵌入路由模式编译出的整体正则。
//!
//! 注册表在启动阶段构建，之后只读，通过 `Arc` 显式传递给使用者，不存在隐式的全局状态。

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::exception::Exception;

pub const INT: &str = "int";
pub const FLOAT: &str = "float";
pub const STRING: &str = "string";
pub const UUID: &str = "uuid";

const INT_PATTERN: &str = r"[+\-]?\d+";
const FLOAT_PATTERN: &str = r"[+\-]?(?:(?:0|[1-9]\d*)(?:\.\d*)?|\.\d+)(?:[eE][+\-]?\d+)?";
const STRING_PATTERN: &str = r"[^/?]+";
const UUID_PATTERN: &str =
    r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";

lazy_static! {
    static ref TYPE_NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
    static ref BUILTINS: Vec<Arc<TypeMatcher>> = [
        (INT, INT_PATTERN),
        (FLOAT, FLOAT_PATTERN),
        (STRING, STRING_PATTERN),
        (UUID, UUID_PATTERN),
    ]
    .iter()
    .map(|(name, raw)| Arc::new(TypeMatcher::compile(name, raw).unwrap()))
    .collect();
}

/// 一个具名的取值校验器。注册后不可变。
#[derive(Debug)]
pub struct TypeMatcher {
    name: String,
    raw: String,
    fragment: String,
    validator: Regex,
}

impl TypeMatcher {
    fn compile(name: &str, raw: &str) -> Result<Self, regex::Error> {
        let fragment = strip_anchors(raw).to_string();
        // 片段会被原样嵌入路由正则，括号必须自身平衡
        Regex::new(&fragment)?;
        let validator = Regex::new(&format!("^(?:{})$", fragment))?;
        Ok(Self {
            name: name.to_string(),
            raw: raw.to_string(),
            fragment,
            validator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 注册时提供的原始模式
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 可嵌入路由正则的片段（已去除首尾锚点）
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// 判断取值是否完整匹配该类型
    pub fn matches(&self, value: &str) -> bool {
        self.validator.is_match(value)
    }
}

/// 去掉一个前导 `^` 和一个未被转义的尾部 `$`。
fn strip_anchors(raw: &str) -> &str {
    let mut s = raw.strip_prefix('^').unwrap_or(raw);
    if let Some(body) = s.strip_suffix('$') {
        let escapes = body.chars().rev().take_while(|c| *c == '\\').count();
        if escapes % 2 == 0 {
            s = body;
        }
    }
    s
}

/// 类型匹配器注册表。
///
/// 内置 `int`、`float`、`string`、`uuid` 四种类型；注册表只增不减，
/// 未知类型名在解析时回退到宽松的 `string` 匹配器。
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    matchers: HashMap<String, Arc<TypeMatcher>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let matchers = BUILTINS
            .iter()
            .map(|m| (m.name().to_string(), Arc::clone(m)))
            .collect();
        Self { matchers }
    }

    /// 注册一个自定义类型。
    ///
    /// # 错误
    /// - 类型名是内置类型：`BuiltinTypeOverwrite`
    /// - 类型名已被注册：`TypeAlreadyRegistered`
    /// - 类型名不合法：`InvalidTypeName`
    /// - 模式无法编译：`InvalidTypePattern`
    ///
    /// 任何失败都不会修改注册表。
    pub fn register(&mut self, name: &str, raw_pattern: &str) -> Result<(), Exception> {
        if Self::is_builtin(name) {
            warn!("试图覆盖内置类型：{}", name);
            return Err(Exception::BuiltinTypeOverwrite(name.to_string()));
        }
        if !TYPE_NAME.is_match(name) {
            return Err(Exception::InvalidTypeName(name.to_string()));
        }
        if self.matchers.contains_key(name) {
            return Err(Exception::TypeAlreadyRegistered(name.to_string()));
        }
        let matcher =
            TypeMatcher::compile(name, raw_pattern).map_err(|e| Exception::InvalidTypePattern {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        debug!("注册自定义类型 {} -> {}", name, raw_pattern);
        self.matchers.insert(name.to_string(), Arc::new(matcher));
        Ok(())
    }

    /// 按名称解析匹配器，未知名称回退到 `string`。
    pub fn resolve(&self, name: &str) -> Arc<TypeMatcher> {
        match self.matchers.get(name) {
            Some(m) => Arc::clone(m),
            None => {
                debug!("未注册的类型 {}，回退为 string", name);
                self.default_matcher()
            }
        }
    }

    /// 宽松的默认匹配器（`string`）
    pub fn default_matcher(&self) -> Arc<TypeMatcher> {
        Arc::clone(&BUILTINS[2])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.matchers.contains_key(name)
    }

    pub fn is_builtin(name: &str) -> bool {
        matches!(name, INT | FLOAT | STRING | UUID)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
