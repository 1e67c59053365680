// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 查询参数
//!
//! - [`Queries`]：请求携带的查询参数多值映射。
//! - [`QueryDeclaration`]：从路由模式 `?` 之后的部分解析出的「名称 -> 类型」约束。
//!
//! 声明只约束**具名**的查询参数；请求中未声明的参数总是被接受并在匹配时忽略。

use std::collections::HashMap;
use std::sync::Arc;

use crate::exception::Exception;
use crate::matcher::{TypeMatcher, TypeRegistry, STRING};

/// 查询参数多值映射。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queries {
    inner: HashMap<String, Vec<String>>,
}

impl Queries {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析原始查询串（不含 `?`），并进行百分号解码。
    pub fn parse(raw: &str) -> Self {
        let mut queries = Self::new();
        for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            queries.add(&name, &value);
        }
        queries
    }

    /// 仅当该参数恰好有一个值时返回它
    pub fn get_one(&self, name: &str) -> Option<&str> {
        match self.inner.get(name) {
            Some(values) if values.len() == 1 => Some(values[0].as_str()),
            _ => None,
        }
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.inner.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_int(&self, name: &str) -> Result<i64, Exception> {
        let value = self.require(name)?;
        value
            .parse::<i64>()
            .map_err(|e| Exception::parse("query", format!("{}={}: {}", name, value, e)))
    }

    pub fn get_float(&self, name: &str) -> Result<f64, Exception> {
        let value = self.require(name)?;
        value
            .parse::<f64>()
            .map_err(|e| Exception::parse("query", format!("{}={}: {}", name, value, e)))
    }

    fn require(&self, name: &str) -> Result<&str, Exception> {
        self.get_one(name)
            .ok_or_else(|| Exception::parse("query", format!("expected exactly one '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn add(&mut self, name: &str, value: &str) {
        self.inner
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// 替换某参数的全部取值
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        self.inner.insert(name.to_string(), values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// 单条查询约束
#[derive(Debug, Clone)]
pub struct QueryRequirement {
    name: String,
    type_name: String,
    matcher: Arc<TypeMatcher>,
}

impl QueryRequirement {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明时写下的类型名（未知类型仍保留原名，但使用 `string` 匹配器）
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// 路由模式中声明的查询约束，按声明顺序保存。
#[derive(Debug, Clone, Default)]
pub struct QueryDeclaration {
    requirements: Vec<QueryRequirement>,
}

impl QueryDeclaration {
    /// 解析 `name[:type]&name2[:type]...`。
    ///
    /// 缺省类型为 `string`；空条目被忽略；空名称或重复名称视为模式编译错误。
    pub fn parse(
        pattern: &str,
        raw: &str,
        registry: &TypeRegistry,
    ) -> Result<Self, Exception> {
        let mut requirements: Vec<QueryRequirement> = Vec::new();
        for def in raw.split('&').filter(|d| !d.is_empty()) {
            let (name, type_name) = match def.split_once(':') {
                Some((name, tpe)) => (name, tpe),
                None => (def, STRING),
            };
            if name.is_empty() || type_name.is_empty() {
                return Err(Exception::PatternCompile {
                    pattern: pattern.to_string(),
                    reason: format!("malformed query declaration '{}'", def),
                });
            }
            if requirements.iter().any(|r| r.name == name) {
                return Err(Exception::PatternCompile {
                    pattern: pattern.to_string(),
                    reason: format!("query '{}' is declared more than once", name),
                });
            }
            requirements.push(QueryRequirement {
                name: name.to_string(),
                type_name: type_name.to_string(),
                matcher: registry.resolve(type_name),
            });
        }
        Ok(Self { requirements })
    }

    /// 声明的类型名
    pub fn get(&self, name: &str) -> Option<&str> {
        self.requirements
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.type_name.as_str())
    }

    pub fn requirements(&self) -> &[QueryRequirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// 对每个声明的名称：请求中至少有一个非空值，并且**每个**值都满足声明的类型。
    pub fn accepts(&self, queries: &Queries) -> bool {
        self.requirements.iter().all(|req| {
            let values = queries.get_all(&req.name);
            values.iter().any(|v| !v.is_empty()) && values.iter().all(|v| req.matcher.matches(v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(raw: &str) -> QueryDeclaration {
        QueryDeclaration::parse("/test", raw, &TypeRegistry::new()).unwrap()
    }

    #[test]
    fn test_parse_declaration() {
        let decl = declaration("query:string&name&age:int&email");
        assert_eq!(decl.get("query"), Some("string"));
        assert_eq!(decl.get("name"), Some("string"));
        assert_eq!(decl.get("age"), Some("int"));
        assert_eq!(decl.get("email"), Some("string"));
        assert_eq!(decl.get("missing"), None);
        assert_eq!(decl.requirements().len(), 4);
    }

    #[test]
    fn test_accepts_conforming_queries() {
        let decl = declaration("query:string&age:int");
        assert!(decl.accepts(&Queries::parse("query=search&age=23&extra=x")));
    }

    #[test]
    fn test_rejects_non_conforming_type() {
        let decl = declaration("query:string&age:int");
        assert!(!decl.accepts(&Queries::parse("query=search&age=twenty_three")));
    }

    #[test]
    fn test_rejects_missing_declared_query() {
        let decl = declaration("query:string&age:int");
        assert!(!decl.accepts(&Queries::parse("age=23")));
        assert!(!decl.accepts(&Queries::new()));
    }

    #[test]
    fn test_every_value_must_conform() {
        let decl = declaration("uid:int");
        assert!(decl.accepts(&Queries::parse("uid=1&uid=2")));
        assert!(!decl.accepts(&Queries::parse("uid=1&uid=a23")));
    }

    #[test]
    fn test_empty_value_does_not_satisfy_declaration() {
        let decl = declaration("name");
        assert!(!decl.accepts(&Queries::parse("name=")));
    }

    #[test]
    fn test_unknown_type_keeps_name_but_accepts_strings() {
        let decl = declaration("who:person");
        assert_eq!(decl.get("who"), Some("person"));
        assert!(decl.accepts(&Queries::parse("who=john.doe@gmail.com")));
    }

    #[test]
    fn test_duplicate_or_empty_names_fail() {
        let registry = TypeRegistry::new();
        assert!(QueryDeclaration::parse("/p", "a&a:int", &registry).is_err());
        assert!(QueryDeclaration::parse("/p", ":int", &registry).is_err());
        assert!(QueryDeclaration::parse("/p", "a:", &registry).is_err());
    }

    #[test]
    fn test_queries_accessors() {
        let queries = Queries::parse("q=hello%20world&n=42&f=2.5&m=1&m=2");
        assert_eq!(queries.get_one("q"), Some("hello world"));
        assert_eq!(queries.get_int("n").unwrap(), 42);
        assert_eq!(queries.get_float("f").unwrap(), 2.5);
        assert_eq!(queries.get_one("m"), None);
        assert_eq!(queries.get_all("m").len(), 2);
        assert!(queries.get_int("q").unwrap_err().is_parse_error());
        assert!(queries.get_int("absent").is_err());
    }
}
