// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 报文头多值映射
//!
//! 请求与响应共用的 Header 容器：保持插入顺序，字段名大小写不敏感，同名字段可以有多个值。

/// 有序、大小写不敏感的 Header 多值映射。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取某字段的第一个值
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 获取某字段的全部值，按插入顺序排列
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// 追加一个值，不影响已有的同名字段
    pub fn add(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    /// 替换某字段的全部值
    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.add(name, value);
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 将另一个映射的所有字段追加进来
    pub fn extend(&mut self, other: &Headers) {
        self.entries.extend(other.entries.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert!(headers.contains("CONTENT-TYPE"));
        assert_eq!(headers.get("accept"), None);
    }

    #[test]
    fn test_multi_values_keep_order() {
        let mut headers = Headers::new();
        headers.add("X-Trace", "a");
        headers.add("x-trace", "b");
        assert_eq!(headers.get_all("X-TRACE"), vec!["a", "b"]);
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_set_replaces_all_values() {
        let mut headers = Headers::new();
        headers.add("X-Trace", "a");
        headers.add("X-Trace", "b");
        headers.set("x-trace", "c");
        assert_eq!(headers.get_all("X-Trace"), vec!["c"]);
    }
}
