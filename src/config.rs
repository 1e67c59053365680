// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};

use crate::exception::Exception;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    port: u16,
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_read_buffer_size")]
    read_buffer_size: usize,
    #[serde(default = "default_max_body_size")]
    max_body_size: usize,
    /// 服务器级请求超时，0 表示不设置
    #[serde(default)]
    request_timeout_ms: u64,
}

fn default_read_buffer_size() -> usize {
    4096 // 4KB
}

fn default_max_body_size() -> usize {
    2097152 // 2MB
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 7878,
            local: true,
            worker_threads: 0,
            read_buffer_size: default_read_buffer_size(),
            max_body_size: default_max_body_size(),
            request_timeout_ms: 0,
        }
    }

    /// 从 TOML 文件读取配置。
    ///
    /// 文件无法读取时返回错误；内容无法解析时记录日志并回退为默认配置。
    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let content = fs::read_to_string(filename)
            .map_err(|e| Exception::Config(format!("no such file {}: {}", filename, e)))?;
        Ok(Self::from_toml_str(&content))
    }

    pub fn from_toml_str(content: &str) -> Self {
        let mut config = match toml::from_str::<Config>(content) {
            Ok(c) => c,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if config.worker_threads == 0 {
            config.worker_threads = num_cpus::get();
        }
        if config.read_buffer_size == 0 {
            warn!("read_buffer_size被设置为0，该值将被改为{}。", default_read_buffer_size());
            config.read_buffer_size = default_read_buffer_size();
        }
        config
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    /// `local` 为真时只监听回环地址
    pub fn socket_addr(&self) -> SocketAddrV4 {
        let address = match self.local {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        SocketAddrV4::new(address, self.port)
    }
}
