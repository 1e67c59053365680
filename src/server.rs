// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 服务器
//!
//! [`Server`] 收集自定义类型、控制器、服务器级监听器与中断，启动时转换为只读的 [`Dispatcher`]。
//! 内置的 TCP 服务基于 Tokio：每个连接一个任务，读取完整请求后分发，响应写出后关闭连接。

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::Config;
use crate::context::RequestContext;
use crate::controller::Controller;
use crate::dispatcher::{default_error_handler, default_not_found, Dispatcher};
use crate::encoder::{encode, WireResponse};
use crate::exception::Exception;
use crate::interrupt::{Interrupt, TimeoutInterrupt};
use crate::listener::{ErrorHandler, JourneyListener, RequestListener, ResponseListener};
use crate::matcher::TypeRegistry;
use crate::request::{expected_length, RawRequest};
use crate::response::{Entity, FailureMessage, Response};
use crate::route::{handler, Handler};
use crate::router::RouteTable;

/// 报文头允许占用的最大字节数
const MAX_HEAD_SIZE: usize = 65536;

pub struct Server {
    config: Config,
    registry: TypeRegistry,
    routes: RouteTable,
    request_listeners: Vec<RequestListener>,
    response_listeners: Vec<ResponseListener>,
    journey_listeners: Vec<JourneyListener>,
    interrupts: Vec<Arc<dyn Interrupt>>,
    not_found: Handler,
    error_handler: ErrorHandler,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// 以配置创建服务器。`request_timeout_ms` 大于 0 时注册一个服务器级超时中断。
    pub fn with_config(config: Config) -> Self {
        let timeout = config.request_timeout_ms();
        let mut server = Self {
            config,
            registry: TypeRegistry::new(),
            routes: RouteTable::new(),
            request_listeners: Vec::new(),
            response_listeners: Vec::new(),
            journey_listeners: Vec::new(),
            interrupts: Vec::new(),
            not_found: default_not_found(),
            error_handler: default_error_handler(),
        };
        if timeout > 0 {
            server.set_timeout(Duration::from_millis(timeout));
        }
        server
    }

    /// 注册自定义类型。必须在使用该类型的控制器注册之前调用。
    pub fn register_type(&mut self, name: &str, pattern: &str) -> Result<&mut Self, Exception> {
        self.registry.register(name, pattern)?;
        Ok(self)
    }

    /// 编译并挂载控制器，模式错误在此处返回。
    pub fn register(&mut self, controller: Controller) -> Result<&mut Self, Exception> {
        self.routes.mount(controller, &self.registry)?;
        Ok(self)
    }

    pub fn add_request_listener<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(RequestContext) -> RequestContext + Send + Sync + 'static,
    {
        self.request_listeners.push(Arc::new(listener));
        self
    }

    pub fn add_response_listener<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.response_listeners.push(Arc::new(listener));
        self
    }

    pub fn add_response_listener_arc(&mut self, listener: ResponseListener) -> &mut Self {
        self.response_listeners.push(listener);
        self
    }

    pub fn add_journey_listener<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&RequestContext, &Response) + Send + Sync + 'static,
    {
        self.journey_listeners.push(Arc::new(listener));
        self
    }

    pub fn add_journey_listener_arc(&mut self, listener: JourneyListener) -> &mut Self {
        self.journey_listeners.push(listener);
        self
    }

    pub fn add_interrupt(&mut self, interrupt: impl Interrupt + 'static) -> &mut Self {
        self.interrupts.push(Arc::new(interrupt));
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.add_interrupt(TimeoutInterrupt::new(timeout))
    }

    pub fn not_found_handler<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response, Exception>> + Send + 'static,
    {
        self.not_found = handler(f);
        self
    }

    pub fn error_handler<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&RequestContext, &Exception) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(f);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(self.routes)
            .with_scope(
                self.request_listeners,
                self.response_listeners,
                self.journey_listeners,
                self.interrupts,
            )
            .with_handlers(self.not_found, self.error_handler)
    }

    /// 绑定配置中的地址并开始服务
    pub async fn serve(self) -> Result<(), Exception> {
        let address = self.config.socket_addr();
        let listener = match TcpListener::bind(address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定地址：{}，错误：{}", address, e);
                return Err(e.into());
            }
        };
        info!("地址{}绑定完成", address);
        self.serve_listener(listener).await
    }

    /// 在已绑定的监听器上运行主事件循环
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), Exception> {
        let config = Arc::new(self.config.clone());
        let dispatcher = Arc::new(self.into_dispatcher());
        info!("路由表共{}条路由，开始接收连接", dispatcher.routes().len());

        let mut id: u128 = 0;
        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("接收TCP连接失败：{}", e);
                    continue;
                }
            };
            debug!("[ID{}]TCP连接已建立：{}", id, addr);

            let dispatcher = Arc::clone(&dispatcher);
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                handle_connection(stream, addr, id, dispatcher, config).await;
            });
            id += 1;
        }
    }
}

/// # 连接处理器
///
/// 读取完整请求，解析失败时直接返回 400 或 413，否则交给分发器。
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    id: u128,
    dispatcher: Arc<Dispatcher>,
    config: Arc<Config>,
) {
    let mut wire = WireResponse::new();
    match read_request(&mut stream, id, &config).await {
        Ok(Some(buffer)) => match RawRequest::try_from(&buffer, id) {
            Ok(raw) => {
                debug!("[ID{}]成功解析HTTP请求", id);
                dispatcher.handle(raw.with_remote_addr(addr), &mut wire).await;
            }
            Err(e) => {
                warn!("[ID{}]解析HTTP请求失败：{}，返回400", id, e);
                encode(&transport_failure(400, "bad request"), &mut wire, id);
            }
        },
        Ok(None) => {
            debug!("[ID{}]客户端未发送数据即关闭连接", id);
            return;
        }
        Err(Exception::PayloadTooLarge) => {
            warn!("[ID{}]请求超过{}字节上限，返回413", id, config.max_body_size());
            encode(&transport_failure(413, "payload too large"), &mut wire, id);
        }
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误：{}", id, e);
            return;
        }
    }

    let bytes = wire.as_bytes();
    debug!("[ID{}]发送响应，长度：{}", id, bytes.len());
    if let Err(e) = stream.write_all(&bytes).await {
        error!("[ID{}]发送响应失败：{}", id, e);
        return;
    }
    let _ = stream.flush().await;
}

/// 读取直到得到完整的报文头与 `Content-Length` 声明的请求体
async fn read_request(
    stream: &mut TcpStream,
    id: u128,
    config: &Config,
) -> Result<Option<Vec<u8>>, Exception> {
    let mut buffer = Vec::new();
    let mut chunk = vec![0u8; config.read_buffer_size()];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(if buffer.is_empty() { None } else { Some(buffer) });
        }
        buffer.extend_from_slice(&chunk[..n]);
        match expected_length(&buffer)? {
            Some(total) => {
                if total > config.max_body_size() + MAX_HEAD_SIZE {
                    return Err(Exception::PayloadTooLarge);
                }
                if buffer.len() >= total {
                    debug!("[ID{}]HTTP请求接收完毕，共{}字节", id, buffer.len());
                    return Ok(Some(buffer));
                }
            }
            None if buffer.len() > MAX_HEAD_SIZE => return Err(Exception::PayloadTooLarge),
            None => {}
        }
    }
}

fn transport_failure(status_code: u16, message: &str) -> Response {
    Response::new(
        status_code,
        Entity::json(FailureMessage {
            status_code,
            path: String::new(),
            message: message.to_string(),
            method: String::new(),
        }),
    )
}
