// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 中断
//!
//! 中断与处理器并发运行，可以向共享的通道发布一个替代响应。
//! 分发器只采用最先到达的结果，其余结果被丢弃，但不会取消仍在运行的处理器或中断。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use tokio::sync::mpsc::Sender;

use crate::context::RequestContext;
use crate::response::{Entity, Response};

#[async_trait]
pub trait Interrupt: Send + Sync {
    /// 针对一个请求触发中断。需要抢先返回时，向 `complete_with` 发送响应；
    /// 发送失败说明竞争已经结束，直接忽略即可。
    async fn trigger_for(&self, request: Arc<RequestContext>, complete_with: Sender<Response>);
}

/// 超时中断：到期后发布 408 响应。
#[derive(Debug, Clone, Copy)]
pub struct TimeoutInterrupt {
    timeout: Duration,
}

impl TimeoutInterrupt {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

pub fn request_timeout_response() -> Response {
    Response::request_timeout(Entity::text("408 - request timed out"))
}

#[async_trait]
impl Interrupt for TimeoutInterrupt {
    async fn trigger_for(&self, request: Arc<RequestContext>, complete_with: Sender<Response>) {
        tokio::time::sleep(self.timeout).await;
        if complete_with.send(request_timeout_response()).await.is_ok() {
            warn!(
                "[ID{}]请求处理超过 {}ms，已中断",
                request.id(),
                self.timeout.as_millis()
            );
        }
    }
}
