// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 上下文
//!
//! 一次请求的处理现场：已解析的请求、正在构建的响应头部、连接的输出流以及请求级的取消信号。
//! 响应头在第一次写响应体（或显式调用 `send_headers`）时发出，之后不能再修改。
//! 未设置 `Content-Length` 的响应使用分块传输，分帧由上下文负责。

use std::io;

use bytes::Bytes;
use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::param::{HttpRequestMethod, CRLF};
use crate::request::Request;
use crate::response::Response;
use crate::util::HtmlBuilder;

/// 一个完整的、体积很小的状态页响应（404、405、406 等）
#[derive(Debug, Clone)]
pub struct StatusResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StatusResponse {
    pub fn html(status: u16, note: Option<&str>) -> Self {
        Self {
            status,
            content_type: "text/html;charset=utf-8".to_string(),
            headers: Vec::new(),
            body: Bytes::from(HtmlBuilder::from_status_code(status, note).build()),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

pub struct HttpContext<W> {
    id: u128,
    request: Request,
    response: Response,
    writer: W,
    headers_sent: bool,
    cancel: CancellationToken,
}

impl<W: AsyncWrite + Unpin + Send> HttpContext<W> {
    pub fn new(id: u128, request: Request, writer: W, cancel: CancellationToken) -> Self {
        Self {
            id,
            request,
            response: Response::new(),
            writer,
            headers_sent: false,
            cancel,
        }
    }

    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// 响应头发出之后的修改不会生效
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// HEAD 请求和 304 响应都不能携带响应体
    fn body_allowed(&self) -> bool {
        self.request.method() != HttpRequestMethod::Head && self.response.status_code() != 304
    }

    fn check_cancelled(&self) -> io::Result<()> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "request cancelled"));
        }
        Ok(())
    }

    /// 发出状态行和响应头；重复调用不会重复发送
    pub async fn send_headers(&mut self) -> io::Result<()> {
        if self.headers_sent {
            return Ok(());
        }
        self.check_cancelled()?;
        self.headers_sent = true;
        let head = self.response.head_bytes();
        self.writer.write_all(&head).await
    }

    /// 写入一段响应体，必要时先发出响应头
    pub async fn write_body(&mut self, data: &[u8]) -> io::Result<()> {
        self.send_headers().await?;
        if data.is_empty() || !self.body_allowed() {
            return Ok(());
        }
        self.check_cancelled()?;
        if self.response.is_chunked() {
            let size = format!("{:x}{}", data.len(), CRLF);
            self.writer.write_all(size.as_bytes()).await?;
            self.writer.write_all(data).await?;
            self.writer.write_all(CRLF.as_bytes()).await
        } else {
            self.writer.write_all(data).await
        }
    }

    /// 结束响应：补发响应头，写出分块传输的结束块并刷新输出流
    pub async fn finish(&mut self) -> io::Result<()> {
        self.send_headers().await?;
        if self.response.is_chunked() && self.body_allowed() {
            self.writer.write_all(["0", CRLF, CRLF].concat().as_bytes()).await?;
        }
        self.writer.flush().await
    }

    /// 用一个完整的状态页替换当前响应并发送
    pub async fn send_status_response(&mut self, page: &StatusResponse) -> io::Result<()> {
        debug!("[ID{}]发送状态页：{}", self.id, page.status);
        let mut response = Response::new();
        response
            .set_code(page.status)
            .set_header("Content-Type", &page.content_type)
            .set_content_length(Some(page.body.len() as u64));
        for (name, value) in &page.headers {
            response.set_header(name, value);
        }
        self.response = response;
        self.write_body(&page.body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(method: HttpRequestMethod) -> HttpContext<Vec<u8>> {
        HttpContext::new(
            1,
            Request::new(method, "/"),
            Vec::new(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_fixed_length_body() {
        let mut ctx = context(HttpRequestMethod::Get);
        ctx.response_mut().set_content_length(Some(5));
        ctx.write_body(b"hello").await.unwrap();
        ctx.finish().await.unwrap();
        let output = String::from_utf8(ctx.into_writer()).unwrap();
        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(output.ends_with("\r\n\r\nhello"));
    }

    #[tokio::test]
    async fn test_chunked_body() {
        let mut ctx = context(HttpRequestMethod::Get);
        ctx.write_body(b"hello").await.unwrap();
        ctx.write_body(b"").await.unwrap();
        ctx.write_body(b" world!").await.unwrap();
        ctx.finish().await.unwrap();
        let output = String::from_utf8(ctx.into_writer()).unwrap();
        assert!(output.contains("Transfer-Encoding: chunked"));
        assert!(output.ends_with("\r\n\r\n5\r\nhello\r\n7\r\n world!\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let mut ctx = context(HttpRequestMethod::Head);
        ctx.response_mut().set_content_length(Some(5));
        ctx.write_body(b"hello").await.unwrap();
        ctx.finish().await.unwrap();
        let output = String::from_utf8(ctx.into_writer()).unwrap();
        assert!(output.contains("Content-Length: 5"));
        assert!(output.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_headers_sent_once() {
        let mut ctx = context(HttpRequestMethod::Get);
        ctx.response_mut().set_content_length(Some(2));
        ctx.send_headers().await.unwrap();
        ctx.send_headers().await.unwrap();
        ctx.write_body(b"ok").await.unwrap();
        let output = String::from_utf8(ctx.into_writer()).unwrap();
        assert_eq!(output.matches("HTTP/1.1").count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_write_fails() {
        let mut ctx = context(HttpRequestMethod::Get);
        ctx.cancellation().cancel();
        let err = ctx.write_body(b"data").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert!(ctx.into_writer().is_empty());
    }

    #[tokio::test]
    async fn test_status_response() {
        let mut ctx = context(HttpRequestMethod::Get);
        let page = StatusResponse::html(404, None).with_header("X-Test", "1");
        ctx.send_status_response(&page).await.unwrap();
        ctx.finish().await.unwrap();
        let output = String::from_utf8(ctx.into_writer()).unwrap();
        assert!(output.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(output.contains("X-Test: 1"));
        assert!(output.contains("Content-Type: text/html;charset=utf-8"));
        assert!(output.ends_with("</html>"));
    }
}
