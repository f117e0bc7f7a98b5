// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理
//!
//! 每个 TCP 连接只处理一个请求：读取请求头、交给挂载点处理、写完响应后关闭连接。

use std::io;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::context::HttpContext;
use crate::exception::Exception;
use crate::module::FileModule;
use crate::request::Request;

/// 请求头的最大长度
pub const MAX_REQUEST_HEAD_SIZE: usize = 16384;

fn head_complete(buffer: &[u8]) -> bool {
    buffer.windows(4).any(|w| w == b"\r\n\r\n")
}

/// 读取请求行与请求头，直到空行、连接关闭或超出长度上限
pub async fn read_request_head<R: AsyncRead + Unpin>(stream: &mut R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if head_complete(&buffer) || buffer.len() >= MAX_REQUEST_HEAD_SIZE {
            break;
        }
    }
    Ok(buffer)
}

/// 请求无法解析时直接写出 400 或 505，此时还没有可用的 `HttpContext`
async fn write_parse_error<W: AsyncWrite + Unpin>(stream: &mut W, e: Exception) -> io::Result<()> {
    let reason = match e {
        Exception::UnsupportedHttpVersion => "HTTP Version Not Supported",
        _ => "Bad Request",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        e.status_code(),
        reason,
        reason.len(),
        reason
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

/// 处理单个连接。`cancel` 被触发时正在进行的传输会尽快中止。
pub async fn handle_connection<S>(
    mut stream: S,
    id: u128,
    module: Arc<FileModule>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let buffer = match read_request_head(&mut stream).await {
        Ok(buffer) if buffer.is_empty() => return,
        Ok(buffer) => buffer,
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();
    let request = match Request::try_from(&buffer, id) {
        Ok(request) => request,
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败: {:?}", id, e);
            if let Err(e) = write_parse_error(&mut stream, e).await {
                debug!("[ID{}]写出错误响应失败，连接可能已断开: {}", id, e);
            }
            return;
        }
    };

    let mut ctx = HttpContext::new(id, request, &mut stream, cancel);
    ctx.response_mut().set_header("Connection", "close");
    if let Err(e) = module.handle(&mut ctx).await {
        error!("[ID{}]处理请求时发生异常: {}", id, e);
    }

    debug!(
        "[ID{}]HTTP响应完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );
    let request = ctx.request();
    let response = ctx.response();
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}, ",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );
    drop(ctx);
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_request_head_stops_at_blank_line() {
        let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: a\r\n\r\nbody";
        let head = read_request_head(&mut input).await.unwrap();
        assert!(head_complete(&head));
        assert!(head.starts_with(b"GET / HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_write_parse_error() {
        let mut output = Vec::new();
        write_parse_error(&mut output, Exception::UnsupportedHttpVersion)
            .await
            .unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("HTTP/1.1 505 HTTP Version Not Supported\r\n"));
        assert!(output.ends_with("\r\n\r\nHTTP Version Not Supported"));

        // 对端已关闭时返回错误而不是 panic
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        assert!(write_parse_error(&mut server, Exception::MalformedRequest)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_read_request_head_until_eof() {
        let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: a";
        let head = read_request_head(&mut input).await.unwrap();
        assert_eq!(head, b"GET / HTTP/1.1\r\nHost: a");
        let mut empty: &[u8] = b"";
        assert!(read_request_head(&mut empty).await.unwrap().is_empty());
    }
}
