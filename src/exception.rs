// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 Web 服务器在请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖了协议解析错误、提供者 I/O 错误以及传输错误。404、405、403 由挂载点的
//!   `OutcomeHandler` 应答，406、416 由协商与范围判断直接应答，不经过该枚举。
//! - **语义映射**：每个变体都对应了特定的 HTTP 结果，便于上层模块将其转化为对应的响应状态码。
//! - **轻量**：底层的 `io::Error` 在出错位置记录日志后再映射为 `Exception`，因此该枚举可以 `Copy`。
//!
//! 缓存的常规操作（查询、删除）从不返回错误；重复注册缓存分区属于编程错误，直接 panic。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行或请求头的格式不符合 HTTP/1.1 规范。对应 `400 Bad Request`。
    MalformedRequest,
    /// 客户端使用了服务器无法识别的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本（例如：HTTP/0.9 或 HTTP/2 明文）。
    UnsupportedHttpVersion,
    /// 请求的是目录，但当前挂载点没有配置目录列表渲染器。对应 `403 Forbidden`。
    ListingForbidden,
    /// 资源提供者在打开文件或枚举目录时发生 I/O 错误。对应 `500 Internal Server Error`。
    ProviderIo,
    /// 客户端在响应传输过程中断开连接，或请求被取消。
    ClientAborted,
}

use Exception::*;

impl Exception {
    /// 该异常在尚未发送响应头时应当对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            RequestIsNotUtf8 | MalformedRequest | UnSupportedRequestMethod => 400,
            UnsupportedHttpVersion => 505,
            ListingForbidden => 403,
            ProviderIo => 500,
            // 连接已经不可用，不会真正写出
            ClientAborted => 499,
        }
    }
}

/// 为 `Exception` 实现 `Display` 特性，使其支持字符串格式化输出。
impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequest => write!(f, "Malformed HTTP request"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            ListingForbidden => write!(f, "Directory listing is disabled (403)"),
            ProviderIo => write!(f, "Resource provider I/O failure"),
            ClientAborted => write!(f, "Client aborted the transfer"),
        }
    }
}

impl std::error::Error for Exception {}
