// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块负责将 TCP 流中读取的原始字节解析为强类型的 `Request` 结构体。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 请求头（Headers）的提取，字段名大小写不敏感。
//! 3. 内容分发所需标头的便捷访问：`Accept-Encoding`、`Range`、`If-Range`、
//!    `If-None-Match`、`If-Modified-Since`。
//!
//! 标头的语义解析（编码协商、范围计算、条件判断）由各自的模块完成，这里只保存原始字符串。

use crate::{exception::Exception, param::*};
use log::error;

/// 表示一个完整的 HTTP 请求元数据。
///
/// 该结构体不包含请求体（Body），静态资源分发只关心请求行和请求头。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法（GET, HEAD 等）
    method: HttpRequestMethod,
    /// 请求目标（包含查询字符串）
    target: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 按出现顺序保存的请求头
    headers: Vec<(String, String)>,
}

impl Request {
    /// 以编程方式构造请求，常用于嵌入场景和测试
    pub fn new(method: HttpRequestMethod, target: &str) -> Self {
        Self {
            method,
            target: target.to_string(),
            version: HttpVersion::V1_1,
            headers: Vec::new(),
        }
    }

    /// 追加一个请求头
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、路径和协议版本。
    /// 3. 迭代解析标头，直到遇到空行。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        // 1. 将字节流转换为字符串，失败则判定为非法的 HTTP 请求
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut request_lines = request_string.split(CRLF);

        // 2. 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let first_line = request_lines.next().unwrap_or("");
        let first_line_parts: Vec<&str> = first_line.split(' ').collect();

        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
            return Err(Exception::MalformedRequest);
        }

        let method = match HttpRequestMethod::parse(first_line_parts[0]) {
            Some(m) => m,
            None => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, first_line_parts[0]);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        let version_str = first_line_parts[first_line_parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格，虽然不规范但通过 join 尝试恢复
        let target = if first_line_parts.len() == 3 {
            first_line_parts[1].to_string()
        } else {
            first_line_parts[1..first_line_parts.len() - 1].join(" ")
        };

        // 3. 解析 Headers，空行之后是请求体，直接忽略
        let mut headers = Vec::new();
        for line in request_lines {
            if line.is_empty() {
                break;
            }
            match line.split_once(':') {
                Some((name, value)) => {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
                None => {
                    error!("[ID{}]无法解析的请求头：{}", id, line);
                    return Err(Exception::MalformedRequest);
                }
            }
        }

        Ok(Self {
            method,
            target,
            version,
            headers,
        })
    }
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取 HTTP 协议版本
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取完整的请求目标（含查询参数）
    pub fn target(&self) -> &str {
        &self.target
    }

    /// 获取不含查询字符串与片段的 URL 路径
    pub fn path(&self) -> &str {
        let end = self
            .target
            .find(|c| c == '?' || c == '#')
            .unwrap_or(self.target.len());
        &self.target[..end]
    }

    /// 获取请求方法
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 按名称查询请求头，大小写不敏感；同名多个时返回第一个
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("")
    }

    pub fn accept_encoding(&self) -> Option<&str> {
        self.header("Accept-Encoding")
    }

    pub fn range(&self) -> Option<&str> {
        self.header("Range")
    }

    pub fn if_range(&self) -> Option<&str> {
        self.header("If-Range")
    }

    pub fn if_none_match(&self) -> Option<&str> {
        self.header("If-None-Match")
    }

    pub fn if_modified_since(&self) -> Option<&str> {
        self.header("If-Modified-Since")
    }
}
