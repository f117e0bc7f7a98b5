// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use chrono::prelude::*;
use log::error;

use crate::{param::*, util::format_http_date};

/// 响应体的分帧方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length(u64),
    Chunked,
    /// 304 等不允许携带响应体的状态，不发送任何分帧头
    Bodyless,
}

/// 响应头部：状态行与各个响应头。响应体由 `HttpContext` 直接写入连接。
#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    headers: Vec<(String, String)>,
    framing: Framing,
    date: DateTime<Utc>,
    server_name: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            headers: Vec::new(),
            framing: Framing::Chunked,
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
        }
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&info) => info.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                panic!("非法的状态码：{}", code);
            }
        };
        self
    }

    /// 设置响应头，同名头会被替换
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(header) => header.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self
    }

    /// 设置 `Content-Length`；为 `None` 时使用分块传输
    pub fn set_content_length(&mut self, length: Option<u64>) -> &mut Self {
        self.framing = match length {
            Some(length) => Framing::Length(length),
            None => Framing::Chunked,
        };
        self
    }

    /// 标记响应没有响应体，也不发送 `Content-Length`/`Transfer-Encoding`
    pub fn set_bodyless(&mut self) -> &mut Self {
        self.framing = Framing::Bodyless;
        self
    }

    /// 序列化状态行和响应头，以空行结尾
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        );
        for (name, value) in &self.headers {
            head.push_str(&[name.as_str(), ": ", value, CRLF].concat());
        }
        match self.framing {
            Framing::Length(length) => {
                head.push_str(&["Content-Length: ", &length.to_string(), CRLF].concat())
            }
            Framing::Chunked => head.push_str(&["Transfer-Encoding: chunked", CRLF].concat()),
            Framing::Bodyless => {}
        }
        head.push_str(&["Date: ", &format_http_date(&self.date), CRLF].concat());
        head.push_str(&["Server: ", &self.server_name, CRLF].concat());
        head.push_str(CRLF);
        head.into_bytes()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        match self.framing {
            Framing::Length(length) => Some(length),
            _ => None,
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.framing == Framing::Chunked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_new() {
        let response = Response::new();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.information(), "OK");
        assert!(response.is_chunked());
    }

    #[test]
    fn test_head_bytes_basic() {
        let mut response = Response::new();
        response.set_content_length(Some(0));
        let head = String::from_utf8(response.head_bytes()).unwrap();

        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Length: 0\r\n"));
        assert!(head.contains("Server: shaneyale-webserver"));
        assert!(head.contains("Date: "));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_head_bytes_chunked() {
        let response = Response::new();
        let head = String::from_utf8(response.head_bytes()).unwrap();
        assert!(head.contains("Transfer-Encoding: chunked\r\n"));
        assert!(!head.contains("Content-Length"));
    }

    #[test]
    fn test_head_bytes_bodyless() {
        let mut response = Response::new();
        response.set_code(304).set_bodyless();
        let head = String::from_utf8(response.head_bytes()).unwrap();
        assert!(head.starts_with("HTTP/1.1 304 Not Modified\r\n"));
        assert!(!head.contains("Transfer-Encoding"));
        assert!(!head.contains("Content-Length"));
        assert!(!response.is_chunked());
    }

    #[test]
    fn test_set_header_replaces() {
        let mut response = Response::new();
        response.set_header("ETag", "\"a\"").set_header("etag", "\"b\"");
        assert_eq!(response.header("ETag"), Some("\"b\""));
        response.remove_header("ETAG");
        assert_eq!(response.header("ETag"), None);
    }

    #[test]
    fn test_response_status_code_various() {
        for (code, expected_info) in [
            (200, "OK"),
            (206, "Partial Content"),
            (304, "Not Modified"),
            (403, "Forbidden"),
            (404, "Not Found"),
            (405, "Method Not Allowed"),
            (406, "Not Acceptable"),
            (416, "Range Not Satisfiable"),
            (500, "Internal Server Error"),
        ] {
            let mut response = Response::new();
            response.set_code(code);
            assert_eq!(response.status_code(), code);
            assert_eq!(response.information(), expected_info);
        }
    }

    #[test]
    #[should_panic(expected = "非法的状态码")]
    fn test_invalid_status_code_panics() {
        Response::new().set_code(999);
    }
}
