// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::param::{CompressionMethod, STATUS_CODES};

lazy_static! {
    // RFC 7231 §3.1.1.1 的 media-type：type "/" subtype *( OWS ";" OWS parameter )
    static ref MIME_TYPE_PATTERN: Regex = Regex::new(
        r#"^[!#$%&'*+.^_`|~0-9A-Za-z-]+/[!#$%&'*+.^_`|~0-9A-Za-z-]+(\s*;\s*[!#$%&'*+.^_`|~0-9A-Za-z-]+=([!#$%&'*+.^_`|~0-9A-Za-z-]+|"[^"]*"))*$"#
    )
    .unwrap();
}

pub struct HtmlBuilder {
    title: String,
    css: String,
    script: String,
    body: String,
}

impl HtmlBuilder {
    pub fn new(title: &str, css: &str, body: String) -> Self {
        Self {
            title: title.to_string(),
            css: css.to_string(),
            script: "".to_string(),
            body,
        }
    }

    pub fn from_status_code(code: u16, note: Option<&str>) -> Self {
        let title = format!("{}", code);
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            ";
        let description = match note {
            Some(n) => n,
            None => match STATUS_CODES.get(&code) {
                Some(d) => *d,
                None => {
                    panic!("非法的状态码：{}", code);
                }
            },
        };
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            code, description
        );
        Self::new(&title, css, body)
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <!-- 本文件由shaneyale的Rust Webserver自动生成 -->
            <html>
                <head>
                    <meta charset="utf-8">
                    <script>{}</script>
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.script, self.title, self.css, self.body
        )
    }
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}

/// 按 IMF-fixdate 格式化时间，例如 `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// 解析 HTTP-date，支持 IMF-fixdate、RFC 850 与 asctime 三种格式
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// HTTP-date 只精确到秒，比较前先截掉亚秒部分
pub fn truncate_to_seconds(date: &DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(date.timestamp(), 0)
        .single()
        .unwrap_or(*date)
}

/// 由资源的修改时间、长度和压缩方式确定性地生成实体标签。
///
/// 相同的输入总是得到相同的标签，不同压缩方式的变体得到不同的标签。
pub fn entity_tag(last_modified: &DateTime<Utc>, length: u64, method: CompressionMethod) -> String {
    let suffix = match method.content_encoding() {
        Some(encoding) => format!("-{}", encoding),
        None => String::new(),
    };
    format!(
        "\"{:x}-{:x}{}\"",
        last_modified.timestamp_millis(),
        length,
        suffix
    )
}

/// 检查字符串是否是语法合法的 MIME 类型（允许带参数）
pub fn is_valid_mime_type(value: &str) -> bool {
    MIME_TYPE_PATTERN.is_match(value)
}
