// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 目录列表渲染
//!
//! 请求目录且挂载点配置了渲染器时，引擎把目录内容交给 `DirectoryLister` 渲染。
//! 渲染结果直接写入压缩包装器，因此渲染器只需要一个同步的 `Write`。

use std::cmp::Ordering;
use std::io::{self, Write};

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use crate::provider::MappedResourceInfo;
use crate::util::{format_file_size, HtmlBuilder};

pub trait DirectoryLister: Send + Sync {
    /// 渲染结果的 MIME 类型
    fn content_type(&self) -> &str;

    fn render(
        &self,
        directory: &MappedResourceInfo,
        absolute_url_path: &str,
        entries: &[MappedResourceInfo],
        output: &mut dyn Write,
        cancel: &CancellationToken,
    ) -> io::Result<()>;
}

/// 目录在前，同类按名称排序
fn sort_entries(entries: &[MappedResourceInfo]) -> Vec<&MappedResourceInfo> {
    let mut sorted: Vec<&MappedResourceInfo> = entries.iter().collect();
    sorted.sort_by(|a, b| match (a.is_directory, b.is_directory) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
    sorted
}

fn check_cancelled(cancel: &CancellationToken) -> io::Result<()> {
    if cancel.is_cancelled() {
        return Err(io::Error::new(io::ErrorKind::Interrupted, "listing cancelled"));
    }
    Ok(())
}

/// HTML 文件列表页面
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlDirectoryLister;

impl DirectoryLister for HtmlDirectoryLister {
    fn content_type(&self) -> &str {
        "text/html;charset=utf-8"
    }

    fn render(
        &self,
        _directory: &MappedResourceInfo,
        absolute_url_path: &str,
        entries: &[MappedResourceInfo],
        output: &mut dyn Write,
        cancel: &CancellationToken,
    ) -> io::Result<()> {
        check_cancelled(cancel)?;
        let path = absolute_url_path.trim_end_matches('/');
        let mut body = String::new();
        body.push_str(&format!("<h1>{}/的文件列表</h1><hr>", path));
        body.push_str("<table>");
        body.push_str(
            r#"
            <tr>
                <td>文件名</td>
                <td>大小</td>
                <td>修改时间</td>
            </tr>
            <tr>
                <td><a href="../">..</a></td>
                <td></td>
                <td></td>
            </tr>
            "#,
        );
        for entry in sort_entries(entries) {
            let local_time: DateTime<Local> = entry.last_modified_utc.into();
            let formatted_time = local_time.format("%Y-%m-%d %H:%M:%S %Z").to_string();
            let (href, size) = if entry.is_directory {
                (format!("{}/", entry.name), "文件夹".to_string())
            } else {
                (entry.name.clone(), format_file_size(entry.length))
            };
            body.push_str(&format!(
                r#"
                <tr>
                    <td><a href="{}">{}</a></td>
                    <td>{}</td>
                    <td>{}</td>
                </tr>
                "#,
                href, href, size, formatted_time
            ));
        }
        body.push_str("</table>");

        let css = r"
            table {
                border-collapse: collapse;
                width: 100%;
            }

            td {
                padding: 8px;
                white-space: pre-wrap;
                border: none;
            }";
        let title = format!("{}/的文件列表", path);
        output.write_all(HtmlBuilder::new(&title, css, body).build().as_bytes())
    }
}

/// JSON 格式的目录列表，供前端页面或脚本使用
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDirectoryLister;

impl DirectoryLister for JsonDirectoryLister {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn render(
        &self,
        _directory: &MappedResourceInfo,
        _absolute_url_path: &str,
        entries: &[MappedResourceInfo],
        output: &mut dyn Write,
        cancel: &CancellationToken,
    ) -> io::Result<()> {
        check_cancelled(cancel)?;
        let json_struct: Vec<_> = sort_entries(entries)
            .into_iter()
            .map(|entry| {
                serde_json::json!({
                    "name": entry.name,
                    "type": if entry.is_directory { "dir" } else { "file" },
                    "size": if entry.is_directory { "-".to_string() } else { format_file_size(entry.length) },
                    "raw_size": entry.length,
                    "date": entry.last_modified_utc.to_rfc3339(),
                })
            })
            .collect();
        serde_json::to_writer(output, &json_struct).map_err(io::Error::from)
    }
}
