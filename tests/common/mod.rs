// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 集成测试共用的内存资源提供者与响应解析工具

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use webserver::{
    FileModule, FileModuleOptions, HttpContext, HttpRequestMethod, MappedResourceInfo,
    MimeTypeResolver, Request, ResourceCache, ResourceProvider, ResourceStream,
};

pub fn modified_at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, 8, 30, 0).unwrap()
}

/// 可预测的测试内容
pub fn sample_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

struct MemoryFile {
    content: Bytes,
    last_modified: DateTime<Utc>,
}

/// 内存中的资源提供者：目录由文件路径隐式构成
pub struct MemoryProvider {
    files: Mutex<HashMap<String, MemoryFile>>,
    immutable: bool,
    sequential: bool,
    opens: AtomicUsize,
    changes: broadcast::Sender<String>,
}

fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

impl MemoryProvider {
    pub fn new(immutable: bool) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            files: Mutex::new(HashMap::new()),
            immutable,
            sequential: false,
            opens: AtomicUsize::new(0),
            changes,
        }
    }

    /// 打开的流不可定位，范围请求只能读取并丢弃
    pub fn sequential(mut self) -> Self {
        self.sequential = true;
        self
    }

    pub fn insert(&self, path: &str, content: &[u8], last_modified: DateTime<Utc>) {
        self.files.lock().unwrap().insert(
            normalize(path),
            MemoryFile {
                content: Bytes::copy_from_slice(content),
                last_modified,
            },
        );
    }

    pub fn notify(&self, path: &str) {
        let _ = self.changes.send(normalize(path));
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn file_info(path: &str, file: &MemoryFile, mime: &dyn MimeTypeResolver) -> MappedResourceInfo {
        let name = path.rsplit('/').next().unwrap_or("").to_string();
        let content_type = name.rsplit_once('.').and_then(|(_, ext)| mime.mime_type(ext));
        MappedResourceInfo::file(
            path,
            &name,
            file.last_modified,
            file.content.len() as u64,
            content_type,
        )
    }

    fn is_directory(files: &HashMap<String, MemoryFile>, path: &str) -> bool {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        files.keys().any(|key| key.starts_with(&prefix))
    }
}

impl ResourceProvider for MemoryProvider {
    fn is_immutable(&self) -> bool {
        self.immutable
    }

    fn map_url_path(&self, url_path: &str, mime: &dyn MimeTypeResolver) -> Option<MappedResourceInfo> {
        let path = normalize(url_path);
        let files = self.files.lock().unwrap();
        if let Some(file) = files.get(&path) {
            return Some(Self::file_info(&path, file, mime));
        }
        if Self::is_directory(&files, &path) {
            let name = path.rsplit('/').next().unwrap_or("").to_string();
            return Some(MappedResourceInfo::directory(&path, &name, modified_at(1)));
        }
        None
    }

    fn open_file(&self, path: &str) -> io::Result<ResourceStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let files = self.files.lock().unwrap();
        let file = files
            .get(&normalize(path))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
        let cursor = io::Cursor::new(file.content.to_vec());
        if self.sequential {
            Ok(ResourceStream::Sequential(Box::new(cursor)))
        } else {
            Ok(ResourceStream::Seekable(Box::new(cursor)))
        }
    }

    fn list_directory_entries(
        &self,
        path: &str,
        mime: &dyn MimeTypeResolver,
    ) -> io::Result<Vec<MappedResourceInfo>> {
        let path = normalize(path);
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        let files = self.files.lock().unwrap();
        let mut entries: Vec<MappedResourceInfo> = Vec::new();
        for (key, file) in files.iter() {
            let rest = match key.strip_prefix(&prefix) {
                Some(rest) => rest,
                None => continue,
            };
            match rest.split_once('/') {
                None => entries.push(Self::file_info(key, file, mime)),
                Some((dir, _)) => {
                    let dir_path = format!("{}{}", prefix, dir);
                    if !entries.iter().any(|e| e.path == dir_path) {
                        entries.push(MappedResourceInfo::directory(&dir_path, dir, modified_at(1)));
                    }
                }
            }
        }
        Ok(entries)
    }

    fn resource_changed(&self) -> Option<broadcast::Receiver<String>> {
        Some(self.changes.subscribe())
    }
}

/// 解析后的 HTTP 响应，分块传输的响应体已经还原
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn decode_chunked(mut data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .expect("分块长度行不完整");
        let size = usize::from_str_radix(std::str::from_utf8(&data[..line_end]).unwrap(), 16).unwrap();
        data = &data[line_end + 2..];
        if size == 0 {
            return body;
        }
        body.extend_from_slice(&data[..size]);
        data = &data[size + 2..];
    }
}

pub fn parse_response(raw: &[u8]) -> TestResponse {
    let head_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("响应头不完整");
    let head = std::str::from_utf8(&raw[..head_end]).unwrap();
    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let rest = &raw[head_end + 4..];
    let chunked = headers
        .iter()
        .any(|(k, v)| k.eq_ignore_ascii_case("Transfer-Encoding") && v == "chunked");
    let body = if chunked && !rest.is_empty() {
        decode_chunked(rest)
    } else {
        rest.to_vec()
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn get(path: &str) -> Request {
    Request::new(HttpRequestMethod::Get, path)
}

/// 在内存中处理一个请求并解析输出
pub async fn send(module: &FileModule, request: Request) -> TestResponse {
    send_with_cancel(module, request, CancellationToken::new())
        .await
        .expect("没有写出任何响应")
}

/// 返回 `None` 表示没有写出任何字节
pub async fn send_with_cancel(
    module: &FileModule,
    request: Request,
    cancel: CancellationToken,
) -> Option<TestResponse> {
    let mut ctx = HttpContext::new(1, request, Vec::new(), cancel);
    let _ = module.handle(&mut ctx).await;
    let raw = ctx.into_writer();
    if raw.is_empty() {
        None
    } else {
        Some(parse_response(&raw))
    }
}

/// 在独立的缓存上挂载一个内存提供者
pub fn mount(
    provider: Arc<MemoryProvider>,
    options: FileModuleOptions,
    cache: &Arc<ResourceCache>,
) -> Arc<FileModule> {
    FileModule::start("/", provider, options, cache)
}
