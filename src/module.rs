// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容分发引擎
//!
//! `FileModule` 把某个路由前缀下的请求交给一个 `ResourceProvider` 处理。每个请求依次经过：
//! 路径映射（默认文档、默认扩展名回退）→ 方法检查 → 目录列表检查 → 获取缓存条目（新鲜度检查）→
//! 内容类型 → 压缩协商 → 实体标签 → 条件请求 → 获取内容（缓存命中、目录渲染或读入内存）→
//! 范围请求 → 写出响应体（内存切片或直接从提供者流式传输）。
//!
//! 每个挂载点在 `ResourceCache` 中拥有一个以路由前缀命名的分区。

use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheEntry, CacheSection, ResourceCache};
use crate::compression::{should_skip_compression, Compressor};
use crate::context::{HttpContext, StatusResponse};
use crate::exception::Exception;
use crate::lister::DirectoryLister;
use crate::param::{
    CompressionMethod, HttpRequestMethod, ALLOWED_METHODS, CACHE_CONTROL_REVALIDATE,
    DEFAULT_DOCUMENT_NAME, DEFAULT_MIME_TYPE,
};
use crate::provider::{
    MappedResourceInfo, MimeTypeResolver, ResourceProvider, ResourceStream, StaticMimeTypes,
};
use crate::range::{self, RangeDecision};
use crate::request::Request;
use crate::util::{
    entity_tag, format_http_date, is_valid_mime_type, parse_http_date, truncate_to_seconds,
};

/// 流式传输时每次读取的字节数
pub const DEFAULT_CHUNK_SIZE: usize = 262144;

/// 引擎本身不直接处理、交给可替换策略的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    MappingFailed,
    DirectoryNotListable,
    MethodNotAllowed,
}

pub trait OutcomeHandler: Send + Sync {
    fn respond(&self, outcome: FileOutcome, request: &Request) -> StatusResponse;
}

/// 默认策略：404、403、405 状态页
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOutcomeHandler;

impl OutcomeHandler for DefaultOutcomeHandler {
    fn respond(&self, outcome: FileOutcome, _request: &Request) -> StatusResponse {
        match outcome {
            FileOutcome::MappingFailed => StatusResponse::html(
                404,
                Some(r"<h2>噢！</h2><p>你指定的网页无法找到。</p>"),
            ),
            FileOutcome::DirectoryNotListable => StatusResponse::html(
                403,
                Some(r"<h2>噢！</h2><p>该目录不允许浏览。</p>"),
            ),
            FileOutcome::MethodNotAllowed => StatusResponse::html(
                405,
                Some(r"<h2>噢！</h2><p>本服务器仅支持GET和HEAD方法。</p>"),
            )
            .with_header("Allow", &allowed_methods()),
        }
    }
}

fn allowed_methods() -> String {
    ALLOWED_METHODS
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 挂载点配置
#[derive(Clone)]
pub struct FileModuleOptions {
    /// 关闭后所有内容都直接从提供者读取
    pub content_caching: bool,
    pub default_document: Option<String>,
    /// 包含前导的 `.`，例如 `.html`
    pub default_extension: Option<String>,
    /// 为 `None` 时请求目录返回 403
    pub directory_lister: Option<Arc<dyn DirectoryLister>>,
    pub mime_types: Arc<dyn MimeTypeResolver>,
    pub outcome_handler: Arc<dyn OutcomeHandler>,
    pub chunk_size: usize,
}

impl Default for FileModuleOptions {
    fn default() -> Self {
        Self {
            content_caching: true,
            default_document: Some(DEFAULT_DOCUMENT_NAME.to_string()),
            default_extension: None,
            directory_lister: None,
            mime_types: Arc::new(StaticMimeTypes),
            outcome_handler: Arc::new(DefaultOutcomeHandler),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub struct FileModule {
    base_route: String,
    provider: Arc<dyn ResourceProvider>,
    options: FileModuleOptions,
    cache: Arc<ResourceCache>,
    section: Arc<CacheSection>,
    cancel: CancellationToken,
}

fn normalize_route(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn provider_failed(id: u128, e: io::Error) -> Exception {
    error!("[ID{}]读取资源时遇到错误：{}", id, e);
    Exception::ProviderIo
}

fn write_failed(id: u128, e: io::Error) -> Exception {
    warn!("[ID{}]向客户端写入响应失败：{}", id, e);
    Exception::ClientAborted
}

/// `If-None-Match` 使用弱比较，`*` 匹配任意表示
fn etag_list_matches(header: &str, etag: &str) -> bool {
    let etag = etag.trim_start_matches("W/");
    header
        .split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || tag.trim_start_matches("W/") == etag)
}

/// 条件请求判断，`If-None-Match` 存在时忽略 `If-Modified-Since`
fn is_not_modified(request: &Request, etag: &str, last_modified: &DateTime<Utc>) -> bool {
    if let Some(if_none_match) = request.if_none_match() {
        return etag_list_matches(if_none_match, etag);
    }
    match request.if_modified_since().and_then(parse_http_date) {
        Some(since) => truncate_to_seconds(last_modified) <= since,
        None => false,
    }
}

impl FileModule {
    /// 注册缓存分区、启动提供者，并在提供者支持时订阅资源变化事件。
    ///
    /// 同一个 `ResourceCache` 上重复挂载同一路由前缀会 panic。
    pub fn start(
        base_route: &str,
        provider: Arc<dyn ResourceProvider>,
        options: FileModuleOptions,
        cache: &Arc<ResourceCache>,
    ) -> Arc<Self> {
        let base_route = normalize_route(base_route);
        let section = cache.add_section(&base_route);
        let cancel = CancellationToken::new();
        provider.start(cancel.child_token());

        if let Some(receiver) = provider.resource_changed() {
            match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(watch_resource_changes(
                        receiver,
                        Arc::clone(&section),
                        cancel.child_token(),
                    ));
                }
                Err(_) => warn!("没有可用的tokio运行时，挂载点{}不会响应资源变化事件", base_route),
            }
        }

        info!("挂载点{}已启动", base_route);
        Arc::new(Self {
            base_route,
            provider,
            options,
            cache: Arc::clone(cache),
            section,
            cancel,
        })
    }

    /// 停止挂载点并移除其缓存分区，重复调用无效果
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.cache.remove_section(&self.base_route);
        info!("挂载点{}已停止", self.base_route);
    }

    pub fn base_route(&self) -> &str {
        &self.base_route
    }

    pub fn section(&self) -> &Arc<CacheSection> {
        &self.section
    }

    pub fn options(&self) -> &FileModuleOptions {
        &self.options
    }

    /// 去掉路由前缀后的资源路径；不属于本挂载点时返回 `None`
    fn relative_path<'a>(&self, url_path: &'a str) -> Option<&'a str> {
        if self.base_route == "/" {
            return Some(url_path);
        }
        let rest = url_path.strip_prefix(self.base_route.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// 映射路径，依次尝试默认文档与默认扩展名
    fn map_resource(&self, url_path: &str) -> Option<MappedResourceInfo> {
        let mime = self.options.mime_types.as_ref();
        if let Some(info) = self.provider.map_url_path(url_path, mime) {
            if info.is_directory {
                if let Some(document) = &self.options.default_document {
                    let candidate = format!("{}/{}", url_path.trim_end_matches('/'), document);
                    if let Some(found) = self
                        .provider
                        .map_url_path(&candidate, mime)
                        .filter(MappedResourceInfo::is_file)
                    {
                        return Some(found);
                    }
                }
            }
            return Some(info);
        }
        let extension = self.options.default_extension.as_ref()?;
        let candidate = format!("{}{}", url_path.trim_end_matches('/'), extension);
        self.provider
            .map_url_path(&candidate, mime)
            .filter(MappedResourceInfo::is_file)
    }

    /// 取出缓存条目；可变提供者的资源有变化时以新条目替换旧条目
    fn obtain_entry(&self, id: u128, info: &MappedResourceInfo) -> Arc<CacheEntry> {
        if let Some(entry) = self.section.try_get(&info.path) {
            if self.provider.is_immutable() || entry.matches(info.last_modified_utc, info.length) {
                return entry;
            }
            debug!("[ID{}]资源{}已变化，丢弃旧的缓存条目", id, info.path);
            self.section.remove(&info.path);
        }
        let entry = Arc::new(CacheEntry::new(info.last_modified_utc, info.length));
        self.section.add(&info.path, Arc::clone(&entry));
        entry
    }

    fn content_type(&self, id: u128, info: &MappedResourceInfo) -> String {
        let declared = match &info.content_type {
            Some(content_type) => Some(content_type.clone()),
            None if info.is_directory => self
                .options
                .directory_lister
                .as_ref()
                .map(|lister| lister.content_type().to_string()),
            None => None,
        };
        match declared {
            Some(content_type) if is_valid_mime_type(&content_type) => content_type,
            Some(content_type) => {
                warn!("[ID{}]非法的MIME类型：{}，使用默认类型", id, content_type);
                DEFAULT_MIME_TYPE.to_string()
            }
            None => DEFAULT_MIME_TYPE.to_string(),
        }
    }

    fn may_cache(&self, uncompressed_len: u64) -> bool {
        self.options.content_caching && uncompressed_len <= self.cache.max_file_size_bytes()
    }

    /// 处理一个请求并结束响应。
    ///
    /// 客户端断开导致的错误在这里被吞掉；提供者 I/O 错误在响应头尚未发出时返回 500。
    pub async fn handle<W: AsyncWrite + Unpin + Send>(
        &self,
        ctx: &mut HttpContext<W>,
    ) -> Result<(), Exception> {
        let id = ctx.id();
        match self.handle_inner(ctx).await {
            Ok(()) => {}
            Err(Exception::ClientAborted) => {
                debug!("[ID{}]客户端已断开或请求被取消，放弃本次响应", id);
                return Ok(());
            }
            Err(e) => {
                if !ctx.headers_sent() {
                    let page = StatusResponse::html(
                        500,
                        Some(r"<h2>噢！</h2><p>服务器出现了一个内部错误。</p>"),
                    );
                    if let Err(write_error) = ctx.send_status_response(&page).await {
                        debug!("[ID{}]发送错误页面失败：{}", id, write_error);
                        return Err(e);
                    }
                    if let Err(write_error) = ctx.finish().await {
                        debug!("[ID{}]发送错误页面失败：{}", id, write_error);
                    }
                }
                return Err(e);
            }
        }
        if let Err(e) = ctx.finish().await {
            debug!("[ID{}]结束响应时客户端已断开：{}", id, e);
        }
        Ok(())
    }

    async fn respond_outcome<W: AsyncWrite + Unpin + Send>(
        &self,
        ctx: &mut HttpContext<W>,
        outcome: FileOutcome,
    ) -> Result<(), Exception> {
        let page = self.options.outcome_handler.respond(outcome, ctx.request());
        let id = ctx.id();
        ctx.send_status_response(&page)
            .await
            .map_err(|e| write_failed(id, e))
    }

    async fn handle_inner<W: AsyncWrite + Unpin + Send>(
        &self,
        ctx: &mut HttpContext<W>,
    ) -> Result<(), Exception> {
        let id = ctx.id();
        let absolute_path = ctx.request().path().to_string();

        let info = match self
            .relative_path(&absolute_path)
            .and_then(|path| self.map_resource(path))
        {
            Some(info) => info,
            None => {
                warn!("[ID{}]请求的路径：{} 不存在，返回404", id, absolute_path);
                return self.respond_outcome(ctx, FileOutcome::MappingFailed).await;
            }
        };

        let method = ctx.request().method();
        if !ALLOWED_METHODS.contains(&method) {
            warn!("[ID{}]不允许的请求方法：{}，返回405", id, method);
            return self.respond_outcome(ctx, FileOutcome::MethodNotAllowed).await;
        }

        if info.is_directory && self.options.directory_lister.is_none() {
            warn!("[ID{}]目录{}不允许浏览，返回403", id, absolute_path);
            return self.respond_outcome(ctx, FileOutcome::DirectoryNotListable).await;
        }

        let entry = self.obtain_entry(id, &info);
        let content_type = self.content_type(id, &info);

        let prefer_compression =
            ctx.request().range().is_none() && !should_skip_compression(&content_type);
        let compression = match ctx
            .try_determine_compression(prefer_compression)
            .await
            .map_err(|e| write_failed(id, e))?
        {
            Some(method) => method,
            None => return Ok(()),
        };

        let last_modified = entry.last_modified_utc();
        let etag = entity_tag(&last_modified, entry.length(), compression);
        ctx.response_mut()
            .set_header("ETag", &etag)
            .set_header("Last-Modified", &format_http_date(&last_modified))
            .set_header("Cache-Control", CACHE_CONTROL_REVALIDATE)
            .set_header("Accept-Ranges", "bytes")
            .set_header("Vary", "Accept-Encoding");

        if is_not_modified(ctx.request(), &etag, &last_modified) {
            debug!("[ID{}]资源未修改，返回304", id);
            ctx.response_mut().set_code(304).set_bodyless();
            return ctx.send_headers().await.map_err(|e| write_failed(id, e));
        }

        let mut content = entry.variant(compression);
        if content.is_some() {
            debug!("[ID{}]缓存命中：{}（{}）", id, info.path, compression);
        } else if info.is_directory {
            content = Some(
                self.render_directory(ctx, &info, &absolute_path, &entry, compression)
                    .await?,
            );
        } else if method != HttpRequestMethod::Head && self.may_cache(info.length) {
            debug!("[ID{}]缓存未命中，读入内存：{}（{}）", id, info.path, compression);
            let bytes = self.load_file(ctx, &info, compression).await?;
            self.section
                .add_variant(&info.path, &entry, compression, bytes.clone());
            content = Some(bytes);
        }

        let content_length = match &content {
            Some(bytes) => Some(bytes.len() as u64),
            None if compression == CompressionMethod::None => Some(info.length),
            None => None,
        };

        let decision = match (compression, content_length) {
            (CompressionMethod::None, Some(total)) => range::evaluate(
                ctx.request().range(),
                ctx.request().if_range(),
                total,
                &etag,
                &last_modified,
            ),
            _ => RangeDecision::Full,
        };
        debug!("[ID{}]范围请求判断结果：{:?}", id, decision);

        let response = ctx.response_mut();
        match decision {
            RangeDecision::Unsatisfiable => {
                let content_range = decision.content_range(content_length.unwrap_or(0));
                response
                    .set_code(416)
                    .set_header("Content-Range", content_range.as_deref().unwrap_or_default())
                    .set_content_length(Some(0));
                return ctx.send_headers().await.map_err(|e| write_failed(id, e));
            }
            RangeDecision::Partial { start, end } => {
                let content_range = decision.content_range(content_length.unwrap_or(0));
                response
                    .set_code(206)
                    .set_header("Content-Range", content_range.as_deref().unwrap_or_default())
                    .set_content_length(Some(end - start + 1));
            }
            RangeDecision::Full => {
                response.set_code(200).set_content_length(content_length);
            }
        }
        response.set_header("Content-Type", &content_type);
        if let Some(encoding) = compression.content_encoding() {
            response.set_header("Content-Encoding", encoding);
        }

        if method == HttpRequestMethod::Head {
            return ctx.send_headers().await.map_err(|e| write_failed(id, e));
        }

        match (content, decision) {
            (Some(bytes), RangeDecision::Partial { start, end }) => ctx
                .write_body(&bytes[start as usize..=end as usize])
                .await
                .map_err(|e| write_failed(id, e)),
            (Some(bytes), _) => ctx.write_body(&bytes).await.map_err(|e| write_failed(id, e)),
            (None, RangeDecision::Partial { start, end }) => {
                self.stream_range(ctx, &info, start, end).await
            }
            (None, _) => self.stream_full(ctx, &info, compression).await,
        }
    }

    /// 渲染目录列表；未压缩长度不超过阈值时写入缓存
    async fn render_directory<W: AsyncWrite + Unpin + Send>(
        &self,
        ctx: &HttpContext<W>,
        info: &MappedResourceInfo,
        absolute_path: &str,
        entry: &Arc<CacheEntry>,
        compression: CompressionMethod,
    ) -> Result<Bytes, Exception> {
        let id = ctx.id();
        let lister = match &self.options.directory_lister {
            Some(lister) => lister,
            None => return Err(Exception::ListingForbidden),
        };
        let entries = self
            .provider
            .list_directory_entries(&info.path, self.options.mime_types.as_ref())
            .map_err(|e| provider_failed(id, e))?;
        debug!("[ID{}]渲染目录列表：{}，共{}项", id, info.path, entries.len());

        let mut compressor = Compressor::new(compression);
        if let Err(e) = lister.render(info, absolute_path, &entries, &mut compressor, ctx.cancellation()) {
            if ctx.cancellation().is_cancelled() {
                return Err(Exception::ClientAborted);
            }
            return Err(provider_failed(id, e));
        }
        let uncompressed_len = compressor.uncompressed_len();
        let bytes = Bytes::from(compressor.finish().map_err(|e| provider_failed(id, e))?);
        if self.may_cache(uncompressed_len) {
            self.section
                .add_variant(&info.path, entry, compression, bytes.clone());
        }
        Ok(bytes)
    }

    fn open(&self, id: u128, info: &MappedResourceInfo) -> Result<ResourceStream, Exception> {
        self.provider
            .open_file(&info.path)
            .map_err(|e| provider_failed(id, e))
    }

    /// 把整个文件经压缩包装器读入内存。被取消时不产生任何缓存内容。
    async fn load_file<W: AsyncWrite + Unpin + Send>(
        &self,
        ctx: &HttpContext<W>,
        info: &MappedResourceInfo,
        compression: CompressionMethod,
    ) -> Result<Bytes, Exception> {
        let id = ctx.id();
        let mut stream = self.open(id, info)?;
        let mut compressor = Compressor::new(compression);
        let mut buffer = vec![0u8; self.options.chunk_size.max(1)];
        loop {
            if ctx.cancellation().is_cancelled() {
                return Err(Exception::ClientAborted);
            }
            let n = stream
                .read(&mut buffer)
                .await
                .map_err(|e| provider_failed(id, e))?;
            if n == 0 {
                break;
            }
            compressor
                .write_all(&buffer[..n])
                .map_err(|e| provider_failed(id, e))?;
        }
        let output = compressor.finish().map_err(|e| provider_failed(id, e))?;
        Ok(Bytes::from(output))
    }

    /// 不经缓存，按块复制闭区间 `[start, end]`
    async fn stream_range<W: AsyncWrite + Unpin + Send>(
        &self,
        ctx: &mut HttpContext<W>,
        info: &MappedResourceInfo,
        start: u64,
        end: u64,
    ) -> Result<(), Exception> {
        let id = ctx.id();
        let mut stream = self.open(id, info)?;
        stream
            .skip_to(start)
            .await
            .map_err(|e| provider_failed(id, e))?;
        let mut buffer = vec![0u8; self.options.chunk_size.max(1)];
        let mut remaining = end - start + 1;
        while remaining > 0 {
            if ctx.cancellation().is_cancelled() {
                return Err(Exception::ClientAborted);
            }
            let want = remaining.min(buffer.len() as u64) as usize;
            let n = stream
                .read(&mut buffer[..want])
                .await
                .map_err(|e| provider_failed(id, e))?;
            if n == 0 {
                error!("[ID{}]资源{}在范围结束前被截断", id, info.path);
                return Err(Exception::ProviderIo);
            }
            ctx.write_body(&buffer[..n])
                .await
                .map_err(|e| write_failed(id, e))?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// 不经缓存，经压缩包装器流式传输整个文件
    async fn stream_full<W: AsyncWrite + Unpin + Send>(
        &self,
        ctx: &mut HttpContext<W>,
        info: &MappedResourceInfo,
        compression: CompressionMethod,
    ) -> Result<(), Exception> {
        let id = ctx.id();
        let mut stream = self.open(id, info)?;
        debug!("[ID{}]开始流式传输：{}，文件大小：{} bytes", id, info.path, info.length);
        let mut compressor = Compressor::new(compression);
        let mut buffer = vec![0u8; self.options.chunk_size.max(1)];
        loop {
            if ctx.cancellation().is_cancelled() {
                return Err(Exception::ClientAborted);
            }
            let n = stream
                .read(&mut buffer)
                .await
                .map_err(|e| provider_failed(id, e))?;
            if n == 0 {
                break;
            }
            compressor
                .write_all(&buffer[..n])
                .map_err(|e| provider_failed(id, e))?;
            let output = compressor.take_output();
            ctx.write_body(&output)
                .await
                .map_err(|e| write_failed(id, e))?;
        }
        let tail = compressor.finish().map_err(|e| provider_failed(id, e))?;
        ctx.write_body(&tail).await.map_err(|e| write_failed(id, e))?;
        debug!("[ID{}]流式传输完成，共{} bytes", id, info.length);
        Ok(())
    }
}

async fn watch_resource_changes(
    mut receiver: tokio::sync::broadcast::Receiver<String>,
    section: Arc<CacheSection>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            message = receiver.recv() => match message {
                Ok(path) => {
                    debug!("资源{}已变化，从分区{}移除", path, section.name());
                    section.remove(&path);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("分区{}丢失了{}条资源变化通知，清空整个分区", section.name(), skipped);
                    section.clear();
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_normalize_route() {
        assert_eq!(normalize_route(""), "/");
        assert_eq!(normalize_route("/"), "/");
        assert_eq!(normalize_route("static/"), "/static");
        assert_eq!(normalize_route("/static"), "/static");
    }

    #[test]
    fn test_etag_list_matches() {
        let etag = "\"18c0-3e8\"";
        assert!(etag_list_matches("\"18c0-3e8\"", etag));
        assert!(etag_list_matches("\"a\", W/\"18c0-3e8\"", etag));
        assert!(etag_list_matches("*", etag));
        assert!(!etag_list_matches("\"other\"", etag));
    }

    #[test]
    fn test_conditional_precedence() {
        let modified = Utc::now();
        let etag = "\"1-2\"";
        let earlier = format_http_date(&(modified - Duration::days(1)));
        let later = format_http_date(&(modified + Duration::days(1)));

        let request = Request::new(HttpRequestMethod::Get, "/")
            .with_header("If-None-Match", etag)
            .with_header("If-Modified-Since", &earlier);
        assert!(is_not_modified(&request, etag, &modified));

        let request = Request::new(HttpRequestMethod::Get, "/")
            .with_header("If-None-Match", "\"nope\"")
            .with_header("If-Modified-Since", &later);
        assert!(!is_not_modified(&request, etag, &modified));

        let request =
            Request::new(HttpRequestMethod::Get, "/").with_header("If-Modified-Since", &later);
        assert!(is_not_modified(&request, etag, &modified));
        let request =
            Request::new(HttpRequestMethod::Get, "/").with_header("If-Modified-Since", &earlier);
        assert!(!is_not_modified(&request, etag, &modified));
        let request =
            Request::new(HttpRequestMethod::Get, "/").with_header("If-Modified-Since", "garbage");
        assert!(!is_not_modified(&request, etag, &modified));
    }

    #[test]
    fn test_default_outcomes() {
        let request = Request::new(HttpRequestMethod::Post, "/");
        let handler = DefaultOutcomeHandler;
        assert_eq!(handler.respond(FileOutcome::MappingFailed, &request).status, 404);
        assert_eq!(handler.respond(FileOutcome::DirectoryNotListable, &request).status, 403);
        let page = handler.respond(FileOutcome::MethodNotAllowed, &request);
        assert_eq!(page.status, 405);
        assert_eq!(
            page.headers,
            vec![("Allow".to_string(), "GET, HEAD".to_string())]
        );
    }
}
