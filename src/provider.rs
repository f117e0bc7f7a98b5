// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源提供者
//!
//! 内容分发引擎只通过 `ResourceProvider` 接口访问资源：把 URL 路径映射为文件或目录信息、
//! 打开文件读取字节流、枚举目录内容。具体的资源来源（文件系统、压缩包、内嵌资源）都实现这个接口。
//!
//! 本模块同时提供一个基于文件系统的实现 `FileSystemProvider`，供服务器二进制程序使用。

use std::fs::{self, Metadata};
use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, ReadBuf};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::param::MIME_TYPES;

/// 根据文件扩展名查询 MIME 类型
pub trait MimeTypeResolver: Send + Sync {
    fn mime_type(&self, extension: &str) -> Option<String>;
}

/// 使用内置 MIME 表的解析器
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticMimeTypes;

impl MimeTypeResolver for StaticMimeTypes {
    fn mime_type(&self, extension: &str) -> Option<String> {
        MIME_TYPES
            .get(extension.to_lowercase().as_str())
            .map(|m| m.to_string())
    }
}

/// URL 路径映射得到的资源信息
#[derive(Debug, Clone, PartialEq)]
pub struct MappedResourceInfo {
    /// 提供者内部的资源路径，同时作为缓存键
    pub path: String,
    pub name: String,
    pub is_directory: bool,
    pub last_modified_utc: DateTime<Utc>,
    /// 文件长度；目录为 0
    pub length: u64,
    pub content_type: Option<String>,
}

impl MappedResourceInfo {
    pub fn file(
        path: &str,
        name: &str,
        last_modified_utc: DateTime<Utc>,
        length: u64,
        content_type: Option<String>,
    ) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            is_directory: false,
            last_modified_utc,
            length,
            content_type,
        }
    }

    pub fn directory(path: &str, name: &str, last_modified_utc: DateTime<Utc>) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            is_directory: true,
            last_modified_utc,
            length: 0,
            content_type: None,
        }
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }
}

/// 同时支持读取与定位的字节流
pub trait AsyncReadSeek: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> AsyncReadSeek for T {}

/// 提供者打开文件后返回的字节流。
///
/// 不可定位的流在范围请求时只能通过读取并丢弃来跳到起始位置。
pub enum ResourceStream {
    Seekable(Box<dyn AsyncReadSeek>),
    Sequential(Box<dyn AsyncRead + Unpin + Send>),
}

impl ResourceStream {
    /// 把读取位置移动到 `offset`：可定位的流直接定位，否则读取并丢弃前面的字节
    pub async fn skip_to(&mut self, offset: u64) -> io::Result<()> {
        if offset == 0 {
            return Ok(());
        }
        match self {
            ResourceStream::Seekable(stream) => {
                stream.seek(SeekFrom::Start(offset)).await?;
            }
            ResourceStream::Sequential(stream) => {
                let skipped = tokio::io::copy(&mut stream.take(offset), &mut tokio::io::sink()).await?;
                if skipped < offset {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended before range start",
                    ));
                }
            }
        }
        Ok(())
    }
}

impl AsyncRead for ResourceStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ResourceStream::Seekable(stream) => Pin::new(stream).poll_read(cx, buf),
            ResourceStream::Sequential(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

pub trait ResourceProvider: Send + Sync {
    /// 为 true 时资源在运行期间不会变化，缓存条目永远不需要新鲜度检查
    fn is_immutable(&self) -> bool;

    /// 把 URL 路径映射为资源；不存在时返回 `None`
    fn map_url_path(&self, url_path: &str, mime: &dyn MimeTypeResolver) -> Option<MappedResourceInfo>;

    fn open_file(&self, path: &str) -> io::Result<ResourceStream>;

    fn list_directory_entries(
        &self,
        path: &str,
        mime: &dyn MimeTypeResolver,
    ) -> io::Result<Vec<MappedResourceInfo>>;

    /// 可变提供者在资源变化时广播资源路径，以便挂载点主动丢弃缓存
    fn resource_changed(&self) -> Option<broadcast::Receiver<String>> {
        None
    }

    fn start(&self, _cancel: CancellationToken) {}
}

/// 以某个本地目录为根的文件系统提供者
pub struct FileSystemProvider {
    root: PathBuf,
    immutable: bool,
}

impl FileSystemProvider {
    pub fn new<P: AsRef<Path>>(root: P, immutable: bool) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            immutable,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 把 URL 路径转换为根目录下的物理路径，拒绝 `..` 等越权成分
    fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let relative = url_path.trim_start_matches('/');
        let mut full_path = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => full_path.push(part),
                Component::CurDir => {}
                _ => {
                    warn!("拒绝越权路径：{}", url_path);
                    return None;
                }
            }
        }
        Some(full_path)
    }

    fn info_from_metadata(
        &self,
        key: &str,
        file_path: &Path,
        metadata: &Metadata,
        mime: &dyn MimeTypeResolver,
    ) -> MappedResourceInfo {
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let last_modified_utc = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        if metadata.is_dir() {
            MappedResourceInfo::directory(key, &name, last_modified_utc)
        } else {
            let content_type = file_path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|e| mime.mime_type(e));
            MappedResourceInfo::file(key, &name, last_modified_utc, metadata.len(), content_type)
        }
    }
}

impl ResourceProvider for FileSystemProvider {
    fn is_immutable(&self) -> bool {
        self.immutable
    }

    fn map_url_path(&self, url_path: &str, mime: &dyn MimeTypeResolver) -> Option<MappedResourceInfo> {
        let file_path = self.resolve(url_path)?;
        let metadata = fs::metadata(&file_path).ok()?;
        let key = format!("/{}", url_path.trim_matches('/'));
        debug!("映射物理路径：{} -> {}", url_path, file_path.display());
        Some(self.info_from_metadata(&key, &file_path, &metadata, mime))
    }

    fn open_file(&self, path: &str) -> io::Result<ResourceStream> {
        let file_path = self
            .resolve(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;
        let file = fs::File::open(file_path)?;
        Ok(ResourceStream::Seekable(Box::new(tokio::fs::File::from_std(file))))
    }

    fn list_directory_entries(
        &self,
        path: &str,
        mime: &dyn MimeTypeResolver,
    ) -> io::Result<Vec<MappedResourceInfo>> {
        let dir_path = self
            .resolve(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid path"))?;
        let base = path.trim_end_matches('/');
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir_path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let key = format!("{}/{}", base, entry.file_name().to_string_lossy());
            entries.push(self.info_from_metadata(&key, &entry.path(), &metadata, mime));
        }
        Ok(entries)
    }
}
