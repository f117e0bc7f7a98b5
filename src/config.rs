// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{DEFAULT_MAX_FILE_SIZE_KB, DEFAULT_MAX_SIZE_KB};
use crate::lister::{DirectoryLister, HtmlDirectoryLister, JsonDirectoryLister};
use crate::module::{FileModuleOptions, DEFAULT_CHUNK_SIZE};
use crate::param::DEFAULT_DOCUMENT_NAME;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_cache_max_size_kb")]
    cache_max_size_kb: u64,
    #[serde(default = "default_cache_max_file_size_kb")]
    cache_max_file_size_kb: u64,
    #[serde(default = "default_content_caching")]
    content_caching: bool,
    #[serde(default = "default_default_document")]
    default_document: Option<String>,
    #[serde(default)]
    default_extension: Option<String>,
    #[serde(default = "default_directory_listing")]
    directory_listing: String,
    #[serde(default)]
    immutable: bool,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_eviction_interval_secs")]
    eviction_interval_secs: u64,
}

fn default_www_root() -> String {
    ".".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_local() -> bool {
    true
}

fn default_cache_max_size_kb() -> u64 {
    DEFAULT_MAX_SIZE_KB
}

fn default_cache_max_file_size_kb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_KB
}

fn default_content_caching() -> bool {
    true
}

fn default_default_document() -> Option<String> {
    Some(DEFAULT_DOCUMENT_NAME.to_string())
}

fn default_directory_listing() -> String {
    "html".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE // 256KB
}

fn default_eviction_interval_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: default_www_root(),
            port: default_port(),
            local: default_local(),
            worker_threads: 0,
            cache_max_size_kb: default_cache_max_size_kb(),
            cache_max_file_size_kb: default_cache_max_file_size_kb(),
            content_caching: default_content_caching(),
            default_document: default_default_document(),
            default_extension: None,
            directory_listing: default_directory_listing(),
            immutable: false,
            chunk_size: default_chunk_size(),
            eviction_interval_secs: default_eviction_interval_secs(),
        }
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => panic!("no such file {} exception:{}", filename, e),
        };
        let mut str_val = String::new();
        match file.read_to_string(&mut str_val) {
            Ok(s) => s,
            Err(e) => panic!("Error Reading file: {}", e),
        };
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(content: &str) -> Self {
        let mut raw_config: Config = match toml::from_str(content) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为{}。", DEFAULT_CHUNK_SIZE);
            raw_config.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        if raw_config.eviction_interval_secs == 0 {
            warn!("eviction_interval_secs被设置为0，该值将被改为1。");
            raw_config.eviction_interval_secs = 1;
        }
        if let Some(extension) = raw_config.default_extension.take() {
            let extension = extension.trim().to_string();
            raw_config.default_extension = match extension.as_str() {
                "" => None,
                e if e.starts_with('.') => Some(extension),
                e => Some(format!(".{}", e)),
            };
        }
        if raw_config.default_document.as_deref() == Some("") {
            raw_config.default_document = None;
        }
        raw_config
    }

    /// 根据配置构建挂载点选项
    pub fn module_options(&self) -> FileModuleOptions {
        FileModuleOptions {
            content_caching: self.content_caching,
            default_document: self.default_document.clone(),
            default_extension: self.default_extension.clone(),
            directory_lister: self.directory_lister(),
            chunk_size: self.chunk_size,
            ..FileModuleOptions::default()
        }
    }

    fn directory_lister(&self) -> Option<Arc<dyn DirectoryLister>> {
        match self.directory_listing.to_lowercase().as_str() {
            "html" => Some(Arc::new(HtmlDirectoryLister)),
            "json" => Some(Arc::new(JsonDirectoryLister)),
            "none" => None,
            other => {
                warn!("未知的directory_listing取值：{}，将禁用目录列表", other);
                None
            }
        }
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn cache_max_size_kb(&self) -> u64 {
        self.cache_max_size_kb
    }

    pub fn cache_max_file_size_kb(&self) -> u64 {
        self.cache_max_file_size_kb
    }

    pub fn content_caching(&self) -> bool {
        self.content_caching
    }

    pub fn default_document(&self) -> Option<&str> {
        self.default_document.as_deref()
    }

    pub fn default_extension(&self) -> Option<&str> {
        self.default_extension.as_deref()
    }

    pub fn directory_listing(&self) -> &str {
        &self.directory_listing
    }

    pub fn immutable(&self) -> bool {
        self.immutable
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }
}
