// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod cache;
pub mod compression;
pub mod config;
pub mod context;
pub mod exception;
pub mod lister;
pub mod module;
pub mod negotiation;
pub mod param;
pub mod provider;
pub mod range;
pub mod request;
pub mod response;
pub mod server;
pub mod util;

pub use cache::{CacheEntry, CacheSection, CacheStats, ResourceCache};
pub use config::Config;
pub use context::{HttpContext, StatusResponse};
pub use exception::Exception;
pub use lister::{DirectoryLister, HtmlDirectoryLister, JsonDirectoryLister};
pub use module::{DefaultOutcomeHandler, FileModule, FileModuleOptions, FileOutcome, OutcomeHandler};
pub use param::{CompressionMethod, HttpRequestMethod, HttpVersion};
pub use provider::{
    FileSystemProvider, MappedResourceInfo, MimeTypeResolver, ResourceProvider, ResourceStream,
    StaticMimeTypes,
};
pub use request::Request;
pub use response::Response;
pub use util::HtmlBuilder;
