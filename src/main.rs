// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 异步 Web 服务器
//!
//! 基于 Tokio 运行时的静态资源服务器，把 `www_root` 挂载到 `/`。
//! 核心功能包括：
//! - 容量受限的 LRU 资源缓存与后台淘汰任务
//! - 条件请求、压缩协商与字节范围请求
//! - 大文件直接从磁盘流式传输
//! - 后台管理控制台（CLI 指令交互）

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use log::{debug, error, info};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    runtime::Builder,
};
use tokio_util::sync::CancellationToken;

use webserver::{
    server::handle_connection, util::format_file_size, Config, FileModule, FileSystemProvider,
    ResourceCache,
};

/// # 程序入口点
///
/// 初始化日志与配置，按配置构建多线程运行时并启动主事件循环。
fn main() {
    // 日志系统通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
        return;
    }

    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    info!("www root: {}", config.www_root());

    let worker_threads = config.worker_threads();
    let runtime = match Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            return;
        }
    };
    info!("异步运行时已创建，工作线程数：{}", worker_threads);

    runtime.block_on(serve(config));
}

async fn serve(config: Config) {
    // 缓存实例显式创建并注入挂载点
    let cache = Arc::new(ResourceCache::with_eviction_interval(
        config.eviction_interval(),
    ));
    cache.set_max_size_kb(config.cache_max_size_kb());
    cache.set_max_file_size_kb(config.cache_max_file_size_kb());
    info!(
        "缓存容量：{}KB，单文件缓存上限：{}KB",
        cache.max_size_kb(),
        cache.max_file_size_kb()
    );

    let provider = Arc::new(FileSystemProvider::new(config.www_root(), config.immutable()));
    let module = FileModule::start("/", provider, config.module_options(), &cache);

    // 支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
    let port: u16 = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);
    let listener = match TcpListener::bind(SocketAddrV4::new(address, port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            module.stop();
            cache.shutdown();
            return;
        }
    };
    info!("端口{}绑定完成", port);

    let shutdown = CancellationToken::new();
    let active_connection = Arc::new(AtomicU32::new(0));

    tokio::spawn(console(
        shutdown.clone(),
        Arc::clone(&active_connection),
        Arc::clone(&cache),
    ));

    let mut id: u128 = 0;
    loop {
        let (stream, addr) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("接受连接时遇到错误：{}", e);
                    continue;
                }
            },
        };
        debug!("[ID{}]TCP连接已建立：{}", id, addr);

        let module = Arc::clone(&module);
        let active_connection = Arc::clone(&active_connection);
        let cancel = shutdown.child_token();
        tokio::spawn(async move {
            active_connection.fetch_add(1, Ordering::Relaxed);
            handle_connection(stream, id, module, cancel).await;
            active_connection.fetch_sub(1, Ordering::Relaxed);
        });
        id += 1;
    }

    module.stop();
    cache.shutdown();
}

/// 交互式管理控制台
async fn console(
    shutdown: CancellationToken,
    active_connection: Arc<AtomicU32>,
    cache: Arc<ResourceCache>,
) {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let cmd = input.trim();
        match cmd {
            "stop" => {
                shutdown.cancel();
                println!("停机指令已激活，服务器将停止接受新的连接...");
                break;
            }
            "help" => {
                println!("== Webserver Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("cache  - 查看资源缓存统计");
                println!("help   - 显示此帮助信息");
                println!("====================");
            }
            "status" => {
                println!("== Webserver 状态 ===");
                println!("当前活跃连接数: {}", active_connection.load(Ordering::Relaxed));
                println!("====================");
            }
            "cache" => {
                let stats = cache.stats();
                println!("== 资源缓存 =========");
                println!("分区数: {}", stats.sections);
                println!("条目数: {}", stats.entries);
                println!(
                    "占用: {} / {}",
                    format_file_size(stats.total_size),
                    format_file_size(cache.max_size_kb() * 1024)
                );
                println!("后台淘汰: {}", if cache.is_eviction_running() { "运行中" } else { "未运行" });
                println!("====================");
            }
            "" => {}
            _ => {
                println!("无效的命令：{}", cmd);
            }
        }
    }
}
