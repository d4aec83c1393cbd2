//! # Sandbox Billing Proxy 主程序

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use sandbox_billing_proxy::{
    AppContext, lerror, linfo,
    config::ConfigManager,
    logging::{self, LogComponent, LogStage},
    proxy::ProxyServer,
};

/// 计费代理命令行参数
#[derive(Debug, Parser)]
#[command(name = "sandbox-billing-proxy", version, about)]
struct Args {
    /// 配置文件路径
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// 日志级别（trace/debug/info/warn/error）
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_optimized_logging(args.log_level.as_ref());

    let manager = ConfigManager::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("配置加载失败: {e}"))?;
    let config = manager.get_config();

    let context = Arc::new(
        AppContext::initialize(Arc::clone(&config))
            .await
            .map_err(|e| anyhow::anyhow!("应用初始化失败: {e}"))?,
    );

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动"
    );

    let server = ProxyServer::new(config.server.clone(), Arc::clone(&context));
    if let Err(e) = server.serve(shutdown_signal()).await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务运行失败: {e:?}")
        );
        context.shutdown().await;
        return Err(e.into());
    }

    context.shutdown().await;
    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        lerror!(
            "system",
            LogStage::Shutdown,
            LogComponent::Main,
            "signal_failed",
            &format!("无法监听停止信号: {e}")
        );
        std::future::pending::<()>().await;
    }
    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "shutdown_signal",
        "收到停止信号，开始优雅关闭"
    );
}
