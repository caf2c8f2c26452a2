//! # CleanShare：命令行入口
//!
//! 本文件仅负责日志初始化与参数解析，处理流程见 `cli.rs`。

use clap::Parser;

use cleanshare::cli::{self, Cli};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    match cli::run(args).await {
        Ok(output) => println!("{}", output.display()),
        Err(err) => {
            log::error!("❌ 处理失败 [{}]: {}", err.code(), err);
            std::process::exit(1);
        }
    }
}
