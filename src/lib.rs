//! # CleanShare 本地图片打码：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │           前端（命令行 cli / 图形界面适配层）             │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ redaction ── RedactionSession 状态机                  │
//! │  │   ├─ raster        RGBA 图片 · 编解码                  │
//! │  │   ├─ blur          积分图盒式模糊                      │
//! │  │   ├─ mask          选区代数 · 笔刷 · 检测框            │
//! │  │   ├─ history       有界撤销 / 重做                     │
//! │  │   └─ job / worker  后台快照 · 过期丢弃 · 防抖          │
//! │  │                                                       │
//! │  ├─ detection ── 外部 YOLO 检测进程适配                   │
//! │  ├─ settings ─── JSON 设置文件                            │
//! │  └─ storage ──── 导出路径                                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`redaction`] | 加载、模糊、选区、撤销/重做、后台任务、导出 |
//! | [`detection`] | 运行检测脚本并解析矩形框 |
//! | [`settings`] | 用户设置的读写与到各模块配置的转换 |
//! | [`storage`] | 默认导出文件名与格式判断 |
//! | [`cli`] | 命令行参数与一次性处理流程 |

pub mod cli;
pub mod detection;
pub mod error;
pub mod redaction;
pub mod settings;
pub mod storage;
