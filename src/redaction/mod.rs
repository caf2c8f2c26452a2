//! # 打码引擎模块（redaction）
//!
//! ## 设计思路
//!
//! 该模块把“图片解码 → 选区构建 → 模糊计算 → 合成 → 撤销/重做 → 导出”
//! 按职责拆分为多个子模块，所有状态集中在 `RedactionSession` 中，由调用方显式持有。
//!
//! - `raster`：RGBA 图片模型与 PNG/JPEG/BMP 编解码
//! - `blur`：基于积分图的盒式模糊与强度映射
//! - `mask`：单通道选区及其并集 / 差集 / 替换运算
//! - `history`：有界撤销 / 重做栈
//! - `session`：状态机，编排所有编辑操作
//! - `job` / `worker`：后台计算的快照、编号与合并
//! - `debounce`：强度滑块防抖
//! - `config/error`：配置与错误
//!
//! ## 新同事快速上手
//!
//! ```text
//! 调用方（CLI / 前端适配层）
//!    ↓
//! session.rs（前置校验 → 写状态）
//!    ├─ raster.rs（加载 / 导出）
//!    ├─ mask.rs（选区运算）
//!    ├─ blur.rs（整图模糊）
//!    └─ history.rs（撤销快照）
//!
//! 后台路径：
//! session.snapshot_*() → worker.rs（spawn_blocking）→ session.commit_job()
//!
//! 滑块路径：
//! PreviewScheduler::request() → debounce.rs（窗口期）→ poll() → 后台路径
//! ```
//!
//! ## 分层职责建议
//!
//! - 算法调整优先改 `blur.rs`
//! - 新的选区来源（笔刷、矩形、检测框）优先改 `mask.rs`
//! - 编辑流程与缓存策略优先改 `session.rs`

mod blur;
mod config;
mod debounce;
mod error;
mod history;
mod job;
mod mask;
mod raster;
mod session;
mod worker;

pub use blur::{BlurEngine, BoxBlur, MAX_BLUR_RADIUS, box_blur, radius_for_strength};
pub use config::{DEFAULT_REFERENCE_STRENGTH, MAX_STRENGTH, RedactionConfig};
pub use debounce::Debouncer;
pub use error::RedactError;
pub use history::EditHistory;
pub use job::{BlurSnapshot, JobCommit, JobId, JobRequest, JobResult, JobTracker};
pub use mask::{BrushStroke, DEFAULT_BRUSH_RADIUS, PixelRect, SELECTED, SelectionMask, SelectionMode};
pub use raster::{CHANNELS, RasterImage};
pub use session::{DetectionApply, RedactionSession};
pub use worker::{BlurWorker, PreviewScheduler};
