//! # 粘贴预览工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  宿主（cli + main）                                       │
//! │   文件 / 标准输入 / 系统剪贴板  →  一组 ClipboardItem     │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  ├─ clipboard ── PasteListener（分类 + 异步读取 + 分发）  │
//! │  │   ├─ memory         内存条目（文件 / stdin / 测试）    │
//! │  │   └─ system         arboard 系统剪贴板快照             │
//! │  │                                                       │
//! │  ├─ image_handler      解码 · 缩放 · 灰度 · 阈值预览      │
//! │  │   └─ service        PreviewService（最新粘贴胜出）     │
//! │  │                                                       │
//! │  ├─ settings           JSON 设置文件                      │
//! │  └─ error              AppError（统一错误类型）           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，命令行入口的返回类型 |
//! | [`clipboard`] | 粘贴条目抽象、监听分发、内存条目、系统剪贴板快照 |
//! | [`image_handler`] | 载荷加载、解码缩放灰度、阈值预览、写回剪贴板 |
//! | [`settings`] | 设置文件读取与叠加到 `ImageConfig` |
//! | [`cli`] | 命令行参数与一次粘贴的完整执行 |

pub mod cli;
pub mod clipboard;
pub mod error;
pub mod image_handler;
pub mod settings;
