//! 工具调用模块：工具使用策略、强制工具跟踪与外部执行边界。
//!
//! Tool calling support for the execution loop:
//!
//! | Item | Description |
//! |------|-------------|
//! | [`prepare_tools`] | filters tools and derives the initial [`crate::types::ToolChoice`] |
//! | [`track_forced_tool_usage`] | decides whether a forced tool fired and what to force next |
//! | [`ToolExecutor`] | boundary to the external tool registry |

pub mod executor;
pub mod forced;
pub mod usage;

pub use executor::{FnToolExecutor, NoToolExecutor, ToolExecutor, ToolOutcome};
pub use forced::{track_forced_tool_usage, ForcedToolUsage};
pub use usage::{prepare_tools, PreparedTools};
