//! # 聊天请求处理
//!
//! 认证 → 请求体校验 → 转发或模拟 → 计价 → 派发用量记录 → 响应

pub mod backend;
pub mod handler;
pub mod pipeline;
pub mod server;
pub mod simulator;
pub mod types;
pub mod validation;

pub use backend::{ChatBackend, HttpChatBackend};
pub use handler::{
    BASE_COST_HEADER, FEE_HEADER, REQUEST_ID_HEADER, TOTAL_COST_HEADER, chat_handler,
};
pub use pipeline::{ChatPipeline, PipelineOutcome};
pub use server::{ProxyServer, create_router};
pub use simulator::SimulatedChatBackend;
pub use types::{ChatCompletion, ChatMessage, ChatRequest};
pub use validation::validate_chat_body;
