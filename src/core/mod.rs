pub mod meta_tools;
pub mod protocol;
pub mod request_id;
pub mod server;
pub mod tasks;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, ToolDescriptor};
pub use request_id::RequestIdGenerator;
pub use server::RouterServer;
pub use tasks::BackgroundTasks;
