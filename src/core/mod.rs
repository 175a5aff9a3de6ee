//! 核心契约：错误、统一结果、优雅关闭

pub mod error;
pub mod result;
pub mod shutdown;

pub use error::{DispatchError, OpError};
pub use result::{OperationResult, TransportReply};
pub use shutdown::{
    run_with_graceful_shutdown, SessionCleanup, ShutdownCleanup, ShutdownCoordinator,
    ShutdownManager, ShutdownReason,
};
