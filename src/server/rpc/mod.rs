mod service;

pub use service::RpcHandlers;
