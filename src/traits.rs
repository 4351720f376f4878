use async_trait::async_trait;
use bytes::Bytes;
use crate::error::Result;

/// Transport: 测量引擎访问网络的唯一入口
/// 生产环境使用 reqwest 实现，测试中替换为 mock
#[async_trait]
pub trait Transport: Sync + Send {
    /// 发送 GET 请求，收到响应头即返回 (响应体直接丢弃)
    /// 任何 HTTP 状态码都算一次成功的往返
    async fn probe(&self, url: &str) -> Result<()>;

    /// 下载并丢弃完整响应体，返回读取的字节数
    async fn download(&self, url: &str) -> Result<u64>;

    /// POST 固定负载，读完响应体后返回状态码
    async fn upload(&self, url: &str, payload: Bytes) -> Result<u16>;
}

/// TransferWorker: 吞吐阶段中单个并发单元的一次传输尝试
#[async_trait]
pub trait TransferWorker: Sync + Send {
    /// 执行一次传输，返回计入总量的字节数
    /// 失败的尝试返回 0，不向上传播错误
    async fn attempt(&self) -> u64;
}
