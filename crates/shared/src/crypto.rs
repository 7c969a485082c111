//! 哈希与随机码生成模块
//!
//! 验证码和 API Key 属于敏感凭据，数据库中只保存带密钥的 SHA-256 哈希，
//! 不保存明文。哈希用于查找与比对，永远不需要解密，因此这里不使用可逆加密。
//!
//! 输出格式: `base64(sha256(key || value))`

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// 哈希模块错误类型
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("哈希密钥不能为空")]
    EmptyKey,
}

/// 带密钥哈希器
///
/// 持有部署级别的哈希密钥（生产环境通过 VERIFY_CODES_HASH_KEY 传入），
/// 对验证码、API Key 等短凭据做确定性哈希，便于按哈希值索引查找。
#[derive(Clone)]
pub struct KeyedHasher {
    key: String,
}

impl KeyedHasher {
    /// 从密钥字符串创建哈希器
    pub fn new(key: impl Into<String>) -> Result<Self, CryptoError> {
        let key = key.into();
        if key.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        Ok(Self { key })
    }

    /// 计算带密钥哈希
    ///
    /// 同一密钥下对同一输入产生相同输出，可直接作为数据库唯一索引列。
    pub fn hash(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.key.as_bytes());
        hasher.update(value.as_bytes());
        BASE64.encode(hasher.finalize())
    }
}

/// 生成纯数字短码
///
/// 首位允许为 0，位数固定，适合短信/口述传达。
pub fn generate_numeric_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from_digit(rng.random_range(0..10), 10).unwrap())
        .collect()
}

/// 生成长码（16 字节随机数的 hex 表示）
///
/// 用于链接点击场景，熵足够大，无需频率限制即可防猜测。
pub fn generate_long_code() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 生成 API Key 明文
///
/// 格式为 URL 安全的 base64，仅在创建时返回一次，落库前即被哈希。
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// 取 API Key 的展示前缀
///
/// 用于管理后台列表展示，让运营能区分不同 Key 而不暴露完整凭据。
pub fn api_key_preview(key: &str) -> String {
    key.chars().take(8).collect()
}
