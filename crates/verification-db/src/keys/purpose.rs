//! 签名密钥用途定义
//!
//! 三种用途的密钥版本行为完全一致，仅表名、展示名与作用域规则不同。
//! 用 trait 常量描述差异，存储与生命周期逻辑只实现一次。

/// 密钥用途
///
/// 实现者是零尺寸标记类型，描述一类签名密钥的存储位置与作用域规则。
pub trait KeyPurpose: Send + Sync + 'static {
    /// 落库表名（常量，不来自外部输入）
    const TABLE: &'static str;
    /// 展示名，用于审计与错误信息
    const PURPOSE: &'static str;
    /// 是否系统级作用域（realm_id 固定为 0）
    const SCOPELESS: bool = false;
}

/// 系统级作用域的 realm_id 哨兵值
pub const SYSTEM_SCOPE: i64 = 0;

/// 证书签名密钥（按租户）
pub struct CertificateKey;

impl KeyPurpose for CertificateKey {
    const TABLE: &'static str = "signing_keys";
    const PURPOSE: &'static str = "certificate";
}

/// 短信签名密钥（按租户，用于 EN Express 链接签名）
pub struct SmsKey;

impl KeyPurpose for SmsKey {
    const TABLE: &'static str = "sms_signing_keys";
    const PURPOSE: &'static str = "SMS";
}

/// 令牌签名密钥（系统级，不分租户）
pub struct TokenKey;

impl KeyPurpose for TokenKey {
    const TABLE: &'static str = "token_signing_keys";
    const PURPOSE: &'static str = "token";
    const SCOPELESS: bool = true;
}

/// 校验作用域是否符合用途规则
///
/// 系统级用途只接受 [`SYSTEM_SCOPE`]，租户级用途只接受正的 realm_id。
pub fn check_scope<P: KeyPurpose>(scope: i64) -> crate::Result<()> {
    let valid = if P::SCOPELESS {
        scope == SYSTEM_SCOPE
    } else {
        scope > 0
    };
    if valid {
        Ok(())
    } else {
        Err(crate::DbError::MalformedScope {
            purpose: P::PURPOSE,
            scope,
        })
    }
}
