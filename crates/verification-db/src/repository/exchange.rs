//! 验证码换令牌流程
//!
//! 设备端提交验证码哈希，兑换成功后立即铸造长效令牌。
//! 依赖仓储抽象而非具体实现，便于 mock 测试调用顺序与失败边界。

use chrono::{Duration, Utc};
use tracing::instrument;

use super::traits::{CodeRepositoryTrait, TokenRepositoryTrait};
use crate::error::Result;
use crate::models::VerificationToken;

/// 按哈希兑换验证码并铸造令牌
///
/// 两次独立的仓储调用：兑换先行（标记 claimed 并累加统计），
/// 随后铸造令牌。铸造失败时验证码保持已兑换状态，不回滚——
/// 中断的兑换视为烧码，用户需要重新签发。
#[instrument(skip(codes, tokens, hash))]
pub async fn exchange_code<C, T>(
    codes: &C,
    tokens: &T,
    realm_id: i64,
    hash: &str,
    token_ttl: Duration,
) -> Result<VerificationToken>
where
    C: CodeRepositoryTrait,
    T: TokenRepositoryTrait,
{
    let claimed = codes.claim(realm_id, hash).await?;
    tokens.mint(&claimed, Utc::now() + token_ttl).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TestType, VerificationCode, VerificationToken};
    use crate::repository::{MockCodeRepositoryTrait, MockTokenRepositoryTrait};
    use crate::DbError;
    use mockall::Sequence;

    fn claimed_code(realm_id: i64) -> VerificationCode {
        let now = Utc::now();
        VerificationCode {
            id: 11,
            realm_id,
            code_hash: "short-hash".to_string(),
            long_code_hash: "long-hash".to_string(),
            test_type: TestType::Confirmed,
            symptom_date: None,
            test_date: None,
            expires_at: now + Duration::minutes(15),
            long_expires_at: now + Duration::hours(24),
            claimed: true,
            issuing_user_id: Some(1),
            issuing_app_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn minted_token(realm_id: i64) -> VerificationToken {
        let now = Utc::now();
        VerificationToken {
            id: "token-1".to_string(),
            realm_id,
            test_type: TestType::Confirmed,
            symptom_date: None,
            test_date: None,
            used: false,
            expires_at: now + Duration::hours(24),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_exchange_claims_before_minting() {
        let mut seq = Sequence::new();
        let mut codes = MockCodeRepositoryTrait::new();
        let mut tokens = MockTokenRepositoryTrait::new();

        codes
            .expect_claim()
            .withf(|realm_id, hash| *realm_id == 7 && hash == "short-hash")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|realm_id, _| Ok(claimed_code(realm_id)));
        // 铸造拿到的必须是已兑换的验证码
        tokens
            .expect_mint()
            .withf(|code, _| code.claimed && code.realm_id == 7)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|code, _| Ok(minted_token(code.realm_id)));

        let token = exchange_code(&codes, &tokens, 7, "short-hash", Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(token.realm_id, 7);
        assert!(!token.used);
    }

    #[tokio::test]
    async fn test_exchange_failed_claim_mints_nothing() {
        let mut codes = MockCodeRepositoryTrait::new();
        let mut tokens = MockTokenRepositoryTrait::new();

        codes
            .expect_claim()
            .returning(|_, _| Err(DbError::CodeExpired));
        tokens.expect_mint().times(0);

        let err = exchange_code(&codes, &tokens, 7, "stale-hash", Duration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CodeExpired));
    }
}
