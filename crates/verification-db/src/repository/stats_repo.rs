//! 每日用量统计仓储
//!
//! 计数行由签发/兑换事务顺带累加（见 `code_repo`/`token_repo`），
//! 这里只负责查询侧的聚合。日期序列在 SQL 里用 generate_series
//! 补齐，没有记录的日期返回全零行。

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use super::traits::StatsRepositoryTrait;
use crate::error::Result;
use crate::models::{AuthorizedAppStat, RealmStat, UserStat};

/// 统计仓储
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 租户日序列（闭区间，缺日补零，时间升序）
    pub async fn realm_daily(
        &self,
        realm_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RealmStat>> {
        let stats = sqlx::query_as::<_, RealmStat>(
            r#"
            SELECT d.date::date AS date,
                   $1::bigint AS realm_id,
                   COALESCE(s.codes_issued, 0) AS codes_issued,
                   COALESCE(s.codes_claimed, 0) AS codes_claimed,
                   COALESCE(s.codes_invalid, 0) AS codes_invalid,
                   COALESCE(s.tokens_claimed, 0) AS tokens_claimed,
                   COALESCE(s.tokens_invalid, 0) AS tokens_invalid
            FROM generate_series($2::date, $3::date, '1 day'::interval) AS d(date)
            LEFT JOIN realm_stats s
                   ON s.date = d.date::date AND s.realm_id = $1
            ORDER BY d.date ASC
            "#,
        )
        .bind(realm_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    /// 租户区间汇总（单行，五个计数求和）
    pub async fn realm_summary(
        &self,
        realm_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RealmStat> {
        let stat = sqlx::query_as::<_, RealmStat>(
            r#"
            SELECT $3::date AS date,
                   $1::bigint AS realm_id,
                   COALESCE(SUM(codes_issued), 0)::bigint AS codes_issued,
                   COALESCE(SUM(codes_claimed), 0)::bigint AS codes_claimed,
                   COALESCE(SUM(codes_invalid), 0)::bigint AS codes_invalid,
                   COALESCE(SUM(tokens_claimed), 0)::bigint AS tokens_claimed,
                   COALESCE(SUM(tokens_invalid), 0)::bigint AS tokens_invalid
            FROM realm_stats
            WHERE realm_id = $1 AND date BETWEEN $2 AND $3
            "#,
        )
        .bind(realm_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(stat)
    }

    /// 租户内各后台用户的签发量（区间汇总，按量倒序）
    pub async fn user_rollup(
        &self,
        realm_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UserStat>> {
        let stats = sqlx::query_as::<_, UserStat>(
            r#"
            SELECT $3::date AS date,
                   realm_id,
                   user_id,
                   COALESCE(SUM(codes_issued), 0)::bigint AS codes_issued
            FROM user_stats
            WHERE realm_id = $1 AND date BETWEEN $2 AND $3
            GROUP BY realm_id, user_id
            ORDER BY codes_issued DESC, user_id ASC
            "#,
        )
        .bind(realm_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    /// 单个 API Key 的日序列（缺日补零）
    pub async fn app_daily(
        &self,
        app_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AuthorizedAppStat>> {
        let stats = sqlx::query_as::<_, AuthorizedAppStat>(
            r#"
            SELECT d.date::date AS date,
                   $1::bigint AS app_id,
                   COALESCE(s.codes_issued, 0) AS codes_issued
            FROM generate_series($2::date, $3::date, '1 day'::interval) AS d(date)
            LEFT JOIN authorized_app_stats s
                   ON s.date = d.date::date AND s.app_id = $1
            ORDER BY d.date ASC
            "#,
        )
        .bind(app_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[async_trait]
impl StatsRepositoryTrait for StatsRepository {
    async fn realm_daily(
        &self,
        realm_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RealmStat>> {
        self.realm_daily(realm_id, start, end).await
    }

    async fn realm_summary(
        &self,
        realm_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RealmStat> {
        self.realm_summary(realm_id, start, end).await
    }
}
