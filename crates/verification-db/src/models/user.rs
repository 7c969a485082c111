//! 用户与成员关系模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::Permission;

/// 系统用户
///
/// 用户本身是全局的，通过 [`Membership`] 与具体租户建立权限关系
#[derive(Debug, Clone, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// 邮箱，全局唯一，入库前统一转小写
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "名称长度需在 1-100 之间"))]
    pub name: String,
    /// 系统管理员可跨租户操作
    pub system_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email: email.into().to_lowercase(),
            name: name.into(),
            system_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 成员关系
///
/// (realm, user) 二元组加一个权限位掩码
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub realm_id: i64,
    pub user_id: i64,
    /// Permission::value 的按位或
    pub permissions: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(realm_id: i64, user_id: i64, permissions: &[Permission]) -> Self {
        let now = Utc::now();
        Self {
            realm_id,
            user_id,
            permissions: Permission::combine(permissions),
            created_at: now,
            updated_at: now,
        }
    }

    /// 检查是否持有指定权限
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions & permission.value() != 0
    }
}
