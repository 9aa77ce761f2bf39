use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Billing-relevant slice of the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub free_searches_remaining: Option<i32>,
    pub subscription_status: Option<String>,
}

impl Account {
    pub fn is_pro(&self) -> bool {
        self.subscription_status.as_deref() == Some("active")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct UserConfig {
    pub user_id: Uuid,
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub report_config: Option<Value>,
    pub chart_config: Option<Value>,
    pub favorite_theme: Option<String>,
}

/// Partial write to `user_config`; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfigPatch {
    pub job_title: Option<String>,
    pub industry: Option<String>,
    pub report_config: Option<Value>,
    pub chart_config: Option<Value>,
    pub favorite_theme: Option<String>,
}

impl UserConfigPatch {
    pub fn apply(self, config: &mut UserConfig) {
        if let Some(v) = self.job_title {
            config.job_title = Some(v);
        }
        if let Some(v) = self.industry {
            config.industry = Some(v);
        }
        if let Some(v) = self.report_config {
            config.report_config = Some(v);
        }
        if let Some(v) = self.chart_config {
            config.chart_config = Some(v);
        }
        if let Some(v) = self.favorite_theme {
            config.favorite_theme = Some(v);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContent {
    pub source_url: String,
    pub content: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub user_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_set_fields() {
        let mut config = UserConfig {
            job_title: Some("Counsel".into()),
            industry: Some("Legal".into()),
            ..Default::default()
        };
        UserConfigPatch { favorite_theme: Some("dark.pptx".into()), ..Default::default() }.apply(&mut config);

        assert_eq!(config.job_title.as_deref(), Some("Counsel"));
        assert_eq!(config.favorite_theme.as_deref(), Some("dark.pptx"));
    }

    #[test]
    fn only_active_subscription_is_pro() {
        let mut account = Account { id: Uuid::new_v4(), free_searches_remaining: Some(2), subscription_status: None };
        assert!(!account.is_pro());
        account.subscription_status = Some("past_due".into());
        assert!(!account.is_pro());
        account.subscription_status = Some("active".into());
        assert!(account.is_pro());
    }
}
