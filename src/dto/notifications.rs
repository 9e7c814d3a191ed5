use serde::Deserialize;

/// One entry of `GET /api/auth/notifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationDto {
    pub id: i64,
    #[serde(default)]
    pub notif_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reference_id: Option<i64>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsResponse {
    #[serde(default)]
    pub notifications: Vec<NotificationDto>,
}

impl NotificationsResponse {
    /// Count of notifications not yet marked read.
    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}
