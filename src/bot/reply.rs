use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use super::activity::Activity;
use super::traits::ReplySink;

/// Buffers replies so the gateway can return them inline with the request.
#[derive(Default)]
pub struct CollectingSink {
    activities: Mutex<Vec<Activity>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_activities(self) -> Vec<Activity> {
        self.activities.into_inner()
    }

    pub fn len(&self) -> usize {
        self.activities.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReplySink for CollectingSink {
    async fn send(&self, activity: Activity) -> Result<()> {
        tracing::debug!(
            conversation = %activity.conversation_id(),
            reply_to = activity.reply_to_id.as_deref().unwrap_or(""),
            "Buffering reply"
        );
        self.activities.lock().push(activity);
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}
