use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use freightwatch_core::NotificationChannel;
use freightwatch_provider::{
    AttemptLog, EmailDispatch, EmailNotifier, SmsDispatch, SmsNotifier, sort_by_priority,
};

use crate::blacklist::EmailBlacklist;
use crate::error::NotifyError;

/// A notification to deliver on one channel.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub delivery_id: Uuid,
    /// Email address or E.164 number, depending on the channel.
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Acknowledgement of a successful channel send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReceipt {
    pub channel: NotificationChannel,
    pub provider: String,
    pub message_id: String,
}

/// Channel-aware fan-out with per-channel fallback.
pub struct NotificationService {
    email: Vec<Arc<dyn EmailNotifier>>,
    sms: Vec<Arc<dyn SmsNotifier>>,
    blacklist: EmailBlacklist,
}

/// Builder for [`NotificationService`].
#[derive(Default)]
pub struct NotificationServiceBuilder {
    email: Vec<Arc<dyn EmailNotifier>>,
    sms: Vec<Arc<dyn SmsNotifier>>,
    blacklist: Option<EmailBlacklist>,
}

impl NotificationServiceBuilder {
    #[must_use]
    pub fn email_adapter(mut self, adapter: Arc<dyn EmailNotifier>) -> Self {
        self.email.push(adapter);
        self
    }

    #[must_use]
    pub fn email_adapters(mut self, adapters: Vec<Arc<dyn EmailNotifier>>) -> Self {
        self.email.extend(adapters);
        self
    }

    #[must_use]
    pub fn sms_adapter(mut self, adapter: Arc<dyn SmsNotifier>) -> Self {
        self.sms.push(adapter);
        self
    }

    #[must_use]
    pub fn sms_adapters(mut self, adapters: Vec<Arc<dyn SmsNotifier>>) -> Self {
        self.sms.extend(adapters);
        self
    }

    #[must_use]
    pub fn blacklist(mut self, blacklist: EmailBlacklist) -> Self {
        self.blacklist = Some(blacklist);
        self
    }

    #[must_use]
    pub fn build(mut self) -> NotificationService {
        sort_by_priority(&mut self.email, |a| a.priority());
        sort_by_priority(&mut self.sms, |a| a.priority());
        NotificationService {
            email: self.email,
            sms: self.sms,
            blacklist: self.blacklist.unwrap_or_default(),
        }
    }
}

impl NotificationService {
    #[must_use]
    pub fn builder() -> NotificationServiceBuilder {
        NotificationServiceBuilder::default()
    }

    /// Send on the given channel.
    pub async fn send(
        &self,
        channel: NotificationChannel,
        request: &NotificationRequest,
    ) -> Result<ChannelReceipt, NotifyError> {
        match channel {
            NotificationChannel::Email => self.send_email(request).await,
            NotificationChannel::Sms => self.send_sms(request).await,
        }
    }

    /// Send on both channels concurrently, returning a result per channel.
    pub async fn send_both(
        &self,
        email: &NotificationRequest,
        sms: &NotificationRequest,
    ) -> (
        Result<ChannelReceipt, NotifyError>,
        Result<ChannelReceipt, NotifyError>,
    ) {
        tokio::join!(self.send_email(email), self.send_sms(sms))
    }

    /// Send an email, walking the adapter chain in priority order.
    pub async fn send_email(
        &self,
        request: &NotificationRequest,
    ) -> Result<ChannelReceipt, NotifyError> {
        if self.blacklist.contains(&request.recipient) {
            warn!(
                delivery_id = %request.delivery_id,
                recipient = %request.recipient,
                "recipient blacklisted, skipping email"
            );
            return Err(NotifyError::Blacklisted {
                recipient: request.recipient.clone(),
            });
        }

        let dispatch = EmailDispatch {
            to: request.recipient.clone(),
            subject: request.subject.clone(),
            body: request.body.clone(),
            delivery_id: request.delivery_id,
        };

        let mut attempts = AttemptLog::new();
        let mut any_available = false;
        for adapter in &self.email {
            if !adapter.is_available().await {
                debug!(adapter = adapter.name(), "email adapter unavailable, skipping");
                continue;
            }
            any_available = true;
            match adapter.send(&dispatch).await {
                Ok(receipt) => {
                    info!(
                        delivery_id = %request.delivery_id,
                        adapter = adapter.name(),
                        message_id = %receipt.message_id,
                        "email sent"
                    );
                    return Ok(ChannelReceipt {
                        channel: NotificationChannel::Email,
                        provider: receipt.provider,
                        message_id: receipt.message_id,
                    });
                }
                Err(error) => {
                    warn!(
                        delivery_id = %request.delivery_id,
                        adapter = adapter.name(),
                        error = %error,
                        "email adapter failed, trying next"
                    );
                    attempts.record(adapter.name(), &error);
                }
            }
        }

        if !any_available {
            return Err(NotifyError::NoAdapter {
                channel: NotificationChannel::Email,
            });
        }
        Err(NotifyError::AllFailed {
            channel: NotificationChannel::Email,
            detail: attempts.into_error("send email").to_string(),
        })
    }

    /// Send an SMS, walking the adapter chain in priority order.
    pub async fn send_sms(
        &self,
        request: &NotificationRequest,
    ) -> Result<ChannelReceipt, NotifyError> {
        let dispatch = SmsDispatch {
            to: request.recipient.clone(),
            body: request.body.clone(),
            delivery_id: request.delivery_id,
        };

        let mut attempts = AttemptLog::new();
        let mut any_available = false;
        for adapter in &self.sms {
            if !adapter.is_available().await {
                debug!(adapter = adapter.name(), "sms adapter unavailable, skipping");
                continue;
            }
            any_available = true;
            match adapter.send(&dispatch).await {
                Ok(receipt) => {
                    info!(
                        delivery_id = %request.delivery_id,
                        adapter = adapter.name(),
                        message_id = %receipt.message_id,
                        "sms sent"
                    );
                    return Ok(ChannelReceipt {
                        channel: NotificationChannel::Sms,
                        provider: receipt.provider,
                        message_id: receipt.message_id,
                    });
                }
                Err(error) => {
                    warn!(
                        delivery_id = %request.delivery_id,
                        adapter = adapter.name(),
                        error = %error,
                        "sms adapter failed, trying next"
                    );
                    attempts.record(adapter.name(), &error);
                }
            }
        }

        if !any_available {
            return Err(NotifyError::NoAdapter {
                channel: NotificationChannel::Sms,
            });
        }
        Err(NotifyError::AllFailed {
            channel: NotificationChannel::Sms,
            detail: attempts.into_error("send sms").to_string(),
        })
    }
}
