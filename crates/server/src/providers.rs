//! Adapter registry construction from configuration.
//!
//! Configured adapters register at their configured priority; the mock
//! adapters are always appended at priority 999 so no fallback chain is
//! ever empty. The force-mock flag drops everything but the mocks.

use std::sync::Arc;

use tracing::info;

use freightwatch_email::{SendgridConfig, SendgridMailer, SmtpConfig, SmtpMailer};
use freightwatch_googlemaps::{GoogleGeocoder, GoogleMapsConfig, GoogleTrafficProvider};
use freightwatch_openai::{OpenAiConfig, OpenAiMessageGenerator};
use freightwatch_provider::mock::{
    MockEmailNotifier, MockGeocoder, MockMessageGenerator, MockSmsNotifier, MockTrafficProvider,
};
use freightwatch_provider::{
    EmailNotifier, Geocoder, MessageGenerator, ProviderError, SmsNotifier, TrafficProvider,
};
use freightwatch_twilio::{TwilioConfig, TwilioSmsNotifier};

use crate::config::ProvidersSection;

/// The adapter chains handed to the services.
pub struct ProviderSet {
    pub traffic: Vec<Arc<dyn TrafficProvider>>,
    pub geocoders: Vec<Arc<dyn Geocoder>>,
    pub generators: Vec<Arc<dyn MessageGenerator>>,
    pub email: Vec<Arc<dyn EmailNotifier>>,
    pub sms: Vec<Arc<dyn SmsNotifier>>,
}

/// Build every adapter chain from configuration.
pub fn build_providers(config: &ProvidersSection) -> Result<ProviderSet, ProviderError> {
    let mut set = ProviderSet {
        traffic: Vec::new(),
        geocoders: Vec::new(),
        generators: Vec::new(),
        email: Vec::new(),
        sms: Vec::new(),
    };

    if !config.force_mock_adapters {
        if let Some(api_key) = config.google_maps.api_key.clone() {
            let mut maps = GoogleMapsConfig::new().with_api_key(api_key);
            if let Some(priority) = config.google_maps.priority {
                maps = maps.with_priority(priority);
            }
            set.traffic
                .push(Arc::new(GoogleTrafficProvider::new(maps.clone())?));
            set.geocoders.push(Arc::new(GoogleGeocoder::new(maps)?));
            info!("google maps adapters registered");
        }

        if let (Some(api_key), Some(from_email)) = (
            config.sendgrid.api_key.clone(),
            config.sendgrid.from_email.clone(),
        ) {
            let mut sendgrid = SendgridConfig::new(from_email).with_api_key(api_key);
            if let Some(priority) = config.sendgrid.priority {
                sendgrid = sendgrid.with_priority(priority);
            }
            set.email.push(Arc::new(SendgridMailer::new(sendgrid)?));
            info!("sendgrid mailer registered");
        }

        if let (Some(host), Some(from_email)) =
            (config.smtp.host.clone(), config.smtp.from_email.clone())
        {
            let mut smtp = SmtpConfig::new(from_email).with_host(host);
            if let Some(port) = config.smtp.port {
                smtp = smtp.with_port(port);
            }
            if let (Some(username), Some(password)) =
                (config.smtp.username.clone(), config.smtp.password.clone())
            {
                smtp = smtp.with_credentials(username, password);
            }
            if let Some(tls) = config.smtp.tls {
                smtp = smtp.with_tls(tls);
            }
            if let Some(priority) = config.smtp.priority {
                smtp = smtp.with_priority(priority);
            }
            set.email.push(Arc::new(SmtpMailer::new(smtp)?));
            info!("smtp mailer registered");
        }

        if let (Some(account_sid), Some(auth_token), Some(from_number)) = (
            config.twilio.account_sid.clone(),
            config.twilio.auth_token.clone(),
            config.twilio.from_number.clone(),
        ) {
            let mut twilio = TwilioConfig::new()
                .with_credentials(account_sid, auth_token)
                .with_from_number(from_number);
            if let Some(priority) = config.twilio.priority {
                twilio = twilio.with_priority(priority);
            }
            set.sms.push(Arc::new(TwilioSmsNotifier::new(twilio)?));
            info!("twilio sms notifier registered");
        }

        if let Some(api_key) = config.openai.api_key.clone() {
            let mut openai = OpenAiConfig::new().with_api_key(api_key);
            if let Some(model) = config.openai.model.clone() {
                openai = openai.with_model(model);
            }
            if let Some(priority) = config.openai.priority {
                openai = openai.with_priority(priority);
            }
            set.generators
                .push(Arc::new(OpenAiMessageGenerator::new(openai)?));
            info!("openai message generator registered");
        }
    } else {
        info!("mock adapters forced; external adapters disabled");
    }

    // Mocks always close every chain at priority 999.
    set.traffic.push(Arc::new(MockTrafficProvider::new()));
    set.geocoders.push(Arc::new(MockGeocoder::new()));
    set.generators.push(Arc::new(MockMessageGenerator::new()));
    set.email.push(Arc::new(MockEmailNotifier::new()));
    set.sms.push(Arc::new(MockSmsNotifier::new()));

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProvidersSection, TwilioSection};

    #[test]
    fn mocks_are_always_present() {
        let set = build_providers(&ProvidersSection::default()).unwrap();
        assert_eq!(set.traffic.len(), 1);
        assert_eq!(set.email.len(), 1);
        assert_eq!(set.sms.len(), 1);
        assert_eq!(set.traffic[0].name(), "mock-traffic");
    }

    #[test]
    fn configured_adapters_precede_mocks() {
        let config = ProvidersSection {
            twilio: TwilioSection {
                account_sid: Some("AC123".into()),
                auth_token: Some("token".into()),
                from_number: Some("+15551234567".into()),
                priority: None,
            },
            ..ProvidersSection::default()
        };
        let set = build_providers(&config).unwrap();
        assert_eq!(set.sms.len(), 2);
        assert_eq!(set.sms[0].name(), "twilio");
        assert_eq!(set.sms[1].name(), "mock-sms");
    }

    #[test]
    fn force_mock_drops_configured_adapters() {
        let config = ProvidersSection {
            force_mock_adapters: true,
            twilio: TwilioSection {
                account_sid: Some("AC123".into()),
                auth_token: Some("token".into()),
                from_number: Some("+15551234567".into()),
                priority: None,
            },
            ..ProvidersSection::default()
        };
        let set = build_providers(&config).unwrap();
        assert_eq!(set.sms.len(), 1);
        assert_eq!(set.sms[0].name(), "mock-sms");
    }
}
