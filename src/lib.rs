pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::database::RecruitmentStore;
use crate::error::Result;
use crate::services::{
    application_service::ApplicationService,
    calendar_service::{CalendarProvider, DisabledCalendar, GoogleCalendarClient},
    google_auth::GoogleTokenSource,
    interview_service::InterviewService,
    notification_service::{
        EmailTransport, GmailTransport, NotificationService, UnconfiguredTransport,
    },
    ranking_service::RankingService,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecruitmentStore>,
    pub ranking_service: RankingService,
    pub application_service: ApplicationService,
    pub interview_service: InterviewService,
    pub default_interview_minutes: i32,
}

impl AppState {
    pub fn new(store: Arc<dyn RecruitmentStore>, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let (calendar, transport): (Arc<dyn CalendarProvider>, Arc<dyn EmailTransport>) =
            match &config.google {
                Some(credentials) => {
                    let tokens = Arc::new(GoogleTokenSource::new(
                        http_client.clone(),
                        credentials.clone(),
                    ));
                    (
                        Arc::new(GoogleCalendarClient::new(
                            http_client.clone(),
                            tokens.clone(),
                            config.google_calendar_id.clone(),
                        )),
                        Arc::new(GmailTransport::new(http_client, tokens)),
                    )
                }
                None => {
                    info!("Google credentials not set; calendar events and email delivery disabled");
                    (Arc::new(DisabledCalendar), Arc::new(UnconfiguredTransport))
                }
            };

        let notifications =
            NotificationService::new(transport, config.environment, config.send_real_emails);

        Ok(Self::with_integrations(
            store,
            calendar,
            notifications,
            config.meeting_url_base.clone(),
            config.default_interview_minutes,
        ))
    }

    /// Wires the services around explicit integrations.
    pub fn with_integrations(
        store: Arc<dyn RecruitmentStore>,
        calendar: Arc<dyn CalendarProvider>,
        notifications: NotificationService,
        meeting_url_base: String,
        default_interview_minutes: i32,
    ) -> Self {
        let ranking_service = RankingService::new(store.clone());
        let application_service = ApplicationService::new(store.clone());
        let interview_service =
            InterviewService::new(store.clone(), calendar, notifications, meeting_url_base);

        Self {
            store,
            ranking_service,
            application_service,
            interview_service,
            default_interview_minutes,
        }
    }
}
