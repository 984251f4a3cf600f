pub mod application_service;
pub mod calendar_service;
pub mod google_auth;
pub mod interview_service;
pub mod notification_service;
pub mod position_analyzer;
pub mod ranking_service;
pub mod skill_extractor;
pub mod skill_matcher;
