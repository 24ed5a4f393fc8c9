use std::sync::Arc;

use handlebars::TemplateError;
use thiserror::Error;

use crate::auth::AdminAuth;
use crate::clients::{
    mailer::{LuckyMailer, SmtpMailer},
    storage::{ImageStore, ObjectStorageClient},
    telegram::TelegramClient,
    webhook::ScriptWebhookClient,
    NotifyError,
};
use crate::config::AppConfig;
use crate::database::DirectoryStore;
use crate::seed::SeedFile;
use crate::templates::Templates;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("failed to compile templates: {0}")]
    Templates(#[from] TemplateError),

    #[error("failed to configure SMTP: {0}")]
    Mailer(#[from] NotifyError),
}

/// Shared application state handed to every handler.
pub struct AppState {
    pub store: Arc<dyn DirectoryStore>,
    pub auth: AdminAuth,
    pub templates: Arc<Templates>,
    pub seed: SeedFile,
    pub images: Option<Arc<dyn ImageStore>>,
    pub telegram: Option<TelegramClient>,
    pub mailer: Option<Arc<dyn LuckyMailer>>,
    pub webhook: Option<ScriptWebhookClient>,
    pub site_url: String,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn DirectoryStore>,
    ) -> Result<Self, StartupError> {
        let templates = Arc::new(Templates::new()?);

        let mailer: Option<Arc<dyn LuckyMailer>> = match &config.smtp {
            Some(smtp) => Some(Arc::new(SmtpMailer::new(
                smtp,
                templates.clone(),
                &config.site_url,
            )?)),
            None => None,
        };

        let images: Option<Arc<dyn ImageStore>> = config
            .storage
            .as_ref()
            .map(|storage| Arc::new(ObjectStorageClient::new(storage)) as Arc<dyn ImageStore>);

        Ok(Self {
            store,
            auth: AdminAuth::from_config(config),
            templates,
            seed: SeedFile::new(&config.seed_path),
            images,
            telegram: config
                .telegram
                .as_ref()
                .map(|telegram| TelegramClient::new(telegram, &config.site_url)),
            mailer,
            webhook: config
                .google_script_webhook_url
                .clone()
                .map(ScriptWebhookClient::new),
            site_url: config.site_url.clone(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}
