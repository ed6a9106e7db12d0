use std::sync::Arc;

use tracing::warn;

use crate::backend::RestClient;
use crate::config::Config;
use crate::error::AppResult;
use crate::pages::DefaultPageFactory;
use crate::router::{
    ROOT_PATH, RouteController, default_protected_prefixes, default_route_table,
};
use crate::services::Services;
use crate::services::auth::Role;

use super::state::{AppState, SharedLoadingFlag};

/// The application: state, service collaborators and the route controller,
/// constructed once at startup and driven by the event loop.
pub struct App {
    pub state: AppState,
    pub config: Arc<Config>,
    pub services: Services,
    pub controller: RouteController,
    pub(crate) loading: SharedLoadingFlag,
}

impl App {
    pub fn new(config: Config) -> AppResult<Self> {
        let config = Arc::new(config);
        let rest = Arc::new(RestClient::new(&config.backend)?);
        let services = Services::backed_by(rest, &config.backend);
        Self::with_services(config, services)
    }

    pub fn with_services(config: Arc<Config>, services: Services) -> AppResult<Self> {
        let loading = SharedLoadingFlag::default();
        let controller = RouteController::new(
            default_route_table()?,
            default_protected_prefixes(),
            Arc::new(DefaultPageFactory),
            Arc::new(loading.clone()),
            &config.router,
        )?;

        Ok(Self {
            state: AppState::default(),
            config,
            services,
            controller,
            loading,
        })
    }
}

/// Where to land at startup: drivers on their dashboard, other signed-in
/// users on the booking page, everyone else at sign-in.
pub(crate) async fn startup_path(services: &Services) -> String {
    match services.auth.current_principal().await {
        Ok(Some(principal)) => match services.auth.profile(&principal.id).await {
            Ok(Some(profile)) if profile.role == Role::Driver => {
                "/driver/dashboard".to_string()
            }
            Ok(_) => "/customer".to_string(),
            Err(err) => {
                warn!("could not load profile at startup: {err}");
                "/customer".to_string()
            }
        },
        Ok(None) => ROOT_PATH.to_string(),
        Err(err) => {
            warn!("could not resolve session at startup: {err}");
            ROOT_PATH.to_string()
        }
    }
}
