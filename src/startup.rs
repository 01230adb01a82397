use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::accounts::AccountStore;
use crate::auth::{AuthSessionService, PasswordHasher};
use crate::middleware::JwtMiddleware;
use crate::routes::{
    create_user, get_current_user, health_check, login, refresh, revoke, update_user,
};

/// Shared collaborators handed to every worker
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<AuthSessionService>,
    pub hasher: PasswordHasher,
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let accounts: web::Data<dyn AccountStore> = web::Data::from(state.accounts);
    let sessions = web::Data::from(state.sessions);
    let hasher = web::Data::new(state.hasher);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(accounts.clone())
            .app_data(sessions.clone())
            .app_data(hasher.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::resource("/users")
                            .route(web::post().to(create_user))
                            .route(
                                web::put()
                                    .to(update_user)
                                    .wrap(JwtMiddleware::new(sessions.clone())),
                            ),
                    )
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    // Protected routes (require access token)
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware::new(sessions.clone()))
                            .route(web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
