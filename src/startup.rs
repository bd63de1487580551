use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{PasswordVerifier, TokenIssuer};
use crate::configuration::Settings;
use crate::ledger::{PgLedgerStore, ReferralRedeemer, RewardLedger};
use crate::middleware::{JwtMiddleware, LoggerMiddleware};
use crate::routes::{
    delete_user_by_id, get_leaderboard, get_user_by_id, health_check, login, logout, refresh,
    register, reward_routes,
};

pub fn run(listener: TcpListener, connection: PgPool, settings: Settings) -> Result<Server, std::io::Error> {
    let verifier = PasswordVerifier::new(settings.hashing.bcrypt_cost)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let ledger = RewardLedger::new(Arc::new(PgLedgerStore::new(connection.clone())));
    let redeemer = ReferralRedeemer::new(ledger.clone());

    let secret = settings.jwt.secret.clone();
    let connection = web::Data::new(connection);
    let jwt_config = web::Data::new(settings.jwt);
    let verifier_data = web::Data::new(verifier);
    let issuer = web::Data::new(TokenIssuer::new(verifier));
    let ledger = web::Data::new(ledger);
    let redeemer = web::Data::new(redeemer);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)
            .app_data(connection.clone())
            .app_data(jwt_config.clone())
            .app_data(verifier_data.clone())
            .app_data(issuer.clone())
            .app_data(ledger.clone())
            .app_data(redeemer.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            // Protected routes
            .service(
                web::resource("/auth/logout")
                    .wrap(JwtMiddleware::new(secret.clone()))
                    .route(web::post().to(logout)),
            )
            .service(
                web::scope("/users")
                    .wrap(JwtMiddleware::new(secret.clone()))
                    .route("/leaderboard", web::get().to(get_leaderboard))
                    .route("/{id}", web::get().to(get_user_by_id))
                    .route("/{id}", web::delete().to(delete_user_by_id))
                    .configure(reward_routes),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
