use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

use super::AuthenticatedUser;

/// Request logging middleware
///
/// Logs one line per request with method, path, status, latency and the
/// authenticated subject when there is one. Query strings are left out
/// because they can carry credentials.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let method = req.method().to_string();
        let path = req.path().to_string();

        let service = self.service.clone();

        Box::pin(async move {
            let result = service.call(req).await;
            let elapsed_ms = started.elapsed().as_millis();

            match &result {
                Ok(res) => {
                    let user = res
                        .request()
                        .extensions()
                        .get::<AuthenticatedUser>()
                        .map(|u| u.id().to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let status = res.status().as_u16();

                    if res.status().is_server_error() {
                        log::warn!(
                            "[{}] {} {} -> {} ({}ms) user={}",
                            request_id, method, path, status, elapsed_ms, user
                        );
                    } else {
                        log::info!(
                            "[{}] {} {} -> {} ({}ms) user={}",
                            request_id, method, path, status, elapsed_ms, user
                        );
                    }
                }
                Err(e) => {
                    let status = e.as_response_error().status_code().as_u16();
                    log::info!(
                        "[{}] {} {} -> {} ({}ms) rejected: {}",
                        request_id, method, path, status, elapsed_ms, e
                    );
                }
            }

            result
        })
    }
}
